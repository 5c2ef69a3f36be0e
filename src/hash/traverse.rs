//! The binder-aware abstract hashing traversal.
//!
//! Parameter classification needs heads whose bound variables are resolved.
//! The traversal therefore keeps a stack of synthesized locals, one per
//! binder it has entered, and instantiates a head against that stack right
//! before classifying it. The hash of a term with loose bound variables
//! depends on that stack, so only closed terms are memoized.

use tracing::trace;

use super::combine;
use super::error::HashError;
use super::store::MemoStore;
use crate::kernel::context::{Transparency, TypeContext};
use crate::kernel::expr::{Expr, ExprData, MacroView, Name, inst, unfold_apps};

pub struct AbstractHasher<'a> {
  ctx: &'a mut TypeContext,
  cache: &'a mut MemoStore,
  locals: Vec<Expr>,
}

impl<'a> AbstractHasher<'a> {
  pub fn new(ctx: &'a mut TypeContext, cache: &'a mut MemoStore) -> Self {
    AbstractHasher { ctx, cache, locals: Vec::new() }
  }

  /// Number of binders currently entered.
  pub fn depth(&self) -> usize {
    self.locals.len()
  }

  pub fn instantiate_locals(&self, e: &Expr) -> Expr {
    inst(e, &self.locals)
  }

  pub fn push_local(&mut self, name: &Name, ty: &Expr) -> Expr {
    let ty = self.instantiate_locals(ty);
    let l = self.ctx.push_local(name, ty);
    self.locals.push(l.clone());
    l
  }

  pub fn push_let(&mut self, name: &Name, ty: &Expr, value: &Expr) -> Expr {
    let ty = self.instantiate_locals(ty);
    let value = self.instantiate_locals(value);
    let l = self.ctx.push_let(name, ty, value);
    self.locals.push(l.clone());
    l
  }

  pub fn pop(&mut self) {
    if self.locals.pop().is_some() {
      self.ctx.pop_local();
    }
  }

  /// Runs `f` under a fresh local for `name : ty`, popping it on every path.
  fn with_local<R>(
    &mut self,
    name: &Name,
    ty: &Expr,
    f: impl FnOnce(&mut Self) -> R,
  ) -> R {
    self.push_local(name, ty);
    let r = f(self);
    self.pop();
    r
  }

  fn with_let<R>(
    &mut self,
    name: &Name,
    ty: &Expr,
    value: &Expr,
    f: impl FnOnce(&mut Self) -> R,
  ) -> R {
    self.push_let(name, ty, value);
    let r = f(self);
    self.pop();
    r
  }

  /// Hashes a top-level term with transparency forced to `All`, restoring
  /// the caller's setting afterwards.
  pub fn run(&mut self, e: &Expr) -> Result<u64, HashError> {
    let saved = self.ctx.set_transparency(Transparency::All);
    trace!(kind = %e.kind(), cached = self.cache.len(), "abstract hash");
    let hits = self.cache.stats().hits;
    let r = self.hash(e);
    self.ctx.set_transparency(saved);
    trace!(
      hits = self.cache.stats().hits - hits,
      ok = r.is_ok(),
      "abstract hash done"
    );
    r
  }

  pub fn hash(&mut self, e: &Expr) -> Result<u64, HashError> {
    if e.kind().is_leaf() {
      return Ok(e.structural_hash());
    }
    // Open terms resolve their loose variables against the binder stack, so
    // only closed terms are memoized.
    if e.has_loose_bvars() {
      return self.hash_compound(e);
    }
    if let Some(h) = self.cache.get(e) {
      return Ok(h);
    }
    let r = self.hash_compound(e)?;
    self.cache.insert(e.clone(), r);
    Ok(r)
  }

  fn hash_compound(&mut self, e: &Expr) -> Result<u64, HashError> {
    match e.as_data() {
      ExprData::Bvar(..)
      | ExprData::Fvar(..)
      | ExprData::Mvar(..)
      | ExprData::Sort(..)
      | ExprData::Const(..) => {
        Err(HashError::InvariantViolation { kind: e.kind() })
      },
      ExprData::Lam(n, d, b, _) | ExprData::ForallE(n, d, b, _) => {
        let r = self.hash(d)?;
        let hb = self.with_local(n, d, |this| this.hash(b))?;
        Ok(combine(r, hb))
      },
      ExprData::LetE(n, t, v, b) => {
        let ht = self.hash(t)?;
        let r = combine(ht, self.hash(v)?);
        let hb = self.with_let(n, t, v, |this| this.hash(b))?;
        Ok(combine(r, hb))
      },
      ExprData::Macro(def, args) => self.hash_macro(MacroView::new(def, args)),
      ExprData::App(..) => self.hash_app(e),
    }
  }

  /// The definition's identity always contributes, so macros with equal
  /// arguments but different meanings differ.
  fn hash_macro(&mut self, m: MacroView<'_>) -> Result<u64, HashError> {
    let mut r = m.num_args() as u64;
    for i in 0..m.num_args() {
      r = combine(r, self.hash(m.arg(i))?);
    }
    Ok(combine(r, m.def_hash()))
  }

  /// Folds in the head and every argument the classifier reports as neither
  /// instance-implicit nor a proof.
  fn hash_app(&mut self, e: &Expr) -> Result<u64, HashError> {
    let (f, args) = unfold_apps(e);
    let mut r = self.hash(&f)?;
    let head = self.instantiate_locals(&f);
    let info = self.ctx.fun_info(&head, args.len())?;
    if info.arity() > args.len() {
      return Err(HashError::ParamCountMismatch {
        reported: info.arity(),
        nargs: args.len(),
      });
    }
    for (pinfo, arg) in info.params().iter().zip(&args) {
      if pinfo.is_relevant() {
        r = combine(r, self.hash(arg)?);
      }
    }
    // The arity of `f` may depend on its arguments, so `info` can be shorter
    // than `args`; the remaining arguments do not contribute.
    Ok(r)
  }
}
