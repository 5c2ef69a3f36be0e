//! Parameter classification for application heads.
//!
//! The abstract hasher asks, for a head `f` applied to `n` arguments, which
//! of the first `n` parameters are instance-implicit and which are proofs.
//! [`TelescopeFunInfo`] answers by walking the Pi telescope of the head's
//! declared type without performing any reduction, so a telescope hidden
//! behind a definition yields a shorter parameter list.

use super::context::TypeContext;
use super::error::KernelError;
use super::expr::{
  BinderInfo, Expr, ExprData, subst_expr_levels, unfold_apps,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamInfo {
  pub is_inst_implicit: bool,
  /// The argument is a proof of a proposition.
  pub is_prop: bool,
}

impl ParamInfo {
  /// Whether the argument at this position can change the term's meaning.
  pub fn is_relevant(&self) -> bool {
    !self.is_inst_implicit && !self.is_prop
  }
}

/// Per-position parameter flags, possibly fewer than the arguments supplied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunInfo {
  params: Vec<ParamInfo>,
}

impl FunInfo {
  pub fn new(params: Vec<ParamInfo>) -> Self {
    FunInfo { params }
  }

  pub fn params(&self) -> &[ParamInfo] {
    &self.params
  }

  pub fn arity(&self) -> usize {
    self.params.len()
  }
}

/// Source of parameter classification.
///
/// Implementations must be deterministic for a fixed environment, head and
/// argument count, and must not return more than `nargs` entries.
pub trait FunInfoProvider: Send + Sync {
  fn fun_info(
    &self,
    ctx: &TypeContext,
    f: &Expr,
    nargs: usize,
  ) -> Result<FunInfo, KernelError>;
}

/// Classifies parameters from the binders of the head's type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelescopeFunInfo;

impl FunInfoProvider for TelescopeFunInfo {
  fn fun_info(
    &self,
    ctx: &TypeContext,
    f: &Expr,
    nargs: usize,
  ) -> Result<FunInfo, KernelError> {
    // A lambda head is classified by its own binders.
    if let ExprData::Lam(..) = f.as_data() {
      return telescope(ctx, f, nargs);
    }
    match head_type(ctx, f)? {
      Some(ty) => telescope(ctx, &ty, nargs),
      None => Ok(FunInfo::default()),
    }
  }
}

/// Walks up to `nargs` Pi or lambda binders starting at `start`.
fn telescope(
  ctx: &TypeContext,
  start: &Expr,
  nargs: usize,
) -> Result<FunInfo, KernelError> {
  let mut params = Vec::with_capacity(nargs);
  let mut binders: Vec<Expr> = Vec::new();
  let mut cursor = start.clone();
  while params.len() < nargs {
    let (dom, body, bi) = match cursor.as_data() {
      ExprData::ForallE(_, d, b, bi) | ExprData::Lam(_, d, b, bi) => {
        (d.clone(), b.clone(), *bi)
      },
      _ => break,
    };
    let is_prop = is_proof_type(ctx, &dom, &mut binders)?;
    params.push(ParamInfo {
      is_inst_implicit: bi == BinderInfo::InstImplicit,
      is_prop,
    });
    binders.push(dom);
    cursor = body;
  }
  Ok(FunInfo::new(params))
}

/// Declared type of a constant (instantiated at its universe arguments) or
/// local head; `None` for heads with no type available here.
fn head_type(
  ctx: &TypeContext,
  f: &Expr,
) -> Result<Option<Expr>, KernelError> {
  match f.as_data() {
    ExprData::Const(name, levels) => match ctx.env().find(name) {
      Some(c) => {
        Ok(Some(subst_expr_levels(&c.typ, &c.level_params, levels)))
      },
      None => Err(KernelError::UnknownConst { name: name.clone() }),
    },
    ExprData::Fvar(name) => match ctx.find_local(name) {
      Some(decl) => Ok(Some(decl.typ.clone())),
      None => Err(KernelError::UnknownLocal { name: name.clone() }),
    },
    _ => Ok(None),
  }
}

/// Whether `ty` is a proposition, i.e. its inhabitants are proofs.
///
/// `binders` holds the domains of the enclosing binders, outermost first,
/// so that a `Bvar` head can be given a type.
fn is_proof_type(
  ctx: &TypeContext,
  ty: &Expr,
  binders: &mut Vec<Expr>,
) -> Result<bool, KernelError> {
  if let ExprData::ForallE(_, d, b, _) = ty.as_data() {
    // Impredicativity: `∀ x, P x` is a proposition when its body is.
    binders.push(d.clone());
    let r = is_proof_type(ctx, b, binders);
    binders.pop();
    return r;
  }
  let (head, args) = unfold_apps(ty);
  let head_ty = match head.as_data() {
    ExprData::Bvar(idx) => {
      let idx = usize::try_from(*idx).unwrap_or(usize::MAX);
      match binders.len().checked_sub(idx.saturating_add(1)) {
        Some(k) => binders[k].clone(),
        None => return Ok(false),
      }
    },
    ExprData::Const(..) | ExprData::Fvar(..) => {
      match head_type(ctx, &head)? {
        Some(t) => t,
        None => return Ok(false),
      }
    },
    _ => return Ok(false),
  };
  Ok(returns_prop(&head_ty, args.len()))
}

/// Whether peeling exactly `nargs` Pi binders from `ty` leaves `Sort 0`.
fn returns_prop(ty: &Expr, nargs: usize) -> bool {
  let mut cursor = ty;
  for _ in 0..nargs {
    match cursor.as_data() {
      ExprData::ForallE(_, _, b, _) => cursor = b,
      _ => return false,
    }
  }
  matches!(cursor.as_data(), ExprData::Sort(l) if l.is_zero())
}
