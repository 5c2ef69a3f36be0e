//! The type context: an environment, a local context and ambient options.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use super::env::Environment;
use super::error::KernelError;
use super::expr::{Expr, Name};
use super::fun_info::{FunInfo, FunInfoProvider, TelescopeFunInfo};

pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// How eagerly definitions may be unfolded by consumers of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transparency {
  All,
  #[default]
  Default,
  Reducible,
  Instances,
  None,
}

/// Ambient settings of a [`TypeContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions {
  pub transparency: Transparency,
}

/// A local hypothesis or let-bound local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
  /// Unique name carried by the `Fvar`.
  pub name: Name,
  pub user_name: Name,
  pub typ: Expr,
  pub value: Option<Expr>,
}

pub struct TypeContext {
  env: Environment,
  options: ContextOptions,
  lctx: FxIndexMap<Name, LocalDecl>,
  local_counter: u64,
  fun_info: Arc<dyn FunInfoProvider>,
}

impl TypeContext {
  pub fn new(env: Environment) -> Self {
    TypeContext::with_options(env, ContextOptions::default())
  }

  pub fn with_options(env: Environment, options: ContextOptions) -> Self {
    TypeContext {
      env,
      options,
      lctx: FxIndexMap::default(),
      local_counter: 0,
      fun_info: Arc::new(TelescopeFunInfo),
    }
  }

  /// Replaces the parameter classifier. Hash caches are keyed by environment
  /// alone, so the classifier must be a function of the environment.
  pub fn with_fun_info(mut self, provider: Arc<dyn FunInfoProvider>) -> Self {
    self.fun_info = provider;
    self
  }

  pub fn env(&self) -> &Environment {
    &self.env
  }

  pub fn transparency(&self) -> Transparency {
    self.options.transparency
  }

  /// Sets the transparency and returns the previous one.
  pub fn set_transparency(&mut self, mode: Transparency) -> Transparency {
    std::mem::replace(&mut self.options.transparency, mode)
  }

  /// Classifies the first `nargs` parameters of `f`.
  pub fn fun_info(
    &self,
    f: &Expr,
    nargs: usize,
  ) -> Result<FunInfo, KernelError> {
    self.fun_info.fun_info(self, f, nargs)
  }

  // ==========================================================================
  // Local context
  // ==========================================================================

  fn fresh_name(&mut self) -> Name {
    let id = self.local_counter;
    self.local_counter += 1;
    Name::num(Name::str(Name::anon(), "_uniq".to_owned()), id)
  }

  /// Create a fresh free variable of type `ty`.
  pub fn push_local(&mut self, user_name: &Name, ty: Expr) -> Expr {
    self.push_decl(user_name, ty, None)
  }

  /// Create a fresh let-bound free variable `user_name : ty := value`.
  pub fn push_let(&mut self, user_name: &Name, ty: Expr, value: Expr) -> Expr {
    self.push_decl(user_name, ty, Some(value))
  }

  fn push_decl(
    &mut self,
    user_name: &Name,
    typ: Expr,
    value: Option<Expr>,
  ) -> Expr {
    let name = self.fresh_name();
    let decl =
      LocalDecl { name: name.clone(), user_name: user_name.clone(), typ, value };
    self.lctx.insert(name.clone(), decl);
    Expr::fvar(name)
  }

  /// Removes the most recently pushed local.
  pub fn pop_local(&mut self) -> Option<LocalDecl> {
    self.lctx.pop().map(|(_, decl)| decl)
  }

  pub fn find_local(&self, name: &Name) -> Option<&LocalDecl> {
    self.lctx.get(name)
  }

  pub fn num_locals(&self) -> usize {
    self.lctx.len()
  }
}
