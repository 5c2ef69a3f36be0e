//! Shared environment and classifier doubles for the hashing tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::kernel::context::TypeContext;
use crate::kernel::env::{ConstantVal, Environment};
use crate::kernel::error::KernelError;
use crate::kernel::expr::{BinderInfo, Expr, Level, Name, foldl_apps};
use crate::kernel::fun_info::{
  FunInfo, FunInfoProvider, ParamInfo, TelescopeFunInfo,
};

pub const NO: ParamInfo = ParamInfo { is_inst_implicit: false, is_prop: false };
pub const INST: ParamInfo = ParamInfo { is_inst_implicit: true, is_prop: false };

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .with_test_writer()
    .try_init();
}

pub fn n(s: &str) -> Name {
  Name::from_dotted(s)
}

pub fn cnst(s: &str) -> Expr {
  Expr::cnst(n(s), vec![])
}

pub fn pi(x: &str, d: Expr, b: Expr) -> Expr {
  Expr::all(n(x), d, b, BinderInfo::Default)
}

pub fn lam(x: &str, d: Expr, b: Expr) -> Expr {
  Expr::lam(n(x), d, b, BinderInfo::Default)
}

pub fn app(f: Expr, args: &[Expr]) -> Expr {
  foldl_apps(f, args.iter().cloned())
}

pub fn decl(name: &str, typ: Expr) -> ConstantVal {
  ConstantVal { name: n(name), level_params: vec![], typ }
}

pub fn prop() -> Expr {
  Expr::sort(Level::zero())
}

pub fn ty() -> Expr {
  Expr::sort(Level::succ(Level::zero()))
}

/// A small prelude:
///
/// - `Nat : Type`, `zero one two : Nat`
/// - `Add : Type → Type`, `instNat instNat' : Add Nat`
/// - `Add.add : {α : Type} → [Add α] → α → α → α`
/// - `Eq : {α : Type} → α → α → Prop`, `rfl0 rfl0' : Eq Nat zero zero`
/// - `f : Nat → Nat → Nat`
/// - `pos : (n : Nat) → Eq Nat n n → Nat`
pub fn env() -> Environment {
  let nat = || cnst("Nat");
  let eq = |a: Expr, b: Expr| app(cnst("Eq"), &[nat(), a, b]);
  let add_add_ty = Expr::all(
    n("α"),
    ty(),
    Expr::all(
      n("inst"),
      app(cnst("Add"), &[Expr::bvar(0)]),
      pi("a", Expr::bvar(1), pi("b", Expr::bvar(2), Expr::bvar(3))),
      BinderInfo::InstImplicit,
    ),
    BinderInfo::Implicit,
  );
  let eq_ty = Expr::all(
    n("α"),
    ty(),
    pi("a", Expr::bvar(0), pi("b", Expr::bvar(1), prop())),
    BinderInfo::Implicit,
  );
  Environment::from_constants([
    decl("Nat", ty()),
    decl("zero", nat()),
    decl("one", nat()),
    decl("two", nat()),
    decl("Add", pi("α", ty(), ty())),
    decl("instNat", app(cnst("Add"), &[nat()])),
    decl("instNat'", app(cnst("Add"), &[nat()])),
    decl("Add.add", add_add_ty),
    decl("Eq", eq_ty),
    decl("rfl0", eq(cnst("zero"), cnst("zero"))),
    decl("rfl0'", eq(cnst("zero"), cnst("zero"))),
    decl("f", pi("a", nat(), pi("b", nat(), nat()))),
    decl(
      "pos",
      pi("n", nat(), pi("h", eq(Expr::bvar(0), Expr::bvar(0)), nat())),
    ),
  ])
}

/// Reports the same flags for every head, truncated to the argument count.
pub struct FixedFunInfo(pub Vec<ParamInfo>);

impl FunInfoProvider for FixedFunInfo {
  fn fun_info(
    &self,
    _ctx: &TypeContext,
    _f: &Expr,
    nargs: usize,
  ) -> Result<FunInfo, KernelError> {
    Ok(FunInfo::new(self.0.iter().copied().take(nargs).collect()))
  }
}

/// Delegates to [`TelescopeFunInfo`] and counts the queries.
#[derive(Default)]
pub struct CountingFunInfo {
  pub calls: AtomicUsize,
}

impl CountingFunInfo {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl FunInfoProvider for CountingFunInfo {
  fn fun_info(
    &self,
    ctx: &TypeContext,
    f: &Expr,
    nargs: usize,
  ) -> Result<FunInfo, KernelError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    TelescopeFunInfo.fun_info(ctx, f, nargs)
  }
}

pub struct FailingFunInfo;

impl FunInfoProvider for FailingFunInfo {
  fn fun_info(
    &self,
    _ctx: &TypeContext,
    _f: &Expr,
    _nargs: usize,
  ) -> Result<FunInfo, KernelError> {
    Err(anyhow::anyhow!("classifier unavailable").into())
  }
}
