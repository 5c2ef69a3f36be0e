//! Parallel abstract hashing of many terms against one environment.
//!
//! Every rayon worker hashes with its own [`TypeContext`] and its own
//! thread-local registry, so stores are never shared between threads.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::debug;

use super::abstract_hash;
use super::error::HashError;
use crate::kernel::context::TypeContext;
use crate::kernel::env::Environment;
use crate::kernel::expr::Expr;

/// Abstract hashes of `exprs`, in order, under default contexts for `env`.
pub fn abstract_hash_all(
  env: &Environment,
  exprs: &[Expr],
) -> Result<Vec<u64>, HashError> {
  abstract_hash_all_with(exprs, || TypeContext::new(env.clone()))
}

/// Like [`abstract_hash_all`], with each worker's context built by `mk_ctx`.
/// Stops at the first error.
pub fn abstract_hash_all_with<F>(
  exprs: &[Expr],
  mk_ctx: F,
) -> Result<Vec<u64>, HashError>
where
  F: Fn() -> TypeContext + Sync + Send,
{
  debug!(terms = exprs.len(), "batch abstract hash");
  exprs
    .par_iter()
    .map_init(mk_ctx, |ctx, e| abstract_hash(ctx, e))
    .collect()
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::hash::fixtures::*;
  use crate::kernel::error::KernelError;

  fn terms() -> Vec<Expr> {
    let mut v = Vec::new();
    for inst in ["instNat", "instNat'"] {
      for (a, b) in [("zero", "one"), ("one", "two"), ("two", "zero")] {
        v.push(app(
          cnst("Add.add"),
          &[cnst("Nat"), cnst(inst), cnst(a), cnst(b)],
        ));
      }
    }
    v.push(app(cnst("pos"), &[cnst("one"), cnst("rfl0")]));
    v.push(lam("x", cnst("Nat"), app(cnst("f"), &[Expr::bvar(0), cnst("two")])));
    v.push(cnst("Nat"));
    v
  }

  #[test]
  fn batch_matches_sequential() {
    init_tracing();
    let env = env();
    let exprs = terms();
    let batch = abstract_hash_all(&env, &exprs).unwrap();
    let mut ctx = TypeContext::new(env.clone());
    let sequential: Vec<u64> =
      exprs.iter().map(|e| abstract_hash(&mut ctx, e).unwrap()).collect();
    assert_eq!(batch, sequential);
    // The instance argument is ignored across the two halves.
    assert_eq!(batch[..3], batch[3..6]);
  }

  #[test]
  fn batch_reports_first_failure() {
    let env = env();
    let mut exprs = terms();
    exprs.push(app(cnst("missing"), &[cnst("zero")]));
    let err = abstract_hash_all(&env, &exprs).unwrap_err();
    assert!(matches!(err, HashError::Kernel(KernelError::UnknownConst { .. })));
  }

  #[test]
  fn batch_uses_the_given_contexts() {
    let env = env();
    let exprs = terms();
    let every_arg = Arc::new(FixedFunInfo(vec![NO; 4]));
    let batch = abstract_hash_all_with(&exprs, || {
      TypeContext::new(env.clone()).with_fun_info(every_arg.clone())
    })
    .unwrap();
    // With every argument relevant the instances are told apart again.
    assert_ne!(batch[..3], batch[3..6]);
  }
}
