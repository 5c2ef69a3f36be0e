//! Abstract hashing of kernel expressions.
//!
//! The abstract hash of a term ignores the arguments that cannot change its
//! meaning: instance-implicit arguments (any two instances are
//! interchangeable) and proofs (any two proofs of a proposition are). Equal
//! abstract hashes are only a hint that two terms may be interchangeable;
//! they never replace a definitional equality check.
//!
//! Results are memoized per environment in a [`MemoStore`] handed out by a
//! [`CacheProvider`]. The default provider is a per-thread
//! [`CacheRegistry`].

pub mod error;
pub mod registry;
pub mod store;
pub mod traverse;

#[cfg(feature = "parallel")]
pub mod batch;

#[cfg(test)]
mod fixtures;

use tracing::trace;

use crate::kernel::context::TypeContext;
use crate::kernel::expr::Expr;
pub use error::HashError;
pub use registry::{CacheProvider, CacheRegistry, with_thread_registry};
pub use store::{MemoStats, MemoStore};
pub use traverse::AbstractHasher;

/// Order-sensitive hash mixing.
///
/// One boost-style `hash_combine` step (golden-ratio offset plus shifted
/// seed) followed by the SplitMix64 finalizer, so a single flipped input bit
/// flips about half of the output bits. The result depends only on the two
/// inputs.
pub fn combine(seed: u64, h: u64) -> u64 {
  let mut x = seed
    ^ h
      .wrapping_add(0x9e37_79b9_7f4a_7c15)
      .wrapping_add(seed << 6)
      .wrapping_add(seed >> 2);
  x ^= x >> 30;
  x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
  x ^= x >> 27;
  x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
  x ^ (x >> 31)
}

/// Abstract hash of `e` under `ctx`, memoized in this thread's registry.
///
/// Leaves (variables, locals, metavariables, sorts and constants) return
/// their structural hash without touching any cache.
pub fn abstract_hash(ctx: &mut TypeContext, e: &Expr) -> Result<u64, HashError> {
  if e.kind().is_leaf() {
    return Ok(e.structural_hash());
  }
  match with_thread_registry(|registry| abstract_hash_with(registry, ctx, e)) {
    Some(r) => r,
    None => {
      trace!("thread cache in use, hashing with a transient cache");
      abstract_hash_with(&mut CacheRegistry::new(), ctx, e)
    },
  }
}

/// Abstract hash of `e` using the store `cache` provides for `ctx`'s
/// environment.
pub fn abstract_hash_with<C: CacheProvider + ?Sized>(
  cache: &mut C,
  ctx: &mut TypeContext,
  e: &Expr,
) -> Result<u64, HashError> {
  if e.kind().is_leaf() {
    return Ok(e.structural_hash());
  }
  let store = cache.store_for(ctx.env());
  AbstractHasher::new(ctx, store).run(e)
}
