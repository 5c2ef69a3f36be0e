#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
#[cfg(test)]
extern crate rand;

pub mod hash;
pub mod kernel;

#[cfg(feature = "parallel")]
pub use hash::batch::{abstract_hash_all, abstract_hash_all_with};
pub use hash::{
  AbstractHasher, CacheProvider, CacheRegistry, HashError, MemoStore,
  abstract_hash, abstract_hash_with, combine,
};
