//! Memoized abstract hashes for a single environment.

use rustc_hash::FxHashMap;

use crate::kernel::expr::Expr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
  pub hits: u64,
  pub misses: u64,
  pub inserts: u64,
}

/// Expression → abstract hash.
///
/// Expressions are immutable, so an entry stays valid for as long as the
/// environment it was computed under; nothing is ever evicted.
#[derive(Debug, Default)]
pub struct MemoStore {
  hashes: FxHashMap<Expr, u64>,
  stats: MemoStats,
}

impl MemoStore {
  pub fn new() -> Self {
    MemoStore::default()
  }

  /// Looks up `e`, counting the hit or miss.
  pub fn get(&mut self, e: &Expr) -> Option<u64> {
    let found = self.hashes.get(e).copied();
    match found {
      Some(_) => self.stats.hits += 1,
      None => self.stats.misses += 1,
    }
    found
  }

  /// Looks up `e` without touching the counters.
  pub fn peek(&self, e: &Expr) -> Option<u64> {
    self.hashes.get(e).copied()
  }

  pub fn insert(&mut self, e: Expr, hash: u64) {
    self.stats.inserts += 1;
    self.hashes.insert(e, hash);
  }

  pub fn len(&self) -> usize {
    self.hashes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hashes.is_empty()
  }

  pub fn stats(&self) -> MemoStats {
    self.stats
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kernel::expr::Name;

  #[test]
  fn counts_hits_and_misses() {
    let e = Expr::app(
      Expr::cnst(Name::from_dotted("f"), vec![]),
      Expr::cnst(Name::from_dotted("a"), vec![]),
    );
    let mut store = MemoStore::new();
    assert_eq!(store.get(&e), None);
    store.insert(e.clone(), 42);
    assert_eq!(store.get(&e), Some(42));
    assert_eq!(store.peek(&e), Some(42));
    assert_eq!(store.stats(), MemoStats { hits: 1, misses: 1, inserts: 1 });
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn structurally_equal_keys_share_an_entry() {
    let mk = || {
      Expr::app(
        Expr::cnst(Name::from_dotted("f"), vec![]),
        Expr::cnst(Name::from_dotted("a"), vec![]),
      )
    };
    let mut store = MemoStore::new();
    store.insert(mk(), 7);
    assert_eq!(store.get(&mk()), Some(7));
  }
}
