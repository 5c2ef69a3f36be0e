//! Environment-scoped lifecycle of memo stores.
//!
//! A [`CacheRegistry`] keeps the store of the most recently requested
//! environment. Asking again for the same environment returns the same
//! store; asking for another one discards it and starts over. The registry
//! is keyed by environment identity only: transparency settings never
//! influence an abstract hash, so contexts that differ only in transparency
//! share a store.
//!
//! The default entry point uses one registry per thread, so stores are never
//! shared across threads and need no locking.

use std::cell::RefCell;

use tracing::debug;

use super::store::MemoStore;
use crate::kernel::env::Environment;

/// Hands out the memo store to use for an environment.
pub trait CacheProvider {
  fn store_for(&mut self, env: &Environment) -> &mut MemoStore;
}

#[derive(Debug, Default)]
pub struct CacheRegistry {
  current: Option<(Environment, MemoStore)>,
  replacements: u64,
}

impl CacheRegistry {
  pub fn new() -> Self {
    CacheRegistry::default()
  }

  pub fn current_env(&self) -> Option<&Environment> {
    self.current.as_ref().map(|(env, _)| env)
  }

  pub fn current_store(&self) -> Option<&MemoStore> {
    self.current.as_ref().map(|(_, store)| store)
  }

  /// How many stores were discarded because a different environment was
  /// requested.
  pub fn replacements(&self) -> u64 {
    self.replacements
  }

  /// Drops the current store and its environment.
  pub fn reset(&mut self) {
    self.current = None;
  }
}

impl CacheProvider for CacheRegistry {
  fn store_for(&mut self, env: &Environment) -> &mut MemoStore {
    if let Some((cur, store)) = &self.current
      && !cur.is_same(env)
    {
      debug!(
        old_env = cur.id(),
        new_env = env.id(),
        entries = store.len(),
        "environment changed, replacing abstract hash cache"
      );
      self.replacements += 1;
      self.current = None;
    }
    let (_, store) =
      self.current.get_or_insert_with(|| (env.clone(), MemoStore::new()));
    store
  }
}

thread_local! {
  static THREAD_REGISTRY: RefCell<CacheRegistry> =
    RefCell::new(CacheRegistry::new());
}

/// Runs `f` with the calling thread's registry.
///
/// Returns `None` without running `f` when the registry is already in use
/// further up the stack, e.g. when a parameter classifier hashes terms
/// itself.
pub fn with_thread_registry<R>(
  f: impl FnOnce(&mut CacheRegistry) -> R,
) -> Option<R> {
  THREAD_REGISTRY.with(|cell| {
    let mut registry = cell.try_borrow_mut().ok()?;
    Some(f(&mut registry))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kernel::expr::{Expr, Name};

  fn key() -> Expr {
    Expr::app(
      Expr::cnst(Name::from_dotted("f"), vec![]),
      Expr::cnst(Name::from_dotted("a"), vec![]),
    )
  }

  #[test]
  fn same_environment_reuses_store() {
    let env = Environment::new();
    let mut registry = CacheRegistry::new();
    registry.store_for(&env).insert(key(), 1);
    assert_eq!(registry.store_for(&env.clone()).peek(&key()), Some(1));
    assert_eq!(registry.replacements(), 0);
  }

  #[test]
  fn different_environment_replaces_store() {
    let env1 = Environment::new();
    let env2 = Environment::new();
    let mut registry = CacheRegistry::new();
    registry.store_for(&env1).insert(key(), 1);
    assert!(registry.store_for(&env2).is_empty());
    assert_eq!(registry.replacements(), 1);
    assert!(registry.current_env().unwrap().is_same(&env2));
    // Going back does not resurrect the old entries.
    assert!(registry.store_for(&env1).is_empty());
    assert_eq!(registry.replacements(), 2);
  }

  #[test]
  fn reset_drops_store() {
    let env = Environment::new();
    let mut registry = CacheRegistry::new();
    registry.store_for(&env).insert(key(), 1);
    registry.reset();
    assert!(registry.current_store().is_none());
    assert!(registry.store_for(&env).is_empty());
  }

  #[test]
  fn thread_registry_is_not_reentrant() {
    let outer = with_thread_registry(|_| with_thread_registry(|_| ()));
    assert_eq!(outer, Some(None));
  }

  #[test]
  fn thread_registries_are_per_thread() {
    let env = Environment::new();
    with_thread_registry(|r| r.store_for(&env).insert(key(), 1));
    let env2 = env.clone();
    let seen = std::thread::spawn(move || {
      with_thread_registry(|r| r.store_for(&env2).peek(&key())).flatten()
    })
    .join()
    .unwrap();
    assert_eq!(seen, None);
    let here = with_thread_registry(|r| r.store_for(&env).peek(&key()));
    assert_eq!(here, Some(Some(1)));
  }
}
