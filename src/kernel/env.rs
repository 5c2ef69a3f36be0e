//! Immutable global environments compared by identity.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::expr::{Expr, Name};

/// Fields every constant declaration carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantVal {
  pub name: Name,
  pub level_params: Vec<Name>,
  pub typ: Expr,
}

pub type ConstMap = FxHashMap<Name, ConstantVal>;

/// A set of global declarations.
///
/// Environments are never mutated in place: [`Environment::add`] returns a
/// new environment with a new identity, so identity is a sound cache key.
#[derive(Debug, Clone, Default)]
pub struct Environment(Arc<ConstMap>);

impl Environment {
  pub fn new() -> Self {
    Environment::default()
  }

  pub fn from_constants(consts: impl IntoIterator<Item = ConstantVal>) -> Self {
    let map = consts.into_iter().map(|c| (c.name.clone(), c)).collect();
    Environment(Arc::new(map))
  }

  /// Returns a new environment extended with `cnst`.
  pub fn add(&self, cnst: ConstantVal) -> Self {
    let mut map = ConstMap::clone(&self.0);
    map.insert(cnst.name.clone(), cnst);
    Environment(Arc::new(map))
  }

  pub fn find(&self, name: &Name) -> Option<&ConstantVal> {
    self.0.get(name)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Identity comparison; two environments with equal contents but
  /// different origins are not the same.
  pub fn is_same(&self, other: &Environment) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// Address of the shared table, for diagnostics only.
  pub fn id(&self) -> usize {
    Arc::as_ptr(&self.0) as usize
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kernel::expr::Level;

  fn axiom(name: &str) -> ConstantVal {
    ConstantVal {
      name: Name::from_dotted(name),
      level_params: vec![],
      typ: Expr::sort(Level::zero()),
    }
  }

  #[test]
  fn add_creates_new_identity() {
    let env = Environment::new();
    let env2 = env.add(axiom("p"));
    assert!(!env.is_same(&env2));
    assert!(env.find(&Name::from_dotted("p")).is_none());
    assert!(env2.find(&Name::from_dotted("p")).is_some());
  }

  #[test]
  fn clones_share_identity() {
    let env = Environment::from_constants([axiom("p"), axiom("q")]);
    let copy = env.clone();
    assert!(env.is_same(&copy));
    assert_eq!(env.id(), copy.id());
    assert_eq!(copy.len(), 2);
  }

  #[test]
  fn equal_contents_are_not_the_same() {
    let a = Environment::from_constants([axiom("p")]);
    let b = Environment::from_constants([axiom("p")]);
    assert!(!a.is_same(&b));
  }
}
