//! Kernel expressions shared by reference.
//!
//! Every node caches its structural hash and the range of loose bound
//! variables below it, so hashing a node and comparing two shared nodes are
//! O(1). Equality tries pointer identity first and only falls back to a
//! structural walk when the cached hashes agree.

use std::{
  fmt,
  hash::{Hash, Hasher},
  sync::Arc,
};

use rustc_hash::FxHasher;

// ============================================================================
// Name
// ============================================================================

/// A hierarchical name with a cached hash.
#[derive(PartialEq, Eq, Debug, PartialOrd, Ord, Clone)]
pub struct Name(pub Arc<NameData>);

#[derive(PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum NameData {
  Anonymous,
  Str(Name, String, u64),
  Num(Name, u64, u64),
}

impl Name {
  pub fn as_data(&self) -> &NameData {
    &self.0
  }

  pub fn get_hash(&self) -> u64 {
    match *self.0 {
      NameData::Anonymous => 0,
      NameData::Str(.., h) | NameData::Num(.., h) => h,
    }
  }

  pub fn anon() -> Self {
    Name(Arc::new(NameData::Anonymous))
  }

  pub fn str(pre: Name, s: String) -> Self {
    let hasher = &mut FxHasher::default();
    (7, pre.get_hash(), &s).hash(hasher);
    Name(Arc::new(NameData::Str(pre, s, hasher.finish())))
  }

  pub fn num(pre: Name, n: u64) -> Name {
    let hasher = &mut FxHasher::default();
    (11, pre.get_hash(), n).hash(hasher);
    Name(Arc::new(NameData::Num(pre, n, hasher.finish())))
  }

  /// Builds `A.B.C` from the dotted string `"A.B.C"`.
  pub fn from_dotted(s: &str) -> Name {
    s.split('.')
      .filter(|part| !part.is_empty())
      .fold(Name::anon(), |pre, part| Name::str(pre, part.to_owned()))
  }

  pub fn is_anonymous(&self) -> bool {
    matches!(*self.0, NameData::Anonymous)
  }

  /// Cheap equality: names with equal hashes are compared structurally.
  fn same(&self, other: &Name) -> bool {
    self.get_hash() == other.get_hash() && self == other
  }

  pub fn pretty(&self) -> String {
    match self.as_data() {
      NameData::Anonymous => "[anonymous]".to_owned(),
      NameData::Str(pre, s, _) if pre.is_anonymous() => s.clone(),
      NameData::Num(pre, n, _) if pre.is_anonymous() => n.to_string(),
      NameData::Str(pre, s, _) => format!("{}.{}", pre.pretty(), s),
      NameData::Num(pre, n, _) => format!("{}.{}", pre.pretty(), n),
    }
  }
}

impl Hash for Name {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.get_hash().hash(state);
  }
}

impl fmt::Display for Name {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.pretty())
  }
}

// ============================================================================
// Level
// ============================================================================

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Level(pub Arc<LevelData>);

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum LevelData {
  Zero,
  Succ(Level),
  Max(Level, Level),
  Imax(Level, Level),
  Param(Name),
  Mvar(Name),
}

impl Level {
  pub fn as_data(&self) -> &LevelData {
    &self.0
  }
  pub fn zero() -> Self {
    Level(Arc::new(LevelData::Zero))
  }
  pub fn succ(x: Level) -> Self {
    Level(Arc::new(LevelData::Succ(x)))
  }
  pub fn max(x: Level, y: Level) -> Self {
    Level(Arc::new(LevelData::Max(x, y)))
  }
  pub fn imax(x: Level, y: Level) -> Self {
    Level(Arc::new(LevelData::Imax(x, y)))
  }
  pub fn param(x: Name) -> Self {
    Level(Arc::new(LevelData::Param(x)))
  }
  pub fn mvar(x: Name) -> Self {
    Level(Arc::new(LevelData::Mvar(x)))
  }

  /// Whether the level is zero for every assignment of its parameters.
  /// `imax u 0` is zero because `imax` collapses to `0` on a zero right side.
  pub fn is_zero(&self) -> bool {
    match self.as_data() {
      LevelData::Zero => true,
      LevelData::Max(a, b) => a.is_zero() && b.is_zero(),
      LevelData::Imax(_, b) => b.is_zero(),
      LevelData::Succ(_) | LevelData::Param(_) | LevelData::Mvar(_) => false,
    }
  }

  /// Substitute universe parameters: `self[params[i] := values[i]]`.
  /// Parameters without a matching value are left in place.
  pub fn subst(&self, params: &[Name], values: &[Level]) -> Level {
    match self.as_data() {
      LevelData::Zero | LevelData::Mvar(_) => self.clone(),
      LevelData::Succ(x) => Level::succ(x.subst(params, values)),
      LevelData::Max(a, b) => {
        Level::max(a.subst(params, values), b.subst(params, values))
      },
      LevelData::Imax(a, b) => {
        Level::imax(a.subst(params, values), b.subst(params, values))
      },
      LevelData::Param(name) => params
        .iter()
        .zip(values)
        .find(|(p, _)| p.same(name))
        .map_or_else(|| self.clone(), |(_, v)| v.clone()),
    }
  }
}

// ============================================================================
// BinderInfo
// ============================================================================

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BinderInfo {
  Default,
  Implicit,
  StrictImplicit,
  InstImplicit,
}

// ============================================================================
// Macros
// ============================================================================

/// The closed set of macro definitions a `Macro` node can carry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum MacroDef {
  /// Transparent annotation such as `have` or `show` markers.
  Annotation(Name),
  /// Structure projection `s.idx` of a value of type `structure`.
  Projection { structure: Name, idx: u64 },
  NatLit(u64),
  StrLit(String),
  Sorry,
}

impl MacroDef {
  /// Hash identifying the definition itself, independent of its arguments.
  pub fn identity_hash(&self) -> u64 {
    let hasher = &mut FxHasher::default();
    match self {
      MacroDef::Annotation(n) => (17, n.get_hash()).hash(hasher),
      MacroDef::Projection { structure, idx } => {
        (19, structure.get_hash(), *idx).hash(hasher)
      },
      MacroDef::NatLit(n) => (23, *n).hash(hasher),
      MacroDef::StrLit(s) => (29, s).hash(hasher),
      MacroDef::Sorry => 31u8.hash(hasher),
    }
    hasher.finish()
  }
}

/// Read-only view of a macro node's definition and arguments.
#[derive(Clone, Copy)]
pub struct MacroView<'a> {
  def: &'a MacroDef,
  args: &'a [Expr],
}

impl<'a> MacroView<'a> {
  pub fn new(def: &'a MacroDef, args: &'a [Expr]) -> Self {
    MacroView { def, args }
  }

  pub fn num_args(&self) -> usize {
    self.args.len()
  }

  pub fn arg(&self, i: usize) -> &'a Expr {
    &self.args[i]
  }

  pub fn def_hash(&self) -> u64 {
    self.def.identity_hash()
  }
}

// ============================================================================
// Expr
// ============================================================================

/// Coarse classification of expression nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
  Var,
  Local,
  Meta,
  Sort,
  Constant,
  Lambda,
  Pi,
  Let,
  Macro,
  App,
}

impl ExprKind {
  /// Leaf kinds have no subterms worth memoizing; their structural hash is
  /// already their abstract hash.
  pub fn is_leaf(self) -> bool {
    matches!(
      self,
      ExprKind::Var
        | ExprKind::Local
        | ExprKind::Meta
        | ExprKind::Sort
        | ExprKind::Constant
    )
  }
}

impl fmt::Display for ExprKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ExprKind::Var => "Var",
      ExprKind::Local => "Local",
      ExprKind::Meta => "Meta",
      ExprKind::Sort => "Sort",
      ExprKind::Constant => "Constant",
      ExprKind::Lambda => "Lambda",
      ExprKind::Pi => "Pi",
      ExprKind::Let => "Let",
      ExprKind::Macro => "Macro",
      ExprKind::App => "App",
    };
    f.write_str(s)
  }
}

/// A reference-counted kernel expression.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

#[derive(Debug)]
struct ExprNode {
  data: ExprData,
  hash: u64,
  /// One past the largest loose de Bruijn index; `0` for closed terms.
  loose_bvar_range: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExprData {
  Bvar(u64),
  Fvar(Name),
  Mvar(Name),
  Sort(Level),
  Const(Name, Vec<Level>),
  App(Expr, Expr),
  Lam(Name, Expr, Expr, BinderInfo),
  ForallE(Name, Expr, Expr, BinderInfo),
  LetE(Name, Expr, Expr, Expr),
  Macro(MacroDef, Vec<Expr>),
}

fn mix<T: Hash>(t: T) -> u64 {
  let hasher = &mut FxHasher::default();
  t.hash(hasher);
  hasher.finish()
}

impl Expr {
  fn mk(data: ExprData, hash: u64, loose_bvar_range: u64) -> Self {
    Expr(Arc::new(ExprNode { data, hash, loose_bvar_range }))
  }

  pub fn bvar(idx: u64) -> Self {
    Expr::mk(ExprData::Bvar(idx), mix((1, idx)), idx.saturating_add(1))
  }
  pub fn fvar(x: Name) -> Self {
    let h = mix((2, x.get_hash()));
    Expr::mk(ExprData::Fvar(x), h, 0)
  }
  pub fn mvar(x: Name) -> Self {
    let h = mix((3, x.get_hash()));
    Expr::mk(ExprData::Mvar(x), h, 0)
  }
  pub fn sort(x: Level) -> Self {
    let h = mix((4, &x));
    Expr::mk(ExprData::Sort(x), h, 0)
  }
  pub fn cnst(x: Name, us: Vec<Level>) -> Self {
    let h = mix((5, x.get_hash(), &us));
    Expr::mk(ExprData::Const(x, us), h, 0)
  }
  pub fn app(f: Expr, a: Expr) -> Self {
    let h = mix((6, f.structural_hash(), a.structural_hash()));
    let r = f.loose_bvar_range().max(a.loose_bvar_range());
    Expr::mk(ExprData::App(f, a), h, r)
  }
  /// Binder names are not hashed, so alpha-equivalent binders hash alike.
  pub fn lam(n: Name, t: Expr, b: Expr, bi: BinderInfo) -> Self {
    let h = mix((7, t.structural_hash(), b.structural_hash()));
    let r = binder_range(&t, &b);
    Expr::mk(ExprData::Lam(n, t, b, bi), h, r)
  }
  pub fn all(n: Name, t: Expr, b: Expr, bi: BinderInfo) -> Self {
    let h = mix((8, t.structural_hash(), b.structural_hash()));
    let r = binder_range(&t, &b);
    Expr::mk(ExprData::ForallE(n, t, b, bi), h, r)
  }
  #[allow(non_snake_case)]
  pub fn letE(n: Name, t: Expr, v: Expr, b: Expr) -> Self {
    let h = mix((
      9,
      t.structural_hash(),
      v.structural_hash(),
      b.structural_hash(),
    ));
    let r = binder_range(&t, &b).max(v.loose_bvar_range());
    Expr::mk(ExprData::LetE(n, t, v, b), h, r)
  }
  pub fn macro_app(def: MacroDef, args: Vec<Expr>) -> Self {
    let hasher = &mut FxHasher::default();
    (10, def.identity_hash(), args.len()).hash(hasher);
    for a in &args {
      a.structural_hash().hash(hasher);
    }
    let r = args.iter().map(Expr::loose_bvar_range).max().unwrap_or(0);
    Expr::mk(ExprData::Macro(def, args), hasher.finish(), r)
  }

  pub fn as_data(&self) -> &ExprData {
    &self.0.data
  }

  pub fn kind(&self) -> ExprKind {
    match self.as_data() {
      ExprData::Bvar(_) => ExprKind::Var,
      ExprData::Fvar(_) => ExprKind::Local,
      ExprData::Mvar(_) => ExprKind::Meta,
      ExprData::Sort(_) => ExprKind::Sort,
      ExprData::Const(..) => ExprKind::Constant,
      ExprData::App(..) => ExprKind::App,
      ExprData::Lam(..) => ExprKind::Lambda,
      ExprData::ForallE(..) => ExprKind::Pi,
      ExprData::LetE(..) => ExprKind::Let,
      ExprData::Macro(..) => ExprKind::Macro,
    }
  }

  /// The hash computed from the node's structure at construction time.
  pub fn structural_hash(&self) -> u64 {
    self.0.hash
  }

  pub fn loose_bvar_range(&self) -> u64 {
    self.0.loose_bvar_range
  }

  pub fn has_loose_bvars(&self) -> bool {
    self.loose_bvar_range() > 0
  }

  /// Whether both handles point at the same allocation.
  pub fn ptr_eq(&self, other: &Expr) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

fn binder_range(t: &Expr, b: &Expr) -> u64 {
  t.loose_bvar_range().max(b.loose_bvar_range().saturating_sub(1))
}

impl PartialEq for Expr {
  fn eq(&self, other: &Expr) -> bool {
    self.ptr_eq(other)
      || (self.structural_hash() == other.structural_hash()
        && self.as_data() == other.as_data())
  }
}

impl Eq for Expr {}

impl Hash for Expr {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u64(self.structural_hash());
  }
}

impl fmt::Debug for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.as_data().fmt(f)
  }
}

// ============================================================================
// Spines and instantiation
// ============================================================================

/// Decompose `f a1 a2 ... an` into `(f, [a1, a2, ..., an])`.
pub fn unfold_apps(e: &Expr) -> (Expr, Vec<Expr>) {
  let mut args = Vec::new();
  let mut cursor = e.clone();
  loop {
    match cursor.as_data() {
      ExprData::App(f, a) => {
        args.push(a.clone());
        cursor = f.clone();
      },
      _ => break,
    }
  }
  args.reverse();
  (cursor, args)
}

/// Reconstruct `f a1 a2 ... an`.
pub fn foldl_apps(mut fun: Expr, args: impl Iterator<Item = Expr>) -> Expr {
  for arg in args {
    fun = Expr::app(fun, arg);
  }
  fun
}

/// Instantiate loose bound variables with closed terms.
///
/// `substs[n-1]` replaces `Bvar(0)` and `substs[0]` replaces `Bvar(n-1)`, so
/// a stack of binder stand-ins can be passed in push order. Loose indices
/// past the substitution are lowered by `n`. The substituted terms must not
/// contain loose bound variables themselves.
pub fn inst(body: &Expr, substs: &[Expr]) -> Expr {
  if substs.is_empty() || !body.has_loose_bvars() {
    return body.clone();
  }
  inst_aux(body, substs, 0)
}

fn inst_aux(e: &Expr, substs: &[Expr], offset: u64) -> Expr {
  enum Frame<'a> {
    Visit(&'a Expr, u64),
    App,
    Lam(Name, BinderInfo),
    All(Name, BinderInfo),
    LetE(Name),
    Macro(MacroDef, usize),
  }

  let n = substs.len() as u64;
  let mut work: Vec<Frame<'_>> = vec![Frame::Visit(e, offset)];
  let mut results: Vec<Expr> = Vec::new();

  while let Some(frame) = work.pop() {
    match frame {
      Frame::Visit(e, offset) => {
        if e.loose_bvar_range() <= offset {
          results.push(e.clone());
          continue;
        }
        match e.as_data() {
          ExprData::Bvar(idx) => {
            let idx = *idx;
            if idx < offset {
              results.push(e.clone());
            } else if idx - offset < n {
              let adjusted = (idx - offset) as usize;
              results.push(substs[substs.len() - 1 - adjusted].clone());
            } else {
              results.push(Expr::bvar(idx - n));
            }
          },
          ExprData::App(f, a) => {
            work.push(Frame::App);
            work.push(Frame::Visit(a, offset));
            work.push(Frame::Visit(f, offset));
          },
          ExprData::Lam(nm, t, b, bi) => {
            work.push(Frame::Lam(nm.clone(), *bi));
            work.push(Frame::Visit(b, offset + 1));
            work.push(Frame::Visit(t, offset));
          },
          ExprData::ForallE(nm, t, b, bi) => {
            work.push(Frame::All(nm.clone(), *bi));
            work.push(Frame::Visit(b, offset + 1));
            work.push(Frame::Visit(t, offset));
          },
          ExprData::LetE(nm, t, v, b) => {
            work.push(Frame::LetE(nm.clone()));
            work.push(Frame::Visit(b, offset + 1));
            work.push(Frame::Visit(v, offset));
            work.push(Frame::Visit(t, offset));
          },
          ExprData::Macro(def, args) => {
            work.push(Frame::Macro(def.clone(), args.len()));
            for a in args.iter().rev() {
              work.push(Frame::Visit(a, offset));
            }
          },
          ExprData::Fvar(..)
          | ExprData::Mvar(..)
          | ExprData::Sort(..)
          | ExprData::Const(..) => results.push(e.clone()),
        }
      },
      Frame::App => {
        let a = results.pop().unwrap();
        let f = results.pop().unwrap();
        results.push(Expr::app(f, a));
      },
      Frame::Lam(nm, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::lam(nm, t, b, bi));
      },
      Frame::All(nm, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::all(nm, t, b, bi));
      },
      Frame::LetE(nm) => {
        let b = results.pop().unwrap();
        let v = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::letE(nm, t, v, b));
      },
      Frame::Macro(def, len) => {
        let args = results.split_off(results.len() - len);
        results.push(Expr::macro_app(def, args));
      },
    }
  }

  results.pop().unwrap()
}

/// Substitute universe parameters in every sort and constant of `e`.
pub fn subst_expr_levels(e: &Expr, params: &[Name], values: &[Level]) -> Expr {
  if params.is_empty() || values.is_empty() {
    return e.clone();
  }
  subst_expr_levels_aux(e, params, values)
}

fn subst_expr_levels_aux(e: &Expr, params: &[Name], values: &[Level]) -> Expr {
  enum Frame<'a> {
    Visit(&'a Expr),
    App,
    Lam(Name, BinderInfo),
    All(Name, BinderInfo),
    LetE(Name),
    Macro(MacroDef, usize),
  }

  let mut work: Vec<Frame<'_>> = vec![Frame::Visit(e)];
  let mut results: Vec<Expr> = Vec::new();

  while let Some(frame) = work.pop() {
    match frame {
      Frame::Visit(e) => match e.as_data() {
        ExprData::Sort(l) => results.push(Expr::sort(l.subst(params, values))),
        ExprData::Const(name, us) => {
          let us = us.iter().map(|l| l.subst(params, values)).collect();
          results.push(Expr::cnst(name.clone(), us));
        },
        ExprData::App(f, a) => {
          work.push(Frame::App);
          work.push(Frame::Visit(a));
          work.push(Frame::Visit(f));
        },
        ExprData::Lam(nm, t, b, bi) => {
          work.push(Frame::Lam(nm.clone(), *bi));
          work.push(Frame::Visit(b));
          work.push(Frame::Visit(t));
        },
        ExprData::ForallE(nm, t, b, bi) => {
          work.push(Frame::All(nm.clone(), *bi));
          work.push(Frame::Visit(b));
          work.push(Frame::Visit(t));
        },
        ExprData::LetE(nm, t, v, b) => {
          work.push(Frame::LetE(nm.clone()));
          work.push(Frame::Visit(b));
          work.push(Frame::Visit(v));
          work.push(Frame::Visit(t));
        },
        ExprData::Macro(def, args) => {
          work.push(Frame::Macro(def.clone(), args.len()));
          for a in args.iter().rev() {
            work.push(Frame::Visit(a));
          }
        },
        ExprData::Bvar(..) | ExprData::Fvar(..) | ExprData::Mvar(..) => {
          results.push(e.clone())
        },
      },
      Frame::App => {
        let a = results.pop().unwrap();
        let f = results.pop().unwrap();
        results.push(Expr::app(f, a));
      },
      Frame::Lam(nm, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::lam(nm, t, b, bi));
      },
      Frame::All(nm, bi) => {
        let b = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::all(nm, t, b, bi));
      },
      Frame::LetE(nm) => {
        let b = results.pop().unwrap();
        let v = results.pop().unwrap();
        let t = results.pop().unwrap();
        results.push(Expr::letE(nm, t, v, b));
      },
      Frame::Macro(def, len) => {
        let args = results.split_off(results.len() - len);
        results.push(Expr::macro_app(def, args));
      },
    }
  }

  results.pop().unwrap()
}
