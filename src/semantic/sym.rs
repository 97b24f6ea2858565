use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Err;
use crate::conjugate::PersonNumber;

use super::node::SemanticNode;

/// Operators the reducer treats specially. Any other function symbol is an
/// ordinary predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
  Intersect,
  Union,
  Not,
}

impl LogicalOp {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "intersect" => Some(Self::Intersect),
      "union" => Some(Self::Union),
      "not" => Some(Self::Not),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticKind {
  /// A leaf value: an entity id, `me`, a category value like `female`.
  Argument,
  /// A predicate awaiting between `min_params` and `max_params` arguments.
  Function { min_params: usize, max_params: usize },
}

/// An interned semantic symbol. Symbols are compared by identity
/// (`Rc::ptr_eq`), never by name, once they leave the registry.
#[derive(Debug)]
pub struct Semantic {
  pub name: String,
  pub cost: f64,
  pub kind: SemanticKind,
  pub op: Option<LogicalOp>,
  /// Two applications of this symbol can never coexist in one argument
  /// list (`users-gender(male)` and `users-gender(female)`).
  pub forbids_multiple: bool,
  /// A reduced semantic that must appear alongside any application of this
  /// symbol once the enclosing `intersect` closes.
  pub requires: Option<Rc<SemanticNode>>,
  /// Set when the symbol can serve as an antecedent for a pronoun of this
  /// person-number (`threePl` for symbols denoting person sets).
  pub anaphora_person_number: Option<PersonNumber>,
}

impl Semantic {
  pub fn argument(name: &str, cost: f64) -> Self {
    Self {
      name: name.to_string(),
      cost,
      kind: SemanticKind::Argument,
      op: None,
      forbids_multiple: false,
      requires: None,
      anaphora_person_number: None,
    }
  }

  pub fn function(name: &str, cost: f64, min_params: usize, max_params: usize) -> Self {
    assert!(
      min_params <= max_params,
      "{}: min_params {} > max_params {}",
      name,
      min_params,
      max_params
    );
    Self {
      name: name.to_string(),
      cost,
      kind: SemanticKind::Function {
        min_params,
        max_params,
      },
      op: LogicalOp::from_name(name),
      forbids_multiple: false,
      requires: None,
      anaphora_person_number: None,
    }
  }

  pub fn forbids_multiple(mut self) -> Self {
    self.forbids_multiple = true;
    self
  }

  pub fn requires(mut self, required: Rc<SemanticNode>) -> Self {
    self.requires = Some(required);
    self
  }

  pub fn anaphora(mut self, person_number: PersonNumber) -> Self {
    self.anaphora_person_number = Some(person_number);
    self
  }

  pub fn max_params(&self) -> usize {
    match self.kind {
      SemanticKind::Argument => 0,
      SemanticKind::Function { max_params, .. } => max_params,
    }
  }
}

impl fmt::Display for Semantic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// The process-wide symbol table. Populated while the grammar is compiled,
/// then read-only for the lifetime of every search that borrows it.
#[derive(Debug, Default)]
pub struct SemanticRegistry {
  by_name: HashMap<String, Rc<Semantic>>,
}

impl SemanticRegistry {
  pub fn new() -> Self {
    Default::default()
  }

  /// Interns `semantic`, erroring on a duplicate name.
  pub fn insert(&mut self, semantic: Semantic) -> Result<Rc<Semantic>, Err> {
    if self.by_name.contains_key(&semantic.name) {
      return Err(format!("duplicate semantic name: {}", semantic.name).into());
    }
    let interned = Rc::new(semantic);
    self
      .by_name
      .insert(interned.name.clone(), interned.clone());
    Ok(interned)
  }

  pub fn argument(&mut self, name: &str, cost: f64) -> Result<Rc<Semantic>, Err> {
    self.insert(Semantic::argument(name, cost))
  }

  pub fn function(
    &mut self,
    name: &str,
    cost: f64,
    min_params: usize,
    max_params: usize,
  ) -> Result<Rc<Semantic>, Err> {
    self.insert(Semantic::function(name, cost, min_params, max_params))
  }

  pub fn get(&self, name: &str) -> Option<Rc<Semantic>> {
    self.by_name.get(name).cloned()
  }

  pub fn len(&self) -> usize {
    self.by_name.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_name.is_empty()
  }
}

#[test]
fn test_registry_interning() {
  let mut reg = SemanticRegistry::new();
  let me = reg.argument("me", 0.0).unwrap();
  assert!(Rc::ptr_eq(&me, &reg.get("me").unwrap()));
  assert!(reg.argument("me", 1.0).is_err());

  let and = reg.function("intersect", 0.5, 1, 100).unwrap();
  assert_eq!(and.op, Some(LogicalOp::Intersect));
  let liked = reg.function("repositories-liked", 0.0, 1, 1).unwrap();
  assert_eq!(liked.op, None);
  assert_eq!(liked.max_params(), 1);
}

#[test]
#[should_panic]
fn test_param_bounds_checked() {
  Semantic::function("broken", 0.0, 2, 1);
}
