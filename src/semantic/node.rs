use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::sym::{LogicalOp, Semantic};

/// One node of a semantic tree. `children: Some(..)` denotes a function
/// application (empty while the function still awaits its arguments);
/// `None` denotes an argument leaf.
///
/// Nodes are immutable and shared freely between search paths; "mutation"
/// (completion marking, merging) always copies.
#[derive(Debug)]
pub struct SemanticNode {
  pub semantic: Rc<Semantic>,
  pub children: Option<Vec<Rc<SemanticNode>>>,
  /// Set on `union`/`intersect` applications once an enclosing reduction
  /// has sealed them against further distribution.
  pub is_complete: bool,
}

/// An ordered argument list of a pending function, or a completed root.
pub type SemanticArray = Vec<Rc<SemanticNode>>;

impl SemanticNode {
  pub fn arg(semantic: &Rc<Semantic>) -> Rc<Self> {
    Rc::new(Self {
      semantic: semantic.clone(),
      children: None,
      is_complete: false,
    })
  }

  /// A function application with no arguments yet: the LHS of a pending
  /// reduction.
  pub fn pending(semantic: &Rc<Semantic>) -> Rc<Self> {
    Rc::new(Self {
      semantic: semantic.clone(),
      children: Some(Vec::new()),
      is_complete: false,
    })
  }

  pub fn apply(semantic: &Rc<Semantic>, children: SemanticArray) -> Rc<Self> {
    Rc::new(Self {
      semantic: semantic.clone(),
      children: Some(children),
      is_complete: false,
    })
  }

  pub fn is_function(&self) -> bool {
    self.children.is_some()
  }

  pub fn op(&self) -> Option<LogicalOp> {
    self.semantic.op
  }

  /// A copy with `is_complete` set, leaving the shared original untouched.
  pub fn completed(&self) -> Rc<Self> {
    Rc::new(Self {
      semantic: self.semantic.clone(),
      children: self.children.clone(),
      is_complete: true,
    })
  }
}

impl fmt::Display for SemanticNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.semantic.name)?;
    if let Some(children) = &self.children {
      write!(f, "(")?;
      for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
          write!(f, ",")?;
        }
        write!(f, "{}", child)?;
      }
      write!(f, ")")?;
    }
    Ok(())
  }
}

/// Canonical ordering: arguments before functions; arguments by name (by
/// identity when interned equal); functions by name, ties broken by
/// recursing over children in order.
pub fn compare(a: &SemanticNode, b: &SemanticNode) -> Ordering {
  match (&a.children, &b.children) {
    (None, Some(_)) => Ordering::Less,
    (Some(_), None) => Ordering::Greater,
    (None, None) => {
      if Rc::ptr_eq(&a.semantic, &b.semantic) {
        Ordering::Equal
      } else {
        a.semantic.name.cmp(&b.semantic.name)
      }
    }
    (Some(a_children), Some(b_children)) => a
      .semantic
      .name
      .cmp(&b.semantic.name)
      .then_with(|| compare_arrays(a_children, b_children)),
  }
}

fn compare_arrays(a: &[Rc<SemanticNode>], b: &[Rc<SemanticNode>]) -> Ordering {
  for (x, y) in a.iter().zip(b.iter()) {
    let ord = compare(x, y);
    if ord != Ordering::Equal {
      return ord;
    }
  }
  a.len().cmp(&b.len())
}

pub fn sort(array: &mut SemanticArray) {
  array.sort_by(|a, b| compare(a, b));
}

pub fn nodes_equal(a: &SemanticNode, b: &SemanticNode) -> bool {
  if !Rc::ptr_eq(&a.semantic, &b.semantic) {
    return false;
  }
  match (&a.children, &b.children) {
    (None, None) => true,
    (Some(a_children), Some(b_children)) => arrays_equal(a_children, b_children),
    _ => false,
  }
}

pub fn arrays_equal(a: &[Rc<SemanticNode>], b: &[Rc<SemanticNode>]) -> bool {
  a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| nodes_equal(x, y))
}

/// Total cost of every symbol in `array`, children included.
pub fn sum_costs(array: &[Rc<SemanticNode>]) -> f64 {
  array
    .iter()
    .map(|node| {
      node.semantic.cost
        + node
          .children
          .as_deref()
          .map_or(0.0, sum_costs)
    })
    .sum()
}

/// A semantic array is reduced iff no function in it, at any depth, still
/// awaits arguments.
pub fn is_reduced(array: &[Rc<SemanticNode>]) -> bool {
  array.iter().all(|node| match &node.children {
    None => true,
    Some(children) => !children.is_empty() && is_reduced(children),
  })
}

/// Does `neg` read `not(other)`?
pub(crate) fn negates(neg: &SemanticNode, other: &SemanticNode) -> bool {
  neg.op() == Some(LogicalOp::Not)
    && neg
      .children
      .as_ref()
      .is_some_and(|children| children.len() == 1 && nodes_equal(&children[0], other))
}

/// Concatenating `a` and `b` is illegal when they share a node, or when a
/// node in one is contradicted by a `not(..)` in the other.
pub fn is_illegal_rhs(a: &[Rc<SemanticNode>], b: &[Rc<SemanticNode>]) -> bool {
  for x in a {
    for y in b {
      if nodes_equal(x, y) || negates(x, y) || negates(y, x) {
        return true;
      }
    }
  }
  false
}

/// `a ++ b` when legal.
pub fn merge_rhs(a: &[Rc<SemanticNode>], b: &[Rc<SemanticNode>]) -> Option<SemanticArray> {
  if is_illegal_rhs(a, b) {
    None
  } else {
    Some(a.iter().chain(b.iter()).cloned().collect())
  }
}

/// Do two nodes in `array` apply the same `forbids_multiple` symbol?
pub fn has_forbidden_multiple(array: &[Rc<SemanticNode>]) -> bool {
  for (idx, x) in array.iter().enumerate() {
    if x.semantic.forbids_multiple {
      for y in &array[idx + 1..] {
        if Rc::ptr_eq(&x.semantic, &y.semantic) {
          return true;
        }
      }
    }
  }
  false
}

#[cfg(test)]
mod tests {
  use super::super::sym::SemanticRegistry;
  use super::*;

  fn registry() -> SemanticRegistry {
    let mut reg = SemanticRegistry::new();
    reg.function("not", 0.5, 1, 1).unwrap();
    reg.function("followers", 0.0, 1, 2).unwrap();
    reg.function("repositories-liked", 0.0, 1, 1).unwrap();
    reg
      .insert(crate::semantic::Semantic::function("users-gender", 0.0, 1, 1).forbids_multiple())
      .unwrap();
    reg.argument("me", 0.0).unwrap();
    reg.argument("0", 0.0).unwrap();
    reg.argument("female", 0.5).unwrap();
    reg.argument("male", 0.5).unwrap();
    reg
  }

  #[test]
  fn test_canonical_ordering() {
    let reg = registry();
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    let zero = SemanticNode::arg(&reg.get("0").unwrap());
    let followers = SemanticNode::apply(&reg.get("followers").unwrap(), vec![me.clone()]);
    let liked = SemanticNode::apply(&reg.get("repositories-liked").unwrap(), vec![me.clone()]);
    let liked0 = SemanticNode::apply(&reg.get("repositories-liked").unwrap(), vec![zero.clone()]);

    // arguments sort before functions
    assert_eq!(compare(&me, &followers), Ordering::Less);
    assert_eq!(compare(&followers, &zero), Ordering::Greater);
    // arguments by name
    assert_eq!(compare(&zero, &me), Ordering::Less);
    // functions by name, then recursively by children
    assert_eq!(compare(&followers, &liked), Ordering::Less);
    assert_eq!(compare(&liked0, &liked), Ordering::Less);

    let mut array = vec![liked.clone(), zero.clone(), followers.clone(), me.clone()];
    sort(&mut array);
    assert!(arrays_equal(&array, &[zero, me, followers, liked]));
  }

  #[test]
  fn test_equality_is_structural_over_interned_symbols() {
    let reg = registry();
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    let followers = reg.get("followers").unwrap();
    let a = SemanticNode::apply(&followers, vec![me.clone()]);
    let b = SemanticNode::apply(&followers, vec![SemanticNode::arg(&reg.get("me").unwrap())]);
    assert!(nodes_equal(&a, &b));
    assert!(!nodes_equal(&a, &me));
    // same symbol, different arity
    let c = SemanticNode::apply(
      &followers,
      vec![me.clone(), SemanticNode::arg(&reg.get("0").unwrap())],
    );
    assert!(!nodes_equal(&a, &c));
  }

  #[test]
  fn test_sum_costs() {
    let reg = registry();
    let female = SemanticNode::arg(&reg.get("female").unwrap());
    let gender = SemanticNode::apply(&reg.get("users-gender").unwrap(), vec![female]);
    let not = SemanticNode::apply(&reg.get("not").unwrap(), vec![gender]);
    assert_eq!(sum_costs(&[not]), 1.0);
  }

  #[test]
  fn test_is_reduced() {
    let reg = registry();
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    let pending = SemanticNode::pending(&reg.get("followers").unwrap());
    let applied = SemanticNode::apply(&reg.get("followers").unwrap(), vec![me.clone()]);
    assert!(is_reduced(&[me.clone(), applied.clone()]));
    assert!(!is_reduced(&[pending.clone()]));
    let nested = SemanticNode::apply(&reg.get("not").unwrap(), vec![pending]);
    assert!(!is_reduced(&[nested]));
  }

  #[test]
  fn test_merge_rhs_rejects_duplicates_and_contradictions() {
    let reg = registry();
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    let followers = SemanticNode::apply(&reg.get("followers").unwrap(), vec![me.clone()]);
    let not_followers = SemanticNode::apply(&reg.get("not").unwrap(), vec![followers.clone()]);
    let liked = SemanticNode::apply(&reg.get("repositories-liked").unwrap(), vec![me.clone()]);

    assert!(merge_rhs(&[followers.clone()], &[liked.clone()]).is_some());
    // duplicate
    assert!(merge_rhs(&[followers.clone()], &[followers.clone()]).is_none());
    // contradiction, both directions
    assert!(merge_rhs(&[followers.clone()], &[not_followers.clone()]).is_none());
    assert!(merge_rhs(&[not_followers.clone()], &[followers.clone()]).is_none());
    // illegality is symmetric
    assert_eq!(
      is_illegal_rhs(&[liked.clone()], &[not_followers.clone()]),
      is_illegal_rhs(&[not_followers], &[liked])
    );
  }

  #[test]
  fn test_has_forbidden_multiple() {
    let reg = registry();
    let gender = reg.get("users-gender").unwrap();
    let male = SemanticNode::apply(&gender, vec![SemanticNode::arg(&reg.get("male").unwrap())]);
    let female = SemanticNode::apply(&gender, vec![SemanticNode::arg(&reg.get("female").unwrap())]);
    let followers =
      SemanticNode::apply(&reg.get("followers").unwrap(), vec![SemanticNode::arg(&reg.get("me").unwrap())]);
    assert!(has_forbidden_multiple(&[male.clone(), female.clone()]));
    assert!(!has_forbidden_multiple(&[male, followers]));
  }
}
