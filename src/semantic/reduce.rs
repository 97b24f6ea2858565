use std::rc::Rc;

use super::node::{
  SemanticArray, SemanticNode, has_forbidden_multiple, negates, nodes_equal, sort,
};
use super::sym::{LogicalOp, SemanticKind};

/// Applies the single pending function in `lhs` to the reduced argument
/// list `rhs`. `None` is a semantic rejection: the path that attempted the
/// reduction is abandoned. Violated preconditions are grammar bugs and
/// panic.
pub fn reduce(lhs: &[Rc<SemanticNode>], rhs: &[Rc<SemanticNode>]) -> Option<SemanticArray> {
  assert_eq!(lhs.len(), 1, "reduce requires exactly one pending function");
  let lhs_node = &lhs[0];
  let lhs_sym = &lhs_node.semantic;
  let mut rhs: SemanticArray = rhs.to_vec();

  if lhs_node.op() == Some(LogicalOp::Intersect) {
    if !requires_satisfied(&rhs) {
      return None;
    }
    if rhs.len() == 1 {
      // A one-item conjunction is the item itself, sealed against any
      // further distribution.
      return Some(vec![seal(&rhs[0])]);
    }
    if has_forbidden_multiple(&rhs) {
      return None;
    }
    rhs = rhs
      .iter()
      .map(|node| match node.op() {
        Some(LogicalOp::Union) if !node.is_complete => node.completed(),
        Some(LogicalOp::Intersect) => {
          assert!(
            !node.is_complete,
            "three consecutive intersect reductions: {}",
            node
          );
          node.completed()
        }
        _ => node.clone(),
      })
      .collect();
  } else if rhs.len() == 1 && rhs[0].op() == Some(LogicalOp::Union) && !rhs[0].is_complete {
    return reduce_union(lhs_node, &rhs[0]);
  }

  // A function carrying arguments of its own applies them innermost-first:
  // `not(followed())` reduced with `[me]` becomes `not(followed(me))`.
  if let Some(children) = &lhs_node.children {
    if !children.is_empty() {
      rhs = reduce(children, &rhs)?;
    }
  }

  let SemanticKind::Function {
    min_params,
    max_params,
  } = lhs_sym.kind
  else {
    panic!("cannot apply argument semantic {}", lhs_sym.name);
  };
  assert!(
    rhs.len() >= min_params,
    "{} applied to {} arguments, needs at least {}",
    lhs_sym.name,
    rhs.len(),
    min_params
  );

  if rhs.len() > max_params {
    // Copy the function across the argument list:
    // `liked(), [0, me]` -> `liked(0), liked(me)`.
    assert_eq!(
      max_params, 1,
      "copy-and-reduce of {} requires max_params == 1",
      lhs_sym.name
    );
    let mut out: SemanticArray = Vec::with_capacity(rhs.len());
    for arg in &rhs {
      if arg.op() == Some(LogicalOp::Union) && !arg.is_complete {
        return None;
      }
      out.push(SemanticNode::apply(lhs_sym, vec![arg.clone()]));
    }
    return Some(out);
  }

  if lhs_node.op() == Some(LogicalOp::Union) {
    rhs = flatten_union(&rhs)?;
  }
  sort(&mut rhs);
  Some(vec![SemanticNode::apply(lhs_sym, rhs)])
}

fn seal(node: &Rc<SemanticNode>) -> Rc<SemanticNode> {
  match node.op() {
    Some(LogicalOp::Union) | Some(LogicalOp::Intersect) if !node.is_complete => node.completed(),
    _ => node.clone(),
  }
}

/// Distributes `lhs` across every branch of a pending `union`, so that
/// "repos I or Danny like" and "repos Danny or I like" collapse to the
/// same canonical tree. The result is sealed.
pub fn reduce_union(
  lhs: &Rc<SemanticNode>,
  union_node: &Rc<SemanticNode>,
) -> Option<SemanticArray> {
  assert!(!union_node.is_complete, "union distributed twice: {}", union_node);
  let branches = union_node
    .children
    .as_ref()
    .expect("union without children");

  let mut children: SemanticArray = Vec::with_capacity(branches.len());
  for branch in branches {
    if branch.op() == Some(LogicalOp::Intersect) && !branch.is_complete {
      // An and-group inside the union: distribute into it and keep the
      // conjunction at the root of this branch.
      let grouped = branch.children.as_ref().expect("intersect without children");
      let mut inner = reduce(std::slice::from_ref(lhs), grouped)?;
      sort(&mut inner);
      children.push(Rc::new(SemanticNode {
        semantic: branch.semantic.clone(),
        children: Some(inner),
        is_complete: true,
      }));
    } else {
      let inner = reduce(std::slice::from_ref(lhs), std::slice::from_ref(branch))?;
      children.extend(inner);
    }
  }

  for (idx, x) in children.iter().enumerate() {
    for y in &children[idx + 1..] {
      assert!(
        !(nodes_equal(x, y) || negates(x, y) || negates(y, x)),
        "union distribution produced an illegal branch pair: {} / {}",
        x,
        y
      );
    }
  }

  sort(&mut children);
  Some(vec![Rc::new(SemanticNode {
    semantic: union_node.semantic.clone(),
    children: Some(children),
    is_complete: true,
  })])
}

/// One level of union unwrapping for `union(..)` reduced over arguments
/// that are themselves unions, re-checking legality at each insertion.
pub fn flatten_union(rhs: &[Rc<SemanticNode>]) -> Option<SemanticArray> {
  let mut out: SemanticArray = Vec::with_capacity(rhs.len());
  for node in rhs {
    if node.op() == Some(LogicalOp::Union) {
      for child in node.children.as_ref().expect("union without children") {
        insert_checked(&mut out, child)?;
      }
    } else {
      insert_checked(&mut out, node)?;
    }
  }
  Some(out)
}

fn insert_checked(out: &mut SemanticArray, node: &Rc<SemanticNode>) -> Option<()> {
  for existing in out.iter() {
    if nodes_equal(existing, node) || negates(existing, node) || negates(node, existing) {
      return None;
    }
    if node.semantic.forbids_multiple && Rc::ptr_eq(&existing.semantic, &node.semantic) {
      return None;
    }
  }
  out.push(node.clone());
  Some(())
}

/// The `requires` contract: every requirement reachable in `rhs` (without
/// descending into nested `intersect`s) must itself appear in `rhs`
/// (without descending into `intersect` or `not`).
fn requires_satisfied(rhs: &[Rc<SemanticNode>]) -> bool {
  let mut required: Vec<Rc<SemanticNode>> = Vec::new();
  collect_requirements(rhs, &mut required);
  required.iter().all(|q| contains_requirement(rhs, q))
}

fn collect_requirements(nodes: &[Rc<SemanticNode>], out: &mut Vec<Rc<SemanticNode>>) {
  for node in nodes {
    if node.op() == Some(LogicalOp::Intersect) {
      continue;
    }
    if let Some(required) = &node.semantic.requires {
      out.push(required.clone());
    }
    if let Some(children) = &node.children {
      collect_requirements(children, out);
    }
  }
}

fn contains_requirement(nodes: &[Rc<SemanticNode>], required: &SemanticNode) -> bool {
  for node in nodes {
    if nodes_equal(node, required) {
      return true;
    }
    if matches!(node.op(), Some(LogicalOp::Intersect) | Some(LogicalOp::Not)) {
      continue;
    }
    if let Some(children) = &node.children {
      if contains_requirement(children, required) {
        return true;
      }
    }
  }
  false
}
