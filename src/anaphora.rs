use std::rc::Rc;

use cactus::Cactus;

use crate::conjugate::PersonNumber;
use crate::path::SemanticFrame;
use crate::semantic::{LogicalOp, SemanticArray, SemanticNode, nodes_equal};

/// Locates the antecedent for a pronoun of `person_number` in the
/// semantics parsed so far.
///
/// Frames are visited newest-out; only reduced (RHS) frames can hold an
/// antecedent. Within a frame, two *distinct* antecedents make the pronoun
/// unresolvable and reject the path; repeated mentions of one entity are
/// fine. A frame that holds no antecedent defers to an earlier frame.
pub fn resolve(
  semantic_list: &Cactus<SemanticFrame>,
  person_number: PersonNumber,
) -> Option<SemanticArray> {
  let mut cur = semantic_list.clone();
  loop {
    match cur.val() {
      None => return None,
      Some(SemanticFrame::Rhs { semantic, resolved }) => {
        if let Some(cached) = resolved
          .borrow()
          .iter()
          .find(|(cached_pn, _)| *cached_pn == person_number)
          .map(|(_, node)| node.clone())
        {
          return Some(vec![cached]);
        }

        let mut found: Option<Rc<SemanticNode>> = None;
        if !search(semantic, person_number, &mut found) {
          return None;
        }
        if let Some(antecedent) = found {
          resolved
            .borrow_mut()
            .push((person_number, antecedent.clone()));
          return Some(vec![antecedent]);
        }
      }
      Some(SemanticFrame::Lhs { .. }) => {}
    }
    cur = cur.parent()?;
  }
}

/// Depth-first antecedent search. Conjunction applications bound the walk:
/// their contents belong to an inner clause, re-entered only through an
/// outer frame. Returns false on conflicting antecedents.
fn search(
  nodes: &[Rc<SemanticNode>],
  person_number: PersonNumber,
  found: &mut Option<Rc<SemanticNode>>,
) -> bool {
  for node in nodes {
    if node.semantic.anaphora_person_number == Some(person_number) {
      match found {
        Some(prev) if nodes_equal(prev, node) => {}
        Some(_) => return false,
        None => *found = Some(node.clone()),
      }
    }
    if node.op() == Some(LogicalOp::Intersect) {
      continue;
    }
    if let Some(children) = &node.children {
      if !search(children, person_number, found) {
        return false;
      }
    }
  }
  true
}
