use std::cell::RefCell;
use std::rc::Rc;

use cactus::Cactus;

use crate::anaphora;
use crate::conjugate::{self, GramProps, PersonNumber, Text};
use crate::forest::{Forest, NodeId, RuleProps, Sub};
use crate::semantic::{
  self, LogicalOp, SemanticArray, SemanticKind, SemanticNode, negates, nodes_equal,
};

/// One frame of a path's semantic stack. `Rhs` holds a reduced argument
/// list accumulating for the nearest pending function; `Lhs` holds that
/// pending function, with the pending-item node count recorded when it was
/// pushed (its arguments are all parsed once the count falls back to it).
#[derive(Debug, Clone)]
pub enum SemanticFrame {
  Rhs {
    semantic: SemanticArray,
    /// Antecedents resolved against this frame, memoized because frames
    /// are shared across many live paths and resolution is pure.
    resolved: RefCell<Vec<(PersonNumber, Rc<SemanticNode>)>>,
  },
  Lhs {
    semantic: SemanticArray,
    next_node_count: usize,
  },
}

impl SemanticFrame {
  pub fn rhs(semantic: SemanticArray) -> Self {
    Self::Rhs {
      semantic,
      resolved: RefCell::new(Vec::new()),
    }
  }
}

/// A person-number in scope for verb conjugation, recording the pending
/// list's size when it was imposed.
#[derive(Debug, Clone, Copy)]
pub struct PersonNumberFrame {
  pub person_number: PersonNumber,
  pub next_item_list_size: usize,
}

#[derive(Debug, Clone)]
pub enum PendingKind {
  /// A forest node to parse once the current branch completes, carrying
  /// the grammatical properties its parent rule imposed on it.
  Node {
    node: NodeId,
    gram_props: Option<GramProps>,
  },
  /// Insertion text to conjugate once the branch before it completes.
  Text(Text),
}

/// An entry of the pending-item list. `size`, `node_count` and `min_cost`
/// are cumulative over the item and everything below it, so the head item
/// answers for the whole list.
#[derive(Debug, Clone)]
pub struct PendingItem {
  pub kind: PendingKind,
  pub node_count: usize,
  pub size: usize,
  pub min_cost: f64,
}

/// A reverse derivation step, kept when the caller asks for rebuildable
/// trees.
#[derive(Debug)]
pub struct Derivation {
  pub rule_props: Rc<RuleProps>,
  pub prev: Option<Rc<Derivation>>,
}

/// A partial parse: the search state between two heap pops. The three
/// stacks share their tails with sibling paths; frames are never mutated
/// in place.
#[derive(Debug)]
pub struct Path {
  /// The forest node to expand next; `None` right after a terminal.
  pub cur_node: Option<NodeId>,
  pub next_item_list: Cactus<PendingItem>,
  pub semantic_list: Cactus<SemanticFrame>,
  pub person_number_list: Cactus<PersonNumberFrame>,
  /// Accumulated display text, leading space stripped at finalization.
  pub text: String,
  /// Grammatical properties governing `cur_node`, assigned when it became
  /// current.
  pub gram_props: Option<GramProps>,
  pub cost: f64,
  /// `cost` plus the admissible minimum of every unexpanded obligation.
  pub min_cost: f64,
  pub derivation: Option<Rc<Derivation>>,
}

pub fn head_size(list: &Cactus<PendingItem>) -> usize {
  list.val().map_or(0, |item| item.size)
}

pub fn head_node_count(list: &Cactus<PendingItem>) -> usize {
  list.val().map_or(0, |item| item.node_count)
}

pub fn head_min_cost(list: &Cactus<PendingItem>) -> f64 {
  list.val().map_or(0.0, |item| item.min_cost)
}

pub fn head_person_number(list: &Cactus<PersonNumberFrame>) -> Option<PersonNumber> {
  list.val().map(|frame| frame.person_number)
}

impl Path {
  pub fn start(forest: &Forest, root: NodeId) -> Self {
    Self {
      cur_node: Some(root),
      next_item_list: Cactus::new(),
      semantic_list: Cactus::new(),
      person_number_list: Cactus::new(),
      text: String::new(),
      gram_props: None,
      cost: 0.0,
      min_cost: forest.get(root).min_cost,
      derivation: None,
    }
  }
}

/// Extends `prev` along one rule variant of one derivation edge. `None`
/// rejects the extension as semantically illegal.
pub fn create_path(
  forest: &Forest,
  prev: &Path,
  sub: &Sub,
  rule_props: &Rc<RuleProps>,
  build_trees: bool,
) -> Option<Path> {
  let rp = rule_props.as_ref();
  let next_node_count = head_node_count(&prev.next_item_list);
  let mut new = Path {
    cur_node: None,
    next_item_list: prev.next_item_list.clone(),
    semantic_list: prev.semantic_list.clone(),
    person_number_list: prev.person_number_list.clone(),
    text: prev.text.clone(),
    gram_props: None,
    cost: prev.cost + rp.cost,
    min_cost: 0.0,
    derivation: if build_trees {
      Some(Rc::new(Derivation {
        rule_props: rule_props.clone(),
        prev: prev.derivation.clone(),
      }))
    } else {
      None
    },
  };
  new.min_cost = new.cost + head_min_cost(&prev.next_item_list);

  if rp.is_nonterminal {
    new.semantic_list = append_semantic(&prev.semantic_list, next_node_count, rp)?;
    new.cur_node = Some(sub.node);
    new.min_cost += forest.get(sub.node).min_cost;
    new.gram_props = rp.gram_props[0];

    if let Some(person_number) = rp.person_number {
      new.person_number_list = prepend_person_number(
        &new.person_number_list,
        person_number,
        head_size(&prev.next_item_list),
      );
    }

    match rp.inserted_sym_idx {
      None => {
        if let Some(next) = sub.next {
          let next_min_cost = forest.get(next).min_cost;
          let increment = usize::from(rp.second_rhs_can_produce_semantic);
          new.next_item_list = new.next_item_list.child(PendingItem {
            kind: PendingKind::Node {
              node: next,
              gram_props: rp.gram_props[1],
            },
            node_count: next_node_count + increment,
            size: head_size(&prev.next_item_list) + 1,
            min_cost: head_min_cost(&prev.next_item_list) + next_min_cost,
          });
          new.min_cost += next_min_cost;
        }
      }
      // Inserted text on the right: delay conjugation until the parsed
      // branch has fixed the path's person-number.
      Some(1) => {
        let text = rp.text.clone().expect("insertion rule without text");
        new.next_item_list = new.next_item_list.child(PendingItem {
          kind: PendingKind::Text(text),
          node_count: next_node_count,
          size: head_size(&prev.next_item_list) + 1,
          min_cost: head_min_cost(&prev.next_item_list),
        });
      }
      // Inserted text on the left: conjugated against the person-number
      // already in scope, not the one this rule just imposed.
      Some(0) => {
        let text = rp.text.as_ref().expect("insertion rule without text");
        new.text.push_str(&conjugate::conjugate_text(
          text,
          head_person_number(&prev.person_number_list),
          None,
          None,
        ));
      }
      Some(idx) => panic!("bad insertion index {}", idx),
    }
  } else {
    new.semantic_list = reduce_semantic_tree(&prev.semantic_list, next_node_count, rp)?;
    if let Some(text) = &rp.text {
      new.text.push_str(&conjugate::conjugate_text(
        text,
        head_person_number(&new.person_number_list),
        prev.gram_props.as_ref(),
        rp.tense,
      ));
      if let Some(person_number) = rp.person_number {
        new.person_number_list = prepend_person_number(
          &new.person_number_list,
          person_number,
          head_size(&prev.next_item_list),
        );
      }
    }
  }

  Some(new)
}

/// Folds a nonterminal rule's semantics into the stack.
pub fn append_semantic(
  list: &Cactus<SemanticFrame>,
  next_node_count: usize,
  rp: &RuleProps,
) -> Option<Cactus<SemanticFrame>> {
  if let Some(inserted) = &rp.inserted_semantic {
    // An insertion carrying both halves: the pending function, then the
    // inserted branch's reduced semantic wrapping it.
    let lhs = rp
      .semantic
      .clone()
      .expect("inserted semantic without a pending function");
    return Some(
      list
        .child(SemanticFrame::Lhs {
          semantic: lhs,
          next_node_count,
        })
        .child(SemanticFrame::rhs(inserted.clone())),
    );
  }

  if let Some(new_semantic) = &rp.semantic {
    if rp.semantic_is_reduced {
      return match list.val() {
        Some(SemanticFrame::Rhs { semantic, .. }) => {
          if is_forbidden_multiple(list, new_semantic) {
            return None;
          }
          let merged = semantic::merge_rhs(semantic, new_semantic)?;
          Some(
            list
              .parent()
              .expect("non-empty stack has a parent")
              .child(SemanticFrame::rhs(merged)),
          )
        }
        // Nothing after this branch can produce a semantic, so reduce up
        // through the stack now.
        Some(SemanticFrame::Lhs { .. }) if !rp.rhs_can_produce_semantic => {
          base_reduce_semantic_tree(list, next_node_count, new_semantic.clone())
        }
        Some(SemanticFrame::Lhs { .. }) => {
          if is_illegal_semantic_reduction(list, new_semantic) {
            return None;
          }
          Some(list.child(SemanticFrame::rhs(new_semantic.clone())))
        }
        None => Some(list.child(SemanticFrame::rhs(new_semantic.clone()))),
      };
    }

    if is_forbidden_multiple(list, new_semantic) {
      return None;
    }
    return Some(list.child(SemanticFrame::Lhs {
      semantic: new_semantic.clone(),
      next_node_count,
    }));
  }

  if let Some(person_number) = rp.anaphora_person_number {
    let resolved = anaphora::resolve(list, person_number)?;
    return base_reduce_semantic_tree(list, next_node_count, resolved);
  }

  Some(list.clone())
}

/// Folds a terminal rule's semantics into the stack, reducing any pending
/// functions whose argument branches just finished.
pub fn reduce_semantic_tree(
  list: &Cactus<SemanticFrame>,
  next_node_count: usize,
  rp: &RuleProps,
) -> Option<Cactus<SemanticFrame>> {
  if let Some(new_semantic) = &rp.semantic {
    return base_reduce_semantic_tree(list, next_node_count, new_semantic.clone());
  }
  if let Some(person_number) = rp.anaphora_person_number {
    let resolved = anaphora::resolve(list, person_number)?;
    return base_reduce_semantic_tree(list, next_node_count, resolved);
  }

  match list.val() {
    Some(SemanticFrame::Rhs { semantic, .. }) => {
      let parent = list.parent().expect("non-empty stack has a parent");
      let reducible = match parent.val() {
        Some(SemanticFrame::Lhs {
          next_node_count: recorded,
          ..
        }) => next_node_count <= *recorded,
        _ => false,
      };
      if reducible {
        // The function below this argument list has no branches left:
        // re-enter the reduction with the accumulated arguments.
        base_reduce_semantic_tree(&parent, next_node_count, semantic.clone())
      } else {
        Some(list.clone())
      }
    }
    Some(SemanticFrame::Lhs {
      next_node_count: recorded,
      ..
    }) => {
      // A pending function whose branches are exhausted but produced no
      // arguments can never reduce.
      if next_node_count <= *recorded {
        None
      } else {
        Some(list.clone())
      }
    }
    None => Some(list.clone()),
  }
}

/// Carries `rhs` outward through the stack: merging into reduced frames,
/// applying pending functions whose argument branches are complete, and
/// stopping at the first function still waiting on an unparsed branch.
pub fn base_reduce_semantic_tree(
  list: &Cactus<SemanticFrame>,
  next_node_count: usize,
  rhs: SemanticArray,
) -> Option<Cactus<SemanticFrame>> {
  let mut cur = list.clone();
  let mut rhs = rhs;
  loop {
    let descend = match cur.val() {
      None => false,
      Some(SemanticFrame::Rhs { semantic, .. }) => {
        rhs = semantic::merge_rhs(semantic, &rhs)?;
        true
      }
      Some(SemanticFrame::Lhs {
        semantic,
        next_node_count: recorded,
      }) => {
        if next_node_count <= *recorded {
          rhs = semantic::reduce(semantic, &rhs)?;
          true
        } else {
          if is_illegal_semantic_reduction(&cur, &rhs) {
            return None;
          }
          false
        }
      }
    };
    if !descend {
      break;
    }
    cur = cur.parent().expect("non-empty stack has a parent");
  }
  Some(cur.child(SemanticFrame::rhs(rhs)))
}

/// The forbidden-multiple lookahead: under a pending `intersect`, a new
/// semantic whose head symbol forbids multiple instances is rejected as
/// soon as the accumulating argument list already applies that symbol.
fn is_forbidden_multiple(list: &Cactus<SemanticFrame>, new_semantic: &SemanticArray) -> bool {
  let Some(first) = new_semantic.first() else {
    return false;
  };
  if !first.semantic.forbids_multiple {
    return false;
  }
  let Some(SemanticFrame::Rhs { semantic: rhs, .. }) = list.val() else {
    return false;
  };
  let Some(parent) = list.parent() else {
    return false;
  };
  let Some(SemanticFrame::Lhs { semantic: lhs, .. }) = parent.val() else {
    return false;
  };
  if lhs
    .first()
    .is_none_or(|node| node.op() != Some(LogicalOp::Intersect))
  {
    return false;
  }
  rhs
    .iter()
    .any(|node| Rc::ptr_eq(&node.semantic, &first.semantic))
}

/// Lookahead for a doomed reduction: when the pending function at the top
/// of `list_at_lhs` must copy itself across its arguments (max one param)
/// and the frame beneath already holds an application of the same symbol,
/// an argument seen now can prove the future merge illegal.
fn is_illegal_semantic_reduction(
  list_at_lhs: &Cactus<SemanticFrame>,
  rhs: &SemanticArray,
) -> bool {
  let Some(SemanticFrame::Lhs { semantic: lhs, .. }) = list_at_lhs.val() else {
    return false;
  };
  if lhs.len() != 1 {
    return false;
  }
  let lhs_node = &lhs[0];
  let bare = lhs_node.children.as_ref().is_some_and(Vec::is_empty);
  let unary = matches!(
    lhs_node.semantic.kind,
    SemanticKind::Function { max_params: 1, .. }
  );
  if !bare || !unary {
    return false;
  }
  let Some(parent) = list_at_lhs.parent() else {
    return false;
  };
  let Some(SemanticFrame::Rhs {
    semantic: prev_rhs, ..
  }) = parent.val()
  else {
    return false;
  };
  if !prev_rhs
    .iter()
    .any(|node| Rc::ptr_eq(&node.semantic, &lhs_node.semantic))
  {
    return false;
  }

  for arg in rhs {
    if arg.op() == Some(LogicalOp::Union) && !arg.is_complete {
      continue;
    }
    let candidate = SemanticNode::apply(&lhs_node.semantic, vec![arg.clone()]);
    for prior in prev_rhs {
      if nodes_equal(prior, &candidate) || negates(prior, &candidate) || negates(&candidate, prior)
      {
        return true;
      }
    }
  }
  false
}

/// Imposes a person-number, replacing frames whose scope has ended. The
/// new frame's `prev` is the nearest older surviving frame.
pub fn prepend_person_number(
  list: &Cactus<PersonNumberFrame>,
  person_number: PersonNumber,
  next_item_list_size: usize,
) -> Cactus<PersonNumberFrame> {
  unwind_person_number_list(list, next_item_list_size).child(PersonNumberFrame {
    person_number,
    next_item_list_size,
  })
}

/// Drops person-number frames imposed beneath the pending item now being
/// consumed: a frame scopes over items at least as deep as the list was
/// when the frame was created.
pub fn unwind_person_number_list(
  list: &Cactus<PersonNumberFrame>,
  next_item_list_size: usize,
) -> Cactus<PersonNumberFrame> {
  let mut cur = list.clone();
  while cur
    .val()
    .is_some_and(|frame| frame.next_item_list_size > next_item_list_size)
  {
    cur = cur.parent().expect("non-empty stack has a parent");
  }
  cur
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::semantic::{Semantic, SemanticRegistry, lambda_string};

  fn registry() -> SemanticRegistry {
    let mut reg = SemanticRegistry::new();
    reg.function("intersect", 0.5, 1, 100).unwrap();
    reg.function("users-followed", 0.0, 1, 1).unwrap();
    reg.function("followers", 0.0, 1, 1).unwrap();
    reg
      .insert(Semantic::function("users-gender", 0.0, 1, 1).forbids_multiple())
      .unwrap();
    reg.argument("me", 0.0).unwrap();
    reg.argument("0", 0.0).unwrap();
    reg.argument("female", 0.5).unwrap();
    reg.argument("male", 0.5).unwrap();
    reg
  }

  fn top_rhs(list: &Cactus<SemanticFrame>) -> SemanticArray {
    match list.val() {
      Some(SemanticFrame::Rhs { semantic, .. }) => semantic.clone(),
      other => panic!("expected an RHS frame, got {:?}", other),
    }
  }

  #[test]
  fn test_base_reduce_applies_through_the_stack() {
    let reg = registry();
    let list = Cactus::new()
      .child(SemanticFrame::Lhs {
        semantic: vec![SemanticNode::pending(&reg.get("intersect").unwrap())],
        next_node_count: 0,
      })
      .child(SemanticFrame::Lhs {
        semantic: vec![SemanticNode::pending(&reg.get("users-followed").unwrap())],
        next_node_count: 0,
      });
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    let out = base_reduce_semantic_tree(&list, 0, vec![me]).unwrap();
    // both functions reduced: users-followed applied, one-item intersect
    // discarded
    assert_eq!(lambda_string(&top_rhs(&out)), "users-followed(me)");
    assert!(out.parent().unwrap().is_empty());
  }

  #[test]
  fn test_base_reduce_stops_at_waiting_function() {
    let reg = registry();
    let list = Cactus::new().child(SemanticFrame::Lhs {
      semantic: vec![SemanticNode::pending(&reg.get("users-followed").unwrap())],
      next_node_count: 0,
    });
    let me = SemanticNode::arg(&reg.get("me").unwrap());
    // a pending branch (count 1 > recorded 0) blocks the reduction
    let out = base_reduce_semantic_tree(&list, 1, vec![me]).unwrap();
    assert_eq!(lambda_string(&top_rhs(&out)), "me");
    assert_eq!(out.len(), 2);
  }

  #[test]
  fn test_reduce_semantic_tree_rejects_argumentless_function() {
    let reg = registry();
    let list = Cactus::new().child(SemanticFrame::Lhs {
      semantic: vec![SemanticNode::pending(&reg.get("users-followed").unwrap())],
      next_node_count: 0,
    });
    let rp = RuleProps::terminal(0.0).word("follow");
    assert!(reduce_semantic_tree(&list, 0, &rp).is_none());
  }

  #[test]
  fn test_append_merges_reduced_semantics() {
    let reg = registry();
    let followers = SemanticNode::apply(
      &reg.get("followers").unwrap(),
      vec![SemanticNode::arg(&reg.get("me").unwrap())],
    );
    let female = SemanticNode::apply(
      &reg.get("users-gender").unwrap(),
      vec![SemanticNode::arg(&reg.get("female").unwrap())],
    );
    let list = Cactus::new()
      .child(SemanticFrame::Lhs {
        semantic: vec![SemanticNode::pending(&reg.get("intersect").unwrap())],
        next_node_count: 0,
      })
      .child(SemanticFrame::rhs(vec![followers]));

    let rp = RuleProps::nonterminal(0.0).reduced_semantic(vec![female.clone()]);
    let merged = append_semantic(&list, 1, &rp).unwrap();
    assert_eq!(
      lambda_string(&top_rhs(&merged)),
      "followers(me),users-gender(female)"
    );

    // a second gender under the same pending intersect trips the
    // forbidden-multiple lookahead
    let male = SemanticNode::apply(
      &reg.get("users-gender").unwrap(),
      vec![SemanticNode::arg(&reg.get("male").unwrap())],
    );
    let rp = RuleProps::nonterminal(0.0).reduced_semantic(vec![male]);
    assert!(append_semantic(&merged, 1, &rp).is_none());
  }

  #[test]
  fn test_illegal_reduction_lookahead() {
    let reg = registry();
    let followed_me = SemanticNode::apply(
      &reg.get("users-followed").unwrap(),
      vec![SemanticNode::arg(&reg.get("me").unwrap())],
    );
    // stack: RHS [users-followed(me)], then pending users-followed()
    let list = Cactus::new()
      .child(SemanticFrame::rhs(vec![followed_me]))
      .child(SemanticFrame::Lhs {
        semantic: vec![SemanticNode::pending(&reg.get("users-followed").unwrap())],
        next_node_count: 1,
      });
    // pushing [me] now dooms the future users-followed(me) to a duplicate
    let rp = RuleProps::nonterminal(0.0)
      .reduced_semantic(vec![SemanticNode::arg(&reg.get("me").unwrap())]);
    assert!(append_semantic(&list, 2, &rp).is_none());
    // a different argument is fine
    let rp = RuleProps::nonterminal(0.0)
      .reduced_semantic(vec![SemanticNode::arg(&reg.get("0").unwrap())]);
    assert!(append_semantic(&list, 2, &rp).is_some());
  }

  #[test]
  fn test_person_number_unwinding() {
    let list = prepend_person_number(&Cactus::new(), PersonNumber::Pl, 1);
    let list = prepend_person_number(&list, PersonNumber::ThreeSg, 3);

    // consuming an item at depth 3 keeps both frames
    let at3 = unwind_person_number_list(&list, 3);
    assert_eq!(head_person_number(&at3), Some(PersonNumber::ThreeSg));
    // back at depth 1, the inner subject's scope has ended
    let at1 = unwind_person_number_list(&list, 1);
    assert_eq!(head_person_number(&at1), Some(PersonNumber::Pl));
    let at0 = unwind_person_number_list(&list, 0);
    assert_eq!(head_person_number(&at0), None);
  }

  #[test]
  fn test_prepend_replaces_dead_frames() {
    let list = prepend_person_number(&Cactus::new(), PersonNumber::Pl, 2);
    let list = prepend_person_number(&list, PersonNumber::ThreeSg, 5);
    // a new subject at depth 2 replaces the deeper frame but keeps the
    // frame recorded at its own depth
    let list = prepend_person_number(&list, PersonNumber::OneSg, 2);
    assert_eq!(head_person_number(&list), Some(PersonNumber::OneSg));
    let parent = list.parent().unwrap();
    assert_eq!(head_person_number(&parent), Some(PersonNumber::Pl));
  }
}
