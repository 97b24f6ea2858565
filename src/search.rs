use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::conjugate::{self, GramProps, Text};
use crate::forest::{Forest, NodeId};
use crate::path::{self, Derivation, Path, PendingKind, SemanticFrame};
use crate::semantic::{self, SemanticArray};

pub const DEFAULT_K: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
  /// Thread a reverse derivation list through every path, adequate to
  /// rebuild the winning parse trees.
  pub build_trees: bool,
  /// Log ambiguous pairs (same display text, different semantics) as they
  /// are captured.
  pub print_ambiguity: bool,
}

/// One emitted parse: display text, canonical lambda-calculus semantic,
/// and any equal-text semantics captured after it.
#[derive(Debug)]
pub struct ParseTree {
  pub text: String,
  pub semantic_str: String,
  pub cost: f64,
  pub ambiguous_semantics: Vec<String>,
  pub derivation: Option<Rc<Derivation>>,
}

#[derive(Debug)]
pub struct SearchResults {
  pub trees: Vec<ParseTree>,
  /// Paths created over the whole search.
  pub path_count: usize,
  /// Completed trees rejected as display-text duplicates of a cheaper
  /// tree.
  pub ambiguous_tree_count: usize,
}

/// Heap entry: min-ordered on `min_cost`, push order breaking ties so
/// equal-cost emission is deterministic.
struct RankedPath {
  min_cost: f64,
  seq: usize,
  path: Path,
}

impl PartialEq for RankedPath {
  fn eq(&self, other: &Self) -> bool {
    self.min_cost == other.min_cost && self.seq == other.seq
  }
}

impl Eq for RankedPath {}

impl PartialOrd for RankedPath {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for RankedPath {
  fn cmp(&self, other: &Self) -> Ordering {
    // reversed: BinaryHeap is a max-heap, we pop the cheapest
    other
      .min_cost
      .total_cmp(&self.min_cost)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

struct Heap {
  heap: BinaryHeap<RankedPath>,
  push_count: usize,
}

impl Heap {
  fn new() -> Self {
    Self {
      heap: BinaryHeap::new(),
      push_count: 0,
    }
  }

  fn push(&mut self, path: Path) {
    self.heap.push(RankedPath {
      min_cost: path.min_cost,
      seq: self.push_count,
      path,
    });
    self.push_count += 1;
  }

  fn pop(&mut self) -> Option<Path> {
    self.heap.pop().map(|ranked| ranked.path)
  }
}

/// Enumerates the `k` cheapest complete, semantically legal, unambiguous
/// parse trees of the forest rooted at `start`.
///
/// `start` must already carry heuristic annotations
/// (`calc_heuristic_costs`); the search itself never mutates the forest.
pub fn k_best(forest: &Forest, start: NodeId, k: usize, options: &SearchOptions) -> SearchResults {
  let mut heap = Heap::new();
  let mut trees: Vec<ParseTree> = Vec::new();
  let mut ambiguous_tree_count = 0;

  if k > 0 {
    heap.push(Path::start(forest, start));
  }

  while let Some(mut path) = heap.pop() {
    if let Some(node) = path.cur_node {
      expand(forest, &path, node, options, &mut heap);
      continue;
    }

    if let Some(node) = advance(&mut path) {
      expand(forest, &path, node, options, &mut heap);
      continue;
    }

    // No pending items remain: the tree is complete.
    let Some(semantic) = completed_semantic(&path) else {
      debug!(text = %path.text, "completed path left unreduced semantics");
      continue;
    };
    debug_assert!((path.min_cost - path.cost).abs() <= f64::EPSILON);

    let semantic_str = semantic::lambda_string(&semantic);
    // Semantic collisions outnumber text collisions by orders of
    // magnitude, so the semantic pass runs first.
    if trees
      .iter()
      .rev()
      .any(|tree| tree.semantic_str == semantic_str || tree.ambiguous_semantics.contains(&semantic_str))
    {
      trace!(semantic = %semantic_str, "duplicate semantics");
      continue;
    }

    let text = path.text.trim_start().to_string();
    if let Some(prior) = trees.iter_mut().rev().find(|tree| tree.text == text) {
      if options.print_ambiguity {
        debug!(
          text = %text,
          kept = %prior.semantic_str,
          rejected = %semantic_str,
          "ambiguous parse"
        );
      }
      prior.ambiguous_semantics.push(semantic_str);
      ambiguous_tree_count += 1;
      continue;
    }

    trace!(text = %text, semantic = %semantic_str, cost = path.cost, "emitting tree");
    trees.push(ParseTree {
      text,
      semantic_str,
      cost: path.cost,
      ambiguous_semantics: Vec::new(),
      derivation: path.derivation.clone(),
    });
    if trees.len() == k {
      break;
    }
  }

  SearchResults {
    trees,
    path_count: heap.push_count,
    ambiguous_tree_count,
  }
}

/// Creates a path per rule variant per derivation edge of `node`,
/// discarding semantically illegal extensions.
fn expand(forest: &Forest, prev: &Path, node: NodeId, options: &SearchOptions, heap: &mut Heap) {
  for sub in &forest.get(node).subs {
    for rule_props in &sub.rule_props {
      match path::create_path(forest, prev, sub, rule_props, options.build_trees) {
        Some(new_path) => heap.push(new_path),
        None => trace!(sym = %forest.get(node).sym, "rejected extension"),
      }
    }
  }
}

enum Step {
  Text(Text, usize),
  Node(NodeId, Option<GramProps>, usize),
  Done,
}

/// Branch finalization: conjugates and consumes leading insertion text,
/// then promotes the next pending node to current. `None` means the path
/// has no parsing left.
fn advance(path: &mut Path) -> Option<NodeId> {
  loop {
    let step = match path.next_item_list.val() {
      None => Step::Done,
      Some(item) => match &item.kind {
        PendingKind::Text(text) => Step::Text(text.clone(), item.size),
        PendingKind::Node { node, gram_props } => Step::Node(*node, *gram_props, item.size),
      },
    };
    match step {
      Step::Done => return None,
      Step::Text(text, size) => {
        path.person_number_list = path::unwind_person_number_list(&path.person_number_list, size);
        path.text.push_str(&conjugate::conjugate_text(
          &text,
          path::head_person_number(&path.person_number_list),
          None,
          None,
        ));
        path.next_item_list = path.next_item_list.parent().expect("non-empty list");
      }
      Step::Node(node, gram_props, size) => {
        path.person_number_list = path::unwind_person_number_list(&path.person_number_list, size);
        path.cur_node = Some(node);
        path.gram_props = gram_props;
        path.next_item_list = path.next_item_list.parent().expect("non-empty list");
        return Some(node);
      }
    }
  }
}

/// A finished path's semantics: exactly one frame, reduced. Anything else
/// marks a grammar whose branches closed without supplying arguments.
fn completed_semantic(path: &Path) -> Option<SemanticArray> {
  match path.semantic_list.val() {
    Some(SemanticFrame::Rhs { semantic, .. })
      if path.semantic_list.parent().is_some_and(|p| p.is_empty())
        && semantic::is_reduced(semantic) =>
    {
      Some(semantic.clone())
    }
    _ => None,
  }
}
