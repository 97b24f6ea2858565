use std::fmt;
use std::rc::Rc;

use crate::conjugate::{GramProps, PersonNumber, Tense, Text};
use crate::semantic::SemanticArray;

/// Index type for the forest arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A node of the packed parse forest: one grammar symbol over one input
/// span, with every derivation edge that produced it.
#[derive(Debug)]
pub struct ForestNode {
  pub sym: String,
  pub start: usize,
  pub size: usize,
  /// Admissible cost-to-complete for this node's cheapest derivation.
  /// Written once by `calc_heuristic_costs`, read-only during search.
  pub min_cost: f64,
  pub subs: Vec<Sub>,
}

/// One outgoing derivation edge. `next` carries the second child of a
/// binary rule. `rule_props` is a non-empty list: rules that compiled to
/// several variants (multiple insertions, say) share one edge.
#[derive(Debug)]
pub struct Sub {
  pub node: NodeId,
  pub next: Option<NodeId>,
  pub min_cost: f64,
  pub rule_props: Vec<Rc<RuleProps>>,
}

/// Compiled per-edge rule data, straight from the grammar.
#[derive(Debug, Clone)]
pub struct RuleProps {
  pub cost: f64,
  pub is_nonterminal: bool,
  /// The rule's semantic: a pending function (LHS) unless
  /// `semantic_is_reduced`.
  pub semantic: Option<SemanticArray>,
  pub semantic_is_reduced: bool,
  /// A reduced semantic carried by an insertion rule alongside a pending
  /// `semantic`.
  pub inserted_semantic: Option<SemanticArray>,
  /// Whether anything below this rule's RHS can still produce a semantic.
  pub rhs_can_produce_semantic: bool,
  /// Whether the second child of a binary rule can produce a semantic.
  pub second_rhs_can_produce_semantic: bool,
  pub text: Option<Text>,
  /// Surface tense of a matched terminal verb form.
  pub tense: Option<Tense>,
  /// Per-child grammatical properties: index 0 governs the first child,
  /// index 1 the second.
  pub gram_props: [Option<GramProps>; 2],
  /// Person-number this rule imposes on verbs conjugated downstream.
  pub person_number: Option<PersonNumber>,
  /// For insertion rules, which side of the binary rule is synthesized
  /// text rather than parsed input (0 or 1).
  pub inserted_sym_idx: Option<u8>,
  /// Marks a pronoun rule whose semantic is found by anaphora resolution.
  pub anaphora_person_number: Option<PersonNumber>,
}

impl RuleProps {
  fn base(cost: f64, is_nonterminal: bool) -> Self {
    Self {
      cost,
      is_nonterminal,
      semantic: None,
      semantic_is_reduced: false,
      inserted_semantic: None,
      rhs_can_produce_semantic: true,
      second_rhs_can_produce_semantic: false,
      text: None,
      tense: None,
      gram_props: [None, None],
      person_number: None,
      inserted_sym_idx: None,
      anaphora_person_number: None,
    }
  }

  pub fn nonterminal(cost: f64) -> Self {
    Self::base(cost, true)
  }

  pub fn terminal(cost: f64) -> Self {
    Self::base(cost, false)
  }

  /// Attaches a pending-function (LHS) semantic.
  pub fn semantic(mut self, semantic: SemanticArray) -> Self {
    self.semantic = Some(semantic);
    self.semantic_is_reduced = false;
    self
  }

  /// Attaches an already-reduced (RHS) semantic.
  pub fn reduced_semantic(mut self, semantic: SemanticArray) -> Self {
    self.semantic = Some(semantic);
    self.semantic_is_reduced = true;
    self
  }

  /// Attaches both halves of an insertion rule's semantics: the pending
  /// function and the reduced semantic of the inserted branch.
  pub fn inserted_semantic(mut self, lhs: SemanticArray, inserted: SemanticArray) -> Self {
    self.semantic = Some(lhs);
    self.semantic_is_reduced = false;
    self.inserted_semantic = Some(inserted);
    self
  }

  pub fn no_rhs_semantic(mut self) -> Self {
    self.rhs_can_produce_semantic = false;
    self
  }

  pub fn second_produces_semantic(mut self) -> Self {
    self.second_rhs_can_produce_semantic = true;
    self
  }

  pub fn text(mut self, text: Text) -> Self {
    self.text = Some(text);
    self
  }

  pub fn word(self, word: &str) -> Self {
    self.text(Text::word(word))
  }

  pub fn tense(mut self, tense: Tense) -> Self {
    self.tense = Some(tense);
    self
  }

  pub fn gram_props(mut self, child: usize, props: GramProps) -> Self {
    self.gram_props[child] = Some(props);
    self
  }

  pub fn person_number(mut self, person_number: PersonNumber) -> Self {
    self.person_number = Some(person_number);
    self
  }

  pub fn insertion(mut self, sym_idx: u8, text: Text) -> Self {
    assert!(sym_idx <= 1, "insertion index must be 0 or 1");
    self.inserted_sym_idx = Some(sym_idx);
    self.text = Some(text);
    self
  }

  pub fn anaphora(mut self, person_number: PersonNumber) -> Self {
    self.anaphora_person_number = Some(person_number);
    self
  }
}

/// An arena holding the packed forest the upstream chart parser built.
#[derive(Debug, Default)]
pub struct Forest {
  nodes: Vec<ForestNode>,
}

impl Forest {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn node(&mut self, sym: &str, start: usize, size: usize) -> NodeId {
    let idx = self.nodes.len() as u32;
    self.nodes.push(ForestNode {
      sym: sym.to_string(),
      start,
      size,
      min_cost: 0.0,
      subs: Vec::new(),
    });
    NodeId(idx)
  }

  /// Get a node. Assumes valid, panics on OOB
  pub fn get(&self, id: NodeId) -> &ForestNode {
    self.nodes.get(id.0 as usize).expect("invalid NodeId")
  }

  fn get_mut(&mut self, id: NodeId) -> &mut ForestNode {
    self.nodes.get_mut(id.0 as usize).expect("invalid NodeId")
  }

  pub fn unary_sub(&mut self, parent: NodeId, child: NodeId, rule_props: RuleProps) {
    self.sub_variants(parent, child, None, vec![rule_props]);
  }

  pub fn binary_sub(&mut self, parent: NodeId, child: NodeId, next: NodeId, rule_props: RuleProps) {
    self.sub_variants(parent, child, Some(next), vec![rule_props]);
  }

  pub fn sub_variants(
    &mut self,
    parent: NodeId,
    child: NodeId,
    next: Option<NodeId>,
    rule_props: Vec<RuleProps>,
  ) {
    assert!(!rule_props.is_empty(), "a sub needs at least one rule");
    self.get_mut(parent).subs.push(Sub {
      node: child,
      next,
      min_cost: 0.0,
      rule_props: rule_props.into_iter().map(Rc::new).collect(),
    });
  }
}

impl fmt::Display for Forest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, node) in self.nodes.iter().enumerate() {
      writeln!(
        f,
        "{}: {} [{}..{}] minCost {}",
        idx,
        node.sym,
        node.start,
        node.start + node.size,
        node.min_cost
      )?;
      for sub in node.subs.iter() {
        write!(f, "  -> {}", self.get(sub.node).sym)?;
        if let Some(next) = sub.next {
          write!(f, " {}", self.get(next).sym)?;
        }
        writeln!(
          f,
          " ({} rule variants, minCost {})",
          sub.rule_props.len(),
          sub.min_cost
        )?;
      }
    }
    Ok(())
  }
}

/// Annotates every node reachable from `root` with the admissible cost of
/// its cheapest complete derivation. Must run to quiescence before any
/// search borrows the forest.
pub fn calc_heuristic_costs(forest: &mut Forest, root: NodeId) {
  let mut done = vec![false; forest.len()];
  calc_node(forest, root, &mut done);
}

fn calc_node(forest: &mut Forest, id: NodeId, done: &mut [bool]) {
  if done[id.0 as usize] {
    return;
  }
  done[id.0 as usize] = true;

  let children: Vec<(NodeId, Option<NodeId>)> = forest
    .get(id)
    .subs
    .iter()
    .map(|sub| (sub.node, sub.next))
    .collect();
  for (child, next) in &children {
    calc_node(forest, *child, done);
    if let Some(next) = next {
      calc_node(forest, *next, done);
    }
  }

  let sub_costs: Vec<f64> = forest
    .get(id)
    .subs
    .iter()
    .map(|sub| {
      let rule_min = sub
        .rule_props
        .iter()
        .map(|rp| rp.cost)
        .fold(f64::INFINITY, f64::min);
      rule_min
        + forest.get(sub.node).min_cost
        + sub.next.map_or(0.0, |next| forest.get(next).min_cost)
    })
    .collect();

  let node_min = sub_costs.iter().copied().fold(f64::INFINITY, f64::min);
  let node = forest.get_mut(id);
  for (sub, cost) in node.subs.iter_mut().zip(sub_costs.iter()) {
    sub.min_cost = *cost;
  }
  node.min_cost = if node.subs.is_empty() { 0.0 } else { node_min };
}
