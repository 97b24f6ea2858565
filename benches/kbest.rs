use criterion::{Criterion, black_box, criterion_group, criterion_main};

use querybender::conjugate::PersonNumber;
use querybender::semantic::{SemanticNode, SemanticRegistry};
use querybender::{Forest, NodeId, RuleProps, SearchOptions, calc_heuristic_costs, k_best};

/// A deliberately ambiguous forest: one entity phrase packed with many
/// competing rule variants, under a conjunction that multiplies them.
fn build(reg: &SemanticRegistry, width: usize) -> (Forest, NodeId) {
  let mut f = Forest::new();
  let word = f.node("w", 0, 1);

  let intersect = reg.get("intersect").unwrap();
  let followed = reg.get("users-followed").unwrap();

  let subject = f.node("subject", 0, 1);
  let variants = (0..width)
    .map(|idx| {
      RuleProps::terminal(0.1 * idx as f64)
        .word(if idx % 2 == 0 { "I" } else { "me" })
        .reduced_semantic(vec![SemanticNode::arg(&reg.get(&format!("e{}", idx)).unwrap())])
        .person_number(PersonNumber::OneSg)
    })
    .collect();
  f.sub_variants(subject, word, None, variants);

  let object = f.node("object", 1, 1);
  f.unary_sub(
    object,
    word,
    RuleProps::terminal(0.0)
      .word("Danny")
      .reduced_semantic(vec![SemanticNode::arg(&reg.get("danny").unwrap())]),
  );

  let pair = f.node("pair", 0, 2);
  f.binary_sub(
    pair,
    subject,
    object,
    RuleProps::nonterminal(0.0)
      .semantic(vec![SemanticNode::pending(&followed)])
      .second_produces_semantic(),
  );

  let query = f.node("query", 0, 2);
  f.unary_sub(
    query,
    pair,
    RuleProps::nonterminal(0.0).semantic(vec![SemanticNode::pending(&intersect)]),
  );
  (f, query)
}

fn registry(width: usize) -> SemanticRegistry {
  let mut reg = SemanticRegistry::new();
  reg.function("intersect", 0.5, 1, 100).unwrap();
  reg.function("users-followed", 0.0, 1, 2).unwrap();
  reg.argument("danny", 0.0).unwrap();
  for idx in 0..width {
    reg.argument(&format!("e{}", idx), 0.0).unwrap();
  }
  reg
}

fn criterion_benchmark(c: &mut Criterion) {
  let width = 32;
  let reg = registry(width);

  c.bench_function("k_best 7 of 32 variants", |b| {
    b.iter(|| {
      let (mut forest, root) = build(&reg, width);
      calc_heuristic_costs(&mut forest, root);
      let results = k_best(black_box(&forest), root, 7, &SearchOptions::default());
      results.trees.len()
    })
  });

  c.bench_function("k_best exhaustive", |b| {
    b.iter(|| {
      let (mut forest, root) = build(&reg, width);
      calc_heuristic_costs(&mut forest, root);
      let results = k_best(black_box(&forest), root, usize::MAX, &SearchOptions::default());
      results.trees.len()
    })
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
