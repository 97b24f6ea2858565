/// Lambda-calculus string form of semantic trees, and its exact-inverse
/// parser. Pre-order, functions as `name(child,child)`, no whitespace:
/// `intersect(not(repositories-visibility(public)),repositories-created(me))`.
use regex::Regex;
use std::rc::Rc;

use crate::Err;

use super::node::{SemanticArray, SemanticNode};
use super::sym::SemanticRegistry;

pub fn lambda_string(nodes: &[Rc<SemanticNode>]) -> String {
  let mut out = String::new();
  for (idx, node) in nodes.iter().enumerate() {
    if idx > 0 {
      out.push(',');
    }
    write_node(&mut out, node);
  }
  out
}

fn write_node(out: &mut String, node: &SemanticNode) {
  out.push_str(&node.semantic.name);
  if let Some(children) = &node.children {
    out.push('(');
    for (idx, child) in children.iter().enumerate() {
      if idx > 0 {
        out.push(',');
      }
      write_node(out, child);
    }
    out.push(')');
  }
}

type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Tries to parse a symbol name made of letters, numbers, - and _
fn parse_name(s: &str) -> ParseResult<&str> {
  regex_static!(NAME, r"[a-zA-Z0-9\-_]+");
  if let Some(m) = NAME.find(s) {
    if m.start() == 0 {
      let (name, rest) = s.split_at(m.end());
      return Ok((name, rest));
    }
  }
  Err(format!("expected a semantic name at {:?}", s).into())
}

fn parse_node<'a>(registry: &SemanticRegistry, s: &'a str) -> ParseResult<'a, Rc<SemanticNode>> {
  let (name, rest) = parse_name(s)?;
  let semantic = registry
    .get(name)
    .ok_or_else(|| -> Err { format!("unknown semantic name: {}", name).into() })?;

  if let Some(rest) = rest.strip_prefix('(') {
    let mut children: SemanticArray = Vec::new();
    let mut rem = rest;
    loop {
      let (child, s) = parse_node(registry, rem)?;
      children.push(child);
      if let Some(s) = s.strip_prefix(',') {
        rem = s;
      } else if let Some(s) = s.strip_prefix(')') {
        return Ok((SemanticNode::apply(&semantic, children), s));
      } else {
        return Err(format!("expected , or ) at {:?}", s).into());
      }
    }
  } else {
    Ok((SemanticNode::arg(&semantic), rest))
  }
}

/// Inverse of `lambda_string` for strings it produced: parses a
/// comma-separated semantic array against the interned symbols.
pub fn parse_lambda(registry: &SemanticRegistry, s: &str) -> Result<SemanticArray, Err> {
  let mut nodes: SemanticArray = Vec::new();
  let mut rem = s;
  loop {
    let (node, s) = parse_node(registry, rem)?;
    nodes.push(node);
    if s.is_empty() {
      return Ok(nodes);
    }
    rem = s
      .strip_prefix(',')
      .ok_or_else(|| -> Err { format!("trailing input at {:?}", s).into() })?;
  }
}

#[cfg(test)]
mod tests {
  use super::super::node::arrays_equal;
  use super::super::sym::SemanticRegistry;
  use super::*;

  fn registry() -> SemanticRegistry {
    let mut reg = SemanticRegistry::new();
    reg.function("intersect", 0.5, 1, 100).unwrap();
    reg.function("not", 0.5, 1, 1).unwrap();
    reg.function("repositories-created", 0.0, 1, 1).unwrap();
    reg.function("repositories-visibility", 0.0, 1, 1).unwrap();
    reg.argument("me", 0.0).unwrap();
    reg.argument("public", 0.0).unwrap();
    reg
  }

  #[test]
  fn test_lambda_string_format() {
    let reg = registry();
    let tree = SemanticNode::apply(
      &reg.get("intersect").unwrap(),
      vec![
        SemanticNode::apply(
          &reg.get("not").unwrap(),
          vec![SemanticNode::apply(
            &reg.get("repositories-visibility").unwrap(),
            vec![SemanticNode::arg(&reg.get("public").unwrap())],
          )],
        ),
        SemanticNode::apply(
          &reg.get("repositories-created").unwrap(),
          vec![SemanticNode::arg(&reg.get("me").unwrap())],
        ),
      ],
    );
    assert_eq!(
      lambda_string(&[tree]),
      "intersect(not(repositories-visibility(public)),repositories-created(me))"
    );
  }

  #[test]
  fn test_round_trip() {
    let reg = registry();
    for s in [
      "me",
      "repositories-created(me)",
      "intersect(not(repositories-visibility(public)),repositories-created(me))",
      "me,repositories-created(me)",
    ] {
      let parsed = parse_lambda(&reg, s).unwrap();
      assert_eq!(lambda_string(&parsed), s);
      // a second trip lands on identical structure
      let reparsed = parse_lambda(&reg, &lambda_string(&parsed)).unwrap();
      assert!(arrays_equal(&parsed, &reparsed));
    }
  }

  #[test]
  fn test_parse_rejects_unknown_and_malformed() {
    let reg = registry();
    assert!(parse_lambda(&reg, "nonesuch(me)").is_err());
    assert!(parse_lambda(&reg, "repositories-created(me").is_err());
    assert!(parse_lambda(&reg, "me,").is_err());
    assert!(parse_lambda(&reg, "").is_err());
  }
}
