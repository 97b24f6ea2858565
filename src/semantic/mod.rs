mod node;
mod reduce;
mod string;
mod sym;

pub use node::{
  SemanticArray, SemanticNode, arrays_equal, compare, has_forbidden_multiple, is_illegal_rhs,
  is_reduced, merge_rhs, nodes_equal, sort, sum_costs,
};
pub(crate) use node::negates;
pub use reduce::{flatten_union, reduce, reduce_union};
pub use string::{lambda_string, parse_lambda};
pub use sym::{LogicalOp, Semantic, SemanticKind, SemanticRegistry};
