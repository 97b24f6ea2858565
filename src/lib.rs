//! K-best enumeration of complete parse trees from a packed parse forest,
//! building lambda-calculus semantics and conjugated display text along
//! the way, and discarding parses that are semantically illegal or
//! duplicate a cheaper tree.

#[macro_use]
extern crate lazy_static;

pub mod anaphora;
pub mod conjugate;
pub mod forest;
pub mod path;
pub mod search;
pub mod semantic;

pub type Err = Box<dyn std::error::Error + 'static>;

pub use forest::{Forest, NodeId, RuleProps, calc_heuristic_costs};
pub use search::{DEFAULT_K, ParseTree, SearchOptions, SearchResults, k_best};
