//! Shared tree ensemble engine.
//!
//! A single CART implementation backs the imputer's per-column forests and
//! the downstream forest and boosting classifiers:
//!
//! - [`RegressionTree`]: squared-error CART with per-node feature sampling,
//!   leaf lookup and leaf overrides (used by Newton boosting)
//! - [`RandomForestRegressor`]: bootstrap-aggregated trees fitted in parallel

mod forest;
mod tree;

pub use forest::{ForestParams, RandomForestRegressor};
pub use tree::{Node, RegressionTree, TreeParams};
