//! Logistics Containment - Nested-set ownership hierarchy
//!
//! Items form a forest encoded as `(left, right)` intervals: an item is an
//! ancestor of another exactly when its interval strictly contains the
//! other's. This crate validates that encoding, answers ancestry and
//! subtree-aggregate queries, rebuilds explicit trees for presentation, and
//! provides the renumbering primitives used when items are re-parented or
//! deleted.

mod model;
mod tree;

pub use model::ContainmentModel;
pub use tree::{build_forest, ItemNode};
