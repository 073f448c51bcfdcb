//! Base building blocks.
//!
//! This module provides the O(1) randomized set used for the active lineage
//! pool, and the identifiers used to address tree nodes.

mod ids;
mod randomized_set;

pub use ids::{IdAllocator, NodeId, NodeIndex};
pub use randomized_set::RandomizedSet;
