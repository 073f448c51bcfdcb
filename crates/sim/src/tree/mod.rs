//! The lineage tree.
//!
//! Nodes live in an arena addressed by [`NodeIndex`](crate::base::NodeIndex)
//! handles. Each node stores its children and a parent handle, so there is
//! no shared ownership between parents and children.

mod lineage_tree;
mod node;

pub use lineage_tree::{Checkpoint, LineageTree, Preorder, BRANCH_LENGTH_ATOL, BRANCH_LENGTH_RTOL};
pub use node::{Attributes, Event, Node, NodeState};
