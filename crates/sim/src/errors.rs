//! Error types for the simulation crate.
//!
//! Each concern gets its own enum: the randomized set, structural tree
//! operations, the `evolve` event loop, and post-simulation transforms.

use thiserror::Error;

use crate::base::{NodeId, NodeIndex};

/// Errors returned by [`RandomizedSet`](crate::base::RandomizedSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RandomizedSetError {
    /// The item to remove is not in the set.
    #[error("item not found in randomized set")]
    NotFound,
    /// A random choice was requested from an empty set.
    #[error("cannot choose from an empty randomized set")]
    Empty,
}

/// Errors from structural operations on a [`LineageTree`](crate::tree::LineageTree).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// The handle does not refer to a live node.
    #[error("node {0} does not exist or has been deleted")]
    NodeNotFound(NodeIndex),

    /// The node already has a parent.
    #[error("node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// The root has no parent to be detached or spliced from.
    #[error("operation not permitted on the root node {0}")]
    RootOperation(NodeId),

    /// Only nodes with at most one child can be spliced out.
    #[error("cannot splice out node {node} with {children} children")]
    Multifurcating {
        /// The node that was asked to be spliced.
        node: NodeId,
        /// Its number of children.
        children: usize,
    },

    /// An internal invariant was violated. Indicates a logic error.
    #[error("tree invariant violated: {0}")]
    Invariant(String),
}

/// Errors from [`evolve`](crate::simulation::evolve).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// The root already has descendants.
    #[error("tree has already evolved at node {node} with {children} descendant lineages")]
    AlreadyEvolved {
        /// Root node id.
        node: NodeId,
        /// Number of children found on the root.
        children: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The strategies disagree on which state attribute they govern.
    #[error("event processes and mutator must refer to the same attribute (birth={birth}, death={death}, mutation={mutation}, mutator={mutator:?})")]
    AttributeMismatch {
        /// Attribute read by the birth response.
        birth: String,
        /// Attribute read by the death response.
        death: String,
        /// Attribute read by the mutation response.
        mutation: String,
        /// Attributes written by the mutator.
        mutator: Vec<String>,
    },

    /// The root state does not carry the governed attribute.
    #[error("node {node} does not have attribute {attribute} required by the event processes")]
    MissingAttribute {
        /// Root node id.
        node: NodeId,
        /// The missing attribute.
        attribute: String,
    },

    /// The active population exceeded the carrying capacity with no capacity method.
    #[error("capacity={capacity} exceeded at time={time}")]
    CapacityExceeded {
        /// Configured carrying capacity.
        capacity: usize,
        /// Simulation time at which it was exceeded.
        time: f64,
    },

    /// Fewer lineages survived than required.
    #[error("number of survivors {survivors} is less than min_survivors={min_survivors}")]
    InsufficientSurvivors {
        /// Survivors at the end of the window.
        survivors: usize,
        /// Required minimum.
        min_survivors: usize,
    },

    /// Structural failure inside the tree.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Errors from the post-simulation transforms in [`postprocess`](crate::postprocess).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PostProcessError {
    /// `sample_survivors` was already run on this tree.
    #[error("tree has already been sampled below node {0}")]
    AlreadySampled(NodeId),

    /// `prune` requires a sampled tree.
    #[error("tree has not been sampled below node {0}")]
    NotSampled(NodeId),

    /// `prune` was already run on this tree.
    #[error("tree has already been pruned below node {0}")]
    AlreadyPruned(NodeId),

    /// The operation requires a pruned tree.
    #[error("tree has not been pruned below node {0}")]
    NotPruned(NodeId),

    /// Slicing a pruned tree is not meaningful.
    #[error("cannot slice a pruned tree")]
    SlicePruned,

    /// The tree has no descendants yet.
    #[error("cannot slice an unevolved tree")]
    Unevolved,

    /// The slice time lies outside the tree's time span.
    #[error("cannot slice at time {t} outside tree time span [{start}, {end}]")]
    SliceOutOfRange {
        /// Requested time.
        t: f64,
        /// Root time.
        start: f64,
        /// Latest node time.
        end: f64,
    },

    /// No leaf carries a sampling event.
    #[error("cannot prune because no leaves were sampled")]
    NoSampledLeaves,

    /// An argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A sliced state does not carry the requested attribute.
    #[error("node {node} has no attribute {attribute}")]
    UnknownAttribute {
        /// Node whose state was inspected.
        node: NodeId,
        /// Requested attribute.
        attribute: String,
    },

    /// Structural failure inside the tree.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
