//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use bdms_sim::prelude::*;
//!
//! let tree = LineageTree::new(0.0_f64, 0.0);
//! assert!(tree.root_node().is_leaf());
//! let config = EvolveConfig::new(2.0).with_seed(7);
//! assert!(config.validate().is_ok());
//! ```

pub use crate::errors::{PostProcessError, SimulationError, TreeError};
pub use crate::evolution::{Mutator, RateResponse};
pub use crate::postprocess::{
    prune, remove_mutation_events, sample_survivors, slice, slice_attribute, Sampling,
};
pub use crate::simulation::{evolve, rng_from_seed, CapacityMethod, EvolveConfig, EvolveSummary, Simulation};
pub use crate::tree::{Attributes, Event, LineageTree, NodeState};
