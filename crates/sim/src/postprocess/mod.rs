//! Destructive transformations of an evolved tree into an observed phylogeny.
//!
//! The operations run in a fixed order: `sample_survivors`, then `prune`,
//! then `remove_mutation_events`. `slice` reads an evolved tree before
//! pruning.

mod pruning;
mod sampling;
mod slicing;

pub use pruning::{prune, remove_mutation_events};
pub use sampling::{sample_survivors, Sampling};
pub use slicing::{slice, slice_attribute};
