//! # Birth-Death-Mutation-Sampling Simulation
//!
//! The `bdms_sim` crate simulates a branching process in which lineages give
//! birth, die and mutate at rates that depend on their state and on time.
//! The full genealogy is recorded as a [`tree::LineageTree`], which can then
//! be sampled, pruned to its observed part and have mutation events folded
//! into branch annotations.
//!
//! Rate functions and mutators are supplied by the caller through the
//! [`evolution::RateResponse`] and [`evolution::Mutator`] traits.

pub mod base;
pub mod errors;
pub mod evolution;
pub mod postprocess;
pub mod prelude;
pub mod simulation;
pub mod tree;

#[cfg(test)]
mod test_utils;
