//! Simulation engine and run configuration.
//!
//! Re-exports
//!
//! - `evolve`: the event loop growing a `LineageTree` from its root.
//! - `Simulation`: responses, mutator and configuration bundled and checked
//!   once, for repeated runs.
//! - `EvolveConfig` / `CapacityMethod`: serde-serializable run parameters.
//! - `rng_from_seed`: the simulation generator for an optional seed.

pub mod engine;
pub mod parameters;
mod progress;

pub use engine::{evolve, EvolveSummary, Simulation};
pub use parameters::{rng_from_seed, CapacityMethod, EvolveConfig};
