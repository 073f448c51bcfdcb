//! Strategy contracts consumed by the simulation engine.
//!
//! - **Rate responses**: birth, death and mutation rates as functions of
//!   lineage state and time, with waiting-time draws over a population
//! - **Mutators**: stochastic in-place trait changes at mutation events
//!
//! Concrete responses and mutators are supplied by the caller.

pub mod mutator;
pub mod response;

pub use mutator::Mutator;
pub use response::{exponential_waiting_time, RateResponse};
