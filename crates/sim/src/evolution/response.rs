//! Event rate responses.
//!
//! A rate response maps the state of a lineage (and the current time) to the
//! instantaneous rate of one kind of event: birth, death, or mutation. The
//! simulation engine races one waiting time per event kind, each drawn over
//! the whole active population, and takes the earliest.
//!
//! ## Waiting times
//! For `n` lineages with rates `λ_1(t), ..., λ_n(t)` and a capacity rate
//! multiplier `m`, the superposition of their event processes is a Poisson
//! process with intensity `m · Σ λ_i(t)`. When the rates do not depend on
//! time, the waiting time to the next event is exponential with that total
//! rate, which is what the provided default draws. Responses whose rates
//! vary with time must override [`RateResponse::waiting_time`] (for example
//! by thinning or by inverting the integrated intensity).

use rand::Rng;
use rand_distr::{Distribution, Exp};

/// Instantaneous event rate as a function of lineage state and time.
pub trait RateResponse<S> {
    /// Name of the state attribute this response reads.
    fn attribute(&self) -> &str;

    /// Non-negative event rate of a lineage in `state` at absolute `time`.
    fn rate(&self, state: &S, time: f64) -> f64;

    /// Whether the rate is the same for every state.
    ///
    /// When true the engine picks the affected lineage uniformly from the
    /// active pool in O(1) instead of a rate-weighted scan.
    fn is_state_homogeneous(&self) -> bool {
        false
    }

    /// Draw the waiting time from `time` to the next event among `states`,
    /// with every rate scaled by `rate_multiplier`.
    ///
    /// Returns `f64::INFINITY` when the total rate is zero.
    fn waiting_time<'a, I, R>(&self, states: I, time: f64, rate_multiplier: f64, rng: &mut R) -> f64
    where
        I: IntoIterator<Item = &'a S>,
        S: 'a,
        R: Rng + ?Sized,
    {
        let total: f64 = states.into_iter().map(|state| self.rate(state, time)).sum();
        exponential_waiting_time(rate_multiplier * total, rng)
    }
}

/// Exponential waiting time with the given total rate; infinite for a zero rate.
pub fn exponential_waiting_time<R: Rng + ?Sized>(total_rate: f64, rng: &mut R) -> f64 {
    match Exp::new(total_rate) {
        Ok(exp) if total_rate > 0.0 => exp.sample(rng),
        _ => f64::INFINITY,
    }
}

impl<S, T: RateResponse<S> + ?Sized> RateResponse<S> for &T {
    fn attribute(&self) -> &str {
        (**self).attribute()
    }

    fn rate(&self, state: &S, time: f64) -> f64 {
        (**self).rate(state, time)
    }

    fn is_state_homogeneous(&self) -> bool {
        (**self).is_state_homogeneous()
    }

    fn waiting_time<'a, I, R>(&self, states: I, time: f64, rate_multiplier: f64, rng: &mut R) -> f64
    where
        I: IntoIterator<Item = &'a S>,
        S: 'a,
        R: Rng + ?Sized,
    {
        (**self).waiting_time(states, time, rate_multiplier, rng)
    }
}
