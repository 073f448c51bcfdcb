//! Minimal strategies for unit tests.

use rand::Rng;

use crate::evolution::{Mutator, RateResponse};
use crate::tree::{Attributes, NodeState};

/// The same rate for every lineage at every time.
pub(crate) struct Constant {
    attribute: &'static str,
    rate: f64,
}

impl Constant {
    pub(crate) fn new(rate: f64) -> Self {
        Self::on(Attributes::SCALAR, rate)
    }

    pub(crate) fn on(attribute: &'static str, rate: f64) -> Self {
        Self { attribute, rate }
    }
}

impl<S: NodeState> RateResponse<S> for Constant {
    fn attribute(&self) -> &str {
        self.attribute
    }

    fn rate(&self, _state: &S, _time: f64) -> f64 {
        self.rate
    }

    fn is_state_homogeneous(&self) -> bool {
        true
    }
}

/// Adds a fixed amount to a scalar state.
pub(crate) struct Shift {
    attribute: &'static str,
    delta: f64,
}

impl Shift {
    pub(crate) fn new(delta: f64) -> Self {
        Self::on(Attributes::SCALAR, delta)
    }

    pub(crate) fn on(attribute: &'static str, delta: f64) -> Self {
        Self { attribute, delta }
    }
}

impl Mutator<f64> for Shift {
    fn mutated_attributes(&self) -> Vec<&str> {
        vec![self.attribute]
    }

    fn mutate<R: Rng + ?Sized>(&self, state: &mut f64, _rng: &mut R) {
        *state += self.delta;
    }
}

/// Rate equal to the scalar state itself.
pub(crate) struct Proportional;

impl RateResponse<f64> for Proportional {
    fn attribute(&self) -> &str {
        Attributes::SCALAR
    }

    fn rate(&self, state: &f64, _time: f64) -> f64 {
        state.max(0.0)
    }
}
