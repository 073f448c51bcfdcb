//! Shared rate responses and mutators for integration tests.
#![allow(dead_code)]

use bdms_sim::base::NodeIndex;
use bdms_sim::evolution::{Mutator, RateResponse};
use bdms_sim::tree::{Attributes, LineageTree, NodeState};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// The same rate for every lineage.
pub struct Constant {
    pub attribute: &'static str,
    pub rate: f64,
}

impl Constant {
    pub fn new(rate: f64) -> Self {
        Self {
            attribute: Attributes::SCALAR,
            rate,
        }
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

/// `max(0, intercept + slope * x)`.
pub struct Linear {
    pub attribute: &'static str,
    pub intercept: f64,
    pub slope: f64,
}

impl Linear {
    pub fn new(intercept: f64, slope: f64) -> Self {
        Self {
            attribute: Attributes::SCALAR,
            intercept,
            slope,
        }
    }
}

impl<S: NodeState> RateResponse<S> for Linear {
    fn attribute(&self) -> &str {
        self.attribute
    }

    fn rate(&self, state: &S, _time: f64) -> f64 {
        let x = state.attribute(self.attribute).unwrap_or(0.0);
        (self.intercept + self.slope * x).max(0.0)
    }
}

/// Adds a normal deviate to one attribute.
pub struct Gaussian {
    pub attribute: &'static str,
    pub normal: Normal<f64>,
}

impl Gaussian {
    pub fn new(sigma: f64) -> Self {
        Self::on(Attributes::SCALAR, sigma)
    }

    pub fn on(attribute: &'static str, sigma: f64) -> Self {
        Self {
            attribute,
            normal: Normal::new(0.0, sigma).unwrap(),
        }
    }
}

impl Mutator<f64> for Gaussian {
    fn mutated_attributes(&self) -> Vec<&str> {
        vec![self.attribute]
    }

    fn mutate<R: Rng + ?Sized>(&self, state: &mut f64, rng: &mut R) {
        *state += self.normal.sample(rng);
    }
}

impl Mutator<Attributes> for Gaussian {
    fn mutated_attributes(&self) -> Vec<&str> {
        vec![self.attribute]
    }

    fn mutate<R: Rng + ?Sized>(&self, state: &mut Attributes, rng: &mut R) {
        if let Some(value) = state.get_mut(self.attribute) {
            *value += self.normal.sample(rng);
        }
    }
}

/// Total branch length from `node` up to the root.
pub fn root_distance<S>(tree: &LineageTree<S>, mut node: NodeIndex) -> f64 {
    let mut total = 0.0;
    while let Some(parent) = tree[node].parent() {
        total += tree[node].dist();
        node = parent;
    }
    total
}
