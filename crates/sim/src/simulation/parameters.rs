//! Simulation parameters and configuration.
//!
//! This module provides the parameter structure for a single `evolve` run:
//! the simulation window, carrying-capacity control, initial population,
//! and seeding. Configurations are serde-serializable so a run can be
//! reproduced from a stored JSON document.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::errors::SimulationError;

/// How the carrying capacity is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityMethod {
    /// Abort the run if the population exceeds capacity.
    #[default]
    None,
    /// Damp births so the process is critical at capacity.
    Birth,
    /// Boost deaths so the process is critical at capacity.
    Death,
    /// Kill a uniformly random lineage whenever capacity is exceeded.
    Hard,
}

/// Parameters for one `evolve` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolveConfig {
    /// Length of the simulation window
    pub duration: f64,
    /// Mutate both offspring at every birth event
    #[serde(default)]
    pub birth_mutations: bool,
    /// Fail the run if fewer lineages survive
    #[serde(default = "default_min_survivors")]
    pub min_survivors: usize,
    /// Population carrying capacity
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub capacity_method: CapacityMethod,
    /// Number of lineages seeded under the root
    #[serde(default = "default_init_population")]
    pub init_population: usize,
    /// RNG seed; `None` draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
    /// Show a progress spinner
    #[serde(default)]
    pub verbose: bool,
}

fn default_min_survivors() -> usize {
    1
}

fn default_capacity() -> usize {
    1000
}

fn default_init_population() -> usize {
    1
}

impl EvolveConfig {
    /// Configuration for a window of `duration` time units with default settings.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            birth_mutations: false,
            min_survivors: default_min_survivors(),
            capacity: default_capacity(),
            capacity_method: CapacityMethod::None,
            init_population: default_init_population(),
            seed: None,
            verbose: false,
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidArgument(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_birth_mutations(mut self, birth_mutations: bool) -> Self {
        self.birth_mutations = birth_mutations;
        self
    }

    pub fn with_min_survivors(mut self, min_survivors: usize) -> Self {
        self.min_survivors = min_survivors;
        self
    }

    pub fn with_capacity(mut self, capacity: usize, method: CapacityMethod) -> Self {
        self.capacity = capacity;
        self.capacity_method = method;
        self
    }

    pub fn with_init_population(mut self, init_population: usize) -> Self {
        self.init_population = init_population;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(SimulationError::InvalidArgument(format!(
                "duration={} must be finite and non-negative",
                self.duration
            )));
        }
        if self.capacity == 0 {
            return Err(SimulationError::InvalidArgument(
                "capacity must be positive".to_string(),
            ));
        }
        if self.init_population == 0 {
            return Err(SimulationError::InvalidArgument(
                "init_population must be positive".to_string(),
            ));
        }
        if self.init_population > self.capacity {
            return Err(SimulationError::InvalidArgument(format!(
                "init_population={} must not exceed capacity={}",
                self.init_population, self.capacity
            )));
        }
        Ok(())
    }

    /// Generator for this run's seed.
    pub fn rng(&self) -> Xoshiro256PlusPlus {
        rng_from_seed(self.seed)
    }
}

/// Create the simulation RNG: deterministic for `Some(seed)`, from OS
/// entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_seed(rand::rng().random()),
    }
}
