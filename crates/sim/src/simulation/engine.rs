//! Simulation engine for the birth-death-mutation process.
//!
//! This module provides the continuous-time event loop that grows a
//! [`LineageTree`] from its root. At every step the engine:
//!
//! 1. Applies carrying-capacity control to the active population.
//! 2. Races one waiting time per event kind (birth, death, mutation), each
//!    drawn over the whole active population, and takes the earliest.
//! 3. Advances every active lineage's clock to the event time, or to the end
//!    of the window if the earliest event falls beyond it.
//! 4. Resolves the event on one lineage and adds its offspring to the pool.
//!
//! The affected lineage is drawn uniformly for state-homogeneous responses
//! and with probability proportional to its rate at the event time
//! otherwise.
//!
//! A failed run is rolled back: every node created during the attempt is
//! discarded and the tree's id allocator rewound, so the tree is exactly as
//! it was before the call.

use std::collections::HashMap;
use std::marker::PhantomData;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::base::{NodeIndex, RandomizedSet};
use crate::errors::{SimulationError, TreeError};
use crate::evolution::{Mutator, RateResponse};
use crate::simulation::progress::Progress;
use crate::simulation::{CapacityMethod, EvolveConfig};
use crate::tree::{Event, LineageTree, NodeState};

/// Offspring produced by a birth event.
const OFFSPRING_NUMBER: usize = 2;

/// Counts of what happened during a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolveSummary {
    pub births: usize,
    /// Includes lineages culled by hard capacity control
    pub deaths: usize,
    /// Includes mutations at birth when enabled
    pub mutations: usize,
    pub survivors: usize,
    /// Largest active population seen after capacity control
    pub peak_population: usize,
    /// Time of the last processed step
    pub end_time: f64,
}

/// A configured birth-death-mutation process.
///
/// Bundles the three rate responses, the mutator and the run configuration,
/// checked for consistency once at construction.
#[derive(Debug, Clone)]
pub struct Simulation<S, B, D, M, X> {
    birth: B,
    death: D,
    mutation: M,
    mutator: X,
    config: EvolveConfig,
    _state: PhantomData<fn() -> S>,
}

impl<S, B, D, M, X> Simulation<S, B, D, M, X>
where
    S: NodeState,
    B: RateResponse<S>,
    D: RateResponse<S>,
    M: RateResponse<S>,
    X: Mutator<S>,
{
    pub fn new(
        birth: B,
        death: D,
        mutation: M,
        mutator: X,
        config: EvolveConfig,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        state_attribute::<S, _, _, _, _>(&birth, &death, &mutation, &mutator)?;
        Ok(Self {
            birth,
            death,
            mutation,
            mutator,
            config,
            _state: PhantomData,
        })
    }

    pub fn config(&self) -> &EvolveConfig {
        &self.config
    }

    /// Evolve `tree` drawing every random number from `rng`.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        tree: &mut LineageTree<S>,
        rng: &mut R,
    ) -> Result<EvolveSummary, SimulationError> {
        evolve(
            tree,
            &self.config,
            &self.birth,
            &self.death,
            &self.mutation,
            &self.mutator,
            rng,
        )
    }

    /// Evolve `tree` with a generator built from the configured seed.
    pub fn evolve_seeded(&self, tree: &mut LineageTree<S>) -> Result<EvolveSummary, SimulationError> {
        let mut rng = self.config.rng();
        self.evolve(tree, &mut rng)
    }
}

/// Evolve `tree` from its root for `config.duration` time units.
///
/// # Errors
/// - [`SimulationError::AlreadyEvolved`] if the root has children.
/// - [`SimulationError::InvalidArgument`] for out-of-range configuration.
/// - [`SimulationError::AttributeMismatch`] / [`SimulationError::MissingAttribute`]
///   if the strategies disagree on the governed attribute or the root lacks it.
/// - [`SimulationError::CapacityExceeded`] with [`CapacityMethod::None`].
/// - [`SimulationError::InsufficientSurvivors`] below `config.min_survivors`.
///
/// The first three fail before touching the tree; the rest roll it back.
pub fn evolve<S, B, D, M, X, R>(
    tree: &mut LineageTree<S>,
    config: &EvolveConfig,
    birth: &B,
    death: &D,
    mutation: &M,
    mutator: &X,
    rng: &mut R,
) -> Result<EvolveSummary, SimulationError>
where
    S: NodeState,
    B: RateResponse<S>,
    D: RateResponse<S>,
    M: RateResponse<S>,
    X: Mutator<S>,
    R: Rng + ?Sized,
{
    let root = tree.root_node();
    if !root.is_leaf() {
        return Err(SimulationError::AlreadyEvolved {
            node: root.id(),
            children: root.children().len(),
        });
    }
    config.validate()?;
    let attribute = state_attribute::<S, _, _, _, _>(birth, death, mutation, mutator)?;
    if !root.state().has_attribute(attribute) {
        return Err(SimulationError::MissingAttribute {
            node: root.id(),
            attribute: attribute.to_string(),
        });
    }

    debug!(
        duration = config.duration,
        init_population = config.init_population,
        capacity = config.capacity,
        capacity_method = ?config.capacity_method,
        attribute,
        "Evolving tree"
    );

    let checkpoint = tree.checkpoint();
    let start = tree.root_node().t();
    let progress = Progress::new(config.verbose, start, config.duration);
    let mut event_loop = EventLoop {
        tree: &mut *tree,
        config,
        birth,
        death,
        mutation,
        mutator,
        pool: ActivePool::default(),
        time: start,
        summary: EvolveSummary::default(),
    };

    match event_loop.run(rng, &progress) {
        Ok(summary) => {
            progress.finish();
            info!(
                births = summary.births,
                deaths = summary.deaths,
                mutations = summary.mutations,
                survivors = summary.survivors,
                "Evolution finished"
            );
            Ok(summary)
        }
        Err(err) => {
            progress.abandon();
            tree.rollback(checkpoint);
            warn!(%err, "Evolution aborted, tree rolled back");
            Err(err)
        }
    }
}

/// The attribute shared by all three responses, provided the mutator writes it.
fn state_attribute<'a, S, B, D, M, X>(
    birth: &'a B,
    death: &D,
    mutation: &M,
    mutator: &X,
) -> Result<&'a str, SimulationError>
where
    B: RateResponse<S>,
    D: RateResponse<S>,
    M: RateResponse<S>,
    X: Mutator<S>,
{
    let attribute = birth.attribute();
    let mutated = mutator.mutated_attributes();
    if death.attribute() != attribute
        || mutation.attribute() != attribute
        || !mutated.contains(&attribute)
    {
        return Err(SimulationError::AttributeMismatch {
            birth: attribute.to_string(),
            death: death.attribute().to_string(),
            mutation: mutation.attribute().to_string(),
            mutator: mutated.iter().map(|a| a.to_string()).collect(),
        });
    }
    Ok(attribute)
}

/// Active lineages with their cached birth and death rate contributions.
#[derive(Default)]
struct ActivePool {
    lineages: RandomizedSet<NodeIndex>,
    contributions: HashMap<NodeIndex, (f64, f64)>,
    birth_sum: f64,
    death_sum: f64,
}

impl ActivePool {
    fn insert(&mut self, lineage: NodeIndex, birth_rate: f64, death_rate: f64) {
        self.lineages.add(lineage);
        self.contributions.insert(lineage, (birth_rate, death_rate));
        self.birth_sum += birth_rate;
        self.death_sum += death_rate;
    }

    fn remove(&mut self, lineage: NodeIndex) -> Result<(), TreeError> {
        self.lineages
            .remove(&lineage)
            .map_err(|_| TreeError::Invariant(format!("lineage {lineage} is not active")))?;
        if let Some((birth_rate, death_rate)) = self.contributions.remove(&lineage) {
            self.birth_sum -= birth_rate;
            self.death_sum -= death_rate;
        }
        if self.lineages.is_empty() {
            self.birth_sum = 0.0;
            self.death_sum = 0.0;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.lineages.clear();
        self.contributions.clear();
        self.birth_sum = 0.0;
        self.death_sum = 0.0;
    }

    fn len(&self) -> usize {
        self.lineages.len()
    }

    fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NodeIndex, TreeError> {
        self.lineages
            .choice(rng)
            .copied()
            .map_err(|_| TreeError::Invariant("active pool is empty".to_string()))
    }
}

/// `(numerator / denominator)^(population / capacity)`, which is 1 when the
/// denominator vanishes.
fn capacity_multiplier(numerator: f64, denominator: f64, population: usize, capacity: usize) -> f64 {
    if denominator <= 0.0 {
        return 1.0;
    }
    (numerator.max(0.0) / denominator).powf(population as f64 / capacity as f64)
}

struct EventLoop<'a, S, B, D, M, X> {
    tree: &'a mut LineageTree<S>,
    config: &'a EvolveConfig,
    birth: &'a B,
    death: &'a D,
    mutation: &'a M,
    mutator: &'a X,
    pool: ActivePool,
    time: f64,
    summary: EvolveSummary,
}

impl<S, B, D, M, X> EventLoop<'_, S, B, D, M, X>
where
    S: NodeState,
    B: RateResponse<S>,
    D: RateResponse<S>,
    M: RateResponse<S>,
    X: Mutator<S>,
{
    fn run<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        progress: &Progress,
    ) -> Result<EvolveSummary, SimulationError> {
        let root = self.tree.root();
        let end = self.time + self.config.duration;

        for _ in 0..self.config.init_population {
            let state = self.tree[root].state.clone();
            let lineage = self.tree.new_node(self.time, 0.0, state);
            self.tree.add_child(root, lineage)?;
            self.activate(lineage);
        }

        // Indexed birth, death, mutation.
        let mut multipliers = [1.0_f64; 3];
        while !self.pool.is_empty() {
            let population = self.pool.len();
            let capacity = self.config.capacity;
            match self.config.capacity_method {
                CapacityMethod::None => {
                    if population > capacity {
                        debug!(capacity, time = self.time, "Capacity exceeded");
                        return Err(SimulationError::CapacityExceeded {
                            capacity,
                            time: self.time,
                        });
                    }
                }
                CapacityMethod::Birth => {
                    multipliers[0] = capacity_multiplier(
                        self.pool.death_sum,
                        self.pool.birth_sum,
                        population,
                        capacity,
                    );
                }
                CapacityMethod::Death => {
                    multipliers[1] = capacity_multiplier(
                        self.pool.birth_sum,
                        self.pool.death_sum,
                        population,
                        capacity,
                    );
                }
                CapacityMethod::Hard => {
                    if population > capacity {
                        let victim = self.pool.choose(rng)?;
                        self.tree[victim].event = Some(Event::Death);
                        self.pool.remove(victim)?;
                        self.summary.deaths += 1;
                    }
                }
            }
            self.summary.peak_population = self.summary.peak_population.max(self.pool.len());

            let (waiting_time, event) = self.race(&multipliers, rng);
            if waiting_time < end - self.time {
                self.advance(self.time + waiting_time, waiting_time);
                let lineage = self.choose_lineage(event, rng)?;
                self.resolve(lineage, event, rng)?;
            } else {
                self.advance(end, end - self.time);
                for &lineage in self.pool.lineages.iter() {
                    self.tree[lineage].event = Some(Event::Survival);
                }
                self.pool.clear();
            }
            progress.update(self.time, self.pool.len());
        }

        let survivors = self.tree.count_leaves(Event::Survival);
        if survivors < self.config.min_survivors {
            debug!(survivors, min_survivors = self.config.min_survivors, "Too few survivors");
            return Err(SimulationError::InsufficientSurvivors {
                survivors,
                min_survivors: self.config.min_survivors,
            });
        }
        self.tree.check_branch_lengths()?;

        self.summary.survivors = survivors;
        self.summary.end_time = self.time;
        Ok(std::mem::take(&mut self.summary))
    }

    /// Earliest of one waiting time per event kind. Ties go to the earlier kind.
    fn race<R: Rng + ?Sized>(&self, multipliers: &[f64; 3], rng: &mut R) -> (f64, Event) {
        let tree = &*self.tree;
        let states = || {
            self.pool
                .lineages
                .iter()
                .map(move |&lineage| &tree[lineage].state)
        };
        let candidates = [
            (
                self.birth.waiting_time(states(), self.time, multipliers[0], rng),
                Event::Birth,
            ),
            (
                self.death.waiting_time(states(), self.time, multipliers[1], rng),
                Event::Death,
            ),
            (
                self.mutation.waiting_time(states(), self.time, multipliers[2], rng),
                Event::Mutation,
            ),
        ];
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.0 < best.0 {
                best = *candidate;
            }
        }
        best
    }

    /// Move every active lineage's clock to `time`, extending its branch by `dt`.
    fn advance(&mut self, time: f64, dt: f64) {
        for &lineage in self.pool.lineages.iter() {
            let node = &mut self.tree[lineage];
            node.dist += dt;
            node.t = time;
        }
        self.time = time;
    }

    fn choose_lineage<R: Rng + ?Sized>(
        &self,
        event: Event,
        rng: &mut R,
    ) -> Result<NodeIndex, TreeError> {
        match event {
            Event::Birth => self.weighted_choice(self.birth, rng),
            Event::Death => self.weighted_choice(self.death, rng),
            _ => self.weighted_choice(self.mutation, rng),
        }
    }

    /// Draw an active lineage with probability proportional to its current
    /// rate under `response`.
    fn weighted_choice<Q, R>(&self, response: &Q, rng: &mut R) -> Result<NodeIndex, TreeError>
    where
        Q: RateResponse<S>,
        R: Rng + ?Sized,
    {
        if response.is_state_homogeneous() {
            return self.pool.choose(rng);
        }
        let rate = |lineage: NodeIndex| response.rate(&self.tree[lineage].state, self.time);
        let total: f64 = self.pool.lineages.iter().map(|&lineage| rate(lineage)).sum();
        if total <= 0.0 || !total.is_finite() {
            return self.pool.choose(rng);
        }
        let mut target = rng.random::<f64>() * total;
        let mut chosen = None;
        for &lineage in self.pool.lineages.iter() {
            chosen = Some(lineage);
            let weight = rate(lineage);
            if target < weight {
                break;
            }
            target -= weight;
        }
        chosen.ok_or_else(|| TreeError::Invariant("active pool is empty".to_string()))
    }

    fn resolve<R: Rng + ?Sized>(
        &mut self,
        lineage: NodeIndex,
        event: Event,
        rng: &mut R,
    ) -> Result<(), SimulationError> {
        self.tree[lineage].event = Some(event);
        self.pool.remove(lineage)?;
        match event {
            Event::Death => {
                self.summary.deaths += 1;
            }
            Event::Birth => {
                self.summary.births += 1;
                for _ in 0..OFFSPRING_NUMBER {
                    let offspring = self.birth_offspring(lineage, rng)?;
                    self.activate(offspring);
                }
            }
            Event::Mutation => {
                self.summary.mutations += 1;
                self.mutator.mutate(&mut self.tree[lineage].state, rng);
                let child = self.spawn_child(lineage)?;
                self.activate(child);
            }
            Event::Survival | Event::Sampling => {
                return Err(TreeError::Invariant(format!("{event} is not a simulated event")).into());
            }
        }
        Ok(())
    }

    /// Attach one offspring to a birth node and return the lineage that
    /// continues from it: the child itself, or with birth mutations the
    /// grandchild below a mutated child.
    fn birth_offspring<R: Rng + ?Sized>(
        &mut self,
        parent: NodeIndex,
        rng: &mut R,
    ) -> Result<NodeIndex, TreeError> {
        let t = self.tree[parent].t;
        let state = self.tree[parent].state.clone();
        let child = self.tree.new_node(t, 0.0, state);
        let lineage = if self.config.birth_mutations {
            let node = &mut self.tree[child];
            node.event = Some(Event::Mutation);
            self.mutator.mutate(&mut node.state, rng);
            self.summary.mutations += 1;
            self.spawn_child(child)?
        } else {
            child
        };
        self.tree.add_child(parent, child)?;
        Ok(lineage)
    }

    /// Attach a zero-length child copying `parent`'s state.
    fn spawn_child(&mut self, parent: NodeIndex) -> Result<NodeIndex, TreeError> {
        let node = &self.tree[parent];
        let (t, state) = (node.t, node.state.clone());
        let child = self.tree.new_node(t, 0.0, state);
        self.tree.add_child(parent, child)?;
        Ok(child)
    }

    fn activate(&mut self, lineage: NodeIndex) {
        let state = &self.tree[lineage].state;
        let birth_rate = self.birth.rate(state, self.time);
        let death_rate = self.death.rate(state, self.time);
        self.pool.insert(lineage, birth_rate, death_rate);
    }
}
