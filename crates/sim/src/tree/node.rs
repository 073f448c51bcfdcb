use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::base::{NodeId, NodeIndex};

/// Event that resolved a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Birth,
    Death,
    Mutation,
    /// Alive at the end of the simulation window.
    Survival,
    /// A survivor chosen by `sample_survivors`.
    Sampling,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::Birth => "birth",
            Event::Death => "death",
            Event::Mutation => "mutation",
            Event::Survival => "survival",
            Event::Sampling => "sampling",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State carried along a lineage.
///
/// States are copied (not shared) into offspring, so sibling lineages evolve
/// independently. Rate responses and mutators address the state through
/// named attributes.
pub trait NodeState: Clone + fmt::Debug {
    /// Value of the named attribute, if the state has it.
    fn attribute(&self, name: &str) -> Option<f64>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// A bare scalar state exposes a single attribute named `x`.
impl NodeState for f64 {
    fn attribute(&self, name: &str) -> Option<f64> {
        (name == Attributes::SCALAR).then_some(*self)
    }
}

/// Named scalar attributes, for states with more than one trait.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(BTreeMap<String, f64>);

impl Attributes {
    /// Conventional name of a scalar phenotype.
    pub const SCALAR: &'static str = "x";

    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut f64> {
        self.0.get_mut(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl NodeState for Attributes {
    fn attribute(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

/// A timed node of a [`LineageTree`](super::LineageTree).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node<S> {
    pub(crate) id: NodeId,
    /// Absolute simulation time.
    pub(crate) t: f64,
    /// Branch length to the parent.
    pub(crate) dist: f64,
    pub(crate) event: Option<Event>,
    pub(crate) state: S,
    /// Mutation events folded onto the branch above this node.
    pub(crate) n_mutations: u32,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: Vec<NodeIndex>,
}

impl<S> Node<S> {
    pub(crate) fn new(id: NodeId, t: f64, dist: f64, state: S) -> Self {
        Self {
            id,
            t,
            dist,
            event: None,
            state,
            n_mutations: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// The resolving event, or `None` while the node is on the frontier.
    pub fn event(&self) -> Option<Event> {
        self.event
    }

    pub fn set_event(&mut self, event: Event) {
        self.event = Some(event);
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn n_mutations(&self) -> u32 {
        self.n_mutations
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
