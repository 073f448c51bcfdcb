use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::{Event, Node};
use crate::base::{IdAllocator, NodeId, NodeIndex};
use crate::errors::TreeError;

/// Absolute tolerance on `dist - (t - parent.t)`.
pub const BRANCH_LENGTH_ATOL: f64 = 1e-8;
/// Relative tolerance on `dist - (t - parent.t)`.
pub const BRANCH_LENGTH_RTOL: f64 = 1e-5;

/// A timed genealogy stored as an arena of nodes.
///
/// Each node owns a list of child handles and a parent handle. Deleting a
/// node frees its slot; freed slots are never reused, so handles stay
/// stable for the lifetime of the tree. The tree also owns the id
/// allocator and the tree-wide `sampled` and `pruned` flags.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineageTree<S> {
    nodes: Vec<Option<Node<S>>>,
    root: NodeIndex,
    ids: IdAllocator,
    live: usize,
    sampled: bool,
    pruned: bool,
}

/// Arena and allocator state captured before a mutating operation.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint {
    arena_len: usize,
    ids: IdAllocator,
}

impl<S> LineageTree<S> {
    /// Create a tree holding only a root at time `t`.
    pub fn new(state: S, t: f64) -> Self {
        let mut ids = IdAllocator::new();
        let root = Node::new(ids.allocate(), t, 0.0, state);
        Self {
            nodes: vec![Some(root)],
            root: NodeIndex(0),
            ids,
            live: 1,
            sampled: false,
            pruned: false,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// The root node.
    pub fn root_node(&self) -> &Node<S> {
        &self[self.root]
    }

    /// Number of live nodes, including any detached ones.
    pub fn len(&self) -> usize {
        self.live
    }

    /// A tree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node<S>> {
        self.nodes.get(index.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node<S>> {
        self.nodes.get_mut(index.0).and_then(Option::as_mut)
    }

    fn try_get(&self, index: NodeIndex) -> Result<&Node<S>, TreeError> {
        self.get(index).ok_or(TreeError::NodeNotFound(index))
    }

    fn try_get_mut(&mut self, index: NodeIndex) -> Result<&mut Node<S>, TreeError> {
        self.get_mut(index).ok_or(TreeError::NodeNotFound(index))
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    pub(crate) fn mark_sampled(&mut self) {
        self.sampled = true;
    }

    pub(crate) fn mark_pruned(&mut self) {
        self.pruned = true;
    }

    /// The id the next created node will receive.
    pub fn next_id(&self) -> NodeId {
        self.ids.peek()
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, t: f64, dist: f64, state: S) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(Some(Node::new(self.ids.allocate(), t, dist, state)));
        self.live += 1;
        index
    }

    /// Attach a detached `child` under `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<(), TreeError> {
        self.try_get(parent)?;
        let is_root = child == self.root;
        let node = self.try_get_mut(child)?;
        if node.parent.is_some() || is_root {
            return Err(TreeError::AlreadyAttached(node.id));
        }
        node.parent = Some(parent);
        self.try_get_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Allocate a node `dist` time units after `parent` and attach it.
    pub fn add_new_child(
        &mut self,
        parent: NodeIndex,
        dist: f64,
        state: S,
    ) -> Result<NodeIndex, TreeError> {
        let t = self.try_get(parent)?.t + dist;
        let child = self.new_node(t, dist, state);
        self.add_child(parent, child)?;
        Ok(child)
    }

    /// Unlink `node` (and its subtree) from its parent. The subtree stays
    /// in the arena, owned by the caller through the returned handle.
    pub fn detach(&mut self, node: NodeIndex) -> Result<NodeIndex, TreeError> {
        let current = self.try_get(node)?;
        let parent = current.parent.ok_or(TreeError::RootOperation(current.id))?;
        self.try_get_mut(parent)?.children.retain(|&c| c != node);
        self.try_get_mut(node)?.parent = None;
        Ok(node)
    }

    /// Detach `node` and free every slot in its subtree.
    pub fn remove_subtree(&mut self, node: NodeIndex) -> Result<(), TreeError> {
        self.detach(node)?;
        let doomed: Vec<NodeIndex> = self.preorder(node).collect();
        for index in doomed {
            self.free(index);
        }
        Ok(())
    }

    /// Delete a node with at most one child, reattaching the child to the
    /// deleted node's parent in the same position and extending its branch
    /// by the deleted branch.
    pub fn splice_out(&mut self, node: NodeIndex) -> Result<(), TreeError> {
        let current = self.try_get(node)?;
        let parent = current.parent.ok_or(TreeError::RootOperation(current.id))?;
        if current.children.len() > 1 {
            return Err(TreeError::Multifurcating {
                node: current.id,
                children: current.children.len(),
            });
        }
        let dist = current.dist;
        let child = current.children.first().copied();

        let siblings = &mut self.try_get_mut(parent)?.children;
        let position = siblings.iter().position(|&c| c == node).ok_or_else(|| {
            TreeError::Invariant(format!("{node} missing from its parent's children"))
        })?;
        match child {
            Some(child) => siblings[position] = child,
            None => {
                siblings.remove(position);
            }
        }
        if let Some(child) = child {
            let child = self.try_get_mut(child)?;
            child.parent = Some(parent);
            child.dist += dist;
        }
        self.free(node);
        Ok(())
    }

    fn free(&mut self, index: NodeIndex) {
        if let Some(slot) = self.nodes.get_mut(index.0) {
            if slot.take().is_some() {
                self.live -= 1;
            }
        }
    }

    /// Pre-order traversal of the subtree at `start`.
    pub fn preorder(&self, start: NodeIndex) -> Preorder<'_, S, fn(&Node<S>) -> bool> {
        Preorder::new(self, start, descend_always as fn(&Node<S>) -> bool)
    }

    /// Pre-order traversal that does not descend below nodes for which
    /// `stop` holds.
    pub fn preorder_with<F>(&self, start: NodeIndex, stop: F) -> Preorder<'_, S, F>
    where
        F: Fn(&Node<S>) -> bool,
    {
        Preorder::new(self, start, stop)
    }

    /// Post-order traversal of the subtree at `start`: children before parents.
    pub fn postorder(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::new();
        let mut stack = vec![(start, false)];
        while let Some((index, expanded)) = stack.pop() {
            let Some(node) = self.get(index) else {
                continue;
            };
            if expanded {
                order.push(index);
            } else {
                stack.push((index, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Leaves of the subtree at `start`, in pre-order.
    pub fn leaves(&self, start: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.leaves_with(start, |node| node.is_leaf())
    }

    /// Leaves under a caller-defined notion of leaf: a node is a leaf exactly
    /// when `is_leaf` holds for it, and traversal stops there.
    pub fn leaves_with<'a, F>(
        &'a self,
        start: NodeIndex,
        is_leaf: F,
    ) -> impl Iterator<Item = NodeIndex> + 'a
    where
        F: Fn(&Node<S>) -> bool + Clone + 'a,
    {
        let keep = is_leaf.clone();
        self.preorder_with(start, is_leaf)
            .filter(move |&index| keep(&self[index]))
    }

    /// Latest node time in the tree.
    pub fn max_time(&self) -> f64 {
        self.preorder(self.root)
            .map(|index| self[index].t)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Number of leaves under the root carrying `event`.
    pub fn count_leaves(&self, event: Event) -> usize {
        self.leaves(self.root)
            .filter(|&index| self[index].event == Some(event))
            .count()
    }

    /// Verify `dist ≈ t - parent.t` for every non-root node reachable from the root.
    pub fn check_branch_lengths(&self) -> Result<(), TreeError> {
        for index in self.preorder(self.root) {
            let node = &self[index];
            let Some(parent) = node.parent else {
                continue;
            };
            let expected = node.t - self.try_get(parent)?.t;
            let tolerance = BRANCH_LENGTH_ATOL + BRANCH_LENGTH_RTOL * expected.abs();
            if (node.dist - expected).abs() > tolerance {
                return Err(TreeError::Invariant(format!(
                    "node {} has dist {} but its time difference to the parent is {}",
                    node.id, node.dist, expected
                )));
            }
        }
        Ok(())
    }

    /// Capture the arena length and allocator state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            arena_len: self.nodes.len(),
            ids: self.ids,
        }
    }

    /// Discard every node created since `checkpoint` and rewind the id
    /// allocator, so that replaying the same operation reproduces the same ids.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let len = checkpoint.arena_len;
        self.nodes.truncate(len);
        for node in self.nodes.iter_mut().flatten() {
            node.children.retain(|child| child.0 < len);
        }
        self.live = self.nodes.iter().filter(|slot| slot.is_some()).count();
        self.ids = checkpoint.ids;
    }
}

/// # Panics
/// Panics if the handle refers to a deleted node.
impl<S> Index<NodeIndex> for LineageTree<S> {
    type Output = Node<S>;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        match self.get(index) {
            Some(node) => node,
            None => panic!("node {index} does not exist or has been deleted"),
        }
    }
}

impl<S> IndexMut<NodeIndex> for LineageTree<S> {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        match self.get_mut(index) {
            Some(node) => node,
            None => panic!("node {index} does not exist or has been deleted"),
        }
    }
}

fn descend_always<S>(_: &Node<S>) -> bool {
    false
}

/// Iterator returned by [`LineageTree::preorder`] and [`LineageTree::preorder_with`].
pub struct Preorder<'a, S, F> {
    tree: &'a LineageTree<S>,
    stack: Vec<NodeIndex>,
    stop: F,
}

impl<'a, S, F> Preorder<'a, S, F> {
    fn new(tree: &'a LineageTree<S>, start: NodeIndex, stop: F) -> Self {
        let stack = if tree.get(start).is_some() { vec![start] } else { Vec::new() };
        Self { tree, stack, stop }
    }
}

impl<S, F> Iterator for Preorder<'_, S, F>
where
    F: Fn(&Node<S>) -> bool,
{
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree[index];
        if !(self.stop)(node) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(index)
    }
}
