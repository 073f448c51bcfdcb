use std::collections::HashSet;

use tracing::debug;

use crate::base::{NodeId, NodeIndex};
use crate::errors::{PostProcessError, TreeError};
use crate::tree::{Event, LineageTree};

/// Reduce a sampled tree to the subtree subtending its sampled leaves.
///
/// Every maximal subtree without a sampled leaf is removed. A birth node
/// left with a single child is spliced out, so branch lengths from the root
/// to each sampled leaf are preserved. Returns the number of removed
/// subtrees.
pub fn prune<S>(tree: &mut LineageTree<S>) -> Result<usize, PostProcessError> {
    let root_id = tree.root_node().id();
    if tree.is_pruned() {
        return Err(PostProcessError::AlreadyPruned(root_id));
    }
    if !tree.is_sampled() {
        return Err(PostProcessError::NotSampled(root_id));
    }

    let observed = observed_nodes(tree);
    if !observed.contains(&root_id) {
        return Err(PostProcessError::NoSampledLeaves);
    }

    let unobserved: Vec<NodeIndex> = tree
        .leaves_with(tree.root(), |node| !observed.contains(&node.id()))
        .collect();
    for &node in &unobserved {
        let parent = tree[node]
            .parent()
            .ok_or(TreeError::RootOperation(tree[node].id()))?;
        tree.remove_subtree(node)?;
        if parent == tree.root() {
            continue;
        }
        if tree[parent].event() != Some(Event::Birth) {
            return Err(TreeError::Invariant(format!(
                "unobserved subtree hangs off {} which is not a birth event",
                tree[parent].id()
            ))
            .into());
        }
        tree.splice_out(parent)?;
    }

    tree.mark_pruned();
    debug!(
        removed = unobserved.len(),
        remaining = tree.len(),
        "Pruned unobserved subtrees"
    );
    Ok(unobserved.len())
}

/// Ids of nodes with a sampled leaf somewhere in their subtree.
fn observed_nodes<S>(tree: &LineageTree<S>) -> HashSet<NodeId> {
    let mut observed = HashSet::new();
    for index in tree.postorder(tree.root()) {
        let node = &tree[index];
        let sampled = if node.is_leaf() {
            node.event() == Some(Event::Sampling)
        } else {
            node.children()
                .iter()
                .any(|&child| observed.contains(&tree[child].id()))
        };
        if sampled {
            observed.insert(node.id());
        }
    }
    observed
}

/// Collapse every mutation node into its single child.
///
/// The child's `n_mutations` counts the collapsed events on its branch and
/// its `dist` absorbs the mutation node's branch. Returns the number of
/// collapsed nodes.
pub fn remove_mutation_events<S>(tree: &mut LineageTree<S>) -> Result<usize, PostProcessError> {
    if !tree.is_pruned() {
        return Err(PostProcessError::NotPruned(tree.root_node().id()));
    }

    let mut collapsed = 0;
    for index in tree.postorder(tree.root()) {
        let node = &tree[index];
        if node.event() != Some(Event::Mutation) || node.is_root() {
            continue;
        }
        let &[child] = node.children() else {
            return Err(TreeError::Invariant(format!(
                "mutation node {} has {} children",
                node.id(),
                node.children().len()
            ))
            .into());
        };
        let carried = node.n_mutations() + 1;
        tree[child].n_mutations += carried;
        tree.splice_out(index)?;
        collapsed += 1;
    }
    debug!(collapsed, "Removed mutation events");
    Ok(collapsed)
}
