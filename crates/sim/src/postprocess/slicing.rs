use crate::base::NodeIndex;
use crate::errors::{PostProcessError, TreeError};
use crate::tree::{LineageTree, Node, NodeState};

/// States of all lineages alive at time `t`.
///
/// A lineage crossing `t` is represented by the first node at or after `t`:
/// that node's own state if it lies exactly on `t`, otherwise its parent's
/// state (the value carried just before the next event).
pub fn slice<S: Clone>(tree: &LineageTree<S>, t: f64) -> Result<Vec<S>, PostProcessError> {
    Ok(slice_nodes(tree, t)?
        .into_iter()
        .map(|index| tree[index].state().clone())
        .collect())
}

/// Named attribute of all lineages alive at time `t`. See [`slice`].
pub fn slice_attribute<S: NodeState>(
    tree: &LineageTree<S>,
    t: f64,
    attribute: &str,
) -> Result<Vec<f64>, PostProcessError> {
    slice_nodes(tree, t)?
        .into_iter()
        .map(|index| {
            let node = &tree[index];
            node.state()
                .attribute(attribute)
                .ok_or_else(|| PostProcessError::UnknownAttribute {
                    node: node.id(),
                    attribute: attribute.to_string(),
                })
        })
        .collect()
}

/// The node whose state represents each lineage alive at `t`.
fn slice_nodes<S>(tree: &LineageTree<S>, t: f64) -> Result<Vec<NodeIndex>, PostProcessError> {
    if tree.is_pruned() {
        return Err(PostProcessError::SlicePruned);
    }
    let root = tree.root_node();
    if root.is_leaf() {
        return Err(PostProcessError::Unevolved);
    }
    let end = tree.max_time();
    if !t.is_finite() || t < root.t() || t > end {
        return Err(PostProcessError::SliceOutOfRange {
            t,
            start: root.t(),
            end,
        });
    }
    if t == root.t() {
        return Ok(vec![tree.root()]);
    }

    let crosses = move |node: &Node<S>| {
        node.t() >= t && node.parent().is_some_and(|parent| tree[parent].t() < t)
    };
    tree.leaves_with(tree.root(), crosses)
        .map(|index| {
            let node = &tree[index];
            if node.t() == t {
                Ok(index)
            } else {
                node.parent()
                    .ok_or(PostProcessError::Tree(TreeError::RootOperation(node.id())))
            }
        })
        .collect()
}
