use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::base::NodeIndex;
use crate::errors::PostProcessError;
use crate::tree::{Event, LineageTree};

/// How survivors are chosen for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Exactly `n` survivors, drawn without replacement.
    Count(usize),
    /// Each survivor independently with probability `p`.
    Probability(f64),
}

/// Mark survivors as sampled according to `scheme`.
///
/// Chosen leaves get the `sampling` event. The tree is then flagged as
/// sampled, whether or not any leaf was chosen. Returns the number of
/// sampled leaves.
pub fn sample_survivors<S, R>(
    tree: &mut LineageTree<S>,
    scheme: Sampling,
    rng: &mut R,
) -> Result<usize, PostProcessError>
where
    R: Rng + ?Sized,
{
    if tree.is_sampled() {
        return Err(PostProcessError::AlreadySampled(tree.root_node().id()));
    }
    let survivors: Vec<NodeIndex> = tree
        .leaves(tree.root())
        .filter(|&leaf| tree[leaf].event() == Some(Event::Survival))
        .collect();

    let chosen: Vec<NodeIndex> = match scheme {
        Sampling::Count(n) => {
            if n > survivors.len() {
                return Err(PostProcessError::InvalidArgument(format!(
                    "cannot sample {n} leaves from {} survivors",
                    survivors.len()
                )));
            }
            rand::seq::index::sample(rng, survivors.len(), n)
                .into_iter()
                .map(|i| survivors[i])
                .collect()
        }
        Sampling::Probability(p) => {
            if !(0.0..=1.0).contains(&p) {
                return Err(PostProcessError::InvalidArgument(format!(
                    "sampling probability {p} must be between 0.0 and 1.0"
                )));
            }
            survivors
                .into_iter()
                .filter(|_| rng.random_bool(p))
                .collect()
        }
    };

    for &leaf in &chosen {
        tree[leaf].set_event(Event::Sampling);
    }
    tree.mark_sampled();
    Ok(chosen.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// Root with `survivors` surviving and two dead children.
    fn tree_with_survivors(survivors: usize) -> LineageTree<f64> {
        let mut tree = LineageTree::new(0.0, 0.0);
        let root = tree.root();
        for i in 0..survivors {
            let leaf = tree.add_new_child(root, 1.0, i as f64).unwrap();
            tree[leaf].set_event(Event::Survival);
        }
        for _ in 0..2 {
            let leaf = tree.add_new_child(root, 0.5, -1.0).unwrap();
            tree[leaf].set_event(Event::Death);
        }
        tree
    }

    #[test]
    fn test_sample_count_without_replacement() {
        let mut tree = tree_with_survivors(10);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let n = sample_survivors(&mut tree, Sampling::Count(4), &mut rng).unwrap();
        assert_eq!(n, 4);
        assert_eq!(tree.count_leaves(Event::Sampling), 4);
        assert_eq!(tree.count_leaves(Event::Survival), 6);
        assert_eq!(tree.count_leaves(Event::Death), 2);
        assert!(tree.is_sampled());
    }

    #[test]
    fn test_sample_probability_one_takes_all_survivors() {
        let mut tree = tree_with_survivors(7);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        sample_survivors(&mut tree, Sampling::Probability(1.0), &mut rng).unwrap();
        assert_eq!(tree.count_leaves(Event::Sampling), 7);
        assert_eq!(tree.count_leaves(Event::Survival), 0);
    }

    #[test]
    fn test_sample_probability_zero_still_marks_sampled() {
        let mut tree = tree_with_survivors(3);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let n = sample_survivors(&mut tree, Sampling::Probability(0.0), &mut rng).unwrap();
        assert_eq!(n, 0);
        assert!(tree.is_sampled());
    }

    #[test]
    fn test_double_sampling_fails() {
        let mut tree = tree_with_survivors(3);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        sample_survivors(&mut tree, Sampling::Count(1), &mut rng).unwrap();
        let err = sample_survivors(&mut tree, Sampling::Count(1), &mut rng).unwrap_err();
        assert!(matches!(err, PostProcessError::AlreadySampled(_)));
        assert_eq!(tree.count_leaves(Event::Sampling), 1);
    }

    #[test]
    fn test_invalid_arguments_leave_tree_unsampled() {
        let mut tree = tree_with_survivors(3);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert!(matches!(
            sample_survivors(&mut tree, Sampling::Count(4), &mut rng),
            Err(PostProcessError::InvalidArgument(_))
        ));
        assert!(matches!(
            sample_survivors(&mut tree, Sampling::Probability(1.5), &mut rng),
            Err(PostProcessError::InvalidArgument(_))
        ));
        assert!(!tree.is_sampled());
    }
}
