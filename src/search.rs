//! Search engine
//!
//! Best-first exploration of the feature-split space: a recursive
//! selection/expansion/backpropagation pass (`find_tree`) over the shared
//! AND/OR graph, breadth-first propagation of proven-value improvements
//! across every parent of a shared node, and the final readout of the
//! winning tree from the proven values.
use crate::cache::{BitsetCache, NodeCache};
use crate::config::SearchConfig;
use crate::constants::RECONSTRUCTION_TOLERANCE;
use crate::data::{Matrix, TrainingData};
use crate::errors::MctreeError;
use crate::node::{AndNodeId, NodeStore, OrNodeId};
use crate::scoring;
use crate::subproblem::Subproblem;
use crate::tree::{Tree, TreeNode};
use hashbrown::HashSet;
use log::{debug, warn};
use std::collections::VecDeque;

/// The result of a search: the winning tree in its textual form.
pub struct Solution {
    pub tree: String,
}

/// Run a full search session over a binary feature matrix and label
/// vector, returning the serialized winning tree.
pub fn search(features: Matrix<'_, bool>, labels: &[bool], config: &SearchConfig) -> Result<Solution, MctreeError> {
    let data = TrainingData::new(features, labels)?;
    let mut session = TreeSearch::new(&data, config)?;
    let tree = session.search()?;
    Ok(Solution { tree: tree.to_string() })
}

/// One search session: the node store, the subset cursor, the subset
/// cache, and the root decision point. All state is discarded when the
/// session drops.
pub struct TreeSearch<'a> {
    data: &'a TrainingData<'a>,
    cfg: SearchConfig,
    subproblem: Subproblem<'a>,
    cache: BitsetCache,
    store: NodeStore,
    root: OrNodeId,
}

impl<'a> TreeSearch<'a> {
    /// Set up a session: validate the configuration, position the cursor
    /// at the full sample set and allocate the root node.
    pub fn new(data: &'a TrainingData<'a>, config: &SearchConfig) -> Result<Self, MctreeError> {
        config.validate()?;
        let subproblem = Subproblem::new(data);
        let mut store = NodeStore::new(data.num_features());
        let stop = scoring::stop_value(
            subproblem.label_counts(),
            data.num_negative_labels(),
            data.num_positive_labels(),
        );
        let root = store.push_or_node(stop);
        Ok(TreeSearch {
            data,
            cfg: *config,
            subproblem,
            cache: BitsetCache::with_capacity(data.num_samples()),
            store,
            root,
        })
    }

    /// Run the configured number of expansion iterations from the root,
    /// then reconstruct the winning tree. Zero iterations yield a single
    /// leaf.
    pub fn search(&mut self) -> Result<Tree, MctreeError> {
        for _ in 0..self.cfg.num_expansions {
            self.find_tree(self.root);
        }
        let root = self.store.or_node(self.root);
        debug!(
            "root: true_value={:.6} stop_value={:.6} value_estimate={:.6} num_visits={} or_nodes={} and_nodes={}",
            root.true_value,
            root.stop_value,
            root.value_estimate(),
            root.num_visits,
            self.store.num_or_nodes(),
            self.store.num_and_nodes()
        );
        self.build_tree()
    }

    /// One rollout: select a split by UCB1, expand lazily, recurse into
    /// both sides, and return the node's running average value together
    /// with every (feature, value) contribution observed below it. The
    /// contribution list is what feeds the RAVE statistics of every node
    /// on the path.
    fn find_tree(&mut self, id: OrNodeId) -> (f64, Vec<(usize, f64)>) {
        self.store.or_node_mut(id).num_visits += 1;

        let valid_splits = self.subproblem.valid_splits();

        // stop if no valid splits or first visit
        if self.store.or_node(id).num_visits == 1 || valid_splits.is_empty() {
            return self.stop_rollout(id);
        }

        let scores = self.valid_split_scores(id, &valid_splits);
        let mut best_index = 0;
        for (i, &score) in scores.iter().enumerate() {
            if score > scores[best_index] {
                best_index = i;
            }
        }
        let best_score = scores[best_index];
        let best_split = valid_splits[best_index];

        // stop if better than splitting
        if best_score < self.store.or_node(id).stop_value {
            return self.stop_rollout(id);
        }

        let split_id = match self.store.or_node(id).children[best_split] {
            Some(split_id) => split_id,
            None => {
                let split_id = self.store.push_and_node(id, best_split);
                self.store.or_node_mut(id).children[best_split] = Some(split_id);
                split_id
            }
        };

        let (left_value, left_actions) = self.descend(split_id, best_split, false);
        let (right_value, right_actions) = self.descend(split_id, best_split, true);

        let value = left_value + right_value - self.cfg.sparsity;
        self.store.or_node_mut(id).total_value_estimate += value;

        let split = self.store.and_node(split_id);
        if let (Some(left_id), Some(right_id)) = (split.left, split.right) {
            let candidate =
                self.store.or_node(left_id).true_value + self.store.or_node(right_id).true_value - self.cfg.sparsity;
            if candidate > self.store.or_node(id).true_value {
                self.store.or_node_mut(id).true_value = candidate;
                propagate_improvement(&mut self.store, id, self.cfg.sparsity);
            }
        }

        let mut action_values = Vec::with_capacity(1 + left_actions.len() + right_actions.len());
        action_values.push((best_split, value));
        action_values.extend(left_actions);
        action_values.extend(right_actions);

        let node = self.store.or_node_mut(id);
        for &(feature, action_value) in &action_values {
            node.action_value_sums[feature] += action_value;
            node.action_visits[feature] += 1;
        }

        (node.total_value_estimate / node.num_visits as f64, action_values)
    }

    /// End the rollout at this node, scoring it as a leaf.
    fn stop_rollout(&mut self, id: OrNodeId) -> (f64, Vec<(usize, f64)>) {
        let node = self.store.or_node_mut(id);
        node.total_value_estimate += node.stop_value;
        (node.total_value_estimate / node.num_visits as f64, Vec::new())
    }

    /// UCB1 score for every valid split at this node.
    fn valid_split_scores(&self, id: OrNodeId, valid_splits: &[usize]) -> Vec<f64> {
        let node = self.store.or_node(id);
        let mut split_visits = Vec::with_capacity(valid_splits.len());
        let mut split_values = Vec::with_capacity(valid_splits.len());
        let mut rave_values = Vec::with_capacity(valid_splits.len());
        for &feature in valid_splits {
            let mut rave = node.action_value_sums[feature];
            if node.action_visits[feature] > 0 {
                rave /= node.action_visits[feature] as f64;
            }
            let mut visits = 0;
            let mut value = 0.0;
            if let Some(split_id) = node.children[feature] {
                let split = self.store.and_node(split_id);
                for side in [split.left, split.right].into_iter().flatten() {
                    let child = self.store.or_node(side);
                    visits += child.num_visits;
                    if child.num_visits > 0 {
                        value += child.value_estimate();
                    }
                }
            }
            value -= self.cfg.sparsity;
            split_visits.push(visits);
            split_values.push(value);
            rave_values.push(rave);
        }
        scoring::ucb1_scores(
            node.num_visits,
            &split_visits,
            &split_values,
            &rave_values,
            scoring::beta(node.num_visits, self.cfg.k),
            self.cfg.exploration,
        )
    }

    /// Move the cursor down one side of a committed split, resolving the
    /// side's decision point through the cache on first expansion, recurse,
    /// and restore the cursor before returning.
    fn descend(&mut self, split_id: AndNodeId, feature: usize, branch: bool) -> (f64, Vec<(usize, f64)>) {
        self.subproblem.apply_split(feature, branch);

        let slot = {
            let split = self.store.and_node(split_id);
            if branch {
                split.right
            } else {
                split.left
            }
        };
        let child = match slot {
            Some(child) => child,
            None => {
                let child = match self.cache.get(self.subproblem.key()) {
                    Some(cached) => cached,
                    None => {
                        let stop = scoring::stop_value(
                            self.subproblem.label_counts(),
                            self.data.num_negative_labels(),
                            self.data.num_positive_labels(),
                        );
                        let fresh = self.store.push_or_node(stop);
                        self.cache.put(self.subproblem.key(), fresh);
                        fresh
                    }
                };
                self.store.or_node_mut(child).parents.push(split_id);
                let split = self.store.and_node_mut(split_id);
                if branch {
                    split.right = Some(child);
                } else {
                    split.left = Some(child);
                }
                child
            }
        };

        let result = self.find_tree(child);
        self.subproblem.revert_split();
        result
    }

    /// Materialize the winning tree by walking the proven values. The
    /// cursor must be back at the root subset, which it always is after
    /// the expansion loop.
    fn build_tree(&mut self) -> Result<Tree, MctreeError> {
        if self.subproblem.depth() != 0 {
            return Err(MctreeError::InconsistentState(format!(
                "cursor still {} splits deep at reconstruction",
                self.subproblem.depth()
            )));
        }
        let mut tree = Tree::new();
        let mut next_num = 0;
        self.build_tree_node(self.root, 0, &mut tree, &mut next_num)?;
        Ok(tree)
    }

    fn build_tree_node(
        &mut self,
        id: OrNodeId,
        depth: usize,
        tree: &mut Tree,
        next_num: &mut usize,
    ) -> Result<usize, MctreeError> {
        let num = *next_num;
        *next_num += 1;

        // re-derive the stop value from the subset the cursor is actually
        // at, so a cache mixup surfaces instead of being trusted
        let derived = scoring::stop_value(
            self.subproblem.label_counts(),
            self.data.num_negative_labels(),
            self.data.num_positive_labels(),
        );
        let (stop_value, true_value) = {
            let node = self.store.or_node(id);
            (node.stop_value, node.true_value)
        };
        if (derived - stop_value).abs() > RECONSTRUCTION_TOLERANCE {
            warn!(
                "node stop value {} disagrees with the value {} derived from its subset",
                stop_value, derived
            );
        }

        // no possible splits, return a leaf
        if true_value == stop_value {
            tree.add_node(TreeNode::new_leaf(num, depth));
            return Ok(num);
        }

        let mut best_value = stop_value;
        let mut best: Option<(usize, OrNodeId, OrNodeId)> = None;
        {
            let node = self.store.or_node(id);
            for (feature, split_id) in node.children.iter().enumerate() {
                let Some(split_id) = split_id else { continue };
                let split = self.store.and_node(*split_id);
                let (Some(left_id), Some(right_id)) = (split.left, split.right) else {
                    continue;
                };
                let value = self.store.or_node(left_id).true_value + self.store.or_node(right_id).true_value
                    - self.cfg.sparsity;
                if value > best_value {
                    best_value = value;
                    best = Some((feature, left_id, right_id));
                }
            }
        }

        let Some((feature, left_id, right_id)) = best else {
            tree.add_node(TreeNode::new_leaf(num, depth));
            return Ok(num);
        };

        if (best_value - true_value).abs() > RECONSTRUCTION_TOLERANCE {
            warn!(
                "best reconstructed value {} disagrees with recorded true value {}",
                best_value, true_value
            );
        }

        self.subproblem.apply_split(feature, false);
        let left = self.build_tree_node(left_id, depth + 1, tree, next_num);
        self.subproblem.revert_split();
        let left_num = left?;

        self.subproblem.apply_split(feature, true);
        let right = self.build_tree_node(right_id, depth + 1, tree, next_num);
        self.subproblem.revert_split();
        let right_num = right?;

        tree.add_node(TreeNode::new_split(num, depth, feature, left_num, right_num));
        Ok(num)
    }
}

/// Push a proven-value improvement at `start` to every ancestor that can
/// benefit, breadth-first over the parent back-edges. The visited set
/// keeps shared nodes from being reprocessed; the parent direction is
/// acyclic, so the walk terminates.
fn propagate_improvement(store: &mut NodeStore, start: OrNodeId, sparsity: f64) {
    let mut queue: VecDeque<(OrNodeId, Option<usize>)> = VecDeque::new();
    let mut visited: HashSet<OrNodeId> = HashSet::new();
    queue.push_back((start, None));
    visited.insert(start);

    while let Some((id, action)) = queue.pop_front() {
        let mut queue_parents = action.is_none();
        if let Some(feature) = action {
            let Some(split_id) = store.or_node(id).children[feature] else {
                continue;
            };
            let split = store.and_node(split_id);
            let (Some(left_id), Some(right_id)) = (split.left, split.right) else {
                continue;
            };
            let updated = store.or_node(left_id).true_value + store.or_node(right_id).true_value - sparsity;
            if updated > store.or_node(id).true_value {
                store.or_node_mut(id).true_value = updated;
                queue_parents = true;
            }
        }

        if queue_parents {
            let parent_links: Vec<(OrNodeId, usize)> = store
                .or_node(id)
                .parents
                .iter()
                .map(|&split_id| {
                    let split = store.and_node(split_id);
                    (split.parent, split.feature)
                })
                .collect();
            for (parent, feature) in parent_links {
                if visited.insert(parent) {
                    queue.push_back((parent, Some(feature)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_expansions: usize) -> SearchConfig {
        SearchConfig {
            exploration: 1.0,
            num_expansions,
            sparsity: 0.01,
            k: 1.0,
        }
    }

    // one feature that perfectly separates two positives from two negatives
    fn separable() -> (Vec<bool>, Vec<bool>, usize) {
        (
            vec![false, false, true, true],
            vec![false, false, true, true],
            1,
        )
    }

    // labels independent of the single feature, so splitting never pays
    fn unhelpful() -> (Vec<bool>, Vec<bool>, usize) {
        (
            vec![false, true, false, true],
            vec![false, false, true, true],
            1,
        )
    }

    // xor labels over two features, so a good tree needs both
    fn xor() -> (Vec<bool>, Vec<bool>, usize) {
        (
            vec![false, true, false, true, false, false, true, true],
            vec![false, true, true, false],
            2,
        )
    }

    #[test]
    fn test_perfect_split_found() {
        let (f, y, cols) = separable();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(50)).unwrap();
        let tree = session.search().unwrap();

        assert_eq!(tree.n_leaves, 2);
        assert_eq!(tree.depth, 1);
        assert!(!tree.nodes[&0].is_leaf);
        assert_eq!(tree.nodes[&0].split_feature, 0);

        let root = session.store.or_node(session.root);
        assert!((root.true_value - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_zero_budget_yields_single_leaf() {
        let (f, y, cols) = separable();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(0)).unwrap();
        let tree = session.search().unwrap();

        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.nodes[&0].is_leaf);
        // the implied value is the majority-class stop value
        assert!((session.store.or_node(session.root).stop_value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unhelpful_feature_yields_leaf() {
        let (f, y, cols) = unhelpful();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(50)).unwrap();
        let tree = session.search().unwrap();

        assert_eq!(tree.n_leaves, 1);
        let root = session.store.or_node(session.root);
        assert_eq!(root.true_value, root.stop_value);
    }

    #[test]
    fn test_deterministic_output() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();

        let mut first = TreeSearch::new(&data, &config(200)).unwrap();
        let tree_a = first.search().unwrap();
        let mut second = TreeSearch::new(&data, &config(200)).unwrap();
        let tree_b = second.search().unwrap();

        assert_eq!(tree_a.to_string(), tree_b.to_string());
        assert_eq!(tree_a.json_dump().unwrap(), tree_b.json_dump().unwrap());
    }

    #[test]
    fn test_true_value_is_monotone() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(0)).unwrap();

        let mut previous = session.store.or_node(session.root).true_value;
        for _ in 0..200 {
            session.find_tree(session.root);
            let current = session.store.or_node(session.root).true_value;
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_true_value_never_below_stop_value() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(200)).unwrap();
        session.search().unwrap();

        for (_, node) in session.store.or_nodes() {
            assert!(node.true_value >= node.stop_value - 1e-12);
        }
    }

    #[test]
    fn test_xor_needs_both_features() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(500)).unwrap();
        let tree = session.search().unwrap();

        // the full xor tree: one root split, two splits below, four leaves
        assert_eq!(tree.depth, 2);
        assert_eq!(tree.n_leaves, 4);
        let root = session.store.or_node(session.root);
        // four pure leaves worth 0.25 each, three splits paid for
        assert!((root.true_value - (1.0 - 3.0 * 0.01)).abs() < 1e-9);
    }

    #[test]
    fn test_equivalent_subsets_share_one_node() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(300)).unwrap();
        session.search().unwrap();

        // the subset without either feature is reachable through two split
        // orders; both must resolve to the same node instance
        session.subproblem.apply_split(0, false);
        session.subproblem.apply_split(1, false);
        let via_first = session.cache.get(session.subproblem.key());
        session.subproblem.revert_split();
        session.subproblem.revert_split();

        session.subproblem.apply_split(1, false);
        session.subproblem.apply_split(0, false);
        let via_second = session.cache.get(session.subproblem.key());
        session.subproblem.revert_split();
        session.subproblem.revert_split();

        let shared = via_first.expect("subset was never expanded");
        assert_eq!(via_first, via_second);
        // adopted by a committed split under each order
        assert_eq!(session.store.or_node(shared).parents.len(), 2);
    }

    #[test]
    fn test_store_counts_match_explored_graph() {
        let (f, y, cols) = separable();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(50)).unwrap();
        session.search().unwrap();

        // one feature: the root, one committed split, and its two sides
        assert_eq!(session.store.num_or_nodes(), 3);
        assert_eq!(session.store.num_and_nodes(), 1);
        assert_eq!(session.cache.len(), 2);
    }

    #[test]
    fn test_parent_edges_mirror_child_edges() {
        let (f, y, cols) = xor();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let mut session = TreeSearch::new(&data, &config(300)).unwrap();
        session.search().unwrap();

        for (split_id, split) in session.store.and_nodes() {
            assert_eq!(
                session.store.or_node(split.parent).children[split.feature],
                Some(split_id)
            );
            for side in [split.left, split.right].into_iter().flatten() {
                assert!(session.store.or_node(side).parents.contains(&split_id));
            }
        }
    }

    #[test]
    fn test_propagation_reaches_every_parent_of_a_shared_node() {
        let mut store = NodeStore::new(2);
        let first_parent = store.push_or_node(0.5);
        let second_parent = store.push_or_node(0.5);
        let shared = store.push_or_node(0.2);
        let left_only = store.push_or_node(0.2);
        let right_only = store.push_or_node(0.2);

        let first_split = store.push_and_node(first_parent, 0);
        store.or_node_mut(first_parent).children[0] = Some(first_split);
        store.and_node_mut(first_split).left = Some(shared);
        store.and_node_mut(first_split).right = Some(left_only);
        store.or_node_mut(shared).parents.push(first_split);
        store.or_node_mut(left_only).parents.push(first_split);

        let second_split = store.push_and_node(second_parent, 1);
        store.or_node_mut(second_parent).children[1] = Some(second_split);
        store.and_node_mut(second_split).left = Some(shared);
        store.and_node_mut(second_split).right = Some(right_only);
        store.or_node_mut(shared).parents.push(second_split);
        store.or_node_mut(right_only).parents.push(second_split);

        store.or_node_mut(shared).true_value = 0.9;
        propagate_improvement(&mut store, shared, 0.0);

        assert!((store.or_node(first_parent).true_value - 1.1).abs() < 1e-12);
        assert!((store.or_node(second_parent).true_value - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_propagation_skips_non_improving_parents() {
        let mut store = NodeStore::new(1);
        let parent = store.push_or_node(0.5);
        let left = store.push_or_node(0.3);
        let right = store.push_or_node(0.3);
        let split = store.push_and_node(parent, 0);
        store.or_node_mut(parent).children[0] = Some(split);
        store.and_node_mut(split).left = Some(left);
        store.and_node_mut(split).right = Some(right);
        store.or_node_mut(left).parents.push(split);
        store.or_node_mut(right).parents.push(split);
        store.or_node_mut(parent).true_value = 0.95;

        // 0.35 + 0.3 - 0.0 is below the parent's proven 0.95
        store.or_node_mut(left).true_value = 0.35;
        propagate_improvement(&mut store, left, 0.0);
        assert!((store.or_node(parent).true_value - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_configuration_rejected_before_search() {
        let (f, y, cols) = separable();
        let m = Matrix::new(&f, 4, cols);
        let data = TrainingData::new(m, &y).unwrap();
        let bad = SearchConfig {
            exploration: -1.0,
            ..SearchConfig::default()
        };
        assert!(TreeSearch::new(&data, &bad).is_err());
    }

    #[test]
    fn test_entry_point_returns_serialized_tree() {
        let (f, y, cols) = separable();
        let m = Matrix::new(&f, 4, cols);
        let solution = search(m, &y, &config(50)).unwrap();
        let lines: Vec<&str> = solution.tree.lines().collect();
        assert_eq!(lines[0], "0:[f0] no=1,yes=2");
        assert_eq!(lines.len(), 3);
    }
}
