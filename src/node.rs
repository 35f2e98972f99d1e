//! AND/OR node store
//!
//! All nodes for one search session live in a single arena and are
//! addressed by copyable handles. Forward edges (`children`, `left`,
//! `right`) and back edges (`parents`) are handles into the same arena,
//! so one node being reachable through several committed splits carries
//! no ownership hazards. Nothing is freed individually; the whole store
//! drops with the session.
use std::fmt::{self, Debug};

/// Handle to an [`OrNode`] in a [`NodeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OrNodeId(pub(crate) usize);

/// Handle to an [`AndNode`] in a [`NodeStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AndNodeId(pub(crate) usize);

/// A decision point: one sample subset, reachable by any split sequence
/// that produces it. The engine chooses one outgoing split from here.
pub struct OrNode {
    /// Value of predicting the majority class here without splitting
    /// further. Fixed at creation.
    pub stop_value: f64,
    /// Best exact subtree value proven so far. Starts at `stop_value`
    /// and only ever increases.
    pub true_value: f64,
    /// Running sum of rollout values through this node.
    pub total_value_estimate: f64,
    /// Number of rollouts through this node.
    pub num_visits: usize,
    /// Accumulated rollout value per feature, counted anywhere in this
    /// node's explored subtree, not only when chosen here.
    pub action_value_sums: Vec<f64>,
    /// Visit count per feature, matching `action_value_sums`.
    pub action_visits: Vec<usize>,
    /// Committed splits out of this node, indexed by feature. Populated
    /// lazily on first exploration.
    pub children: Vec<Option<AndNodeId>>,
    /// Every committed split that adopted this node as a side.
    pub parents: Vec<AndNodeId>,
}

impl OrNode {
    /// Monte-Carlo value estimate: average rollout value so far.
    pub fn value_estimate(&self) -> f64 {
        if self.num_visits == 0 {
            0.0
        } else {
            self.total_value_estimate / self.num_visits as f64
        }
    }
}

/// A committed split: both resulting subsets must be solved.
pub struct AndNode {
    /// The feature split on.
    pub feature: usize,
    /// The decision point this split leaves from.
    pub parent: OrNodeId,
    /// Subset of samples without the feature.
    pub left: Option<OrNodeId>,
    /// Subset of samples with the feature.
    pub right: Option<OrNodeId>,
}

/// Arena owning every node of one search session.
pub struct NodeStore {
    or_nodes: Vec<OrNode>,
    and_nodes: Vec<AndNode>,
    num_features: usize,
}

impl NodeStore {
    /// Create an empty store for a session over `num_features` features.
    pub fn new(num_features: usize) -> Self {
        NodeStore {
            or_nodes: Vec::new(),
            and_nodes: Vec::new(),
            num_features,
        }
    }

    /// Allocate a fresh decision point with the given stop value.
    pub fn push_or_node(&mut self, stop_value: f64) -> OrNodeId {
        let id = OrNodeId(self.or_nodes.len());
        self.or_nodes.push(OrNode {
            stop_value,
            true_value: stop_value,
            total_value_estimate: 0.0,
            num_visits: 0,
            action_value_sums: vec![0.0; self.num_features],
            action_visits: vec![0; self.num_features],
            children: vec![None; self.num_features],
            parents: Vec::new(),
        });
        id
    }

    /// Allocate a committed split leaving `parent` on `feature`, with both
    /// sides still unexpanded.
    pub fn push_and_node(&mut self, parent: OrNodeId, feature: usize) -> AndNodeId {
        let id = AndNodeId(self.and_nodes.len());
        self.and_nodes.push(AndNode {
            feature,
            parent,
            left: None,
            right: None,
        });
        id
    }

    pub fn or_node(&self, id: OrNodeId) -> &OrNode {
        &self.or_nodes[id.0]
    }

    pub fn or_node_mut(&mut self, id: OrNodeId) -> &mut OrNode {
        &mut self.or_nodes[id.0]
    }

    pub fn and_node(&self, id: AndNodeId) -> &AndNode {
        &self.and_nodes[id.0]
    }

    pub fn and_node_mut(&mut self, id: AndNodeId) -> &mut AndNode {
        &mut self.and_nodes[id.0]
    }

    /// Number of decision points allocated so far.
    pub fn num_or_nodes(&self) -> usize {
        self.or_nodes.len()
    }

    /// Number of committed splits allocated so far.
    pub fn num_and_nodes(&self) -> usize {
        self.and_nodes.len()
    }

    /// Iterate over every decision point with its handle.
    pub fn or_nodes(&self) -> impl Iterator<Item = (OrNodeId, &OrNode)> {
        self.or_nodes.iter().enumerate().map(|(i, n)| (OrNodeId(i), n))
    }

    /// Iterate over every committed split with its handle.
    pub fn and_nodes(&self) -> impl Iterator<Item = (AndNodeId, &AndNode)> {
        self.and_nodes.iter().enumerate().map(|(i, n)| (AndNodeId(i), n))
    }
}

impl Debug for OrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrNode")
            .field("stop_value", &self.stop_value)
            .field("true_value", &self.true_value)
            .field("num_visits", &self.num_visits)
            .finish()
    }
}
