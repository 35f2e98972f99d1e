//! Output decision tree
//!
//! The materialized result of a search: a flat node table with a
//! human-readable `Display` and a JSON form.
use crate::errors::MctreeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// A single node of the output tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub num: usize,
    pub depth: usize,
    pub split_feature: usize,
    pub left_child: usize,
    pub right_child: usize,
    pub is_leaf: bool,
}

impl TreeNode {
    pub fn new_leaf(num: usize, depth: usize) -> Self {
        TreeNode {
            num,
            depth,
            split_feature: 0,
            left_child: 0,
            right_child: 0,
            is_leaf: true,
        }
    }

    pub fn new_split(num: usize, depth: usize, split_feature: usize, left_child: usize, right_child: usize) -> Self {
        TreeNode {
            num,
            depth,
            split_feature,
            left_child,
            right_child,
            is_leaf: false,
        }
    }
}

/// The winning decision tree of a search session. Node 0 is the root.
/// The node table is ordered by node number so the serialized form is
/// identical across runs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: BTreeMap<usize, TreeNode>,
    pub depth: usize,
    pub n_leaves: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: BTreeMap::new(),
            depth: 0,
            n_leaves: 0,
        }
    }

    /// Add a node, keeping the depth and leaf-count summaries current.
    pub fn add_node(&mut self, node: TreeNode) {
        self.depth = self.depth.max(node.depth);
        if node.is_leaf {
            self.n_leaves += 1;
        }
        self.nodes.insert(node.num, node);
    }

    /// Serialize the tree to JSON.
    pub fn json_dump(&self) -> Result<String, MctreeError> {
        serde_json::to_string(self).map_err(|e| MctreeError::UnableToWrite(e.to_string()))
    }

    /// Restore a tree from its JSON form.
    pub fn from_json(json_str: &str) -> Result<Self, MctreeError> {
        serde_json::from_str(json_str).map_err(|e| MctreeError::UnableToRead(e.to_string()))
    }
}

impl Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf {
            write!(f, "{}:leaf", self.num)
        } else {
            write!(
                f,
                "{}:[f{}] no={},yes={}",
                self.num, self.split_feature, self.left_child, self.right_child
            )
        }
    }
}

impl Display for Tree {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<usize> = vec![0];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let node = &self.nodes[&idx];
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node).as_str();
            if !node.is_leaf {
                print_buffer.push(node.right_child);
                print_buffer.push(node.left_child);
            }
        }
        write!(f, "{}", r)
    }
}
