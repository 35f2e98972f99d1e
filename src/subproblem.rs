//! Subproblem cursor
//!
//! Tracks the sample subset the search is currently positioned at, as a
//! bitset over the dataset's samples. Splits are applied and reverted in
//! strictly nested order, mirroring the recursion of the search engine:
//! every `apply_split` must be undone by a matching `revert_split` before
//! the enclosing split is reverted.
use crate::constants::BLOCK_BITS;
use crate::data::TrainingData;

struct SplitFrame {
    feature: usize,
    saved_blocks: Vec<u64>,
}

/// The single mutable cursor threaded through the recursive search.
pub struct Subproblem<'a> {
    data: &'a TrainingData<'a>,
    /// Bitset over samples; a set bit means the sample is in the active subset.
    blocks: Vec<u64>,
    /// Per-feature bitsets: bit i set when sample i has the feature.
    feature_blocks: Vec<Vec<u64>>,
    /// Bit i set when sample i is labeled positive.
    label_blocks: Vec<u64>,
    path: Vec<SplitFrame>,
    used: Vec<bool>,
}

fn pack_bits<F: Fn(usize) -> bool>(num_samples: usize, bit: F) -> Vec<u64> {
    let num_blocks = num_samples.div_ceil(BLOCK_BITS);
    let mut blocks = vec![0u64; num_blocks];
    for i in 0..num_samples {
        if bit(i) {
            blocks[i / BLOCK_BITS] |= 1u64 << (i % BLOCK_BITS);
        }
    }
    blocks
}

impl<'a> Subproblem<'a> {
    /// Create a cursor positioned at the full sample set.
    pub fn new(data: &'a TrainingData<'a>) -> Self {
        let n = data.num_samples();
        let blocks = pack_bits(n, |_| true);
        let feature_blocks = (0..data.num_features())
            .map(|f| {
                let col = data.features.get_col(f);
                pack_bits(n, |i| col[i])
            })
            .collect();
        let label_blocks = pack_bits(n, |i| data.labels[i]);
        Subproblem {
            data,
            blocks,
            feature_blocks,
            label_blocks,
            path: Vec::new(),
            used: vec![false; data.num_features()],
        }
    }

    /// Number of samples in the active subset.
    pub fn active_count(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Negative and positive label counts of the active subset.
    pub fn label_counts(&self) -> (usize, usize) {
        let positive: usize = self
            .blocks
            .iter()
            .zip(self.label_blocks.iter())
            .map(|(b, l)| (b & l).count_ones() as usize)
            .sum();
        (self.active_count() - positive, positive)
    }

    /// Features eligible for splitting at the current subset: unused on the
    /// current path and actually partitioning the subset into two non-empty
    /// sides.
    pub fn valid_splits(&self) -> Vec<usize> {
        let active = self.active_count();
        (0..self.data.num_features())
            .filter(|&f| {
                if self.used[f] {
                    return false;
                }
                let with_feature: usize = self
                    .blocks
                    .iter()
                    .zip(self.feature_blocks[f].iter())
                    .map(|(b, m)| (b & m).count_ones() as usize)
                    .sum();
                with_feature > 0 && with_feature < active
            })
            .collect()
    }

    /// Restrict the active subset to the samples on one side of a split.
    /// `branch` selects the samples that have the feature.
    pub fn apply_split(&mut self, feature: usize, branch: bool) {
        let saved_blocks = self.blocks.clone();
        for (block, mask) in self.blocks.iter_mut().zip(self.feature_blocks[feature].iter()) {
            *block &= if branch { *mask } else { !*mask };
        }
        self.used[feature] = true;
        self.path.push(SplitFrame {
            feature,
            saved_blocks,
        });
    }

    /// Undo the most recent `apply_split`.
    pub fn revert_split(&mut self) {
        if let Some(frame) = self.path.pop() {
            self.blocks = frame.saved_blocks;
            self.used[frame.feature] = false;
        }
    }

    /// Identity of the active subset, used to key the node cache.
    pub fn key(&self) -> &[u64] {
        &self.blocks
    }

    /// Depth of the current split path.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}
