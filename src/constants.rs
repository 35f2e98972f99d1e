/// UCB1 score handed to splits that have never been tried from a node,
/// so that untried splits are always preferred over scored ones.
pub const UNTRIED_SPLIT_SCORE: f64 = 1000.0;
/// Tolerance when comparing a reconstructed split value against the
/// value recorded during the search.
pub const RECONSTRUCTION_TOLERANCE: f64 = 1e-4;
/// Bits per block in the active-sample bitset.
pub const BLOCK_BITS: usize = 64;
