//! Errors
//!
//! Custom error types used throughout the `mctree` crate.
use thiserror::Error;

/// Errors that can occur while setting up or running a tree search.
#[derive(Debug, Error)]
pub enum MctreeError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// The dataset contains no samples.
    #[error("The dataset contains no samples.")]
    NoSamples,
    /// The dataset contains no features.
    #[error("The dataset contains no features.")]
    NoFeatures,
    /// Every label belongs to a single class.
    #[error("Every label belongs to the {0} class; the search needs both classes present.")]
    MissingClass(String),
    /// The search state disagrees with itself during tree reconstruction.
    #[error("Inconsistent search state: {0}")]
    InconsistentState(String),
    /// Unable to serialize a tree.
    #[error("Unable to serialize tree: {0}")]
    UnableToWrite(String),
    /// Unable to deserialize a tree.
    #[error("Unable to deserialize tree: {0}")]
    UnableToRead(String),
}
