// Modules
pub mod cache;
pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod node;
pub mod scoring;
pub mod search;
pub mod subproblem;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use config::SearchConfig;
pub use data::{Matrix, TrainingData};
pub use errors::MctreeError;
pub use search::{search, Solution, TreeSearch};
pub use tree::Tree;
