//! Hierarchical point clustering for interactive maps.
//!
//! [`ClusterIndex`] is built once from a full set of located items and answers
//! per-viewport queries without rebuilding. Items are merged into aggregates when
//! they fall within a pixel radius of each other at a given integer zoom.

pub mod error;
pub mod index;
pub mod kdtree;
pub mod node;
pub mod options;

pub use error::*;
pub use index::*;
pub use node::*;
pub use options::*;
