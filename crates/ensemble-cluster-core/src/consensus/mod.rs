//! Co-clustering consensus over a label matrix.
//!
//! [`CoClusterMatrix`] counts how often each pair of samples shares a
//! non-negative label. [`ConsensusBuilder`] turns it into a
//! [`ConsensusPartition`] by agglomerating `1 - co-clustering` and cutting
//! the tree.
//!
//! # Edge Cases
//!
//! - all labelings fully unassigned: every sample is -1 (`NeverClustered`)
//! - a consensus with one cluster or none is returned as is; callers report
//!   it as a warning, not an error

mod builder;
mod coclustering;
mod partition;

#[cfg(test)]
mod tests;

pub use builder::{build_consensus, ConsensusBuilder, ConsensusOutput};
pub use coclustering::CoClusterMatrix;
pub use partition::{ConsensusCut, ConsensusPartition};
