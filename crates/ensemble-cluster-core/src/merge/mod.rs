//! Hierarchical merging of consensus clusters.
//!
//! Internal nodes of the consensus [`ClusterHierarchy`](crate::hierarchy::ClusterHierarchy)
//! are resolved lowest first. Each compares the samples under its two
//! children through the injected differential-test provider; siblings the
//! provider cannot separate at `merge_cutoff` are merged. The result is
//! always a coarsening of the consensus partition.

mod correction;
mod merger;
mod state;

#[cfg(test)]
mod tests;

pub use correction::benjamini_hochberg;
pub use merger::{HierarchicalMerger, MergeOutcome};
pub use state::{MergeDecision, MergeMethod, NodeState};
