//! Consensus partition and the cut that produced it.

use serde::{Deserialize, Serialize};

use crate::labels::{num_clusters, ClusterLabel, PartitionSummary, UnassignedReason};

/// How the consensus tree is cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusCut {
    /// Group samples that co-cluster in at least this fraction of labelings.
    Proportion(f64),
    /// Cut to exactly this many groups (before size filtering).
    Count(usize),
}

/// Consensus labels with a reason for every -1.
///
/// Non-negative labels are contiguous from 0, largest cluster first; equal
/// sizes are numbered by first appearance in sample order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusPartition {
    labels: Vec<ClusterLabel>,
    reasons: Vec<UnassignedReason>,
    cut: ConsensusCut,
    labelings_used: usize,
}

impl ConsensusPartition {
    pub(crate) fn new(
        labels: Vec<ClusterLabel>,
        reasons: Vec<UnassignedReason>,
        cut: ConsensusCut,
        labelings_used: usize,
    ) -> Self {
        Self {
            labels,
            reasons,
            cut,
            labelings_used,
        }
    }

    /// Label per sample.
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.labels
    }

    /// Why each sample is (un)assigned.
    pub fn reasons(&self) -> &[UnassignedReason] {
        &self.reasons
    }

    pub fn cut(&self) -> ConsensusCut {
        self.cut
    }

    /// Number of labelings that contributed.
    pub fn labelings_used(&self) -> usize {
        self.labelings_used
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn num_clusters(&self) -> usize {
        num_clusters(&self.labels)
    }

    /// Samples carrying `reason`.
    pub fn count_reason(&self, reason: UnassignedReason) -> usize {
        self.reasons.iter().filter(|&&r| r == reason).count()
    }

    /// A single cluster or none at all.
    pub fn is_degenerate(&self) -> bool {
        self.num_clusters() <= 1
    }

    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary::from_labels(&self.labels)
    }
}
