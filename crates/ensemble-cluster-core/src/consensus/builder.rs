//! Consensus extraction from a label matrix.

use crate::config::constants::consensus::CUT_TOLERANCE;
use crate::config::ConsensusConfig;
use crate::error::EnsembleResult;
use crate::labels::{renumber_by_size, ClusterLabel, LabelMatrix, UnassignedReason, NOISE_LABEL};
use crate::linkage::agglomerate;

use super::coclustering::CoClusterMatrix;
use super::partition::{ConsensusCut, ConsensusPartition};

/// Co-clustering matrix and the partition extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOutput {
    pub coclustering: CoClusterMatrix,
    pub partition: ConsensusPartition,
}

/// Builds a [`ConsensusPartition`] from a [`LabelMatrix`].
///
/// # Algorithm
///
/// 1. Count co-clustering over labelings with at least `min_assigned`
///    assigned samples
/// 2. Samples no counted labeling ever assigned become -1 (`NeverClustered`)
/// 3. Agglomerate the rest on `1 - co-clustering` with the configured linkage
/// 4. Cut at height `1 - combine_proportion`, or to `target_clusters` groups;
///    a singleton left by the proportion cut becomes -1 (`BelowProportion`)
/// 5. Groups smaller than `combine_min_size` become -1 (`BelowMinSize`)
/// 6. Renumber the survivors contiguously, largest first (ties by first
///    appearance), so the min-size filter never changes a surviving id
///
/// No randomness is involved: identical input gives an identical partition.
#[derive(Debug, Clone)]
pub struct ConsensusBuilder {
    config: ConsensusConfig,
}

impl ConsensusBuilder {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` if the config is out of range.
    pub fn new(config: ConsensusConfig) -> EnsembleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// The cut this builder applies.
    pub fn cut(&self) -> ConsensusCut {
        match self.config.target_clusters {
            Some(k) => ConsensusCut::Count(k),
            None => ConsensusCut::Proportion(self.config.combine_proportion),
        }
    }

    /// Compute the co-clustering matrix and extract the consensus.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` if `combine_min_size` or
    /// `target_clusters` exceed the number of samples. Nothing is computed
    /// in that case.
    pub fn build(&self, labels: &LabelMatrix) -> EnsembleResult<ConsensusOutput> {
        self.config.validate_for(labels.n_samples())?;

        tracing::info!(
            samples = labels.n_samples(),
            labelings = labels.len(),
            cut = ?self.cut(),
            min_size = self.config.combine_min_size,
            "building consensus"
        );

        let coclustering = CoClusterMatrix::from_labels(labels, self.config.min_assigned);
        let partition = self.extract(&coclustering);
        Ok(ConsensusOutput {
            coclustering,
            partition,
        })
    }

    /// Extract a partition from an already computed co-clustering matrix.
    pub fn extract(&self, coclustering: &CoClusterMatrix) -> ConsensusPartition {
        let n = coclustering.n_samples();
        let cut = self.cut();
        let used = coclustering.labelings_used().len();
        let mut labels: Vec<ClusterLabel> = vec![NOISE_LABEL; n];
        let mut reasons = vec![UnassignedReason::NeverClustered; n];

        let candidates: Vec<usize> = (0..n).filter(|&i| coclustering.ever_assigned(i)).collect();
        if candidates.is_empty() {
            tracing::warn!(
                samples = n,
                labelings_used = used,
                "no sample was ever assigned, consensus is empty"
            );
            return ConsensusPartition::new(labels, reasons, cut, used);
        }

        let dendrogram = agglomerate(&coclustering.dissimilarity(&candidates), self.config.linkage);
        let groups = match cut {
            ConsensusCut::Proportion(p) => dendrogram.cut_at_height(1.0 - p + CUT_TOLERANCE),
            ConsensusCut::Count(k) => dendrogram.cut_to_count(k),
        };

        let mut sizes = vec![0usize; candidates.len()];
        for &g in &groups {
            sizes[g] += 1;
        }

        for (&sample, &group) in candidates.iter().zip(&groups) {
            let size = sizes[group];
            reasons[sample] = if matches!(cut, ConsensusCut::Proportion(_)) && size == 1 {
                UnassignedReason::BelowProportion
            } else if size < self.config.combine_min_size {
                UnassignedReason::BelowMinSize
            } else {
                labels[sample] = group as ClusterLabel;
                UnassignedReason::Assigned
            };
        }

        let partition = ConsensusPartition::new(renumber_by_size(&labels), reasons, cut, used);
        tracing::info!(
            clusters = partition.num_clusters(),
            never_clustered = partition.count_reason(UnassignedReason::NeverClustered),
            below_proportion = partition.count_reason(UnassignedReason::BelowProportion),
            below_min_size = partition.count_reason(UnassignedReason::BelowMinSize),
            "consensus extracted"
        );
        if partition.is_degenerate() {
            tracing::warn!(
                clusters = partition.num_clusters(),
                "degenerate consensus"
            );
        }
        partition
    }
}

/// Build a consensus with the given configuration in one call.
pub fn build_consensus(labels: &LabelMatrix, config: &ConsensusConfig) -> EnsembleResult<ConsensusOutput> {
    ConsensusBuilder::new(config.clone())?.build(labels)
}
