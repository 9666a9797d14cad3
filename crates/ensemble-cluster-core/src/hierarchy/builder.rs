//! Hierarchy over cluster representative points.

use crate::config::HierarchyConfig;
use crate::error::{EnsembleResult, InputError};
use crate::labels::{cluster_sizes, validate_labels, ClusterLabel};
use crate::linkage::{agglomerate, DistanceMatrix};
use crate::matrix::{reduce, FeatureMatrix};
use crate::metrics::median;

use super::tree::ClusterHierarchy;

/// Builds a [`ClusterHierarchy`] over the non-negative clusters of a
/// partition.
///
/// Each cluster is represented by the coordinate-wise median of its members
/// over the `n_dims` most dispersed features (ranked by `reduce`). Raw counts
/// are log-transformed first. Samples labeled -1 take no part.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    config: HierarchyConfig,
}

impl HierarchyBuilder {
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` for a ranking reduction to 0
    /// dimensions.
    pub fn new(config: HierarchyConfig) -> EnsembleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Representative point of every cluster, by ascending label.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the partition length differs from the sample
    /// count or holds a label below -1.
    pub fn representatives(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
    ) -> EnsembleResult<Vec<(ClusterLabel, Vec<f64>)>> {
        if partition.len() != matrix.n_samples() {
            return Err(InputError::dimension_mismatch(matrix.n_samples(), partition.len()).into());
        }
        validate_labels(partition)?;

        let reduced = reduce(&matrix.transformed(), self.config.reduce, self.config.n_dims)?;
        let d = reduced.n_features();

        Ok(cluster_sizes(partition)
            .into_keys()
            .map(|label| {
                let members: Vec<usize> = partition
                    .iter()
                    .enumerate()
                    .filter(|(_, &l)| l == label)
                    .map(|(s, _)| s)
                    .collect();
                let point = (0..d)
                    .map(|f| {
                        let values: Vec<f64> = members.iter().map(|&s| reduced.get(s, f)).collect();
                        median(&values)
                    })
                    .collect();
                (label, point)
            })
            .collect())
    }

    /// Build the hierarchy.
    ///
    /// Leaves are the clusters in ascending label order.
    pub fn build(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
    ) -> EnsembleResult<ClusterHierarchy> {
        let representatives = self.representatives(matrix, partition)?;
        let (labels, points): (Vec<ClusterLabel>, Vec<Vec<f64>>) = representatives.into_iter().unzip();

        if labels.is_empty() {
            tracing::warn!("partition has no clusters, hierarchy is empty");
        }

        let distances = DistanceMatrix::from_points(&points, self.config.metric);
        let dendrogram = agglomerate(&distances, self.config.linkage);
        let tree = ClusterHierarchy::from_dendrogram(labels, &dendrogram)?;

        tracing::info!(
            leaves = tree.n_leaves(),
            internal = tree.n_internal(),
            dims = points.first().map_or(0, Vec::len),
            metric = %self.config.metric,
            linkage = self.config.linkage.as_str(),
            "cluster hierarchy built"
        );
        for node in tree.internal_nodes() {
            tracing::debug!(node = node.id, height = node.height, leaves = ?node.leaves, "hierarchy node");
        }
        Ok(tree)
    }
}
