//! Cluster labels, labelings and partition summaries.
//!
//! A [`ClusterLabel`] is only meaningful inside the labeling that produced it.
//! The reserved value [`NOISE_LABEL`] (-1) marks a sample that is not assigned
//! to any reliable cluster; the cause is carried separately as an
//! [`UnassignedReason`] so the sentinel itself stays single-valued.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Integer cluster label. Non-negative values identify a cluster.
pub type ClusterLabel = i32;

/// Label for samples not assigned to any cluster.
pub const NOISE_LABEL: ClusterLabel = -1;

/// Why a sample carries [`NOISE_LABEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// The sample is assigned to a cluster.
    #[default]
    Assigned,
    /// No considered labeling ever assigned the sample.
    NeverClustered,
    /// The sample did not co-cluster with any other sample often enough.
    BelowProportion,
    /// The sample's cluster was smaller than the minimum size.
    BelowMinSize,
}

impl UnassignedReason {
    /// True unless the sample is assigned.
    #[inline]
    pub fn is_unassigned(&self) -> bool {
        !matches!(self, Self::Assigned)
    }
}

/// Check whether a label marks noise.
#[inline]
pub fn is_noise(label: ClusterLabel) -> bool {
    label == NOISE_LABEL
}

/// Validate that every label is >= -1.
pub fn validate_labels(labels: &[ClusterLabel]) -> Result<(), InputError> {
    match labels.iter().position(|&l| l < NOISE_LABEL) {
        Some(sample) => Err(InputError::InvalidLabel {
            sample,
            label: labels[sample],
        }),
        None => Ok(()),
    }
}

/// Sizes of all non-noise clusters, keyed by label.
pub fn cluster_sizes(labels: &[ClusterLabel]) -> BTreeMap<ClusterLabel, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels.iter().filter(|&&l| !is_noise(l)) {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

/// Number of distinct non-noise clusters.
pub fn num_clusters(labels: &[ClusterLabel]) -> usize {
    cluster_sizes(labels).len()
}

/// Renumber non-noise labels to `0..C`, largest cluster first.
///
/// Equal sizes keep their order of first appearance. Noise stays noise.
/// Dropping every cluster below some size from the input only removes the
/// highest ids from the output; the other clusters keep theirs.
pub fn renumber_by_size(labels: &[ClusterLabel]) -> Vec<ClusterLabel> {
    let sizes = cluster_sizes(labels);
    let mut order: Vec<ClusterLabel> = Vec::with_capacity(sizes.len());
    for &label in labels {
        if !is_noise(label) && !order.contains(&label) {
            order.push(label);
        }
    }
    // Stable sort keeps first appearance among equal sizes.
    order.sort_by(|a, b| sizes[b].cmp(&sizes[a]));
    let mapping: BTreeMap<ClusterLabel, ClusterLabel> = order
        .iter()
        .enumerate()
        .map(|(id, &label)| (label, id as ClusterLabel))
        .collect();
    labels
        .iter()
        .map(|label| mapping.get(label).copied().unwrap_or(NOISE_LABEL))
        .collect()
}

/// One clustering of the full sample universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeling {
    /// Human-readable description of the parameters that produced it.
    pub name: String,
    /// Label per sample, in sample order.
    pub labels: Vec<ClusterLabel>,
}

impl Labeling {
    /// Create a labeling.
    pub fn new(name: impl Into<String>, labels: Vec<ClusterLabel>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// A labeling with every sample unassigned.
    pub fn unassigned(name: impl Into<String>, n_samples: usize) -> Self {
        Self::new(name, vec![NOISE_LABEL; n_samples])
    }

    /// Number of samples with a non-noise label.
    pub fn assigned_count(&self) -> usize {
        self.labels.iter().filter(|&&l| !is_noise(l)).count()
    }

    /// Number of distinct clusters.
    pub fn num_clusters(&self) -> usize {
        num_clusters(&self.labels)
    }

    /// True when no sample is assigned.
    pub fn is_degenerate(&self) -> bool {
        self.assigned_count() == 0
    }
}

/// Ordered labelings over a shared sample universe.
///
/// # Invariant
///
/// Every labeling has exactly `n_samples` labels and no label below -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatrix {
    n_samples: usize,
    labelings: Vec<Labeling>,
}

impl LabelMatrix {
    /// Build a label matrix, validating the shared-length invariant.
    ///
    /// # Errors
    ///
    /// - `InputError::LabelingLength` if any labeling has the wrong length
    /// - `InputError::InvalidLabel` if any label is below -1
    pub fn new(n_samples: usize, labelings: Vec<Labeling>) -> Result<Self, InputError> {
        for (index, labeling) in labelings.iter().enumerate() {
            if labeling.labels.len() != n_samples {
                return Err(InputError::LabelingLength {
                    index,
                    expected: n_samples,
                    actual: labeling.labels.len(),
                });
            }
            validate_labels(&labeling.labels)?;
        }
        Ok(Self {
            n_samples,
            labelings,
        })
    }

    /// Build from bare label vectors, naming them by position.
    pub fn from_rows(rows: Vec<Vec<ClusterLabel>>) -> Result<Self, InputError> {
        let n_samples = rows.first().map(|r| r.len()).unwrap_or(0);
        let labelings = rows
            .into_iter()
            .enumerate()
            .map(|(i, labels)| Labeling::new(format!("labeling_{}", i), labels))
            .collect();
        Self::new(n_samples, labelings)
    }

    /// Number of samples in the universe.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of labelings.
    #[inline]
    pub fn len(&self) -> usize {
        self.labelings.len()
    }

    /// True when there are no labelings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labelings.is_empty()
    }

    /// All labelings in sweep order.
    pub fn labelings(&self) -> &[Labeling] {
        &self.labelings
    }

    /// Labeling at a position.
    pub fn get(&self, index: usize) -> Option<&Labeling> {
        self.labelings.get(index)
    }

    /// True when every labeling is fully unassigned (or there are none).
    pub fn is_degenerate(&self) -> bool {
        self.labelings.iter().all(Labeling::is_degenerate)
    }
}

/// Human-readable summary of a partition: cluster sizes plus unassigned count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Size of each non-noise cluster, keyed by label.
    pub cluster_sizes: BTreeMap<ClusterLabel, usize>,
    /// Number of samples labeled -1.
    pub unassigned: usize,
    /// Total number of samples.
    pub total: usize,
}

impl PartitionSummary {
    /// Summarize a label vector.
    pub fn from_labels(labels: &[ClusterLabel]) -> Self {
        let cluster_sizes = cluster_sizes(labels);
        let assigned: usize = cluster_sizes.values().sum();
        Self {
            cluster_sizes,
            unassigned: labels.len() - assigned,
            total: labels.len(),
        }
    }

    /// Number of non-noise clusters.
    #[inline]
    pub fn num_clusters(&self) -> usize {
        self.cluster_sizes.len()
    }
}

impl std::fmt::Display for PartitionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} clusters over {} samples ({} unassigned)",
            self.num_clusters(),
            self.total,
            self.unassigned
        )?;
        for (label, size) in &self.cluster_sizes {
            write!(f, "; {}={}", label, size)?;
        }
        Ok(())
    }
}
