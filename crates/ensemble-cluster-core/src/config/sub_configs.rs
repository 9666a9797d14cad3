//! Per-stage configuration sections.
//!
//! Field names are snake_case. camelCase spellings (`combineProportion`,
//! `mergeCutoff`) are accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::contrast::ContrastType;
use crate::error::{EnsembleError, EnsembleResult};
use crate::linkage::Linkage;
use crate::matrix::ReduceMethod;
use crate::merge::MergeMethod;
use crate::metrics::DistanceMetric;

use super::constants;

/// Input interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InputConfig {
    /// Values are raw counts and get a `log2(x + 1)` transform before any
    /// distance computation.
    #[serde(alias = "isCount")]
    pub is_count: bool,
}

/// Co-clustering consensus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Minimum co-clustering fraction for two samples to be grouped, in (0, 1].
    #[serde(alias = "combineProportion")]
    pub combine_proportion: f64,

    /// Minimum consensus cluster size; smaller clusters become -1.
    #[serde(alias = "combineMinSize")]
    pub combine_min_size: usize,

    /// Labelings with fewer assigned samples are left out of the consensus.
    #[serde(alias = "minAssigned")]
    pub min_assigned: usize,

    /// Cut the consensus tree to this many clusters instead of by proportion.
    #[serde(alias = "targetClusters")]
    pub target_clusters: Option<usize>,

    /// Linkage applied to `1 - co-clustering`.
    pub linkage: Linkage,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            combine_proportion: constants::consensus::COMBINE_PROPORTION,
            combine_min_size: constants::consensus::COMBINE_MIN_SIZE,
            min_assigned: constants::consensus::MIN_ASSIGNED,
            target_clusters: None,
            linkage: Linkage::Complete,
        }
    }
}

impl ConsensusConfig {
    /// Check value ranges.
    pub fn validate(&self) -> EnsembleResult<()> {
        if !(self.combine_proportion > 0.0 && self.combine_proportion <= 1.0) {
            return Err(EnsembleError::invalid_parameter(format!(
                "consensus.combine_proportion must be in (0, 1], got {}",
                self.combine_proportion
            )));
        }
        if self.combine_min_size == 0 {
            return Err(EnsembleError::invalid_parameter(
                "consensus.combine_min_size must be >= 1",
            ));
        }
        if self.target_clusters == Some(0) {
            return Err(EnsembleError::invalid_parameter(
                "consensus.target_clusters must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Check value ranges and sizes against the sample count.
    pub fn validate_for(&self, n_samples: usize) -> EnsembleResult<()> {
        self.validate()?;
        if self.combine_min_size > n_samples {
            return Err(EnsembleError::invalid_parameter(format!(
                "consensus.combine_min_size ({}) must be <= sample count ({})",
                self.combine_min_size, n_samples
            )));
        }
        if let Some(k) = self.target_clusters {
            if k > n_samples {
                return Err(EnsembleError::invalid_parameter(format!(
                    "consensus.target_clusters ({}) must be <= sample count ({})",
                    k, n_samples
                )));
            }
        }
        Ok(())
    }
}

/// Cluster hierarchy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Ranking used to pick the dimensions of representative points.
    #[serde(alias = "reduceMethod")]
    pub reduce: ReduceMethod,

    /// Number of top-ranked dimensions kept (all when `None`).
    #[serde(alias = "nDims")]
    pub n_dims: Option<usize>,

    /// Distance between representative points.
    pub metric: DistanceMetric,

    /// Linkage over representative points.
    pub linkage: Linkage,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            reduce: ReduceMethod::Mad,
            n_dims: Some(constants::hierarchy::N_DIMS),
            metric: DistanceMetric::Euclidean,
            linkage: Linkage::Average,
        }
    }
}

impl HierarchyConfig {
    /// Check value ranges.
    pub fn validate(&self) -> EnsembleResult<()> {
        if self.reduce != ReduceMethod::None && self.n_dims == Some(0) {
            return Err(EnsembleError::invalid_parameter(format!(
                "hierarchy.n_dims must be > 0 for reduce method '{}'",
                self.reduce
            )));
        }
        Ok(())
    }
}

/// Hierarchical merging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Node significance at or above which siblings merge, in [0, 1].
    #[serde(alias = "mergeCutoff")]
    pub merge_cutoff: f64,

    /// Which adjusted p-value defines node significance.
    #[serde(alias = "mergeMethod")]
    pub merge_method: MergeMethod,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_cutoff: constants::merge::MERGE_CUTOFF,
            merge_method: MergeMethod::default(),
        }
    }
}

impl MergeConfig {
    /// Check value ranges.
    pub fn validate(&self) -> EnsembleResult<()> {
        if !(0.0..=1.0).contains(&self.merge_cutoff) {
            return Err(EnsembleError::invalid_parameter(format!(
                "merge.merge_cutoff must be in [0, 1], got {}",
                self.merge_cutoff
            )));
        }
        Ok(())
    }
}

/// Contrast generation and ranking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Run the contrast stage at the end of the pipeline.
    pub enabled: bool,

    /// Contrast generation strategy.
    #[serde(alias = "contrastType")]
    pub contrast_type: ContrastType,

    /// Features retained per contrast.
    pub number: usize,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contrast_type: ContrastType::default(),
            number: constants::contrast::NUMBER,
        }
    }
}

impl ContrastConfig {
    /// Check value ranges.
    pub fn validate(&self) -> EnsembleResult<()> {
        if self.number == 0 {
            return Err(EnsembleError::invalid_parameter(
                "contrast.number must be >= 1",
            ));
        }
        Ok(())
    }
}
