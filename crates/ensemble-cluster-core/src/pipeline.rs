//! End-to-end pipeline: sweep, consensus, hierarchy, merging, contrasts.
//!
//! Each stage publishes an immutable artifact consumed by the next one:
//!
//! ```text
//! FeatureMatrix
//!   -> SweepRunner          -> LabelMatrix
//!   -> ConsensusBuilder     -> CoClusterMatrix + ConsensusPartition
//!   -> HierarchyBuilder     -> ClusterHierarchy
//!   -> HierarchicalMerger   -> MergeOutcome (final partition)
//!   -> ContrastEngine       -> Vec<ContrastResult>
//! ```
//!
//! Every stage is constructed, and its configuration validated, when the
//! pipeline is built. Data-dependent checks run before the first stage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::consensus::{CoClusterMatrix, ConsensusBuilder, ConsensusPartition};
use crate::contrast::{ContrastEngine, ContrastResult, ContrastStatus};
use crate::error::{EnsembleError, EnsembleResult, InputError};
use crate::hierarchy::{ClusterHierarchy, HierarchyBuilder};
use crate::labels::{ClusterLabel, LabelMatrix, PartitionSummary};
use crate::matrix::FeatureMatrix;
use crate::merge::{HierarchicalMerger, MergeOutcome};
use crate::sweep::{ParameterGrid, StrategyRegistry, SweepParams, SweepReport, SweepRunner};
use crate::traits::DiffTestProvider;

/// Non-fatal conditions met during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Some sweep combinations produced no labeling.
    StrategyFailures { count: usize },
    /// The consensus has fewer than two clusters.
    DegenerateConsensus { clusters: usize },
    /// The contrast stage did not run.
    ContrastsSkipped { reason: String },
    /// The provider failed on one contrast.
    ContrastFailed { name: String, reason: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrategyFailures { count } => write!(f, "{} sweep combinations failed", count),
            Self::DegenerateConsensus { clusters } => {
                write!(f, "consensus is degenerate ({} clusters)", clusters)
            }
            Self::ContrastsSkipped { reason } => write!(f, "contrasts skipped: {}", reason),
            Self::ContrastFailed { name, reason } => write!(f, "contrast {} failed: {}", name, reason),
        }
    }
}

/// Every artifact of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: PipelineConfig,
    pub labels: LabelMatrix,
    pub sweep: SweepReport,
    pub coclustering: CoClusterMatrix,
    pub consensus: ConsensusPartition,
    pub consensus_summary: PartitionSummary,
    /// Hierarchy over consensus clusters.
    pub hierarchy: ClusterHierarchy,
    pub merge: MergeOutcome,
    /// Hierarchy over final clusters.
    pub final_hierarchy: ClusterHierarchy,
    pub final_summary: PartitionSummary,
    pub contrasts: Vec<ContrastResult>,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    pub fn consensus_labels(&self) -> &[ClusterLabel] {
        self.consensus.labels()
    }

    pub fn final_labels(&self) -> &[ClusterLabel] {
        &self.merge.final_labels
    }
}

/// Runs every stage against one feature matrix.
///
/// Strategies and the test provider are injected; the pipeline only sees
/// them through their traits.
#[derive(Debug, Clone)]
pub struct EnsemblePipeline {
    config: PipelineConfig,
    sweep: SweepRunner,
    consensus: ConsensusBuilder,
    hierarchy: HierarchyBuilder,
    merger: HierarchicalMerger,
    contrasts: ContrastEngine,
}

impl EnsemblePipeline {
    /// Build a pipeline over explicit sweep combinations.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` for out-of-range settings or a
    /// combination naming an unregistered strategy.
    pub fn new(
        config: PipelineConfig,
        registry: StrategyRegistry,
        combinations: Vec<SweepParams>,
        provider: Arc<dyn DiffTestProvider>,
    ) -> EnsembleResult<Self> {
        config.validate()?;
        if combinations.is_empty() {
            return Err(EnsembleError::invalid_parameter(
                "the sweep needs at least one parameter combination",
            ));
        }
        Ok(Self {
            sweep: SweepRunner::new(registry, combinations)?,
            consensus: ConsensusBuilder::new(config.consensus.clone())?,
            hierarchy: HierarchyBuilder::new(config.hierarchy.clone())?,
            merger: HierarchicalMerger::new(Arc::clone(&provider), config.merge.clone())?,
            contrasts: ContrastEngine::new(provider, config.contrast.clone())?,
            config,
        })
    }

    /// Build a pipeline over the expansion of `grid`.
    pub fn from_grid(
        config: PipelineConfig,
        registry: StrategyRegistry,
        grid: &ParameterGrid,
        provider: Arc<dyn DiffTestProvider>,
    ) -> EnsembleResult<Self> {
        Self::new(config, registry, grid.expand(), provider)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage.
    ///
    /// # Errors
    ///
    /// Fails before any computation on configuration that does not fit the
    /// matrix, or when the matrix count flag disagrees with `input.is_count`.
    #[instrument(skip_all, fields(samples = matrix.n_samples(), features = matrix.n_features()))]
    pub fn run(&self, matrix: &FeatureMatrix) -> EnsembleResult<PipelineReport> {
        let started_at = Utc::now();
        self.check_input(matrix)?;

        let sweep = self.sweep.run(matrix)?;
        self.finish(matrix, sweep.labels, sweep.report, started_at)
    }

    /// Run every stage after the sweep on a precomputed label matrix.
    #[instrument(skip_all, fields(samples = matrix.n_samples(), labelings = labels.len()))]
    pub fn run_from_labels(
        &self,
        matrix: &FeatureMatrix,
        labels: LabelMatrix,
    ) -> EnsembleResult<PipelineReport> {
        let started_at = Utc::now();
        self.check_input(matrix)?;
        if labels.n_samples() != matrix.n_samples() {
            return Err(InputError::dimension_mismatch(matrix.n_samples(), labels.n_samples()).into());
        }
        self.finish(matrix, labels, SweepReport::default(), started_at)
    }

    fn check_input(&self, matrix: &FeatureMatrix) -> EnsembleResult<()> {
        self.config.validate_for(matrix.n_samples())?;
        if matrix.is_count() != self.config.input.is_count {
            return Err(EnsembleError::invalid_parameter(format!(
                "input.is_count is {} but the matrix was loaded with is_count = {}",
                self.config.input.is_count,
                matrix.is_count()
            )));
        }
        Ok(())
    }

    fn finish(
        &self,
        matrix: &FeatureMatrix,
        labels: LabelMatrix,
        sweep: SweepReport,
        started_at: DateTime<Utc>,
    ) -> EnsembleResult<PipelineReport> {
        let mut warnings = Vec::new();
        if sweep.failed() > 0 {
            warnings.push(PipelineWarning::StrategyFailures {
                count: sweep.failed(),
            });
        }

        let consensus = self.consensus.build(&labels)?;
        let partition = consensus.partition;
        let consensus_summary = partition.summary();
        if partition.is_degenerate() {
            warn!(clusters = partition.num_clusters(), "consensus is degenerate");
            warnings.push(PipelineWarning::DegenerateConsensus {
                clusters: partition.num_clusters(),
            });
        }

        let hierarchy = self.hierarchy.build(matrix, partition.labels())?;
        let merge = self.merger.merge(matrix, partition.labels(), &hierarchy)?;
        let final_hierarchy = merge.collapsed_hierarchy(&hierarchy)?;
        let final_summary = merge.summary();

        let contrasts = if !self.config.contrast.enabled {
            warnings.push(PipelineWarning::ContrastsSkipped {
                reason: "disabled by configuration".to_string(),
            });
            Vec::new()
        } else if final_summary.num_clusters() < 2 {
            warnings.push(PipelineWarning::ContrastsSkipped {
                reason: format!("final partition has {} clusters", final_summary.num_clusters()),
            });
            Vec::new()
        } else {
            let results = self
                .contrasts
                .run(matrix, &merge.final_labels, Some(&final_hierarchy))?;
            warnings.extend(results.iter().filter_map(|r| match &r.status {
                ContrastStatus::Failed { reason } => Some(PipelineWarning::ContrastFailed {
                    name: r.contrast.name.clone(),
                    reason: reason.clone(),
                }),
                ContrastStatus::Completed { .. } => None,
            }));
            results
        };

        let report = PipelineReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            config: self.config.clone(),
            labels,
            sweep,
            coclustering: consensus.coclustering,
            consensus: partition,
            consensus_summary,
            hierarchy,
            merge,
            final_hierarchy,
            final_summary,
            contrasts,
            warnings,
        };
        info!(
            run_id = %report.run_id,
            consensus = %report.consensus_summary,
            final_partition = %report.final_summary,
            contrasts = report.contrasts.len(),
            warnings = report.warnings.len(),
            "pipeline complete"
        );
        Ok(report)
    }
}
