//! Parallel execution of a parameter sweep.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::labels::{validate_labels, ClusterLabel, LabelMatrix, Labeling};
use crate::matrix::{reduce, FeatureMatrix, ReduceMethod};
use crate::traits::{ClusteringStrategy, StrategyError};

use super::params::SweepParams;
use super::registry::StrategyRegistry;

/// Why a combination produced no labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Per-combination feature reduction failed.
    Reduction,
    /// The strategy returned an error.
    Strategy,
    /// The strategy returned a labeling of the wrong length or with labels below -1.
    InvalidLabeling,
    /// The strategy panicked.
    Panic,
}

/// A combination recorded as fully unassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    /// Position of the combination in the sweep.
    pub index: usize,
    /// Label of the combination.
    pub label: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationSummary {
    pub index: usize,
    pub label: String,
    /// Distinct non-noise clusters in the labeling.
    pub num_clusters: usize,
    /// Samples with a non-noise label.
    pub assigned: usize,
    pub failed: bool,
}

/// Per-combination summary plus the failure list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub combinations: Vec<CombinationSummary>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    /// Combinations that produced a labeling.
    pub fn succeeded(&self) -> usize {
        self.combinations.len() - self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Label matrix and report produced by one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutput {
    pub labels: LabelMatrix,
    pub report: SweepReport,
}

/// Runs every combination against one matrix.
///
/// Combinations run concurrently on the rayon pool with no shared mutable
/// state. Results are reassembled in combination order regardless of
/// completion order.
#[derive(Debug, Clone)]
pub struct SweepRunner {
    registry: StrategyRegistry,
    combinations: Vec<SweepParams>,
}

impl SweepRunner {
    /// Create a runner, resolving every strategy name up front.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` if a combination names an
    /// unregistered strategy, or requests a ranking reduction to 0 dimensions.
    pub fn new(registry: StrategyRegistry, combinations: Vec<SweepParams>) -> EnsembleResult<Self> {
        for (index, params) in combinations.iter().enumerate() {
            if !registry.contains(&params.strategy) {
                return Err(EnsembleError::invalid_parameter(format!(
                    "combination {} ({}) names unknown strategy '{}'; registered: [{}]",
                    index,
                    params.label(),
                    params.strategy,
                    registry.names().collect::<Vec<_>>().join(", ")
                )));
            }
            if params.reduction != ReduceMethod::None && params.n_dims == Some(0) {
                return Err(EnsembleError::invalid_parameter(format!(
                    "combination {} ({}) reduces to 0 dimensions",
                    index,
                    params.label()
                )));
            }
        }
        Ok(Self {
            registry,
            combinations,
        })
    }

    /// Combinations in sweep order.
    pub fn combinations(&self) -> &[SweepParams] {
        &self.combinations
    }

    /// Run the sweep.
    ///
    /// Raw counts are log-transformed once; reduction is applied per
    /// combination. A failing combination contributes an all -1 labeling and
    /// a [`SweepFailure`].
    pub fn run(&self, matrix: &FeatureMatrix) -> EnsembleResult<SweepOutput> {
        let n = matrix.n_samples();
        let transformed = matrix.transformed();

        tracing::info!(
            combinations = self.combinations.len(),
            samples = n,
            features = matrix.n_features(),
            is_count = matrix.is_count(),
            "starting parameter sweep"
        );

        let outcomes: Vec<(Labeling, Option<SweepFailure>)> = self
            .combinations
            .par_iter()
            .enumerate()
            .map(|(index, params)| self.run_one(index, params, &transformed))
            .collect();

        let mut labelings = Vec::with_capacity(outcomes.len());
        let mut report = SweepReport::default();
        for (index, (labeling, failure)) in outcomes.into_iter().enumerate() {
            report.combinations.push(CombinationSummary {
                index,
                label: labeling.name.clone(),
                num_clusters: labeling.num_clusters(),
                assigned: labeling.assigned_count(),
                failed: failure.is_some(),
            });
            if let Some(failure) = failure {
                report.failures.push(failure);
            }
            labelings.push(labeling);
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "parameter sweep complete"
        );

        Ok(SweepOutput {
            labels: LabelMatrix::new(n, labelings)?,
            report,
        })
    }

    fn run_one(
        &self,
        index: usize,
        params: &SweepParams,
        matrix: &FeatureMatrix,
    ) -> (Labeling, Option<SweepFailure>) {
        let label = params.label();
        let n = matrix.n_samples();
        let fail = |kind: FailureKind, reason: String| {
            tracing::warn!(index, combination = %label, ?kind, %reason, "combination failed");
            (
                Labeling::unassigned(label.clone(), n),
                Some(SweepFailure {
                    index,
                    label: label.clone(),
                    kind,
                    reason,
                }),
            )
        };

        let Some(strategy) = self.registry.get(&params.strategy) else {
            return fail(
                FailureKind::Strategy,
                format!("strategy '{}' is not registered", params.strategy),
            );
        };

        let reduced = match reduce(matrix, params.reduction, params.n_dims) {
            Ok(reduced) => reduced,
            Err(e) => return fail(FailureKind::Reduction, e.to_string()),
        };

        let labels = match invoke(strategy, &reduced, params) {
            Ok(Ok(labels)) => labels,
            Ok(Err(e)) => return fail(FailureKind::Strategy, e.to_string()),
            Err(panic) => return fail(FailureKind::Panic, panic),
        };

        if labels.len() != n {
            return fail(
                FailureKind::InvalidLabeling,
                format!("returned {} labels for {} samples", labels.len(), n),
            );
        }
        if let Err(e) = validate_labels(&labels) {
            return fail(FailureKind::InvalidLabeling, e.to_string());
        }

        let labeling = Labeling::new(label, labels);
        tracing::debug!(
            index,
            combination = %labeling.name,
            clusters = labeling.num_clusters(),
            assigned = labeling.assigned_count(),
            "combination complete"
        );
        (labeling, None)
    }
}

/// Call a strategy, converting a panic into its message.
fn invoke(
    strategy: &Arc<dyn ClusteringStrategy>,
    matrix: &FeatureMatrix,
    params: &SweepParams,
) -> Result<Result<Vec<ClusterLabel>, StrategyError>, String> {
    catch_unwind(AssertUnwindSafe(|| strategy.cluster(matrix, params))).map_err(|payload| {
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("strategy panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("strategy panicked: {}", s)
        } else {
            "strategy panicked".to_string()
        }
    })
}
