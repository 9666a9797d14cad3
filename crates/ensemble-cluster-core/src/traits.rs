//! Capabilities injected into the pipeline.
//!
//! - [`ClusteringStrategy`]: one clustering of a matrix under one parameter set
//! - [`DiffTestProvider`]: per-feature differential test for one contrast
//!
//! Both are selected by configuration when a sweep or engine is built and are
//! called through `dyn` references only; the pipeline never inspects their
//! concrete type. Implementations must be `Send + Sync` because sweep
//! combinations and contrasts are dispatched concurrently.

use thiserror::Error;

use crate::contrast::Contrast;
use crate::labels::ClusterLabel;
use crate::matrix::FeatureMatrix;
use crate::sweep::SweepParams;

/// Failure of a single clustering invocation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    /// Parameters are invalid for this input (e.g. k >= sample count).
    #[error("Invalid parameters: {message}")]
    InvalidParams {
        /// What is wrong
        message: String,
    },

    /// The algorithm ran but could not produce a labeling.
    #[error("Clustering failed: {message}")]
    Failed {
        /// What went wrong
        message: String,
    },
}

impl StrategyError {
    /// Create an InvalidParams error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a Failed error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Failure of a differential test for one contrast.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// Design matrix is rank deficient for this contrast.
    #[error("Singular design: {0}")]
    Singular(String),

    /// Model fitting did not converge.
    #[error("Did not converge: {0}")]
    NotConverged(String),

    /// Any other provider failure.
    #[error("Test provider failed: {0}")]
    Failed(String),
}

/// Per-feature outcome of a differential test.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureTestResult {
    /// Column index in the matrix handed to the provider.
    pub feature: usize,
    /// Test statistic (t, F, ...).
    pub statistic: f64,
    /// Unadjusted p-value.
    pub raw_p: f64,
    /// Multiplicity-adjusted p-value.
    pub adjusted_p: f64,
}

impl FeatureTestResult {
    /// Create a result row.
    pub fn new(feature: usize, statistic: f64, raw_p: f64, adjusted_p: f64) -> Self {
        Self {
            feature,
            statistic,
            raw_p,
            adjusted_p,
        }
    }
}

/// Produces one partition of a matrix for one parameter set.
pub trait ClusteringStrategy: Send + Sync {
    /// Cluster `matrix` (already transformed and reduced for `params`).
    ///
    /// Returns one label per sample; -1 marks an unassigned sample.
    ///
    /// # Errors
    ///
    /// Must return `StrategyError` (not panic) for invalid parameters such as
    /// a cluster count at or above the sample count.
    fn cluster(
        &self,
        matrix: &FeatureMatrix,
        params: &SweepParams,
    ) -> Result<Vec<ClusterLabel>, StrategyError>;
}

impl<F> ClusteringStrategy for F
where
    F: Fn(&FeatureMatrix, &SweepParams) -> Result<Vec<ClusterLabel>, StrategyError> + Send + Sync,
{
    fn cluster(
        &self,
        matrix: &FeatureMatrix,
        params: &SweepParams,
    ) -> Result<Vec<ClusterLabel>, StrategyError> {
        self(matrix, params)
    }
}

/// Tests every feature for differences described by one contrast.
pub trait DiffTestProvider: Send + Sync {
    /// Run the test.
    ///
    /// Samples labeled -1 in `partition` must be ignored. The result holds
    /// one row per matrix column, in column order.
    fn test(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError>;
}

/// Run a provider and check the shape of its answer.
///
/// A result with the wrong row count, rows out of column order, or p-values
/// outside [0, 1] is reported as `ProviderError::Failed`.
pub(crate) fn checked_test(
    provider: &dyn DiffTestProvider,
    matrix: &FeatureMatrix,
    partition: &[ClusterLabel],
    contrast: &Contrast,
) -> Result<Vec<FeatureTestResult>, ProviderError> {
    let rows = provider.test(matrix, partition, contrast)?;
    if rows.len() != matrix.n_features() {
        return Err(ProviderError::Failed(format!(
            "expected {} result rows, got {}",
            matrix.n_features(),
            rows.len()
        )));
    }
    for (column, row) in rows.iter().enumerate() {
        if row.feature != column {
            return Err(ProviderError::Failed(format!(
                "row {} reports feature {}, results must follow column order",
                column, row.feature
            )));
        }
        let valid_p = |p: f64| (0.0..=1.0).contains(&p);
        if !valid_p(row.raw_p) || !valid_p(row.adjusted_p) {
            return Err(ProviderError::Failed(format!(
                "feature {} has p-values outside [0, 1] (raw={}, adjusted={})",
                column, row.raw_p, row.adjusted_p
            )));
        }
    }
    Ok(rows)
}
