//! Contrast dispatch and result ranking.

use std::sync::Arc;

use rayon::prelude::*;

use crate::config::ContrastConfig;
use crate::error::{EnsembleResult, InputError};
use crate::hierarchy::ClusterHierarchy;
use crate::labels::ClusterLabel;
use crate::matrix::FeatureMatrix;
use crate::traits::{checked_test, DiffTestProvider, FeatureTestResult};

use super::generate::generate_contrasts;
use super::types::{Contrast, ContrastResult, ContrastStatus, RankedFeature};

/// Generates contrasts, submits them to a [`DiffTestProvider`] and ranks
/// the answers.
///
/// Contrasts are independent and dispatched on the rayon pool; results come
/// back in generation order. A provider failure marks only its own contrast
/// as failed. The engine does no statistics itself.
#[derive(Clone)]
pub struct ContrastEngine {
    provider: Arc<dyn DiffTestProvider>,
    config: ContrastConfig,
}

impl std::fmt::Debug for ContrastEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContrastEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContrastEngine {
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` if `number` is 0.
    pub fn new(provider: Arc<dyn DiffTestProvider>, config: ContrastConfig) -> EnsembleResult<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &ContrastConfig {
        &self.config
    }

    /// Contrasts of the configured type for `partition`.
    pub fn generate(
        &self,
        partition: &[ClusterLabel],
        hierarchy: Option<&ClusterHierarchy>,
    ) -> EnsembleResult<Vec<Contrast>> {
        generate_contrasts(self.config.contrast_type, partition, hierarchy)
    }

    /// Generate and evaluate every contrast.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the partition does not cover the matrix, and
    /// `EnsembleError::Contrast` if generation is impossible. Provider
    /// failures are reported per contrast, never as an error.
    pub fn run(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        hierarchy: Option<&ClusterHierarchy>,
    ) -> EnsembleResult<Vec<ContrastResult>> {
        if partition.len() != matrix.n_samples() {
            return Err(InputError::dimension_mismatch(matrix.n_samples(), partition.len()).into());
        }
        let contrasts = self.generate(partition, hierarchy)?;
        Ok(self.evaluate(matrix, partition, contrasts))
    }

    /// Evaluate already generated contrasts.
    pub fn evaluate(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        contrasts: Vec<Contrast>,
    ) -> Vec<ContrastResult> {
        tracing::info!(
            contrasts = contrasts.len(),
            kind = %self.config.contrast_type,
            number = self.config.number,
            "evaluating contrasts"
        );

        let results: Vec<ContrastResult> = contrasts
            .into_par_iter()
            .map(|contrast| {
                let status = match checked_test(self.provider.as_ref(), matrix, partition, &contrast) {
                    Ok(rows) => ContrastStatus::Completed {
                        features: rank_features(matrix, rows, self.config.number),
                    },
                    Err(e) => {
                        tracing::warn!(contrast = %contrast.name, error = %e, "contrast failed");
                        ContrastStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                ContrastResult { contrast, status }
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_failed()).count();
        tracing::info!(
            completed = results.len() - failed,
            failed,
            "contrast evaluation complete"
        );
        results
    }
}

/// Sort by adjusted p-value ascending (ties: raw p, then column), keep the
/// first `number`, and tag each with its original feature id.
///
/// Rows naming a column outside `matrix` are dropped before ranking.
pub fn rank_features(
    matrix: &FeatureMatrix,
    mut rows: Vec<FeatureTestResult>,
    number: usize,
) -> Vec<RankedFeature> {
    let ids = matrix.feature_ids();
    let before = rows.len();
    rows.retain(|row| row.feature < ids.len());
    if rows.len() < before {
        tracing::warn!(
            dropped = before - rows.len(),
            features = ids.len(),
            "test rows outside the feature range ignored"
        );
    }
    rows.sort_by(|a, b| {
        a.adjusted_p
            .total_cmp(&b.adjusted_p)
            .then(a.raw_p.total_cmp(&b.raw_p))
            .then(a.feature.cmp(&b.feature))
    });
    rows.truncate(number);
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            Some(RankedFeature {
                rank: i + 1,
                column: row.feature,
                feature_id: *ids.get(row.feature)?,
                name: matrix.feature_name(row.feature).map(str::to_string),
                statistic: row.statistic,
                raw_p: row.raw_p,
                adjusted_p: row.adjusted_p,
            })
        })
        .collect()
}
