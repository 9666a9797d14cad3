//! Feature selection by dispersion ranking.
//!
//! Reduction is parameter-dependent, so callers apply it once per parameter
//! combination and never share the result across combinations.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::metrics::{median_absolute_deviation, variance};

use super::FeatureMatrix;

/// How to rank features before keeping the top `n_dims`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReduceMethod {
    /// Keep every feature.
    #[default]
    None,
    /// Rank by sample variance.
    Var,
    /// Rank by median absolute deviation.
    Mad,
}

impl ReduceMethod {
    /// Short name used in labels and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Var => "var",
            Self::Mad => "mad",
        }
    }
}

impl std::fmt::Display for ReduceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispersion score of every column under `method`.
///
/// `ReduceMethod::None` scores every column 0.0.
pub fn feature_dispersion(matrix: &FeatureMatrix, method: ReduceMethod) -> Vec<f64> {
    (0..matrix.n_features())
        .map(|f| match method {
            ReduceMethod::None => 0.0,
            ReduceMethod::Var => variance(&matrix.column(f)),
            ReduceMethod::Mad => median_absolute_deviation(&matrix.column(f)),
        })
        .collect()
}

/// Column indices of the `n_dims` most dispersed features.
///
/// Ties break toward the lower column index. The result is returned in
/// ascending column order. `n_dims` larger than the feature count keeps
/// every feature.
pub fn top_features(matrix: &FeatureMatrix, method: ReduceMethod, n_dims: usize) -> Vec<usize> {
    let n_features = matrix.n_features();
    if method == ReduceMethod::None || n_dims >= n_features {
        return (0..n_features).collect();
    }

    let scores = feature_dispersion(matrix, method);
    let mut order: Vec<usize> = (0..n_features).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut kept: Vec<usize> = order.into_iter().take(n_dims).collect();
    kept.sort_unstable();
    kept
}

/// Reduce a matrix to its `n_dims` most dispersed features.
///
/// # Errors
///
/// Returns `EnsembleError::Configuration` if `n_dims` is 0 while a ranking
/// method is requested.
pub fn reduce(
    matrix: &FeatureMatrix,
    method: ReduceMethod,
    n_dims: Option<usize>,
) -> EnsembleResult<FeatureMatrix> {
    let n_dims = match (method, n_dims) {
        (ReduceMethod::None, _) | (_, None) => return Ok(matrix.clone()),
        (_, Some(0)) => {
            return Err(EnsembleError::invalid_parameter(format!(
                "n_dims must be > 0 for reduce method '{}'",
                method
            )))
        }
        (_, Some(n)) => n,
    };

    if n_dims > matrix.n_features() {
        tracing::debug!(
            requested = n_dims,
            available = matrix.n_features(),
            method = %method,
            "n_dims exceeds feature count, keeping all features"
        );
    }

    let columns = top_features(matrix, method, n_dims);
    Ok(matrix.select_features(&columns))
}
