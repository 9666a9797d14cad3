//! Numeric feature matrix shared read-only by every stage.
//!
//! Samples are rows, features are columns, stored row-major. The matrix
//! remembers each column's index in the original (unfiltered) feature set so
//! ranked results can be reported against it after upstream filtering or
//! per-combination reduction.
//!
//! # Fail-Fast Validation
//!
//! - at least one sample and one feature
//! - value count equals `n_samples * n_features`
//! - every value finite
//! - raw counts (`is_count`) non-negative

mod reduce;


use serde::{Deserialize, Serialize};

use crate::error::InputError;

pub use reduce::{feature_dispersion, reduce, top_features, ReduceMethod};

/// Dense samples x features matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr", into = "MatrixRepr")]
pub struct FeatureMatrix {
    n_samples: usize,
    n_features: usize,
    values: Vec<f64>,
    is_count: bool,
    feature_ids: Vec<usize>,
    feature_names: Option<Vec<String>>,
}

impl FeatureMatrix {
    /// Create a matrix from a row-major value buffer.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the shape is empty, the buffer length does not
    /// match, a value is not finite, or a raw count is negative.
    pub fn new(
        n_samples: usize,
        n_features: usize,
        values: Vec<f64>,
        is_count: bool,
    ) -> Result<Self, InputError> {
        if n_samples == 0 || n_features == 0 {
            return Err(InputError::EmptyMatrix {
                samples: n_samples,
                features: n_features,
            });
        }
        let expected = n_samples * n_features;
        if values.len() != expected {
            return Err(InputError::dimension_mismatch(expected, values.len()));
        }
        for (idx, &v) in values.iter().enumerate() {
            let (sample, feature) = (idx / n_features, idx % n_features);
            if !v.is_finite() {
                return Err(InputError::NonFinite { sample, feature });
            }
            if is_count && v < 0.0 {
                return Err(InputError::NegativeCount { sample, feature });
            }
        }

        Ok(Self {
            n_samples,
            n_features,
            values,
            is_count,
            feature_ids: (0..n_features).collect(),
            feature_names: None,
        })
    }

    /// Create a matrix from per-sample rows.
    pub fn from_rows(rows: &[Vec<f64>], is_count: bool) -> Result<Self, InputError> {
        let n_samples = rows.len();
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(InputError::dimension_mismatch(n_features, bad.len()));
        }
        let values = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(n_samples, n_features, values, is_count)
    }

    /// Attach original feature indices (one per column).
    pub fn with_feature_ids(mut self, ids: Vec<usize>) -> Result<Self, InputError> {
        if ids.len() != self.n_features {
            return Err(InputError::dimension_mismatch(self.n_features, ids.len()));
        }
        self.feature_ids = ids;
        Ok(self)
    }

    /// Attach feature names (one per column).
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, InputError> {
        if names.len() != self.n_features {
            return Err(InputError::dimension_mismatch(self.n_features, names.len()));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Whether values are raw counts.
    #[inline]
    pub fn is_count(&self) -> bool {
        self.is_count
    }

    /// Value at (sample, feature).
    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.values[sample * self.n_features + feature]
    }

    /// All values of one sample.
    #[inline]
    pub fn row(&self, sample: usize) -> &[f64] {
        let start = sample * self.n_features;
        &self.values[start..start + self.n_features]
    }

    /// All values of one feature.
    pub fn column(&self, feature: usize) -> Vec<f64> {
        (0..self.n_samples)
            .map(|s| self.values[s * self.n_features + feature])
            .collect()
    }

    /// Original feature index of each column.
    pub fn feature_ids(&self) -> &[usize] {
        &self.feature_ids
    }

    /// Name of a column, if names were attached.
    pub fn feature_name(&self, feature: usize) -> Option<&str> {
        self.feature_names
            .as_ref()
            .and_then(|names| names.get(feature))
            .map(String::as_str)
    }

    /// Matrix ready for distance computation.
    ///
    /// Raw counts are transformed with `log2(x + 1)`; normalized values are
    /// returned unchanged.
    pub fn transformed(&self) -> FeatureMatrix {
        if !self.is_count {
            return self.clone();
        }
        FeatureMatrix {
            values: self.values.iter().map(|&v| (v + 1.0).log2()).collect(),
            is_count: false,
            ..self.clone()
        }
    }

    /// Keep only the given columns, in the given order.
    ///
    /// Original feature ids and names travel with their columns.
    pub fn select_features(&self, columns: &[usize]) -> FeatureMatrix {
        let values = (0..self.n_samples)
            .flat_map(|s| columns.iter().map(move |&c| self.get(s, c)))
            .collect();
        FeatureMatrix {
            n_samples: self.n_samples,
            n_features: columns.len(),
            values,
            is_count: self.is_count,
            feature_ids: columns.iter().map(|&c| self.feature_ids[c]).collect(),
            feature_names: self
                .feature_names
                .as_ref()
                .map(|names| columns.iter().map(|&c| names[c].clone()).collect()),
        }
    }
}

/// Serialized form of [`FeatureMatrix`]: rows plus optional column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatrixRepr {
    rows: Vec<Vec<f64>>,
    #[serde(default, alias = "isCount")]
    is_count: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_ids: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
}

impl TryFrom<MatrixRepr> for FeatureMatrix {
    type Error = InputError;

    fn try_from(repr: MatrixRepr) -> Result<Self, Self::Error> {
        let mut matrix = FeatureMatrix::from_rows(&repr.rows, repr.is_count)?;
        if let Some(ids) = repr.feature_ids {
            matrix = matrix.with_feature_ids(ids)?;
        }
        if let Some(names) = repr.feature_names {
            matrix = matrix.with_feature_names(names)?;
        }
        Ok(matrix)
    }
}

impl From<FeatureMatrix> for MatrixRepr {
    fn from(matrix: FeatureMatrix) -> Self {
        let rows = (0..matrix.n_samples)
            .map(|s| matrix.row(s).to_vec())
            .collect();
        let identity = matrix.feature_ids.iter().copied().eq(0..matrix.n_features);
        Self {
            rows,
            is_count: matrix.is_count,
            feature_ids: (!identity).then_some(matrix.feature_ids),
            feature_names: matrix.feature_names,
        }
    }
}
