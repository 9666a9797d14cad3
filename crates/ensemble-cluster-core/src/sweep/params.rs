//! Parameter combinations and their cartesian expansion.

use serde::{Deserialize, Serialize};

use crate::matrix::ReduceMethod;
use crate::metrics::DistanceMetric;

/// One parameter combination handed to a [`ClusteringStrategy`].
///
/// [`ClusteringStrategy`]: crate::traits::ClusteringStrategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    /// Registered strategy name.
    pub strategy: String,
    /// Target cluster count.
    pub k: Option<usize>,
    /// Density parameter for density-based strategies.
    pub density: Option<f64>,
    /// Distance the strategy should use.
    pub distance: DistanceMetric,
    /// Pre-reduction applied before clustering.
    pub reduction: ReduceMethod,
    /// Number of features kept by the reduction.
    pub n_dims: Option<usize>,
}

impl SweepParams {
    /// Parameters for `strategy` with no reduction and Euclidean distance.
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            k: None,
            density: None,
            distance: DistanceMetric::default(),
            reduction: ReduceMethod::None,
            n_dims: None,
        }
    }

    /// Set the target cluster count.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Set the density parameter.
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    /// Set the distance metric.
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Reduce to the `n_dims` top features under `method` before clustering.
    pub fn with_reduction(mut self, method: ReduceMethod, n_dims: usize) -> Self {
        self.reduction = method;
        self.n_dims = Some(n_dims);
        self
    }

    /// Stable human-readable label, e.g. `kmeans,k=3,reduce=var,ndims=50,dist=euclidean`.
    pub fn label(&self) -> String {
        let mut parts = vec![self.strategy.clone()];
        if let Some(k) = self.k {
            parts.push(format!("k={}", k));
        }
        if let Some(density) = self.density {
            parts.push(format!("density={}", density));
        }
        if self.reduction != ReduceMethod::None {
            parts.push(format!("reduce={}", self.reduction));
            match self.n_dims {
                Some(n) => parts.push(format!("ndims={}", n)),
                None => parts.push("ndims=all".to_string()),
            }
        }
        parts.push(format!("dist={}", self.distance));
        parts.join(",")
    }
}

/// Axes of a parameter sweep.
///
/// [`expand`](Self::expand) produces the cartesian product in a fixed order,
/// outermost axis first: strategy, k, density, reduction, n_dims, distance.
/// An empty optional axis contributes a single `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub strategies: Vec<String>,
    pub ks: Vec<usize>,
    pub densities: Vec<f64>,
    pub reductions: Vec<ReduceMethod>,
    #[serde(alias = "nDims")]
    pub n_dims: Vec<usize>,
    pub distances: Vec<DistanceMetric>,
}

impl ParameterGrid {
    /// Grid over the given strategies with every other axis at its default.
    pub fn new<S: Into<String>>(strategies: impl IntoIterator<Item = S>) -> Self {
        Self {
            strategies: strategies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_ks(mut self, ks: impl IntoIterator<Item = usize>) -> Self {
        self.ks = ks.into_iter().collect();
        self
    }

    pub fn with_densities(mut self, densities: impl IntoIterator<Item = f64>) -> Self {
        self.densities = densities.into_iter().collect();
        self
    }

    pub fn with_reductions(mut self, reductions: impl IntoIterator<Item = ReduceMethod>) -> Self {
        self.reductions = reductions.into_iter().collect();
        self
    }

    pub fn with_n_dims(mut self, n_dims: impl IntoIterator<Item = usize>) -> Self {
        self.n_dims = n_dims.into_iter().collect();
        self
    }

    pub fn with_distances(mut self, distances: impl IntoIterator<Item = DistanceMetric>) -> Self {
        self.distances = distances.into_iter().collect();
        self
    }

    /// Number of combinations [`expand`](Self::expand) will produce.
    pub fn len(&self) -> usize {
        self.expand().len()
    }

    /// True when the grid produces no combination.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Cartesian product of all axes.
    ///
    /// `n_dims` only multiplies combinations that actually reduce; a
    /// `ReduceMethod::None` entry appears once per outer combination.
    pub fn expand(&self) -> Vec<SweepParams> {
        let ks = optional_axis(&self.ks);
        let densities = optional_axis(&self.densities);
        let reductions = if self.reductions.is_empty() {
            vec![ReduceMethod::None]
        } else {
            self.reductions.clone()
        };
        let dims = optional_axis(&self.n_dims);
        let distances = if self.distances.is_empty() {
            vec![DistanceMetric::default()]
        } else {
            self.distances.clone()
        };

        let mut combinations = Vec::new();
        for strategy in &self.strategies {
            for &k in &ks {
                for &density in &densities {
                    for &reduction in &reductions {
                        let dim_axis: &[Option<usize>] = if reduction == ReduceMethod::None {
                            &[None]
                        } else {
                            &dims
                        };
                        for &n_dims in dim_axis {
                            for &distance in &distances {
                                combinations.push(SweepParams {
                                    strategy: strategy.clone(),
                                    k,
                                    density,
                                    distance,
                                    reduction,
                                    n_dims,
                                });
                            }
                        }
                    }
                }
            }
        }
        combinations
    }
}

fn optional_axis<T: Copy>(values: &[T]) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}
