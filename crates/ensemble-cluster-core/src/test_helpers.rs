//! Deterministic fixtures shared by unit tests: seeded matrices, a
//! rank-based strategy and a few test providers.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::contrast::{Contrast, ContrastKind};
use crate::labels::{is_noise, ClusterLabel};
use crate::linkage::Merge;
use crate::matrix::FeatureMatrix;
use crate::sweep::SweepParams;
use crate::traits::{ClusteringStrategy, DiffTestProvider, FeatureTestResult, ProviderError, StrategyError};

/// Labels `0, 0, .., 1, 1, ..` for consecutive groups of the given sizes.
pub fn group_labels(sizes: &[usize]) -> Vec<ClusterLabel> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(g, &size)| std::iter::repeat(g as ClusterLabel).take(size))
        .collect()
}

/// One dendrogram step joining nodes `left` and `right`.
pub fn join(left: usize, right: usize, height: f64, size: usize) -> Merge {
    Merge {
        left,
        right,
        height,
        size,
    }
}

/// Matrix whose consecutive sample groups sit around `10 * centers[g]`.
///
/// Each value gets uniform noise in [-0.5, 0.5) from a seeded ChaCha8 stream.
pub fn centered_matrix(sizes: &[usize], centers: &[f64], n_features: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = sizes
        .iter()
        .zip(centers)
        .flat_map(|(&size, &center)| std::iter::repeat(center).take(size))
        .map(|center| {
            (0..n_features)
                .map(|_| 10.0 * center + rng.gen_range(-0.5..0.5))
                .collect()
        })
        .collect();
    FeatureMatrix::from_rows(&rows, false).expect("fixture matrix is valid")
}

/// Matrix with groups centered at 0, 1, 2, ... (well separated).
pub fn grouped_matrix(sizes: &[usize], n_features: usize, seed: u64) -> FeatureMatrix {
    let centers: Vec<f64> = (0..sizes.len()).map(|g| g as f64).collect();
    centered_matrix(sizes, &centers, n_features, seed)
}

/// Splits samples into `k` contiguous chunks by rank of their row mean.
///
/// Rejects `k == 0` and `k >= n_samples` the way a real strategy must.
pub struct RankStrategy;

impl ClusteringStrategy for RankStrategy {
    fn cluster(
        &self,
        matrix: &FeatureMatrix,
        params: &SweepParams,
    ) -> Result<Vec<ClusterLabel>, StrategyError> {
        let n = matrix.n_samples();
        let k = params.k.unwrap_or(2);
        if k == 0 || k >= n {
            return Err(StrategyError::invalid_params(format!(
                "k ({}) must be in 1..{}",
                k, n
            )));
        }
        let means: Vec<f64> = (0..n)
            .map(|s| matrix.row(s).iter().sum::<f64>() / matrix.n_features() as f64)
            .collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| means[a].total_cmp(&means[b]).then(a.cmp(&b)));
        let mut labels = vec![0; n];
        for (rank, &sample) in order.iter().enumerate() {
            labels[sample] = (rank * k / n) as ClusterLabel;
        }
        Ok(labels)
    }
}

/// Returns the same p-value for every feature.
pub struct ConstantProvider {
    pub p: f64,
}

impl DiffTestProvider for ConstantProvider {
    fn test(
        &self,
        matrix: &FeatureMatrix,
        _partition: &[ClusterLabel],
        _contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        Ok((0..matrix.n_features())
            .map(|f| FeatureTestResult::new(f, 0.0, self.p, self.p))
            .collect())
    }
}

/// Always fails with a singular design.
pub struct SingularProvider;

impl DiffTestProvider for SingularProvider {
    fn test(
        &self,
        _matrix: &FeatureMatrix,
        _partition: &[ClusterLabel],
        contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        Err(ProviderError::Singular(format!("no residual degrees of freedom for {}", contrast.name)))
    }
}

/// Scores each feature by the gap between weighted cluster means.
///
/// Group contrasts use the contrast coefficients; omnibus contrasts use the
/// largest distance of a cluster mean from the grand mean. The p-value is
/// `exp(-gap)`, adjusted by Bonferroni, so clearly separated groups get tiny
/// p-values and identical groups get 1.0.
pub struct MeanGapProvider;

impl DiffTestProvider for MeanGapProvider {
    fn test(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        let d = matrix.n_features();
        let mut results = Vec::with_capacity(d);
        for f in 0..d {
            let cluster_mean = |label: ClusterLabel| {
                let values: Vec<f64> = partition
                    .iter()
                    .enumerate()
                    .filter(|(_, &l)| l == label)
                    .map(|(s, _)| matrix.get(s, f))
                    .collect();
                values.iter().sum::<f64>() / values.len().max(1) as f64
            };
            let gap = match &contrast.kind {
                ContrastKind::Groups { .. } => contrast
                    .coefficients
                    .iter()
                    .map(|(&label, &w)| w * cluster_mean(label))
                    .sum::<f64>()
                    .abs(),
                ContrastKind::Omnibus { clusters } => {
                    let assigned: Vec<f64> = partition
                        .iter()
                        .enumerate()
                        .filter(|(_, &l)| !is_noise(l))
                        .map(|(s, _)| matrix.get(s, f))
                        .collect();
                    let grand = assigned.iter().sum::<f64>() / assigned.len().max(1) as f64;
                    clusters
                        .iter()
                        .map(|&c| (cluster_mean(c) - grand).abs())
                        .fold(0.0, f64::max)
                }
            };
            let raw = (-gap).exp().clamp(0.0, 1.0);
            let adjusted = (raw * d as f64).min(1.0);
            results.push(FeatureTestResult::new(f, gap, raw, adjusted));
        }
        Ok(results)
    }
}
