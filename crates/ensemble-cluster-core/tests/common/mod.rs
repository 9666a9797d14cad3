//! Shared fixtures for integration tests.
//!
//! Everything here is deterministic: matrices come from a seeded ChaCha8
//! stream, the strategy is a pure function of the matrix, and providers
//! compute their answers from group means.

#![allow(dead_code)]

use std::sync::Arc;

use ensemble_cluster_core::contrast::{Contrast, ContrastKind};
use ensemble_cluster_core::labels::{is_noise, ClusterLabel};
use ensemble_cluster_core::sweep::{SweepParams, StrategyRegistry};
use ensemble_cluster_core::{
    ClusteringStrategy, DiffTestProvider, FeatureMatrix, FeatureTestResult, ProviderError,
    StrategyError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Consecutive groups of `sizes[g]` samples around `centers[g]`, with
/// uniform noise in [-0.2, 0.2) on every value.
pub fn grouped_matrix(sizes: &[usize], centers: &[f64], n_features: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = sizes
        .iter()
        .zip(centers)
        .flat_map(|(&size, &center)| std::iter::repeat(center).take(size))
        .map(|center| {
            (0..n_features)
                .map(|_| center + rng.gen_range(-0.2..0.2))
                .collect()
        })
        .collect();
    FeatureMatrix::from_rows(&rows, false).expect("fixture matrix is valid")
}

/// Labels `0, 0, .., 1, 1, ..` for consecutive groups of the given sizes.
pub fn group_labels(sizes: &[usize]) -> Vec<ClusterLabel> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(g, &size)| std::iter::repeat(g as ClusterLabel).take(size))
        .collect()
}

/// Orders samples by row mean and cuts at the `k - 1` widest gaps.
pub struct GapStrategy;

impl ClusteringStrategy for GapStrategy {
    fn cluster(
        &self,
        matrix: &FeatureMatrix,
        params: &SweepParams,
    ) -> Result<Vec<ClusterLabel>, StrategyError> {
        let n = matrix.n_samples();
        let k = params.k.unwrap_or(2);
        if k == 0 || k >= n {
            return Err(StrategyError::invalid_params(format!("k = {} with {} samples", k, n)));
        }

        let means: Vec<f64> = (0..n)
            .map(|s| matrix.row(s).iter().sum::<f64>() / matrix.n_features() as f64)
            .collect();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| means[a].total_cmp(&means[b]).then(a.cmp(&b)));

        let mut gaps: Vec<(f64, usize)> = order
            .windows(2)
            .enumerate()
            .map(|(pos, w)| (means[w[1]] - means[w[0]], pos))
            .collect();
        gaps.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut cuts: Vec<usize> = gaps.iter().take(k - 1).map(|&(_, pos)| pos).collect();
        cuts.sort_unstable();

        let mut labels = vec![0; n];
        let mut segment = 0;
        for (pos, &sample) in order.iter().enumerate() {
            labels[sample] = segment;
            if cuts.contains(&pos) {
                segment += 1;
            }
        }
        Ok(labels)
    }
}

/// Always panics.
pub fn panicking_strategy(_: &FeatureMatrix, _: &SweepParams) -> Result<Vec<ClusterLabel>, StrategyError> {
    panic!("strategy crashed")
}

pub fn registry() -> StrategyRegistry {
    StrategyRegistry::new()
        .with("gap", Arc::new(GapStrategy))
        .with("panics", Arc::new(panicking_strategy))
}

/// Same p-value for every feature.
pub struct ConstantProvider(pub f64);

impl DiffTestProvider for ConstantProvider {
    fn test(
        &self,
        matrix: &FeatureMatrix,
        _partition: &[ClusterLabel],
        _contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        Ok((0..matrix.n_features())
            .map(|f| FeatureTestResult::new(f, 0.0, self.0, self.0))
            .collect())
    }
}

/// p = exp(-gap) between weighted group means, Bonferroni adjusted.
pub struct MeanGapProvider;

impl DiffTestProvider for MeanGapProvider {
    fn test(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        let d = matrix.n_features();
        let mean_of = |label: ClusterLabel, f: usize| {
            let values: Vec<f64> = partition
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == label)
                .map(|(s, _)| matrix.get(s, f))
                .collect();
            values.iter().sum::<f64>() / values.len().max(1) as f64
        };

        Ok((0..d)
            .map(|f| {
                let gap = match &contrast.kind {
                    ContrastKind::Groups { .. } => contrast
                        .coefficients
                        .iter()
                        .map(|(&label, &w)| w * mean_of(label, f))
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
                            .map(|&c| (mean_of(c, f) - grand).abs())
                            .fold(0.0, f64::max)
                    }
                };
                let raw = (-gap).exp().clamp(0.0, 1.0);
                FeatureTestResult::new(f, gap, raw, (raw * d as f64).min(1.0))
            })
            .collect())
    }
}
