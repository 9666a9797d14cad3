//! Label matrix fixtures.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ConsensusConfig;
use crate::labels::{ClusterLabel, LabelMatrix};
use crate::test_helpers::group_labels;

/// `copies` labelings that each recover the groups exactly, with the label
/// ids rotated per copy so identity across labelings never matters.
pub fn perfect_labelings(sizes: &[usize], copies: usize) -> LabelMatrix {
    let base = group_labels(sizes);
    let k = sizes.len() as ClusterLabel;
    let rows = (0..copies)
        .map(|c| base.iter().map(|&l| (l + c as ClusterLabel) % k * 10).collect())
        .collect();
    LabelMatrix::from_rows(rows).expect("fixture labelings are valid")
}

/// Random labelings over `n` samples with roughly 20% noise.
pub fn random_labelings(n: usize, count: usize, k: ClusterLabel, seed: u64) -> LabelMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows = (0..count)
        .map(|_| {
            (0..n)
                .map(|_| {
                    if rng.gen_bool(0.2) {
                        -1
                    } else {
                        rng.gen_range(0..k)
                    }
                })
                .collect()
        })
        .collect();
    LabelMatrix::from_rows(rows).expect("fixture labelings are valid")
}

/// Consensus config with the given proportion and minimum size.
pub fn config(proportion: f64, min_size: usize) -> ConsensusConfig {
    ConsensusConfig {
        combine_proportion: proportion,
        combine_min_size: min_size,
        ..ConsensusConfig::default()
    }
}
