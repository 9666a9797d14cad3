//! Pairwise co-clustering proportions.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::labels::{is_noise, ClusterLabel, LabelMatrix};
use crate::linkage::DistanceMatrix;

/// N x N matrix of co-clustering proportions.
///
/// Entry (i, j) is the fraction of the used labelings in which i and j
/// carry the same non-negative label. The diagonal is 1 and the matrix is
/// symmetric by construction (integer counts divided by the same total).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoClusterMatrix {
    n_samples: usize,
    values: Vec<f64>,
    labelings_used: Vec<usize>,
    assigned_fraction: Vec<f64>,
}

impl CoClusterMatrix {
    /// Count co-clustering over every labeling with at least `min_assigned`
    /// assigned samples.
    ///
    /// With no usable labeling every off-diagonal entry is 0.
    pub fn from_labels(labels: &LabelMatrix, min_assigned: usize) -> Self {
        let n = labels.n_samples();
        let used: Vec<usize> = labels
            .labelings()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.assigned_count() >= min_assigned)
            .map(|(i, _)| i)
            .collect();

        let skipped = labels.len() - used.len();
        if skipped > 0 {
            tracing::debug!(
                skipped,
                min_assigned,
                "labelings below the assigned-sample minimum left out of consensus"
            );
        }

        let rows: Vec<&[ClusterLabel]> = used
            .iter()
            .filter_map(|&i| labels.get(i))
            .map(|l| l.labels.as_slice())
            .collect();
        let total = rows.len();

        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let rows = &rows;
                (0..n).map(move |j| {
                    if i == j {
                        return 1.0;
                    }
                    if total == 0 {
                        return 0.0;
                    }
                    let together = rows
                        .iter()
                        .filter(|r| !is_noise(r[i]) && r[i] == r[j])
                        .count();
                    together as f64 / total as f64
                })
            })
            .collect();

        let assigned_fraction = (0..n)
            .map(|i| {
                if total == 0 {
                    0.0
                } else {
                    rows.iter().filter(|r| !is_noise(r[i])).count() as f64 / total as f64
                }
            })
            .collect();

        Self {
            n_samples: n,
            values,
            labelings_used: used,
            assigned_fraction,
        }
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Co-clustering proportion of samples `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n_samples + j]
    }

    /// All proportions for sample `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_samples..(i + 1) * self.n_samples]
    }

    /// Positions (in the label matrix) of the labelings that were counted.
    pub fn labelings_used(&self) -> &[usize] {
        &self.labelings_used
    }

    /// Fraction of counted labelings that assigned sample `i`.
    pub fn assigned_fraction(&self, i: usize) -> f64 {
        self.assigned_fraction[i]
    }

    /// True when the sample was assigned by at least one counted labeling.
    pub fn ever_assigned(&self, i: usize) -> bool {
        self.assigned_fraction[i] > 0.0
    }

    /// `1 - proportion` restricted to `samples`, in the given order.
    pub fn dissimilarity(&self, samples: &[usize]) -> DistanceMatrix {
        DistanceMatrix::from_fn(samples.len(), |a, b| 1.0 - self.get(samples[a], samples[b]))
    }

    /// Whether (i, j) equals (j, i) everywhere.
    pub fn is_symmetric(&self) -> bool {
        (0..self.n_samples)
            .all(|i| ((i + 1)..self.n_samples).all(|j| self.get(i, j) == self.get(j, i)))
    }
}
