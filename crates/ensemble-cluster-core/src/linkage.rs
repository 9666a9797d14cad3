//! Deterministic agglomerative clustering over a dissimilarity matrix.
//!
//! # Algorithm
//!
//! 1. Keep one active slot per cluster and, per slot, its nearest active
//!    neighbour among higher slots
//! 2. Merge the globally closest pair (ties: lowest slot, then lowest partner)
//! 3. Update distances to the merged cluster with the Lance-Williams formula
//!    for the chosen linkage
//! 4. Repeat until one cluster remains
//!
//! Node ids follow the usual dendrogram convention: leaves are `0..n`, the
//! cluster created by merge `m` is `n + m`. No randomness is involved, so
//! identical input always yields an identical dendrogram.

use serde::{Deserialize, Serialize};

use crate::metrics::DistanceMetric;

/// Linkage criterion for agglomeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Minimum pairwise distance.
    Single,
    /// Maximum pairwise distance.
    Complete,
    /// Mean pairwise distance (UPGMA).
    #[default]
    Average,
    /// Minimum increase in within-cluster variance.
    Ward,
}

impl Linkage {
    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Ward => "ward",
        }
    }
}

/// Symmetric dissimilarity matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Build from a pairwise function evaluated on the upper triangle.
    pub fn from_fn<F>(n: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = f(i, j);
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }
        Self { n, values }
    }

    /// Pairwise distances between points.
    pub fn from_points(points: &[Vec<f64>], metric: DistanceMetric) -> Self {
        Self::from_fn(points.len(), |i, j| metric.distance(&points[i], &points[j]))
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// True when there are no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between items `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }
}

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Node id of the first joined cluster (lower slot).
    pub left: usize,
    /// Node id of the second joined cluster.
    pub right: usize,
    /// Linkage distance at which they joined.
    pub height: f64,
    /// Number of leaves in the new cluster.
    pub size: usize,
}

/// Full merge history over `n_leaves` items.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Number of leaves.
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Merges in the order they happened.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat labels after applying every merge at or below `height`.
    ///
    /// Labels are `0..k`, numbered by each group's lowest item.
    pub fn cut_at_height(&self, height: f64) -> Vec<usize> {
        let applied = self
            .merges
            .iter()
            .take_while(|m| m.height <= height)
            .count();
        self.apply_merges(applied)
    }

    /// Flat labels with exactly `k` groups (clamped to `1..=n_leaves`).
    pub fn cut_to_count(&self, k: usize) -> Vec<usize> {
        let k = k.clamp(1, self.n_leaves.max(1));
        self.apply_merges(self.n_leaves.saturating_sub(k))
    }

    /// Union the leaves joined by the first `count` merges.
    fn apply_merges(&self, count: usize) -> Vec<usize> {
        let n = self.n_leaves;
        let mut uf = UnionFind::new(n);
        // Representative leaf of every node id, leaves first.
        let mut representative: Vec<usize> = (0..n).collect();
        for merge in &self.merges[..count] {
            let a = representative[merge.left];
            let b = representative[merge.right];
            uf.union(a, b);
            representative.push(a);
        }

        let mut labels = vec![0usize; n];
        let mut root_label: Vec<Option<usize>> = vec![None; n];
        let mut next = 0;
        for (i, label) in labels.iter_mut().enumerate() {
            let root = uf.find(i);
            *label = *root_label[root].get_or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
        }
        labels
    }
}

/// Union-find with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, i: usize, j: usize) {
        let (pi, pj) = (self.find(i), self.find(j));
        if pi == pj {
            return;
        }
        match self.rank[pi].cmp(&self.rank[pj]) {
            std::cmp::Ordering::Less => self.parent[pi] = pj,
            std::cmp::Ordering::Greater => self.parent[pj] = pi,
            std::cmp::Ordering::Equal => {
                self.parent[pj] = pi;
                self.rank[pi] += 1;
            }
        }
    }
}

/// Agglomerate all items of `distances` under `linkage`.
pub fn agglomerate(distances: &DistanceMatrix, linkage: Linkage) -> Dendrogram {
    let n = distances.len();
    if n < 2 {
        return Dendrogram {
            n_leaves: n,
            merges: Vec::new(),
        };
    }

    // Ward works on squared distances and reports heights on the original scale.
    let mut d: Vec<f64> = match linkage {
        Linkage::Ward => distances.values.iter().map(|v| v * v).collect(),
        _ => distances.values.clone(),
    };
    let at = |i: usize, j: usize| i * n + j;

    let mut active = vec![true; n];
    let mut node_id: Vec<usize> = (0..n).collect();
    let mut size = vec![1usize; n];
    let mut nearest: Vec<Option<(f64, usize)>> = vec![None; n];
    for (i, slot) in nearest.iter_mut().enumerate() {
        *slot = nearest_above(&d, &active, n, i);
    }

    let mut merges = Vec::with_capacity(n - 1);
    for step in 0..(n - 1) {
        // Global minimum: lowest distance, then lowest slot, then lowest partner.
        let mut best: Option<(f64, usize, usize)> = None;
        for (i, candidate) in nearest.iter().enumerate() {
            if !active[i] {
                continue;
            }
            if let Some((dist, j)) = *candidate {
                if best.map_or(true, |(bd, _, _)| dist < bd) {
                    best = Some((dist, i, j));
                }
            }
        }
        let Some((dist, i, j)) = best else {
            break;
        };

        let height = match linkage {
            Linkage::Ward => dist.max(0.0).sqrt(),
            _ => dist,
        };
        let (ni, nj) = (size[i], size[j]);
        merges.push(Merge {
            left: node_id[i],
            right: node_id[j],
            height,
            size: ni + nj,
        });

        // Lance-Williams update into slot i; slot j retires.
        for k in 0..n {
            if !active[k] || k == i || k == j {
                continue;
            }
            let (dik, djk) = (d[at(i, k)], d[at(j, k)]);
            let nk = size[k];
            let updated = match linkage {
                Linkage::Single => dik.min(djk),
                Linkage::Complete => dik.max(djk),
                Linkage::Average => (ni as f64 * dik + nj as f64 * djk) / (ni + nj) as f64,
                Linkage::Ward => {
                    ((ni + nk) as f64 * dik + (nj + nk) as f64 * djk - nk as f64 * dist)
                        / (ni + nj + nk) as f64
                }
            };
            d[at(i, k)] = updated;
            d[at(k, i)] = updated;
        }
        active[j] = false;
        nearest[j] = None;
        size[i] = ni + nj;
        node_id[i] = n + step;

        // Refresh nearest-neighbour entries touched by the merge.
        for k in 0..n {
            if !active[k] {
                continue;
            }
            let points_at_merged = matches!(nearest[k], Some((_, m)) if m == i || m == j);
            if k == i || points_at_merged {
                nearest[k] = nearest_above(&d, &active, n, k);
            } else if k < i {
                let candidate = (d[at(k, i)], i);
                let improves = match nearest[k] {
                    Some((bd, bj)) => candidate.0 < bd || (candidate.0 == bd && i < bj),
                    None => true,
                };
                if improves {
                    nearest[k] = Some(candidate);
                }
            }
        }
    }

    Dendrogram {
        n_leaves: n,
        merges,
    }
}

/// Closest active slot above `i`, ties to the lowest slot.
fn nearest_above(d: &[f64], active: &[bool], n: usize, i: usize) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for j in (i + 1)..n {
        if !active[j] {
            continue;
        }
        let dist = d[i * n + j];
        if best.map_or(true, |(bd, _)| dist < bd) {
            best = Some((dist, j));
        }
    }
    best
}
