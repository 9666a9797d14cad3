//! Contrast generation for a final partition.

use std::collections::BTreeSet;

use crate::error::{EnsembleError, EnsembleResult};
use crate::hierarchy::ClusterHierarchy;
use crate::labels::{cluster_sizes, ClusterLabel};

use super::types::{Contrast, ContrastType};

fn join(labels: &[ClusterLabel]) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Contrasts of `kind` over the non-negative clusters of `partition`.
///
/// | kind | contrasts for C clusters |
/// |---|---|
/// | `F` | 1 |
/// | `Pairs` | C(C-1)/2 |
/// | `OneAgainstAll` | C |
/// | `Dendro` | C-1, one per internal node of `hierarchy` |
///
/// # Errors
///
/// Returns `EnsembleError::Contrast` for fewer than 2 clusters, or for
/// `Dendro` without a hierarchy whose leaves are exactly the clusters.
pub fn generate_contrasts(
    kind: ContrastType,
    partition: &[ClusterLabel],
    hierarchy: Option<&ClusterHierarchy>,
) -> EnsembleResult<Vec<Contrast>> {
    let sizes = cluster_sizes(partition);
    let clusters: Vec<ClusterLabel> = sizes.keys().copied().collect();
    if clusters.len() < 2 {
        return Err(EnsembleError::contrast(format!(
            "contrasts need at least 2 clusters, partition has {}",
            clusters.len()
        )));
    }

    let contrasts = match kind {
        ContrastType::F => vec![Contrast::omnibus("F", clusters)],
        ContrastType::Pairs => {
            let mut out = Vec::with_capacity(clusters.len() * (clusters.len() - 1) / 2);
            for (i, &a) in clusters.iter().enumerate() {
                for &b in &clusters[i + 1..] {
                    out.push(Contrast::groups(format!("{}_vs_{}", a, b), vec![a], vec![b], &sizes)?);
                }
            }
            out
        }
        ContrastType::OneAgainstAll => clusters
            .iter()
            .map(|&a| {
                let rest: Vec<ClusterLabel> = clusters.iter().copied().filter(|&c| c != a).collect();
                Contrast::groups(format!("{}_vs_rest", a), vec![a], rest, &sizes)
            })
            .collect::<EnsembleResult<Vec<_>>>()?,
        ContrastType::Dendro => {
            let tree = hierarchy.ok_or_else(|| {
                EnsembleError::contrast("dendro contrasts need a cluster hierarchy")
            })?;
            let leaves: BTreeSet<ClusterLabel> = tree.leaf_labels().into_iter().collect();
            if !leaves.iter().copied().eq(clusters.iter().copied()) {
                return Err(EnsembleError::contrast(format!(
                    "hierarchy leaves {:?} do not match partition clusters {:?}",
                    leaves, clusters
                )));
            }
            tree.bottom_up()
                .iter()
                .filter_map(|&id| tree.children_leaf_sets(id).map(|sets| (id, sets)))
                .map(|(id, (left, right))| {
                    Contrast::groups(
                        format!("node{}:{}_vs_{}", id, join(left), join(right)),
                        left.to_vec(),
                        right.to_vec(),
                        &sizes,
                    )
                })
                .collect::<EnsembleResult<Vec<_>>>()?
        }
    };

    tracing::debug!(kind = %kind, contrasts = contrasts.len(), "contrasts generated");
    Ok(contrasts)
}
