use std::collections::BTreeMap;
use std::sync::Arc;

use super::*;
use crate::config::MergeConfig;
use crate::contrast::Contrast;
use crate::error::EnsembleError;
use crate::hierarchy::ClusterHierarchy;
use crate::labels::{num_clusters, ClusterLabel};
use crate::matrix::FeatureMatrix;
use crate::test_helpers::{group_labels, grouped_matrix, join, ConstantProvider, SingularProvider};
use crate::traits::{DiffTestProvider, FeatureTestResult, ProviderError};

/// Adjusted p-value chosen per node from its two sides.
struct SidesProvider<F> {
    p: F,
}

impl<F> DiffTestProvider for SidesProvider<F>
where
    F: Fn(&[ClusterLabel], &[ClusterLabel]) -> f64 + Send + Sync,
{
    fn test(
        &self,
        matrix: &FeatureMatrix,
        _partition: &[ClusterLabel],
        contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        let p = (self.p)(contrast.left(), contrast.right());
        Ok((0..matrix.n_features())
            .map(|f| FeatureTestResult::new(f, 1.0, p, p))
            .collect())
    }
}

/// Raw p-values fixed per column, adjusted p-values all 1.0.
struct RawOnlyProvider {
    raw: Vec<f64>,
}

impl DiffTestProvider for RawOnlyProvider {
    fn test(
        &self,
        _matrix: &FeatureMatrix,
        _partition: &[ClusterLabel],
        _contrast: &Contrast,
    ) -> Result<Vec<FeatureTestResult>, ProviderError> {
        Ok(self
            .raw
            .iter()
            .enumerate()
            .map(|(f, &p)| FeatureTestResult::new(f, 2.0, p, 1.0))
            .collect())
    }
}

/// ((0, 1) at 1.0, (2, 3) at 2.0) joined at 5.0.
fn four_cluster_tree() -> ClusterHierarchy {
    let merges = [
        join(0, 1, 1.0, 2),
        join(2, 3, 2.0, 2),
        join(4, 5, 5.0, 4),
    ];
    ClusterHierarchy::from_merges(vec![0, 1, 2, 3], &merges).unwrap()
}

fn merger(
    provider: Arc<dyn DiffTestProvider>,
    cutoff: f64,
    method: MergeMethod,
) -> HierarchicalMerger {
    let config = MergeConfig {
        merge_cutoff: cutoff,
        merge_method: method,
    };
    HierarchicalMerger::new(provider, config).unwrap()
}

fn fixture() -> (FeatureMatrix, Vec<ClusterLabel>, ClusterHierarchy) {
    (grouped_matrix(&[2, 2, 2, 2], 3, 17), group_labels(&[2, 2, 2, 2]), four_cluster_tree())
}

#[test]
fn test_indistinguishable_clusters_merge() {
    let matrix = grouped_matrix(&[3, 3], 4, 3);
    let partition = group_labels(&[3, 3]);
    let tree = ClusterHierarchy::from_merges(vec![0, 1], &[join(0, 1, 1.0, 2)]).unwrap();

    println!("[BEFORE] consensus clusters={}", num_clusters(&partition));
    let outcome = merger(Arc::new(ConstantProvider { p: 1.0 }), 0.01, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    println!("[AFTER]  final labels={:?}", outcome.final_labels);

    assert_eq!(outcome.final_labels, vec![0; 6]);
    assert!(outcome.num_clusters() < num_clusters(&partition));
    assert_eq!(outcome.decisions.len(), 1);
    assert_eq!(outcome.decisions[0].state, NodeState::Merged);
    assert_eq!(outcome.decisions[0].merged_label, Some(0));
    println!("[VERIFIED] p=1.0 at cutoff 0.01 merges");
}

#[test]
fn test_cutoff_boundary_is_inclusive() {
    let (matrix, partition, tree) = fixture();

    let at = merger(Arc::new(ConstantProvider { p: 0.05 }), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    assert!(at.decisions.iter().all(|d| d.state == NodeState::Merged));
    assert_eq!(at.num_clusters(), 1);

    let below = merger(Arc::new(ConstantProvider { p: 0.049_999 }), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    assert!(below.decisions.iter().all(|d| d.state == NodeState::Rejected));
    assert_eq!(below.final_labels, partition);

    let above = merger(Arc::new(ConstantProvider { p: 0.050_001 }), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    assert_eq!(above.merged_count(), 3);
    println!("[VERIFIED] p == cutoff merges, p just below rejects");
}

#[test]
fn test_selective_merge_keeps_lowest_label() {
    let (matrix, partition, tree) = fixture();
    let provider = SidesProvider {
        p: |left: &[ClusterLabel], right: &[ClusterLabel]| match (left, right) {
            ([0], [1]) => 0.9,
            _ => 0.001,
        },
    };

    let outcome = merger(Arc::new(provider), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    for d in &outcome.decisions {
        println!(
            "  node {} {:?} vs {:?}: {:?} {:?}",
            d.node, d.left, d.right, d.significance, d.state
        );
    }

    assert_eq!(outcome.final_labels, vec![0, 0, 0, 0, 2, 2, 3, 3]);
    let expected: BTreeMap<ClusterLabel, ClusterLabel> = [(0, 0), (1, 0), (2, 2), (3, 3)].into();
    assert_eq!(outcome.mapping, expected);
    let states: Vec<NodeState> = outcome.decisions.iter().map(|d| d.state).collect();
    assert_eq!(states, vec![NodeState::Merged, NodeState::Rejected, NodeState::Rejected]);

    let collapsed = outcome.collapsed_hierarchy(&tree).unwrap();
    assert_eq!(collapsed.leaf_labels(), vec![0, 2, 3]);
    assert_eq!(collapsed.n_internal(), 2);
    println!(
        "[VERIFIED] merged groups take the lowest label; hierarchy collapses to {:?}",
        collapsed.leaf_labels()
    );
}

#[test]
fn test_rejected_split_stays_apart_in_ancestors() {
    let (matrix, partition, tree) = fixture();
    let provider = SidesProvider {
        p: |left: &[ClusterLabel], _right: &[ClusterLabel]| {
            if left == [0] {
                0.001
            } else {
                0.9
            }
        },
    };

    let outcome = merger(Arc::new(provider), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    for d in &outcome.decisions {
        println!(
            "  node {} {:?} vs {:?}: {:?} {:?} blocked={}",
            d.node, d.left, d.right, d.significance, d.state, d.blocked
        );
    }

    let states: Vec<NodeState> = outcome.decisions.iter().map(|d| d.state).collect();
    assert_eq!(states, vec![NodeState::Rejected, NodeState::Merged, NodeState::Rejected]);

    let root = &outcome.decisions[2];
    assert!(root.blocked);
    assert_eq!(root.significance, Some(0.9));
    assert!(root.merged_label.is_none());
    assert!(!outcome.decisions[0].blocked, "rejected on its own p-value");

    assert_eq!(outcome.final_labels, vec![0, 0, 1, 1, 2, 2, 2, 2]);
    assert_ne!(outcome.final_labels[0], outcome.final_labels[2]);
    println!("[VERIFIED] clusters 0 and 1 stay distinct above their rejected node");
}

#[test]
fn test_blocked_node_blocks_its_own_ancestors() {
    let (matrix, partition, _) = fixture();
    // (((0, 1), 2), 3)
    let merges = [join(0, 1, 1.0, 2), join(4, 2, 2.0, 3), join(5, 3, 3.0, 4)];
    let chain = ClusterHierarchy::from_merges(vec![0, 1, 2, 3], &merges).unwrap();
    let provider = SidesProvider {
        p: |left: &[ClusterLabel], right: &[ClusterLabel]| {
            if left == [0] && right == [1] {
                0.001
            } else {
                0.9
            }
        },
    };

    let outcome = merger(Arc::new(provider), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &chain)
        .unwrap();

    let blocked: Vec<bool> = outcome.decisions.iter().map(|d| d.blocked).collect();
    assert_eq!(blocked, vec![false, true, true]);
    assert_eq!(outcome.merged_count(), 0);
    assert_eq!(outcome.final_labels, partition);
    println!("[VERIFIED] a rejected split blocks every node above it");
}

#[test]
fn test_failed_node_test_is_rejected() {
    let (matrix, partition, tree) = fixture();
    let outcome = merger(Arc::new(SingularProvider), 0.0, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();

    for d in &outcome.decisions {
        assert_eq!(d.state, NodeState::Rejected);
        assert!(d.significance.is_none());
        assert!(d.failure.as_deref().unwrap_or("").contains("Singular"));
    }
    assert_eq!(outcome.final_labels, partition);
    println!("[VERIFIED] missing evidence never merges, even at cutoff 0");
}

#[test]
fn test_across_all_adjusts_jointly() {
    let (matrix, partition, tree) = fixture();
    let provider: Arc<dyn DiffTestProvider> = Arc::new(RawOnlyProvider {
        raw: vec![0.001, 0.5, 0.5],
    });

    let per_node = merger(provider.clone(), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    assert_eq!(per_node.merged_count(), 3);

    let across = merger(provider, 0.05, MergeMethod::AcrossAll)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    println!(
        "[AFTER] across-all significance: {:?}",
        across.decisions.iter().map(|d| d.significance).collect::<Vec<_>>()
    );

    // 9 pooled raw p-values; the three 0.001s adjust to 0.001 * 9 / 3.
    for d in &across.decisions {
        let q = d.significance.unwrap();
        assert!((q - 0.003).abs() < 1e-12, "{}", q);
        assert_eq!(d.state, NodeState::Rejected);
        assert_eq!(d.statistic, Some(2.0));
    }
    assert_eq!(across.method, MergeMethod::AcrossAll);
    println!("[VERIFIED] BH over every node changes the outcome");
}

#[test]
fn test_noise_samples_stay_unassigned() {
    let matrix = grouped_matrix(&[3, 3, 3], 3, 5);
    let partition = vec![0, 0, -1, 1, 1, 1, -1, 2, 2];
    let merges = [
        join(0, 1, 1.0, 2),
        join(3, 2, 3.0, 3),
    ];
    let tree = ClusterHierarchy::from_merges(vec![0, 1, 2], &merges).unwrap();

    let outcome = merger(Arc::new(ConstantProvider { p: 1.0 }), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();
    assert_eq!(outcome.final_labels, vec![0, 0, -1, 0, 0, 0, -1, 0, 0]);
    assert_eq!(outcome.summary().unassigned, 2);
}

#[test]
fn test_final_partition_is_traceable_coarsening() {
    let (matrix, partition, tree) = fixture();
    let provider = SidesProvider {
        p: |left: &[ClusterLabel], right: &[ClusterLabel]| {
            if left.len() + right.len() == 2 && left[0] + right[0] == 5 {
                0.5
            } else {
                0.0
            }
        },
    };
    let outcome = merger(Arc::new(provider), 0.1, MergeMethod::PerNode)
        .merge(&matrix, &partition, &tree)
        .unwrap();

    // Union-find over consensus clusters joined by merged decisions.
    let mut parent: BTreeMap<ClusterLabel, ClusterLabel> = (0..4).map(|l| (l, l)).collect();
    fn find(parent: &mut BTreeMap<ClusterLabel, ClusterLabel>, x: ClusterLabel) -> ClusterLabel {
        let p = parent[&x];
        if p == x {
            return x;
        }
        let root = find(parent, p);
        parent.insert(x, root);
        root
    }
    for d in outcome.decisions.iter().filter(|d| d.is_merged()) {
        let labels: Vec<ClusterLabel> = d.clusters().collect();
        for pair in labels.windows(2) {
            let (a, b) = (find(&mut parent, pair[0]), find(&mut parent, pair[1]));
            parent.insert(a, b);
        }
    }

    for i in 0..partition.len() {
        for j in 0..partition.len() {
            if outcome.final_labels[i] == outcome.final_labels[j] {
                assert_eq!(find(&mut parent, partition[i]), find(&mut parent, partition[j]));
            }
        }
    }
    assert_eq!(outcome.num_clusters(), 3);
    println!("[VERIFIED] every shared final label traces to merged nodes");
}

#[test]
fn test_preview_matches_merge_decisions() {
    let (matrix, partition, tree) = fixture();
    let m = merger(Arc::new(ConstantProvider { p: 0.3 }), 0.05, MergeMethod::PerNode);
    let preview = m.preview(&matrix, &partition, &tree).unwrap();
    let outcome = m.merge(&matrix, &partition, &tree).unwrap();
    assert_eq!(preview, outcome.decisions);
    let heights: Vec<f64> = preview.iter().map(|d| d.height).collect();
    assert_eq!(heights, vec![1.0, 2.0, 5.0]);
}

#[test]
fn test_mismatched_inputs_fail_fast() {
    let (matrix, partition, tree) = fixture();
    let m = merger(Arc::new(ConstantProvider { p: 0.3 }), 0.05, MergeMethod::PerNode);

    let err = m.merge(&matrix, &partition[..7], &tree).unwrap_err();
    assert!(err.is_input_error());

    let three = vec![0, 0, 1, 1, 2, 2, 2, 2];
    let err = m.merge(&matrix, &three, &tree).unwrap_err();
    assert!(matches!(err, EnsembleError::Hierarchy { .. }));
    println!("[VERIFIED] FAIL FAST: {}", err);

    let bad = MergeConfig {
        merge_cutoff: 1.5,
        ..MergeConfig::default()
    };
    assert!(HierarchicalMerger::new(Arc::new(SingularProvider), bad).is_err());
}

#[test]
fn test_single_cluster_needs_no_decisions() {
    let matrix = grouped_matrix(&[4], 2, 1);
    let tree = ClusterHierarchy::from_merges(vec![0], &[]).unwrap();
    let outcome = merger(Arc::new(SingularProvider), 0.05, MergeMethod::PerNode)
        .merge(&matrix, &[0, 0, 0, 0], &tree)
        .unwrap();
    assert!(outcome.decisions.is_empty());
    assert_eq!(outcome.final_labels, vec![0; 4]);
    assert_eq!(outcome.num_clusters(), 1);
}

#[test]
fn test_merge_method_serde_names() {
    let m: MergeMethod = serde_json::from_str("\"across_all\"").unwrap();
    assert_eq!(m, MergeMethod::AcrossAll);
    let m: MergeMethod = serde_json::from_str("\"PerNode\"").unwrap();
    assert_eq!(m, MergeMethod::PerNode);
    assert_eq!(MergeMethod::default().to_string(), "per_node");
}
