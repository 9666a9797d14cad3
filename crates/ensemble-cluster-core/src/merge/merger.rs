//! Bottom-up merging of consensus clusters along their hierarchy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MergeConfig;
use crate::contrast::Contrast;
use crate::error::{EnsembleError, EnsembleResult, InputError};
use crate::hierarchy::ClusterHierarchy;
use crate::labels::{cluster_sizes, is_noise, validate_labels, ClusterLabel, PartitionSummary};
use crate::matrix::FeatureMatrix;
use crate::traits::{checked_test, DiffTestProvider, FeatureTestResult, ProviderError};

use super::correction::benjamini_hochberg;
use super::state::{MergeDecision, MergeMethod, NodeState};

/// Final partition and the audit trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// One label per sample; -1 samples of the consensus stay -1.
    pub final_labels: Vec<ClusterLabel>,
    /// One decision per internal node, in bottom-up order.
    pub decisions: Vec<MergeDecision>,
    /// Consensus cluster -> final cluster.
    pub mapping: BTreeMap<ClusterLabel, ClusterLabel>,
    pub cutoff: f64,
    pub method: MergeMethod,
}

impl MergeOutcome {
    pub fn num_clusters(&self) -> usize {
        self.mapping.values().collect::<BTreeSet<_>>().len()
    }

    pub fn merged_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_merged()).count()
    }

    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary::from_labels(&self.final_labels)
    }

    /// The consensus hierarchy restricted to the final clusters.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Hierarchy` if `tree` is not the hierarchy
    /// this outcome was computed on.
    pub fn collapsed_hierarchy(&self, tree: &ClusterHierarchy) -> EnsembleResult<ClusterHierarchy> {
        tree.collapse(&self.mapping)
    }
}

/// Node test result before the cutoff is applied.
struct NodeTest {
    node: usize,
    left: Vec<ClusterLabel>,
    right: Vec<ClusterLabel>,
    rows: Result<Vec<FeatureTestResult>, ProviderError>,
}

/// Walks a [`ClusterHierarchy`] bottom-up and merges sibling groups the
/// [`DiffTestProvider`] cannot tell apart.
///
/// # Decision rule
///
/// A node merges iff its significance is `>= merge_cutoff` and each child is
/// a single unit (a leaf or a merged node). A node above a rejected split is
/// rejected as `blocked`, so the two sides of a rejected node stay distinct
/// in every ancestor. A node whose test failed is rejected. Every sample
/// under a merged node takes the smallest consensus label beneath it, so
/// surviving labels keep their values.
///
/// Candidate groups depend only on the frozen hierarchy, so all node tests
/// run in parallel before the sequential walk, and the `AcrossAll`
/// correction is computed once over that fixed set.
#[derive(Clone)]
pub struct HierarchicalMerger {
    provider: Arc<dyn DiffTestProvider>,
    config: MergeConfig,
}

impl std::fmt::Debug for HierarchicalMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalMerger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HierarchicalMerger {
    /// # Errors
    ///
    /// Returns `EnsembleError::Configuration` if the cutoff is outside [0, 1].
    pub fn new(provider: Arc<dyn DiffTestProvider>, config: MergeConfig) -> EnsembleResult<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `partition` along `hierarchy`.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the partition does not cover the matrix, and
    /// `EnsembleError::Hierarchy` if the hierarchy leaves are not exactly the
    /// partition's clusters.
    pub fn merge(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        hierarchy: &ClusterHierarchy,
    ) -> EnsembleResult<MergeOutcome> {
        let (decisions, mapping) = self.decide(matrix, partition, hierarchy)?;

        let final_labels: Vec<ClusterLabel> = partition
            .iter()
            .map(|&label| {
                if is_noise(label) {
                    label
                } else {
                    mapping.get(&label).copied().unwrap_or(label)
                }
            })
            .collect();

        let outcome = MergeOutcome {
            final_labels,
            decisions,
            mapping,
            cutoff: self.config.merge_cutoff,
            method: self.config.merge_method,
        };
        tracing::info!(
            consensus_clusters = hierarchy.n_leaves(),
            final_clusters = outcome.num_clusters(),
            merged = outcome.merged_count(),
            "hierarchical merging complete"
        );
        Ok(outcome)
    }

    /// Decisions only; no partition is produced.
    pub fn preview(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        hierarchy: &ClusterHierarchy,
    ) -> EnsembleResult<Vec<MergeDecision>> {
        self.decide(matrix, partition, hierarchy).map(|(decisions, _)| decisions)
    }

    fn decide(
        &self,
        matrix: &FeatureMatrix,
        partition: &[ClusterLabel],
        hierarchy: &ClusterHierarchy,
    ) -> EnsembleResult<(Vec<MergeDecision>, BTreeMap<ClusterLabel, ClusterLabel>)> {
        if partition.len() != matrix.n_samples() {
            return Err(InputError::dimension_mismatch(matrix.n_samples(), partition.len()).into());
        }
        validate_labels(partition)?;
        let sizes = cluster_sizes(partition);
        let leaves: BTreeSet<ClusterLabel> = hierarchy.leaf_labels().into_iter().collect();
        if !leaves.iter().eq(sizes.keys()) {
            return Err(EnsembleError::hierarchy(format!(
                "hierarchy leaves {:?} do not match partition clusters {:?}",
                leaves,
                sizes.keys().collect::<Vec<_>>()
            )));
        }

        tracing::info!(
            nodes = hierarchy.n_internal(),
            cutoff = self.config.merge_cutoff,
            method = %self.config.merge_method,
            "testing hierarchy nodes"
        );

        let contrasts: Vec<(usize, Contrast)> = hierarchy
            .bottom_up()
            .iter()
            .filter_map(|&id| hierarchy.children_leaf_sets(id).map(|sets| (id, sets)))
            .map(|(id, (left, right))| {
                Contrast::groups(format!("node{}", id), left.to_vec(), right.to_vec(), &sizes)
                    .map(|c| (id, c))
            })
            .collect::<EnsembleResult<_>>()?;

        let tests: Vec<NodeTest> = contrasts
            .into_par_iter()
            .map(|(node, contrast)| {
                let rows = checked_test(self.provider.as_ref(), matrix, partition, &contrast);
                NodeTest {
                    node,
                    left: contrast.left().to_vec(),
                    right: contrast.right().to_vec(),
                    rows,
                }
            })
            .collect();

        let significance = self.significance(&tests);

        let mut states = vec![NodeState::Pending; tests.len()];
        let mut merged_nodes: BTreeSet<usize> = BTreeSet::new();
        let mut mapping: BTreeMap<ClusterLabel, ClusterLabel> = leaves.iter().map(|&l| (l, l)).collect();
        let mut decisions = Vec::with_capacity(tests.len());

        for (i, test) in tests.into_iter().enumerate() {
            let height = hierarchy.node(test.node).map(|n| n.height).unwrap_or(f64::NAN);
            let mut decision = MergeDecision {
                node: test.node,
                height,
                left: test.left,
                right: test.right,
                significance: None,
                statistic: None,
                state: NodeState::Pending,
                merged_label: None,
                failure: None,
                blocked: false,
            };

            match (&test.rows, significance[i]) {
                (Err(e), _) => {
                    tracing::warn!(node = test.node, error = %e, "node test failed, rejecting");
                    decision.failure = Some(e.to_string());
                    states[i] = NodeState::Rejected;
                }
                (Ok(_), None) => {
                    decision.failure = Some("provider returned no features".to_string());
                    states[i] = NodeState::Rejected;
                }
                (Ok(_), Some((p, statistic))) => {
                    states[i] = NodeState::Tested;
                    decision.significance = Some(p);
                    decision.statistic = Some(statistic);
                    let whole_children = hierarchy
                        .node(test.node)
                        .and_then(|n| n.children)
                        .map_or(false, |(l, r)| {
                            [l, r].iter().all(|&c| {
                                merged_nodes.contains(&c)
                                    || hierarchy.node(c).map_or(false, |n| n.is_leaf())
                            })
                        });
                    if p >= self.config.merge_cutoff && !whole_children {
                        tracing::debug!(
                            node = test.node,
                            significance = p,
                            "a descendant split was rejected, keeping sides apart"
                        );
                        decision.blocked = true;
                        states[i] = NodeState::Rejected;
                    } else if p >= self.config.merge_cutoff {
                        merged_nodes.insert(test.node);
                        let target = decision.clusters().min().unwrap_or(0);
                        for label in decision.clusters() {
                            mapping.insert(label, target);
                        }
                        decision.merged_label = Some(target);
                        states[i] = NodeState::Merged;
                    } else {
                        states[i] = NodeState::Rejected;
                    }
                }
            }

            decision.state = states[i];
            tracing::debug!(
                node = decision.node,
                height = decision.height,
                significance = ?decision.significance,
                state = ?decision.state,
                "node resolved"
            );
            decisions.push(decision);
        }

        debug_assert!(states.iter().all(NodeState::is_terminal));
        Ok((decisions, mapping))
    }

    /// Significance and matching statistic per node test, `None` when the
    /// test failed or returned no rows.
    fn significance(&self, tests: &[NodeTest]) -> Vec<Option<(f64, f64)>> {
        match self.config.merge_method {
            MergeMethod::PerNode => tests
                .iter()
                .map(|t| match &t.rows {
                    Ok(rows) => best(rows.iter().map(|r| (r.adjusted_p, r.statistic))),
                    Err(_) => None,
                })
                .collect(),
            MergeMethod::AcrossAll => {
                let pooled: Vec<f64> = tests
                    .iter()
                    .filter_map(|t| t.rows.as_ref().ok())
                    .flat_map(|rows| rows.iter().map(|r| r.raw_p))
                    .collect();
                let mut adjusted = benjamini_hochberg(&pooled).into_iter();
                tests
                    .iter()
                    .map(|t| match &t.rows {
                        Ok(rows) => {
                            let node_q: Vec<(f64, f64)> = rows
                                .iter()
                                .map(|r| (adjusted.next().unwrap_or(1.0), r.statistic))
                                .collect();
                            best(node_q.into_iter())
                        }
                        Err(_) => None,
                    })
                    .collect()
            }
        }
    }
}

/// Smallest p-value with its statistic; ties keep the first.
fn best(values: impl Iterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    values.fold(None, |acc, (p, stat)| match acc {
        Some((best_p, _)) if best_p <= p => acc,
        _ => Some((p, stat)),
    })
}
