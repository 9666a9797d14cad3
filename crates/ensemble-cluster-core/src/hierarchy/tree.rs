//! Node-indexed binary tree over cluster labels.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::labels::ClusterLabel;
use crate::linkage::{Dendrogram, Merge};

/// One node of a [`ClusterHierarchy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Position in the node arena.
    pub id: usize,
    /// Parent node, `None` for the root.
    pub parent: Option<usize>,
    /// `(left, right)` child ids, `None` for a leaf.
    pub children: Option<(usize, usize)>,
    /// Merge height (0 for leaves).
    pub height: f64,
    /// Cluster labels of every leaf beneath this node, left subtree first.
    pub leaves: Vec<ClusterLabel>,
}

impl HierarchyNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Binary tree whose leaves are clusters.
///
/// Leaves occupy ids `0..C` in the order their labels were given; the node
/// created by merge `m` has id `C + m`. Parent links and the bottom-up order
/// are resolved once at construction and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HierarchyRepr", into = "HierarchyRepr")]
pub struct ClusterHierarchy {
    n_leaves: usize,
    nodes: Vec<HierarchyNode>,
    bottom_up: Vec<usize>,
}

impl ClusterHierarchy {
    /// Tree from a dendrogram over items labelled `leaf_labels`.
    pub fn from_dendrogram(
        leaf_labels: Vec<ClusterLabel>,
        dendrogram: &Dendrogram,
    ) -> EnsembleResult<Self> {
        if dendrogram.n_leaves() != leaf_labels.len() {
            return Err(EnsembleError::hierarchy(format!(
                "dendrogram has {} leaves but {} labels were given",
                dendrogram.n_leaves(),
                leaf_labels.len()
            )));
        }
        Self::from_merges(leaf_labels, dendrogram.merges())
    }

    /// Tree from leaf labels and a merge sequence.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Hierarchy` if labels are negative or repeated,
    /// the merge count is not `C - 1`, or a merge references a node that does
    /// not exist yet or already has a parent.
    pub fn from_merges(leaf_labels: Vec<ClusterLabel>, merges: &[Merge]) -> EnsembleResult<Self> {
        let c = leaf_labels.len();
        let mut seen = BTreeSet::new();
        for &label in &leaf_labels {
            if label < 0 || !seen.insert(label) {
                return Err(EnsembleError::hierarchy(format!(
                    "leaf labels must be distinct and non-negative, got {:?}",
                    leaf_labels
                )));
            }
        }
        let expected = c.saturating_sub(1);
        if merges.len() != expected {
            return Err(EnsembleError::hierarchy(format!(
                "{} leaves need {} merges, got {}",
                c,
                expected,
                merges.len()
            )));
        }

        let mut nodes: Vec<HierarchyNode> = leaf_labels
            .iter()
            .enumerate()
            .map(|(id, &label)| HierarchyNode {
                id,
                parent: None,
                children: None,
                height: 0.0,
                leaves: vec![label],
            })
            .collect();

        for (m, merge) in merges.iter().enumerate() {
            let id = c + m;
            let (left, right) = (merge.left, merge.right);
            for child in [left, right] {
                if child >= id {
                    return Err(EnsembleError::hierarchy(format!(
                        "merge {} references node {} which does not exist yet",
                        m, child
                    )));
                }
                if nodes[child].parent.is_some() {
                    return Err(EnsembleError::hierarchy(format!(
                        "merge {} reuses node {} which already has a parent",
                        m, child
                    )));
                }
            }
            if left == right {
                return Err(EnsembleError::hierarchy(format!(
                    "merge {} joins node {} with itself",
                    m, left
                )));
            }
            nodes[left].parent = Some(id);
            nodes[right].parent = Some(id);
            let mut leaves = nodes[left].leaves.clone();
            leaves.extend_from_slice(&nodes[right].leaves);
            nodes.push(HierarchyNode {
                id,
                parent: None,
                children: Some((left, right)),
                height: merge.height,
                leaves,
            });
        }

        // Order by height, never before a child even if stored heights dip.
        let mut effective = vec![0.0f64; nodes.len()];
        for node in &nodes[c..] {
            if let Some((l, r)) = node.children {
                effective[node.id] = node.height.max(effective[l]).max(effective[r]);
            }
        }
        let mut bottom_up: Vec<usize> = (c..nodes.len()).collect();
        bottom_up.sort_by(|&a, &b| effective[a].total_cmp(&effective[b]).then(a.cmp(&b)));

        Ok(Self {
            n_leaves: c,
            nodes,
            bottom_up,
        })
    }

    /// Number of leaves (clusters).
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Number of internal nodes, `C - 1` for `C > 0` leaves.
    #[inline]
    pub fn n_internal(&self) -> usize {
        self.nodes.len() - self.n_leaves
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node, leaves first.
    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    /// Root id, `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    /// Leaf labels in leaf-id order.
    pub fn leaf_labels(&self) -> Vec<ClusterLabel> {
        self.nodes[..self.n_leaves]
            .iter()
            .map(|n| n.leaves[0])
            .collect()
    }

    /// Leaf id carrying `label`.
    pub fn leaf_of(&self, label: ClusterLabel) -> Option<usize> {
        self.nodes[..self.n_leaves]
            .iter()
            .position(|n| n.leaves[0] == label)
    }

    /// Internal node ids by increasing merge height (ties by id).
    ///
    /// Every node appears after both of its children.
    pub fn bottom_up(&self) -> &[usize] {
        &self.bottom_up
    }

    /// Internal nodes in bottom-up order.
    pub fn internal_nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.bottom_up.iter().map(move |&id| &self.nodes[id])
    }

    /// Leaf-label sets of the two children of an internal node.
    pub fn children_leaf_sets(&self, id: usize) -> Option<(&[ClusterLabel], &[ClusterLabel])> {
        let (left, right) = self.nodes.get(id)?.children?;
        Some((&self.nodes[left].leaves, &self.nodes[right].leaves))
    }

    /// Merge sequence equivalent to this tree.
    pub fn merges(&self) -> Vec<Merge> {
        self.nodes[self.n_leaves..]
            .iter()
            .filter_map(|n| {
                n.children.map(|(left, right)| Merge {
                    left,
                    right,
                    height: n.height,
                    size: n.leaves.len(),
                })
            })
            .collect()
    }

    /// Restrict the tree to a coarser partition.
    ///
    /// `mapping` sends every leaf label to its coarse label. Each coarse
    /// cluster must be exactly the leaf set of one subtree; that subtree
    /// becomes a single leaf and the nodes above keep their heights.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Hierarchy` if a leaf label is missing from
    /// `mapping` or a coarse cluster is split across subtrees.
    pub fn collapse(
        &self,
        mapping: &BTreeMap<ClusterLabel, ClusterLabel>,
    ) -> EnsembleResult<ClusterHierarchy> {
        // Coarse label of each node whose leaves all map to one label.
        let mut group: Vec<Option<ClusterLabel>> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let g = match node.children {
                None => {
                    let label = node.leaves[0];
                    Some(*mapping.get(&label).ok_or_else(|| {
                        EnsembleError::hierarchy(format!("leaf label {} has no mapping", label))
                    })?)
                }
                Some((l, r)) => match (group[l], group[r]) {
                    (Some(a), Some(b)) if a == b => Some(a),
                    _ => None,
                },
            };
            group.push(g);
        }

        // Topmost node of each coarse cluster becomes a new leaf.
        let mut new_leaf: BTreeMap<ClusterLabel, usize> = BTreeMap::new();
        for node in &self.nodes {
            let Some(g) = group[node.id] else { continue };
            let parent_same = node.parent.map_or(false, |p| group[p] == Some(g));
            if parent_same {
                continue;
            }
            if let Some(previous) = new_leaf.insert(g, node.id) {
                return Err(EnsembleError::hierarchy(format!(
                    "coarse cluster {} spans separate subtrees (nodes {} and {})",
                    g, previous, node.id
                )));
            }
        }

        let leaf_labels: Vec<ClusterLabel> = new_leaf.keys().copied().collect();
        let mut new_id: BTreeMap<usize, usize> = new_leaf
            .values()
            .enumerate()
            .map(|(i, &old)| (old, i))
            .collect();

        let mut sizes = vec![1usize; leaf_labels.len()];
        let mut merges = Vec::new();
        for node in &self.nodes[self.n_leaves..] {
            if group[node.id].is_some() {
                continue;
            }
            let Some((l, r)) = node.children else { continue };
            let (Some(&left), Some(&right)) = (new_id.get(&l), new_id.get(&r)) else {
                return Err(EnsembleError::hierarchy(format!(
                    "node {} has a child outside the collapsed tree",
                    node.id
                )));
            };
            new_id.insert(node.id, sizes.len());
            sizes.push(sizes[left] + sizes[right]);
            merges.push(Merge {
                left,
                right,
                height: node.height,
                size: sizes[left] + sizes[right],
            });
        }

        Self::from_merges(leaf_labels, &merges)
    }
}

/// Serialized form: leaf labels plus the merge sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HierarchyRepr {
    leaves: Vec<ClusterLabel>,
    merges: Vec<Merge>,
}

impl TryFrom<HierarchyRepr> for ClusterHierarchy {
    type Error = EnsembleError;

    fn try_from(repr: HierarchyRepr) -> Result<Self, Self::Error> {
        Self::from_merges(repr.leaves, &repr.merges)
    }
}

impl From<ClusterHierarchy> for HierarchyRepr {
    fn from(tree: ClusterHierarchy) -> Self {
        Self {
            leaves: tree.leaf_labels(),
            merges: tree.merges(),
        }
    }
}
