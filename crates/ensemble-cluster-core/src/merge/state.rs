//! Per-node merge state and the decisions recorded during a pass.

use serde::{Deserialize, Serialize};

use crate::labels::ClusterLabel;

/// Which adjusted p-value defines a node's significance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// Minimum provider-adjusted p-value over the node's features.
    #[default]
    #[serde(alias = "PerNode", alias = "per-node", alias = "adjP")]
    PerNode,
    /// Raw p-values of every node and feature adjusted jointly with
    /// Benjamini-Hochberg, then the minimum per node.
    #[serde(alias = "AcrossAll", alias = "across-all")]
    AcrossAll,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerNode => "per_node",
            Self::AcrossAll => "across_all",
        }
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an internal node: `Pending -> Tested -> Merged | Rejected`.
///
/// A node whose test failed goes straight from `Pending` to `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Tested,
    Merged,
    Rejected,
}

impl NodeState {
    /// `Merged` and `Rejected` are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Merged | Self::Rejected)
    }
}

/// Audit record for one internal node of the consensus hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    /// Node id in the hierarchy.
    pub node: usize,
    pub height: f64,
    /// Consensus clusters under the left child.
    pub left: Vec<ClusterLabel>,
    /// Consensus clusters under the right child.
    pub right: Vec<ClusterLabel>,
    /// Adjusted p-value the decision was made on; `None` if the test failed.
    pub significance: Option<f64>,
    /// Statistic of the feature that produced `significance`.
    pub statistic: Option<f64>,
    pub state: NodeState,
    /// Label every sample under the node carries after a merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_label: Option<ClusterLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Significance reached the cutoff but a child was not a single unit.
    #[serde(default)]
    pub blocked: bool,
}

impl MergeDecision {
    pub fn is_merged(&self) -> bool {
        self.state == NodeState::Merged
    }

    /// Every consensus cluster under the node.
    pub fn clusters(&self) -> impl Iterator<Item = ClusterLabel> + '_ {
        self.left.iter().chain(&self.right).copied()
    }
}
