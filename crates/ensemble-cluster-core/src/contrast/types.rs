//! Contrast specifications and ranked results.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::labels::ClusterLabel;

/// Contrast generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContrastType {
    /// One omnibus test over all clusters.
    #[default]
    #[serde(alias = "F")]
    F,
    /// Every unordered pair of clusters.
    #[serde(alias = "Pairs")]
    Pairs,
    /// Each cluster against all other samples.
    #[serde(alias = "OneAgainstAll", alias = "one-against-all")]
    OneAgainstAll,
    /// The two children of every internal hierarchy node.
    #[serde(alias = "Dendro")]
    Dendro,
}

impl ContrastType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F => "f",
            Self::Pairs => "pairs",
            Self::OneAgainstAll => "one_against_all",
            Self::Dendro => "dendro",
        }
    }
}

impl std::fmt::Display for ContrastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContrastType {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "f" => Ok(Self::F),
            "pairs" => Ok(Self::Pairs),
            "one_against_all" | "oneagainstall" => Ok(Self::OneAgainstAll),
            "dendro" => Ok(Self::Dendro),
            other => Err(EnsembleError::invalid_parameter(format!(
                "unknown contrast type '{}' (expected f, pairs, one_against_all or dendro)",
                other
            ))),
        }
    }
}

/// What a contrast compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContrastKind {
    /// Does any cluster mean differ from the grand mean.
    Omnibus { clusters: Vec<ClusterLabel> },
    /// Samples of the `left` clusters against samples of the `right` clusters.
    Groups {
        left: Vec<ClusterLabel>,
        right: Vec<ClusterLabel>,
    },
}

/// A named comparison handed to a [`DiffTestProvider`].
///
/// Group contrasts carry one coefficient per involved cluster: cluster
/// sample counts normalised to +1 over the left side and -1 over the right,
/// so the contrast compares the two pooled group means.
///
/// [`DiffTestProvider`]: crate::traits::DiffTestProvider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contrast {
    pub name: String,
    pub kind: ContrastKind,
    pub coefficients: BTreeMap<ClusterLabel, f64>,
}

impl Contrast {
    /// Omnibus contrast over `clusters`.
    pub fn omnibus(name: impl Into<String>, clusters: Vec<ClusterLabel>) -> Self {
        Self {
            name: name.into(),
            kind: ContrastKind::Omnibus { clusters },
            coefficients: BTreeMap::new(),
        }
    }

    /// Contrast of the pooled `left` clusters against the pooled `right` ones.
    ///
    /// # Errors
    ///
    /// Returns `EnsembleError::Contrast` if a side is empty, the sides
    /// overlap, or a cluster has no samples in `sizes`.
    pub fn groups(
        name: impl Into<String>,
        left: Vec<ClusterLabel>,
        right: Vec<ClusterLabel>,
        sizes: &BTreeMap<ClusterLabel, usize>,
    ) -> EnsembleResult<Self> {
        let name = name.into();
        if left.is_empty() || right.is_empty() {
            return Err(EnsembleError::contrast(format!(
                "contrast '{}' needs clusters on both sides",
                name
            )));
        }
        let left_set: BTreeSet<_> = left.iter().collect();
        if right.iter().any(|l| left_set.contains(l)) {
            return Err(EnsembleError::contrast(format!(
                "contrast '{}' has overlapping sides {:?} and {:?}",
                name, left, right
            )));
        }

        let side_total = |side: &[ClusterLabel]| -> EnsembleResult<usize> {
            side.iter().try_fold(0usize, |acc, label| match sizes.get(label) {
                Some(&n) if n > 0 => Ok(acc + n),
                _ => Err(EnsembleError::contrast(format!(
                    "contrast '{}' references cluster {} which has no samples",
                    name, label
                ))),
            })
        };
        let (left_total, right_total) = (side_total(&left)? as f64, side_total(&right)? as f64);

        let mut coefficients = BTreeMap::new();
        for label in &left {
            coefficients.insert(*label, sizes[label] as f64 / left_total);
        }
        for label in &right {
            coefficients.insert(*label, -(sizes[label] as f64) / right_total);
        }

        Ok(Self {
            name,
            kind: ContrastKind::Groups { left, right },
            coefficients,
        })
    }

    /// Left-side clusters (empty for omnibus contrasts).
    pub fn left(&self) -> &[ClusterLabel] {
        match &self.kind {
            ContrastKind::Groups { left, .. } => left,
            ContrastKind::Omnibus { .. } => &[],
        }
    }

    /// Right-side clusters (empty for omnibus contrasts).
    pub fn right(&self) -> &[ClusterLabel] {
        match &self.kind {
            ContrastKind::Groups { right, .. } => right,
            ContrastKind::Omnibus { .. } => &[],
        }
    }

    /// Every cluster the contrast touches.
    pub fn clusters(&self) -> Vec<ClusterLabel> {
        match &self.kind {
            ContrastKind::Omnibus { clusters } => clusters.clone(),
            ContrastKind::Groups { left, right } => left.iter().chain(right).copied().collect(),
        }
    }

    pub fn is_omnibus(&self) -> bool {
        matches!(self.kind, ContrastKind::Omnibus { .. })
    }
}

/// One retained feature of a contrast, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    /// 1-based rank by adjusted p-value.
    pub rank: usize,
    /// Column in the matrix handed to the provider.
    pub column: usize,
    /// Index of the feature in the original, unfiltered feature set.
    pub feature_id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub statistic: f64,
    pub raw_p: f64,
    pub adjusted_p: f64,
}

/// Outcome of testing one contrast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContrastStatus {
    Completed { features: Vec<RankedFeature> },
    Failed { reason: String },
}

/// A contrast and its ranked features (or why it failed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastResult {
    pub contrast: Contrast,
    pub status: ContrastStatus,
}

impl ContrastResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, ContrastStatus::Failed { .. })
    }

    /// Ranked features, empty when the contrast failed.
    pub fn features(&self) -> &[RankedFeature] {
        match &self.status {
            ContrastStatus::Completed { features } => features,
            ContrastStatus::Failed { .. } => &[],
        }
    }
}
