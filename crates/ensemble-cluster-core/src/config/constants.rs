//! Default values for every tunable of the pipeline.
//!
//! Grouped by stage so each default has a single source of truth shared by
//! the `Default` impls, the validation messages and the tests.

/// Co-clustering consensus defaults.
pub mod consensus {
    /// Minimum fraction of labelings in which two samples must share a
    /// cluster to be grouped (`combineProportion`).
    pub const COMBINE_PROPORTION: f64 = 0.7;

    /// Consensus clusters smaller than this are unassigned (`combineMinSize`).
    pub const COMBINE_MIN_SIZE: usize = 5;

    /// Labelings with fewer assigned samples are ignored.
    pub const MIN_ASSIGNED: usize = 1;

    /// Slack added to the proportion cut height to absorb rounding in
    /// `1 - proportion`.
    pub const CUT_TOLERANCE: f64 = 1e-12;
}

/// Cluster hierarchy defaults.
pub mod hierarchy {
    /// Number of most-dispersed features used for representative points.
    pub const N_DIMS: usize = 500;
}

/// Hierarchical merging defaults.
pub mod merge {
    /// Adjusted p-value at or above which two sibling groups merge.
    pub const MERGE_CUTOFF: f64 = 0.05;
}

/// Contrast ranking defaults.
pub mod contrast {
    /// Features retained per contrast.
    pub const NUMBER: usize = 20;
}
