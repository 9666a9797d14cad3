//! Parameter sweep: many clusterings of one matrix.
//!
//! # Failure Policy
//!
//! A combination whose strategy fails, panics, or returns a malformed
//! labeling is recorded as fully unassigned (-1 for every sample) plus a
//! [`SweepFailure`]. The remaining combinations are unaffected. Only an
//! unknown strategy name is fatal, and it is caught when the runner is built.

mod params;
mod registry;
mod runner;

#[cfg(test)]
mod tests;

pub use params::{ParameterGrid, SweepParams};
pub use registry::StrategyRegistry;
pub use runner::{
    CombinationSummary, FailureKind, SweepFailure, SweepOutput, SweepReport, SweepRunner,
};
