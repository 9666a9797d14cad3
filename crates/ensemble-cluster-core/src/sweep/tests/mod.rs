//! Tests for the parameter sweep.
//!
//! - `grid_tests` - ParameterGrid expansion and combination labels
//! - `runner_tests` - SweepRunner ordering, failure policy and reduction
