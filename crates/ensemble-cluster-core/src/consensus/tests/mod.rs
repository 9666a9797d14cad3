//! Tests for co-clustering consensus.
//!
//! - `helpers` - label matrix fixtures
//! - `coclustering_tests` - CoClusterMatrix counting and invariants
//! - `extraction_tests` - ConsensusBuilder cuts, filters and edge cases

mod helpers;
