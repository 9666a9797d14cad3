//! Ensemble Cluster Core Library
//!
//! Ensemble clustering of a samples × features matrix: many clusterings
//! under a parameter sweep are reconciled into one consensus partition,
//! consensus clusters are organised into a hierarchy and merged bottom-up
//! where a differential test finds no evidence of a difference, and the
//! final clusters are described by ranked per-feature contrasts.
//!
//! # Architecture
//!
//! This crate defines:
//! - Input types (`FeatureMatrix`, `LabelMatrix`) and their validation
//! - Injected capabilities (`ClusteringStrategy`, `DiffTestProvider`)
//! - One module per stage (`sweep`, `consensus`, `hierarchy`, `merge`, `contrast`)
//! - The end-to-end `EnsemblePipeline` and its `PipelineReport`
//! - Error types, result aliases and configuration structures
//!
//! Clustering algorithms and statistical models are not part of this crate;
//! callers register them through the two capability traits.
//!
//! # Example
//!
//! ```
//! use ensemble_cluster_core::config::ConsensusConfig;
//! use ensemble_cluster_core::consensus::build_consensus;
//! use ensemble_cluster_core::labels::LabelMatrix;
//!
//! let labels = LabelMatrix::from_rows(vec![
//!     vec![0, 0, 0, 1, 1, 1],
//!     vec![4, 4, 4, 2, 2, 2],
//!     vec![1, 1, 1, 0, 0, 0],
//! ])
//! .unwrap();
//! let config = ConsensusConfig {
//!     combine_min_size: 3,
//!     ..ConsensusConfig::default()
//! };
//! let output = build_consensus(&labels, &config).unwrap();
//! assert_eq!(output.partition.labels(), &[0, 0, 0, 1, 1, 1]);
//! ```

pub mod config;
pub mod consensus;
pub mod contrast;
pub mod error;
pub mod hierarchy;
pub mod labels;
pub mod linkage;
pub mod matrix;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod sweep;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{EnsembleError, EnsembleResult, InputError};
pub use labels::{ClusterLabel, LabelMatrix, Labeling, NOISE_LABEL};
pub use matrix::FeatureMatrix;
pub use pipeline::{EnsemblePipeline, PipelineReport, PipelineWarning};
pub use traits::{ClusteringStrategy, DiffTestProvider, FeatureTestResult, ProviderError, StrategyError};
