//! Error types for ensemble clustering.
//!
//! Only fatal conditions are errors here:
//!
//! - [`InputError`]: malformed feature or label data, surfaced before any
//!   derived state is built
//! - [`EnsembleError::Configuration`]: contradictory or out-of-range parameters,
//!   surfaced at validation time
//!
//! Stage-local failures (a single failing parameter combination, a degenerate
//! consensus, a failing differential test) are recorded as structured results
//! by their stage and never travel through these types.

use thiserror::Error;

/// Malformed input data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    /// Matrix has no samples or no features.
    #[error("Empty matrix: {samples} samples x {features} features")]
    EmptyMatrix {
        /// Number of samples provided
        samples: usize,
        /// Number of features provided
        features: usize,
    },

    /// Value buffer length does not match the declared shape.
    #[error("Dimension mismatch: expected {expected}, actual {actual}")]
    DimensionMismatch {
        /// Expected element count
        expected: usize,
        /// Actual element count
        actual: usize,
    },

    /// A matrix entry is NaN or infinite.
    #[error("Non-finite value at sample {sample}, feature {feature}")]
    NonFinite {
        /// Sample (row) index
        sample: usize,
        /// Feature (column) index
        feature: usize,
    },

    /// Raw counts must not be negative.
    #[error("Negative count at sample {sample}, feature {feature}")]
    NegativeCount {
        /// Sample (row) index
        sample: usize,
        /// Feature (column) index
        feature: usize,
    },

    /// A labeling does not cover the shared sample universe.
    #[error("Labeling {index} has {actual} labels, expected {expected}")]
    LabelingLength {
        /// Position of the labeling in the label matrix
        index: usize,
        /// Number of samples in the universe
        expected: usize,
        /// Labels in this labeling
        actual: usize,
    },

    /// A label below the noise sentinel.
    #[error("Invalid label {label} at sample {sample} (labels must be >= -1)")]
    InvalidLabel {
        /// Offending sample
        sample: usize,
        /// Offending label
        label: i32,
    },
}

impl InputError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Top-level error for the ensemble clustering library.
#[derive(Debug, Error)]
pub enum EnsembleError {
    /// Malformed input data.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Contradictory or out-of-range parameters.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of what's wrong with the configuration
        message: String,
    },

    /// A partition does not line up with a cluster hierarchy.
    #[error("Hierarchy error: {message}")]
    Hierarchy {
        /// Description of the inconsistency
        message: String,
    },

    /// Contrast generation is impossible for the given partition.
    #[error("Contrast error: {message}")]
    Contrast {
        /// Description of the problem
        message: String,
    },

    /// Configuration source could not be read or parsed.
    #[error("Config load error: {0}")]
    ConfigLoad(String),
}

impl EnsembleError {
    /// Create a Configuration error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a Hierarchy error.
    pub fn hierarchy(message: impl Into<String>) -> Self {
        Self::Hierarchy {
            message: message.into(),
        }
    }

    /// Create a Contrast error.
    pub fn contrast(message: impl Into<String>) -> Self {
        Self::Contrast {
            message: message.into(),
        }
    }

    /// True for errors raised by input validation.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// True for errors raised by configuration validation or loading.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::ConfigLoad(_))
    }
}

impl From<config::ConfigError> for EnsembleError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigLoad(err.to_string())
    }
}

impl From<toml::de::Error> for EnsembleError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigLoad(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type EnsembleResult<T> = Result<T, EnsembleError>;
