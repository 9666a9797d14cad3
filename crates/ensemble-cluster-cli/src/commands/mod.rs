//! CLI command handlers
//!
//! # Modules
//!
//! - `consensus`: label matrix -> consensus partition
//! - `hierarchy`: feature matrix + partition -> cluster hierarchy
//! - `contrasts`: partition (+ hierarchy) -> contrast specifications
//!
//! Shared file formats live here so every command reads them the same way.

pub mod consensus;
pub mod contrasts;
pub mod hierarchy;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ensemble_cluster_core::{ClusterLabel, FeatureMatrix, LabelMatrix, Labeling, PipelineConfig};

/// Configuration from `path`, or the layered default sources.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => PipelineConfig::load().context("loading layered configuration"),
    }
}

/// Deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing JSON from {}", path.display()))
}

/// Pretty-print `value` as JSON on stdout.
pub fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("writing JSON to stdout")?;
    writeln!(out).context("writing JSON to stdout")?;
    Ok(())
}

/// A label matrix on disk: bare label vectors or named labelings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelsFile {
    Bare(Vec<Vec<ClusterLabel>>),
    Named(Vec<Labeling>),
}

impl LabelsFile {
    pub fn into_matrix(self) -> Result<LabelMatrix> {
        let matrix = match self {
            Self::Bare(rows) => LabelMatrix::from_rows(rows)?,
            Self::Named(labelings) => {
                let n = labelings.first().map(|l| l.labels.len()).unwrap_or(0);
                LabelMatrix::new(n, labelings)?
            }
        };
        Ok(matrix)
    }
}

/// A feature matrix on disk: one row per sample.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MatrixFile {
    Rows(Vec<Vec<f64>>),
    Annotated {
        rows: Vec<Vec<f64>>,
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        #[serde(default)]
        feature_ids: Option<Vec<usize>>,
    },
}

impl MatrixFile {
    /// Build the matrix; `is_count` comes from configuration.
    pub fn into_matrix(self, is_count: bool) -> Result<FeatureMatrix> {
        let (rows, names, ids) = match self {
            Self::Rows(rows) => (rows, None, None),
            Self::Annotated {
                rows,
                feature_names,
                feature_ids,
            } => (rows, feature_names, feature_ids),
        };
        let mut matrix = FeatureMatrix::from_rows(&rows, is_count)?;
        if let Some(ids) = ids {
            matrix = matrix.with_feature_ids(ids)?;
        }
        if let Some(names) = names {
            matrix = matrix.with_feature_names(names)?;
        }
        Ok(matrix)
    }
}
