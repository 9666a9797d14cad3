//! `hierarchy` command: feature matrix + partition -> cluster hierarchy JSON.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use ensemble_cluster_core::hierarchy::HierarchyBuilder;
use ensemble_cluster_core::ClusterLabel;

use super::{load_config, read_json, write_json, MatrixFile};

/// Arguments for the hierarchy command
#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// JSON feature matrix: `[[row...], ...]` or `{"rows", "feature_names", "feature_ids"}`
    #[arg(short, long)]
    pub matrix: PathBuf,

    /// JSON label vector, one label per matrix row
    #[arg(short, long)]
    pub partition: PathBuf,
}

pub fn hierarchy_command(args: HierarchyArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let matrix = read_json::<MatrixFile>(&args.matrix)?.into_matrix(config.input.is_count)?;
    let partition: Vec<ClusterLabel> = read_json(&args.partition)?;

    let tree = HierarchyBuilder::new(config.hierarchy)?.build(&matrix, &partition)?;
    write_json(&tree)
}
