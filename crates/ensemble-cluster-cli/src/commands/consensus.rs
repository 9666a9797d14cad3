//! `consensus` command: label matrix JSON -> consensus partition JSON.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::info;

use ensemble_cluster_core::consensus::{build_consensus, CoClusterMatrix, ConsensusPartition};
use ensemble_cluster_core::labels::PartitionSummary;

use super::{load_config, read_json, write_json, LabelsFile};

/// Arguments for the consensus command
#[derive(Args, Debug)]
pub struct ConsensusArgs {
    /// JSON label matrix: `[[labels...], ...]` or `[{"name", "labels"}, ...]`
    #[arg(short, long)]
    pub labels: PathBuf,

    /// Override combine_min_size from the configuration
    #[arg(long)]
    pub min_size: Option<usize>,

    /// Include the co-clustering matrix in the output
    #[arg(long)]
    pub with_coclustering: bool,
}

#[derive(Debug, Serialize)]
struct ConsensusReport {
    partition: ConsensusPartition,
    summary: PartitionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    coclustering: Option<CoClusterMatrix>,
}

pub fn consensus_command(args: ConsensusArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(min_size) = args.min_size {
        config.consensus.combine_min_size = min_size;
    }

    let labels = read_json::<LabelsFile>(&args.labels)?.into_matrix()?;
    config.validate_for(labels.n_samples())?;
    info!(
        samples = labels.n_samples(),
        labelings = labels.len(),
        "building consensus"
    );

    let output = build_consensus(&labels, &config.consensus)?;
    let summary = output.partition.summary();
    info!(clusters = summary.num_clusters(), unassigned = summary.unassigned, "consensus built");

    write_json(&ConsensusReport {
        partition: output.partition,
        summary,
        coclustering: args.with_coclustering.then_some(output.coclustering),
    })
}
