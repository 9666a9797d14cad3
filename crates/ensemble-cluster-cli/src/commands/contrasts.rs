//! `contrasts` command: partition (+ hierarchy for dendro) -> contrast JSON.
//!
//! Only generates the contrast specifications; testing them needs a
//! differential-test provider, which is supplied by library callers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use ensemble_cluster_core::contrast::{generate_contrasts, ContrastType};
use ensemble_cluster_core::hierarchy::ClusterHierarchy;
use ensemble_cluster_core::ClusterLabel;

use super::{load_config, read_json, write_json};

/// Arguments for the contrasts command
#[derive(Args, Debug)]
pub struct ContrastsArgs {
    /// JSON label vector
    #[arg(short, long)]
    pub partition: PathBuf,

    /// JSON cluster hierarchy (required for dendro contrasts)
    #[arg(long)]
    pub hierarchy: Option<PathBuf>,

    /// Contrast type: f, pairs, one_against_all or dendro (defaults to the configured type)
    #[arg(short = 't', long = "type")]
    pub contrast_type: Option<ContrastType>,
}

pub fn contrasts_command(args: ContrastsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let kind = args.contrast_type.unwrap_or(config.contrast.contrast_type);
    let partition: Vec<ClusterLabel> = read_json(&args.partition)?;

    let hierarchy = match &args.hierarchy {
        Some(path) => Some(read_json::<ClusterHierarchy>(path)?),
        None if kind == ContrastType::Dendro => bail!("dendro contrasts need --hierarchy"),
        None => None,
    };

    let contrasts = generate_contrasts(kind, &partition, hierarchy.as_ref())?;
    info!(contrast_type = %kind, count = contrasts.len(), "contrasts generated");
    write_json(&contrasts)
}
