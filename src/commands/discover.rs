//! `discover` command
//!
//! Lists the files an analysis would schedule, without calling the model.

use std::path::PathBuf;

use clap::Args;

use crate::models::AnalyzerConfig;
use crate::services::pipeline::{discover_files, DiscoveredFile};
use crate::utils::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Root directory of the project
    pub project_path: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of files that would be analyzed
    #[arg(long)]
    pub max_files: Option<usize>,
}

/// Discovered files split at the `max_files` cap.
#[derive(Debug, Clone)]
pub struct DiscoveryListing {
    pub scheduled: Vec<DiscoveredFile>,
    pub skipped: Vec<DiscoveredFile>,
}

pub fn run(args: &DiscoverArgs) -> AppResult<DiscoveryListing> {
    let mut config = AnalyzerConfig::load(args.config.as_deref())?;
    if let Some(max_files) = args.max_files {
        config.max_files = max_files;
    }
    let mut scheduled = discover_files(&args.project_path, &config)?;
    let cut = scheduled.len().min(config.max_files);
    let skipped = scheduled.split_off(cut);
    Ok(DiscoveryListing { scheduled, skipped })
}

pub fn render_listing(listing: &DiscoveryListing) -> String {
    let mut out = String::new();
    for file in &listing.scheduled {
        out.push_str(&format!("{}\t{} bytes\n", file.path, file.size_bytes));
    }
    for file in &listing.skipped {
        out.push_str(&format!("{}\t{} bytes\t(skipped)\n", file.path, file.size_bytes));
    }
    out.push_str(&format!(
        "{} file(s) to analyze, {} skipped\n",
        listing.scheduled.len(),
        listing.skipped.len()
    ));
    out
}
