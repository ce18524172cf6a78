//! Arch Insight CLI
//!
//! Usage:
//!     arch-insight analyze ./my-project --output report.md
//!     arch-insight discover ./my-project

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use arch_insight::commands::{analyze, discover, AnalyzeArgs, DiscoverArgs};
use arch_insight::utils::logging;

#[derive(Parser, Debug)]
#[command(
    name = "arch-insight",
    version,
    about = "LLM-assisted architecture analysis for source trees"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, global = true, env = logging::ENV_LOG_DIR)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a project and write the architecture report
    Analyze(AnalyzeArgs),
    /// List the files an analysis would include
    Discover(DiscoverArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed.
    let _log_guard = logging::init(cli.verbose, cli.log_dir.as_deref())
        .context("failed to initialise logging")?;

    match cli.command {
        Command::Analyze(args) => {
            let run = analyze::run(&args)
                .await
                .with_context(|| format!("analysis of {} failed", args.project_path.display()))?;
            eprintln!(
                "Analyzed {} file(s), {} failed, {} skipped in {:.2}s",
                run.report.files_analyzed,
                run.report.files_failed,
                run.report.files_skipped,
                run.report.elapsed_ms as f64 / 1000.0
            );
        }
        Command::Discover(args) => {
            let listing = discover::run(&args)
                .with_context(|| format!("discovery in {} failed", args.project_path.display()))?;
            print!("{}", discover::render_listing(&listing));
        }
    }

    Ok(())
}
