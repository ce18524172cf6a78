//! `analyze` command
//!
//! Loads configuration, builds the provider, runs the pipeline and writes
//! the rendered report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arch_insight_llm::{create_provider, LlmProvider, ProviderType};
use clap::Args;

use crate::models::AnalyzerConfig;
use crate::services::pipeline::{AnalysisPipeline, AnalysisRun};
use crate::services::report::{render, ReportFormat};
use crate::utils::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Root directory of the project to analyze
    pub project_path: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (markdown or json)
    #[arg(short, long, default_value = "markdown")]
    pub format: ReportFormat,

    /// Maximum number of files to analyze
    #[arg(long)]
    pub max_files: Option<usize>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model id (OpenAI) or deployment name (Azure)
    #[arg(long)]
    pub model: Option<String>,

    /// Provider (openai or azure)
    #[arg(long)]
    pub provider: Option<ProviderType>,

    /// Maximum concurrent model calls
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl AnalyzeArgs {
    /// Defaults, then file, then environment, then flags.
    pub fn resolve_config<F>(&self, env: F) -> AppResult<AnalyzerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AnalyzerConfig::load(self.config.as_deref())?;
        config.apply_env(env)?;
        if let Some(max_files) = self.max_files {
            config.max_files = max_files;
        }
        if let Some(model) = &self.model {
            config.model_id = model.clone();
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent_calls = max_concurrent;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.per_call_timeout_ms = timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the command against the real provider selected by configuration.
pub async fn run(args: &AnalyzeArgs) -> AppResult<AnalysisRun> {
    let env = |key: &str| std::env::var(key).ok();
    let config = args.resolve_config(env)?;
    crate::services::pipeline::validate_root(&args.project_path)?;

    let provider = create_provider(config.provider_config(env)?)?;
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        max_files = config.max_files,
        "starting analysis"
    );
    run_with_provider(args, config, provider).await
}

/// Run with an explicit provider and write the report.
pub async fn run_with_provider(
    args: &AnalyzeArgs,
    config: AnalyzerConfig,
    provider: Arc<dyn LlmProvider>,
) -> AppResult<AnalysisRun> {
    let pipeline = AnalysisPipeline::new(config, provider)?;
    let run = pipeline.run(&args.project_path).await?;

    let rendered = render(
        args.format,
        &run.report,
        &run.insights,
        Some(&run.gateway_stats),
    )?;
    match &args.output {
        Some(path) => {
            write_report(path, &rendered)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{}", rendered),
    }
    Ok(run)
}

fn write_report(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}
