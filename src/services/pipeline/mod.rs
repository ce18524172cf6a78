//! Analysis Pipeline
//!
//! discovery -> per-file tasks (scheduler) -> aggregator -> report.
//!
//! ## Module Organization
//!
//! - `discovery` - project walk and file filters
//! - `extractor` - regex-based lexical facts
//! - `prompt_builder` - bounded prompt units
//! - `response_parser` - best-effort structuring of model output
//! - `gateway` - permits, timeouts and retries around the provider
//! - `file_task` - the per-file pipeline
//! - `scheduler` - bounded worker pool with ordered results
//! - `aggregator` - project-level report

pub mod aggregator;
pub mod discovery;
pub mod extractor;
pub mod file_task;
pub mod gateway;
pub mod prompt_builder;
pub mod response_parser;
pub mod scheduler;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arch_insight_core::{AggregateReport, FileInsight, GatewayStats};
use arch_insight_llm::LlmProvider;
use chrono::Utc;

use crate::models::AnalyzerConfig;
use crate::utils::error::AppResult;

pub use aggregator::{assemble, Aggregator, RunContext};
pub use discovery::{discover_files, validate_root, DiscoveredFile};
pub use extractor::extract_facts;
pub use file_task::FileAnalyzer;
pub use gateway::{GatewayConfig, ModelGateway, RateLimit, RetryPolicy};
pub use prompt_builder::{PromptUnit, ResponseShape, SizeBudget};
pub use response_parser::{parse_response, ParsedResponse};
pub use scheduler::{PipelineScheduler, ScheduledRun, SchedulerConfig};

/// Everything one analysis produces.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub report: AggregateReport,
    /// One insight per scheduled file, in discovery order.
    pub insights: Vec<FileInsight>,
    pub gateway_stats: GatewayStats,
}

/// Wires the pipeline stages around one shared gateway.
pub struct AnalysisPipeline {
    config: AnalyzerConfig,
    gateway: Arc<ModelGateway>,
}

impl AnalysisPipeline {
    /// Validates the configuration before anything is scheduled.
    pub fn new(config: AnalyzerConfig, provider: Arc<dyn LlmProvider>) -> AppResult<Self> {
        config.validate()?;
        let gateway = Arc::new(ModelGateway::new(
            provider,
            GatewayConfig::from_analyzer(&config),
        ));
        Ok(Self { config, gateway })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Discover files under `root` and analyze them.
    pub async fn run(&self, root: &Path) -> AppResult<AnalysisRun> {
        let started = Instant::now();
        let files = discover_files(root, &self.config)?;
        let project_path = root.display().to_string();
        Ok(self.run_files_since(&project_path, files, started).await)
    }

    /// Analyze an already discovered file list.
    pub async fn run_files(&self, project_path: &str, files: Vec<DiscoveredFile>) -> AnalysisRun {
        self.run_files_since(project_path, files, Instant::now()).await
    }

    async fn run_files_since(
        &self,
        project_path: &str,
        files: Vec<DiscoveredFile>,
        started: Instant,
    ) -> AnalysisRun {
        let timestamp = Utc::now();
        let budget = SizeBudget::new(self.config.content_char_budget, self.config.max_chunks);
        let analyzer = FileAnalyzer::new(Arc::clone(&self.gateway), budget);
        let scheduler = PipelineScheduler::new(analyzer, SchedulerConfig::from_analyzer(&self.config));

        let scheduled = scheduler.run(files).await;

        let aggregator = Aggregator::new(Arc::clone(&self.gateway));
        let ctx = RunContext {
            project_path: project_path.to_string(),
            files_skipped: scheduled.files_skipped,
            elapsed_ms: started.elapsed().as_millis() as u64,
            timestamp,
        };
        let report = aggregator.aggregate(&scheduled.insights, ctx).await;
        let gateway_stats = self.gateway.stats();

        tracing::info!(
            analyzed = report.files_analyzed,
            failed = report.files_failed,
            skipped = report.files_skipped,
            patterns = report.pattern_index.len(),
            calls = gateway_stats.calls,
            narrative = ?report.narrative_source,
            "analysis complete"
        );

        AnalysisRun {
            report,
            insights: scheduled.insights,
            gateway_stats,
        }
    }
}
