//! Pipeline Scheduler
//!
//! Runs one task per file on a bounded worker pool and joins the results
//! into a pre-sized slot vector keyed by discovery index, so output order
//! never depends on completion order. A global deadline stops the join;
//! unfinished tasks are aborted and recorded as `Failed(GlobalTimeout)`.

use std::sync::Arc;
use std::time::Duration;

use arch_insight_core::{FactSet, FailureReason, FileInsight};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::discovery::DiscoveredFile;
use super::file_task::FileAnalyzer;
use crate::models::AnalyzerConfig;

/// Scheduler limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_files: usize,
    pub worker_pool_size: usize,
    pub global_timeout: Duration,
}

impl SchedulerConfig {
    pub fn from_analyzer(config: &AnalyzerConfig) -> Self {
        Self {
            max_files: config.max_files,
            worker_pool_size: config.worker_pool_size.max(1),
            global_timeout: Duration::from_millis(config.global_timeout_ms),
        }
    }
}

/// Scheduler output: one insight per scheduled file, in discovery order.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub insights: Vec<FileInsight>,
    /// Files beyond `max_files`, never analyzed.
    pub files_skipped: usize,
    pub total_discovered: usize,
    /// Whether the global deadline cut the run short.
    pub timed_out: bool,
}

pub struct PipelineScheduler {
    analyzer: FileAnalyzer,
    config: SchedulerConfig,
}

impl PipelineScheduler {
    pub fn new(analyzer: FileAnalyzer, config: SchedulerConfig) -> Self {
        Self { analyzer, config }
    }

    /// Analyze the first `max_files` files and collect their insights.
    pub async fn run(&self, files: Vec<DiscoveredFile>) -> ScheduledRun {
        let total_discovered = files.len();
        let scheduled = total_discovered.min(self.config.max_files);
        let files_skipped = total_discovered - scheduled;
        let deadline = Instant::now() + self.config.global_timeout;

        tracing::info!(
            discovered = total_discovered,
            scheduled,
            skipped = files_skipped,
            workers = self.config.worker_pool_size,
            "scheduling file analysis"
        );

        let scheduled_files: Vec<DiscoveredFile> = files.into_iter().take(scheduled).collect();
        let mut slots: Vec<Option<FileInsight>> = (0..scheduled).map(|_| None).collect();
        let pool = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let mut set = JoinSet::new();

        for (index, file) in scheduled_files.iter().cloned().enumerate() {
            let analyzer = self.analyzer.clone();
            let pool = Arc::clone(&pool);
            set.spawn(async move {
                let insight = run_worker(analyzer, pool, file, deadline).await;
                (index, insight)
            });
        }

        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((index, insight)))) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(insight);
                    }
                }
                Ok(Some(Err(err))) => {
                    tracing::error!(error = %err, "file task ended without a result");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(
                        timeout_ms = self.config.global_timeout.as_millis() as u64,
                        outstanding = set.len(),
                        "global timeout reached, cancelling outstanding files"
                    );
                    set.abort_all();
                    break;
                }
            }
        }
        drop(set);

        let insights: Vec<FileInsight> = slots
            .into_iter()
            .zip(scheduled_files)
            .map(|(slot, file)| match slot {
                Some(insight) => insight,
                None => {
                    let reason = if timed_out {
                        FailureReason::GlobalTimeout
                    } else {
                        FailureReason::TaskAborted {
                            message: "worker ended without a result".to_string(),
                        }
                    };
                    FileInsight::failed(
                        file.path.clone(),
                        FactSet::empty(file.path, file.size_bytes),
                        reason,
                    )
                }
            })
            .collect();

        let failed = insights.iter().filter(|i| i.is_failed()).count();
        tracing::info!(
            analyzed = insights.len() - failed,
            failed,
            skipped = files_skipped,
            timed_out,
            "file analysis finished"
        );

        ScheduledRun {
            insights,
            files_skipped,
            total_discovered,
            timed_out,
        }
    }
}

async fn run_worker(
    analyzer: FileAnalyzer,
    pool: Arc<Semaphore>,
    file: DiscoveredFile,
    deadline: Instant,
) -> FileInsight {
    let _worker = match pool.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return FileInsight::failed(
                file.path.clone(),
                FactSet::empty(file.path, file.size_bytes),
                FailureReason::TaskAborted {
                    message: "worker pool closed".to_string(),
                },
            )
        }
    };
    if Instant::now() >= deadline {
        return FileInsight::failed(
            file.path.clone(),
            FactSet::empty(file.path, file.size_bytes),
            FailureReason::GlobalTimeout,
        );
    }

    match tokio::fs::read(&file.abs_path).await {
        Ok(bytes) => analyzer.analyze_bytes(&file.path, bytes).await,
        Err(err) => {
            tracing::warn!(file = %file.path, error = %err, "cannot read file");
            FileInsight::failed(
                file.path.clone(),
                FactSet::empty(file.path, file.size_bytes),
                FailureReason::Unreadable {
                    message: err.to_string(),
                },
            )
        }
    }
}
