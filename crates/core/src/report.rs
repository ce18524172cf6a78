//! Project-level aggregate built from the per-file insights.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where the report narrative came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Model,
    Fallback,
}

/// The final, read-only analysis artifact.
///
/// Built exactly once by the aggregator. Map key order is the first-seen
/// order of the underlying insights, so two aggregations of the same input
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub project_path: String,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub narrative: String,
    pub narrative_source: NarrativeSource,
    pub pattern_index: IndexMap<String, Vec<String>>,
    pub quality_table: IndexMap<String, usize>,
    pub recommendations: Vec<String>,
}

impl AggregateReport {
    /// Every file the discovery step handed over, analyzed or not.
    pub fn total_files(&self) -> usize {
        self.files_analyzed + self.files_failed + self.files_skipped
    }

    /// Sum of all quality issues across analyzed files.
    pub fn total_issues(&self) -> usize {
        self.quality_table.values().sum()
    }
}

/// Snapshot of gateway call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStats {
    /// Logical gateway calls (one per `invoke`).
    pub calls: u64,
    /// Individual attempts sent to the provider, retries included.
    pub attempts: u64,
    /// Calls that ended in a failure outcome.
    pub failures: u64,
    /// Summed latency of every attempt, failed and timed-out ones included.
    pub total_latency_ms: u64,
}

impl GatewayStats {
    /// Mean latency per attempt, zero before the first attempt.
    pub fn mean_latency_ms(&self) -> u64 {
        if self.attempts == 0 {
            0
        } else {
            self.total_latency_ms / self.attempts
        }
    }
}
