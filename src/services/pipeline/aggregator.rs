//! Aggregator
//!
//! Folds the ordered `FileInsight` list into one `AggregateReport`.
//! [`assemble`] is pure; [`Aggregator::aggregate`] adds the single narrative
//! model call and falls back to a templated summary when it fails.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arch_insight_core::{AggregateReport, FileInsight, ModelOutcome, NarrativeSource};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::gateway::ModelGateway;
use super::prompt_builder::build_summary_unit;
use crate::utils::text::{collapse_whitespace, normalize_key};

/// Upper bound on the digest sent for the narrative.
const DIGEST_MAX_CHARS: usize = 24_000;

/// Everything besides the insights that the report records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub project_path: String,
    pub files_skipped: usize,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}

pub struct Aggregator {
    gateway: Arc<ModelGateway>,
}

impl Aggregator {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Build the report, spending at most one model call on the narrative.
    pub async fn aggregate(&self, insights: &[FileInsight], ctx: RunContext) -> AggregateReport {
        let narrative = self.narrative(insights, &ctx.project_path).await;
        assemble(insights, ctx, narrative)
    }

    async fn narrative(&self, insights: &[FileInsight], project_path: &str) -> Option<String> {
        if !insights.iter().any(FileInsight::is_analyzed) {
            tracing::info!("no analyzed files, using templated narrative");
            return None;
        }

        let unit = build_summary_unit(project_path, &build_digest(insights));
        match self.gateway.invoke(&unit).await {
            ModelOutcome::Success { text, latency_ms } => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::warn!("narrative response was empty, using templated narrative");
                    None
                } else {
                    tracing::info!(latency_ms, "narrative generated");
                    Some(text.to_string())
                }
            }
            ModelOutcome::Failure {
                kind,
                attempts,
                last_error,
            } => {
                tracing::warn!(
                    kind = %kind,
                    attempts,
                    error = %last_error,
                    "narrative call failed, using templated narrative"
                );
                None
            }
        }
    }
}

/// Pure report construction. `narrative` is the model text, if any.
pub fn assemble(
    insights: &[FileInsight],
    ctx: RunContext,
    narrative: Option<String>,
) -> AggregateReport {
    let files_analyzed = insights.iter().filter(|i| i.is_analyzed()).count();
    let files_failed = insights.len() - files_analyzed;

    let pattern_index = build_pattern_index(insights);

    let mut quality_table = IndexMap::new();
    for insight in insights.iter().filter(|i| i.is_analyzed()) {
        quality_table.insert(insight.path.clone(), insight.quality_issues.len());
    }

    let recommendations = dedup_recommendations(insights);

    let (narrative, narrative_source) = match narrative {
        Some(text) => (text, NarrativeSource::Model),
        None => (
            fallback_narrative(files_analyzed, files_failed, ctx.files_skipped, &pattern_index),
            NarrativeSource::Fallback,
        ),
    };

    AggregateReport {
        project_path: ctx.project_path,
        timestamp: ctx.timestamp,
        elapsed_ms: ctx.elapsed_ms,
        files_analyzed,
        files_failed,
        files_skipped: ctx.files_skipped,
        narrative,
        narrative_source,
        pattern_index,
        quality_table,
        recommendations,
    }
}

/// Pattern name -> files, keyed by the first-seen spelling.
fn build_pattern_index(insights: &[FileInsight]) -> IndexMap<String, Vec<String>> {
    let mut index: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut keys: HashMap<String, String> = HashMap::new();

    for insight in insights.iter().filter(|i| i.is_analyzed()) {
        for pattern in &insight.patterns {
            let name = collapse_whitespace(&pattern.name);
            if name.is_empty() {
                continue;
            }
            let key = keys
                .entry(normalize_key(&name))
                .or_insert_with(|| name.clone())
                .clone();
            let paths = index.entry(key).or_default();
            if !paths.contains(&insight.path) {
                paths.push(insight.path.clone());
            }
        }
    }
    index
}

fn dedup_recommendations(insights: &[FileInsight]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for insight in insights {
        for rec in &insight.recommendations {
            let rec = rec.trim();
            if rec.is_empty() {
                continue;
            }
            if seen.insert(normalize_key(rec)) {
                out.push(rec.to_string());
            }
        }
    }
    out
}

/// Deterministic summary built from counts and pattern names.
pub fn fallback_narrative(
    files_analyzed: usize,
    files_failed: usize,
    files_skipped: usize,
    pattern_index: &IndexMap<String, Vec<String>>,
) -> String {
    let total = files_analyzed + files_failed + files_skipped;
    let mut text = format!(
        "Analyzed {} of {} files ({} failed, {} skipped).",
        files_analyzed, total, files_failed, files_skipped
    );
    if files_analyzed == 0 {
        text.push_str(" No files were successfully analyzed.");
    }
    if pattern_index.is_empty() {
        text.push_str(" No design patterns were identified.");
    } else {
        let listed = pattern_index
            .iter()
            .map(|(name, paths)| {
                let noun = if paths.len() == 1 { "file" } else { "files" };
                format!("{} ({} {})", name, paths.len(), noun)
            })
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!(" Design patterns identified: {}.", listed));
    }
    text
}

/// Per-file summary lines fed to the narrative call.
pub fn build_digest(insights: &[FileInsight]) -> String {
    let analyzed: Vec<&FileInsight> = insights.iter().filter(|i| i.is_analyzed()).collect();
    let failed = insights.len() - analyzed.len();

    let mut out = String::new();
    let mut included = 0usize;
    for insight in &analyzed {
        let entry = digest_entry(insight);
        if !out.is_empty() && out.len() + entry.len() > DIGEST_MAX_CHARS {
            break;
        }
        out.push_str(&entry);
        included += 1;
    }
    if included < analyzed.len() {
        out.push_str(&format!(
            "...and {} more files analyzed.\n",
            analyzed.len() - included
        ));
    }
    if failed > 0 {
        out.push_str(&format!("{} file(s) could not be analyzed.\n", failed));
    }
    out
}

fn digest_entry(insight: &FileInsight) -> String {
    let list = |items: &[String]| {
        if items.is_empty() {
            "None".to_string()
        } else {
            items.join("; ")
        }
    };
    let patterns = if insight.patterns.is_empty() {
        "None".to_string()
    } else {
        insight
            .patterns
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "File: {}\n  - Facts: {}\n  - Architectural Insights: {}\n  - Design Patterns: {}\n  - Quality Issues: {}\n  - Recommendations: {}\n",
        insight.path,
        insight.facts.digest_line(),
        list(&insight.architectural_notes),
        patterns,
        list(&insight.quality_issues),
        list(&insight.recommendations),
    )
}
