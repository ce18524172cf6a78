//! Per-File Analysis Task
//!
//! extract -> build prompt units -> gateway call per unit -> parse -> merge.
//! Units of one file run sequentially; parallelism lives across files.
//! The task never returns an error: every path ends in one `FileInsight`.

use std::collections::HashSet;
use std::sync::Arc;

use arch_insight_core::{
    DegradeCause, FactSet, FailureReason, FileInsight, InsightStatus, ModelOutcome,
    PatternMention,
};

use super::extractor::extract_facts;
use super::gateway::ModelGateway;
use super::prompt_builder::{self, SizeBudget};
use super::response_parser::{parse_response, ParsedResponse};
use crate::utils::text::normalize_key;

/// Runs the per-file pipeline against a shared gateway.
#[derive(Clone)]
pub struct FileAnalyzer {
    gateway: Arc<ModelGateway>,
    budget: SizeBudget,
}

impl FileAnalyzer {
    pub fn new(gateway: Arc<ModelGateway>, budget: SizeBudget) -> Self {
        Self { gateway, budget }
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Decode raw file bytes, extract facts and analyze.
    ///
    /// Content that is not valid UTF-8 is analyzed from a lossy decoding with
    /// an empty fact set, and the result is marked degraded.
    pub async fn analyze_bytes(&self, path: &str, bytes: Vec<u8>) -> FileInsight {
        let size_bytes = bytes.len() as u64;
        match String::from_utf8(bytes) {
            Ok(text) => {
                let facts = extract_facts(path, size_bytes, &text);
                self.analyze_with(path, facts, &text, Vec::new()).await
            }
            Err(err) => {
                tracing::debug!(file = %path, error = %err, "content is not valid UTF-8");
                let text = String::from_utf8_lossy(err.as_bytes()).into_owned();
                let facts = FactSet::empty(path, size_bytes);
                self.analyze_with(path, facts, &text, vec![DegradeCause::UndecodableContent])
                    .await
            }
        }
    }

    /// Analyze one file from already extracted facts.
    pub async fn analyze(&self, path: &str, facts: FactSet, source_text: &str) -> FileInsight {
        self.analyze_with(path, facts, source_text, Vec::new()).await
    }

    async fn analyze_with(
        &self,
        path: &str,
        facts: FactSet,
        source_text: &str,
        mut causes: Vec<DegradeCause>,
    ) -> FileInsight {
        let units = prompt_builder::build(&facts, source_text, self.budget);
        let mut merged = MergedInsight::default();

        for unit in &units {
            match self.gateway.invoke(unit).await {
                ModelOutcome::Success { text, .. } => {
                    let parsed = parse_response(&text);
                    if parsed.is_shortfall() {
                        push_cause(&mut causes, DegradeCause::ParseShortfall);
                    }
                    merged.absorb(parsed);
                    if unit.partial {
                        push_cause(&mut causes, DegradeCause::Truncated);
                    }
                }
                ModelOutcome::Failure {
                    kind,
                    attempts,
                    last_error,
                } => {
                    tracing::debug!(
                        file = %path,
                        chunk = unit.chunk_index,
                        kind = %kind,
                        attempts,
                        "file analysis failed"
                    );
                    return FileInsight::failed(
                        path,
                        facts,
                        FailureReason::Model {
                            kind,
                            attempts,
                            message: last_error,
                        },
                    );
                }
            }
        }

        let status = if causes.is_empty() {
            InsightStatus::Ok
        } else {
            InsightStatus::Degraded { causes }
        };
        tracing::debug!(
            file = %path,
            units = units.len(),
            patterns = merged.patterns.len(),
            issues = merged.quality_issues.len(),
            status = ?status,
            "file analyzed"
        );

        FileInsight {
            path: path.to_string(),
            architectural_notes: merged.architectural_notes,
            patterns: merged.patterns,
            quality_issues: merged.quality_issues,
            recommendations: merged.recommendations,
            status,
            facts,
        }
    }
}

fn push_cause(causes: &mut Vec<DegradeCause>, cause: DegradeCause) {
    if !causes.contains(&cause) {
        causes.push(cause);
    }
}

/// Lists merged across units in unit order, duplicates dropped.
#[derive(Default)]
struct MergedInsight {
    architectural_notes: Vec<String>,
    patterns: Vec<PatternMention>,
    quality_issues: Vec<String>,
    recommendations: Vec<String>,
    seen_notes: HashSet<String>,
    seen_patterns: HashSet<String>,
    seen_issues: HashSet<String>,
    seen_recommendations: HashSet<String>,
}

impl MergedInsight {
    fn absorb(&mut self, parsed: ParsedResponse) {
        extend_unique(
            &mut self.architectural_notes,
            &mut self.seen_notes,
            parsed.architectural_notes,
        );
        extend_unique(
            &mut self.quality_issues,
            &mut self.seen_issues,
            parsed.quality_issues,
        );
        extend_unique(
            &mut self.recommendations,
            &mut self.seen_recommendations,
            parsed.recommendations,
        );
        for pattern in parsed.patterns {
            if self.seen_patterns.insert(normalize_key(&pattern.name)) {
                self.patterns.push(pattern);
            }
        }
    }
}

fn extend_unique(target: &mut Vec<String>, seen: &mut HashSet<String>, items: Vec<String>) {
    for item in items {
        if seen.insert(normalize_key(&item)) {
            target.push(item);
        }
    }
}
