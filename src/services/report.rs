//! Report Rendering
//!
//! Turns a finished `AggregateReport` (plus the per-file insights) into
//! Markdown or JSON. Rendering is pure and never fails for Markdown.

use std::fmt::Write as _;

use arch_insight_core::{AggregateReport, FileInsight, GatewayStats, InsightStatus};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Output format for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(AppError::validation(format!(
                "unsupported report format: {}",
                other
            ))),
        }
    }
}

/// JSON document layout.
#[derive(Debug, Serialize)]
struct JsonDocument<'a> {
    report: &'a AggregateReport,
    files: &'a [FileInsight],
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway: Option<&'a GatewayStats>,
}

pub fn render(
    format: ReportFormat,
    report: &AggregateReport,
    insights: &[FileInsight],
    stats: Option<&GatewayStats>,
) -> AppResult<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown(report, insights, stats)),
        ReportFormat::Json => render_json(report, insights, stats),
    }
}

pub fn render_json(
    report: &AggregateReport,
    insights: &[FileInsight],
    stats: Option<&GatewayStats>,
) -> AppResult<String> {
    let doc = JsonDocument {
        report,
        files: insights,
        gateway: stats,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn render_markdown(
    report: &AggregateReport,
    insights: &[FileInsight],
    stats: Option<&GatewayStats>,
) -> String {
    let mut md = String::new();

    md.push_str("# Architecture Analysis Report\n\n");
    let _ = writeln!(md, "- **Project Path:** {}", report.project_path);
    let _ = writeln!(md, "- **Analysis Timestamp:** {}", report.timestamp.to_rfc3339());
    let _ = writeln!(
        md,
        "- **Execution Time:** {:.2} seconds",
        report.elapsed_ms as f64 / 1000.0
    );
    let _ = writeln!(
        md,
        "- **Files:** {} analyzed, {} failed, {} skipped ({} total)",
        report.files_analyzed,
        report.files_failed,
        report.files_skipped,
        report.total_files()
    );
    if let Some(stats) = stats {
        let _ = writeln!(
            md,
            "- **Model Calls:** {} ({} attempts, {} failed, mean latency {} ms)",
            stats.calls,
            stats.attempts,
            stats.failures,
            stats.mean_latency_ms()
        );
    }

    md.push_str("\n## Architecture Summary\n\n");
    md.push_str(report.narrative.trim());
    md.push('\n');

    md.push_str("\n## Design Patterns\n");
    if report.pattern_index.is_empty() {
        md.push_str("\nNo design patterns identified.\n");
    } else {
        for (pattern, files) in &report.pattern_index {
            let _ = writeln!(md, "\n### {}\n", pattern);
            for file in files {
                let _ = writeln!(md, "- {}", file);
            }
        }
    }

    md.push_str("\n## Code Quality Metrics\n\n");
    if report.quality_table.is_empty() {
        md.push_str("No quality metrics available.\n");
    } else {
        md.push_str("| File | Issues |\n|------|--------|\n");
        for (file, count) in &report.quality_table {
            let _ = writeln!(md, "| {} | {} |", escape_cell(file), count);
        }
        let _ = writeln!(md, "\nTotal issues: {}", report.total_issues());
    }

    md.push_str("\n## Recommendations\n\n");
    if report.recommendations.is_empty() {
        md.push_str("No recommendations available.\n");
    } else {
        for rec in &report.recommendations {
            let _ = writeln!(md, "- {}", rec);
        }
    }

    md.push_str("\n## Detailed File Analysis\n");
    for insight in insights {
        render_file(&mut md, insight);
    }

    md
}

fn render_file(md: &mut String, insight: &FileInsight) {
    let _ = writeln!(md, "\n### {}\n", insight.path);
    match &insight.status {
        InsightStatus::Ok => md.push_str("Status: ok\n"),
        InsightStatus::Degraded { causes } => {
            let causes = causes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(md, "Status: degraded ({})", causes);
        }
        InsightStatus::Failed { reason } => {
            let _ = writeln!(md, "Status: failed ({})", reason);
            return;
        }
    }

    section(md, "Architectural Insights", &insight.architectural_notes);
    if !insight.patterns.is_empty() {
        md.push_str("\n#### Design Patterns\n\n");
        for pattern in &insight.patterns {
            if pattern.rationale.is_empty() {
                let _ = writeln!(md, "- {}", pattern.name);
            } else {
                let _ = writeln!(md, "- {}: {}", pattern.name, pattern.rationale);
            }
        }
    }
    section(md, "Quality Issues", &insight.quality_issues);
    section(md, "Recommendations", &insight.recommendations);
}

fn section(md: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(md, "\n#### {}\n", title);
    for item in items {
        let _ = writeln!(md, "- {}", item);
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
