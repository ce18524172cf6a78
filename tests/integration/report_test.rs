//! Report artifact tests: the analyze command writing Markdown and JSON.

use std::time::Duration;

use arch_insight::commands::{analyze, AnalyzeArgs};
use arch_insight::services::report::ReportFormat;
use tempfile::TempDir;

use crate::support::{
    file_needle, network_error, reply, test_config, write_java_files, Behavior, ScriptedProvider,
    NARRATIVE_MARKER,
};

// ============================================================================
// Helpers
// ============================================================================

fn args(dir: &TempDir, output: &str, format: ReportFormat) -> AnalyzeArgs {
    AnalyzeArgs {
        project_path: dir.path().join("project"),
        output: Some(dir.path().join(output)),
        format,
        max_files: None,
        config: None,
        model: None,
        provider: None,
        max_concurrent: None,
        timeout_ms: None,
    }
}

fn scripted() -> std::sync::Arc<ScriptedProvider> {
    ScriptedProvider::new(reply(Some("Repository"), &["Long parameter list"], "Introduce a value object"))
        .on(
            NARRATIVE_MARKER,
            Duration::ZERO,
            Behavior::Reply("Orders flow through repositories.".to_string()),
        )
        .on(&file_needle("Broken"), Duration::ZERO, Behavior::Fail(network_error()))
        .build()
}

// ============================================================================
// Markdown
// ============================================================================

#[tokio::test]
async fn test_markdown_report_written_to_nested_path() {
    let dir = TempDir::new().unwrap();
    write_java_files(&dir.path().join("project"), &["OrderRepository", "Broken"]);
    let args = args(&dir, "out/reports/arch.md", ReportFormat::Markdown);

    let run = analyze::run_with_provider(&args, test_config(), scripted())
        .await
        .unwrap();
    assert_eq!(run.report.files_analyzed, 1);
    assert_eq!(run.report.files_failed, 1);

    let text = std::fs::read_to_string(dir.path().join("out/reports/arch.md")).unwrap();
    assert!(text.starts_with("# Architecture Analysis Report"));
    assert!(text.contains("## Architecture Summary"));
    assert!(text.contains("Orders flow through repositories."));
    assert!(text.contains("### Repository"));
    assert!(text.contains("- src/OrderRepository.java"));
    assert!(text.contains("| src/OrderRepository.java | 1 |"));
    assert!(text.contains("Introduce a value object"));
    assert!(text.contains("src/Broken.java"));
}

// ============================================================================
// JSON
// ============================================================================

#[tokio::test]
async fn test_json_report_carries_report_files_and_stats() {
    let dir = TempDir::new().unwrap();
    write_java_files(&dir.path().join("project"), &["OrderRepository", "Broken"]);
    let args = args(&dir, "arch.json", ReportFormat::Json);

    analyze::run_with_provider(&args, test_config(), scripted())
        .await
        .unwrap();

    let text = std::fs::read_to_string(dir.path().join("arch.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();

    let files = doc["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["path"], "src/Broken.java");
    assert_eq!(files[1]["path"], "src/OrderRepository.java");
    assert!(doc["report"].is_object());
    assert!(doc["gateway"]["calls"].as_u64().unwrap() >= 3);
}

#[tokio::test]
async fn test_missing_project_reports_error_without_writing() {
    let dir = TempDir::new().unwrap();
    let args = args(&dir, "arch.md", ReportFormat::Markdown);

    let result = analyze::run_with_provider(&args, test_config(), scripted()).await;

    assert!(result.is_err());
    assert!(!dir.path().join("arch.md").exists());
}
