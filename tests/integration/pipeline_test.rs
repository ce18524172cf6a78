//! End-to-end pipeline tests
//!
//! Each test builds a small project in a temp dir, runs the full pipeline
//! against a scripted provider and checks the resulting report.

use std::time::Duration;

use arch_insight::services::pipeline::{assemble, RunContext};
use arch_insight::{AnalysisPipeline, AnalyzerConfig};
use arch_insight_core::{FailureKind, FailureReason, InsightStatus, NarrativeSource};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::support::{
    file_needle, network_error, reply, test_config, write_java_files, Behavior, ScriptedProvider,
    NARRATIVE_MARKER,
};

// ============================================================================
// Helpers
// ============================================================================

fn project(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_java_files(dir.path(), names);
    dir
}

fn paths(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| format!("src/{}.java", n)).collect()
}

fn narrative_reply() -> Behavior {
    Behavior::Reply("A layered service with shared singletons.".to_string())
}

// ============================================================================
// Report contents
// ============================================================================

#[tokio::test]
async fn test_singleton_project_report() {
    let dir = project(&["A", "B", "C"]);
    let provider = ScriptedProvider::new(reply(None, &[], "Keep it simple"))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .on(
            &file_needle("A"),
            Duration::ZERO,
            reply(Some("Singleton"), &["Long method"], "Add unit tests"),
        )
        .on(
            &file_needle("B"),
            Duration::ZERO,
            reply(Some("Singleton"), &[], "Split the class"),
        )
        .on(
            &file_needle("C"),
            Duration::ZERO,
            reply(None, &["God class", "Magic numbers"], "add unit tests"),
        )
        .build();

    let pipeline = AnalysisPipeline::new(test_config(), provider.clone()).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();
    let report = &run.report;

    assert_eq!(report.files_analyzed, 3);
    assert_eq!(report.files_failed, 0);
    assert_eq!(report.files_skipped, 0);
    assert_eq!(
        report.pattern_index.get("Singleton"),
        Some(&paths(&["A", "B"]))
    );
    assert_eq!(report.pattern_index.len(), 1);

    let table: Vec<(String, usize)> = report
        .quality_table
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    assert_eq!(
        table,
        vec![
            ("src/A.java".to_string(), 1),
            ("src/B.java".to_string(), 0),
            ("src/C.java".to_string(), 2),
        ]
    );
    assert_eq!(report.total_issues(), 3);

    assert_eq!(
        report.recommendations,
        vec!["Add unit tests".to_string(), "Split the class".to_string()]
    );

    assert_eq!(report.narrative_source, NarrativeSource::Model);
    assert_eq!(report.narrative, "A layered service with shared singletons.");

    // Three file calls plus one narrative call.
    assert_eq!(provider.calls(), 4);
    assert_eq!(run.gateway_stats.calls, 4);
}

#[tokio::test]
async fn test_insights_follow_discovery_order_not_completion_order() {
    let dir = project(&["A", "B", "C", "D"]);
    let provider = ScriptedProvider::new(reply(None, &[], "ok"))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .on(&file_needle("A"), Duration::from_millis(200), reply(None, &[], "a"))
        .on(&file_needle("B"), Duration::from_millis(120), reply(None, &[], "b"))
        .on(&file_needle("C"), Duration::from_millis(40), reply(None, &[], "c"))
        .build();

    let config = AnalyzerConfig {
        max_concurrent_calls: 4,
        worker_pool_size: 4,
        ..test_config()
    };
    let pipeline = AnalysisPipeline::new(config, provider).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    let order: Vec<&str> = run.insights.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(order, vec!["src/A.java", "src/B.java", "src/C.java", "src/D.java"]);
    let recs: Vec<&str> = run.insights.iter().map(|i| i.recommendations[0].as_str()).collect();
    assert_eq!(recs, vec!["a", "b", "c", "ok"]);
}

// ============================================================================
// Counting and truncation
// ============================================================================

#[tokio::test]
async fn test_max_files_truncates_and_counts_skipped() {
    let dir = project(&["A", "B", "C", "D", "E"]);
    let provider = ScriptedProvider::new(reply(None, &[], "ok"))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .build();

    let config = AnalyzerConfig {
        max_files: 2,
        ..test_config()
    };
    let pipeline = AnalysisPipeline::new(config, provider).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    assert_eq!(run.insights.len(), 2);
    assert_eq!(run.report.files_skipped, 3);
    assert_eq!(run.report.files_analyzed, 2);
    assert_eq!(run.report.total_files(), 5);
    let order: Vec<&str> = run.insights.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(order, vec!["src/A.java", "src/B.java"]);
}

#[tokio::test]
async fn test_counts_always_add_up() {
    for max_files in [1, 3, 6, 10] {
        let dir = project(&["A", "B", "C", "D", "E", "F"]);
        let provider = ScriptedProvider::new(reply(None, &["issue"], "ok"))
            .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
            .on(&file_needle("B"), Duration::ZERO, Behavior::Fail(network_error()))
            .on(
                &file_needle("E"),
                Duration::ZERO,
                Behavior::Reply("nothing structured here".to_string()),
            )
            .build();

        let config = AnalyzerConfig {
            max_files,
            ..test_config()
        };
        let pipeline = AnalysisPipeline::new(config, provider).unwrap();
        let run = pipeline.run(dir.path()).await.unwrap();
        let report = &run.report;

        assert_eq!(
            report.files_analyzed + report.files_failed + report.files_skipped,
            6,
            "max_files = {}",
            max_files
        );
        assert_eq!(run.insights.len(), max_files.min(6));
        assert_eq!(report.quality_table.len(), report.files_analyzed);
    }
}

#[tokio::test]
async fn test_unstructured_reply_is_degraded_not_failed() {
    let dir = project(&["A"]);
    let provider = ScriptedProvider::new(Behavior::Reply("just prose".to_string()))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .build();

    let pipeline = AnalysisPipeline::new(test_config(), provider).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    assert_eq!(run.report.files_analyzed, 1);
    assert!(run.insights[0].is_degraded());
    assert_eq!(run.report.quality_table.get("src/A.java"), Some(&0));
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_every_call_failing_still_produces_report() {
    let dir = project(&["A", "B", "C"]);
    let provider = ScriptedProvider::new(Behavior::Fail(network_error())).build();

    let pipeline = AnalysisPipeline::new(test_config(), provider.clone()).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();
    let report = &run.report;

    assert_eq!(report.files_failed, 3);
    assert_eq!(report.files_analyzed, 0);
    assert!(report.pattern_index.is_empty());
    assert!(report.quality_table.is_empty());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.narrative_source, NarrativeSource::Fallback);
    assert!(report
        .narrative
        .starts_with("Analyzed 0 of 3 files (3 failed, 0 skipped)."));

    for insight in &run.insights {
        match &insight.status {
            InsightStatus::Failed {
                reason: FailureReason::Model { kind, attempts, .. },
            } => {
                assert_eq!(*kind, FailureKind::Exhausted);
                assert_eq!(*attempts, 2);
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    // No narrative call when nothing was analyzed: 3 files x 2 attempts.
    assert_eq!(provider.calls(), 6);
}

#[tokio::test]
async fn test_rejected_call_is_not_retried() {
    let dir = project(&["A"]);
    let provider = ScriptedProvider::new(Behavior::Fail(
        arch_insight_llm::LlmError::AuthenticationFailed {
            message: "bad key".to_string(),
        },
    ))
    .build();

    let pipeline = AnalysisPipeline::new(test_config(), provider.clone()).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    match &run.insights[0].status {
        InsightStatus::Failed {
            reason: FailureReason::Model { kind, attempts, .. },
        } => {
            assert_eq!(*kind, FailureKind::Rejected);
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_failed_narrative_falls_back_to_template() {
    let dir = project(&["A", "B"]);
    let provider = ScriptedProvider::new(reply(Some("Builder"), &[], "ok"))
        .on(NARRATIVE_MARKER, Duration::ZERO, Behavior::Fail(network_error()))
        .build();

    let pipeline = AnalysisPipeline::new(test_config(), provider).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    assert_eq!(run.report.narrative_source, NarrativeSource::Fallback);
    assert_eq!(
        run.report.narrative,
        "Analyzed 2 of 2 files (0 failed, 0 skipped). Design patterns identified: Builder (2 files)."
    );
}

#[tokio::test]
async fn test_global_timeout_marks_unfinished_files() {
    let dir = project(&["A", "B"]);
    let provider = ScriptedProvider::new(reply(None, &[], "ok"))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .on(&file_needle("A"), Duration::ZERO, Behavior::Hang)
        .build();

    let config = AnalyzerConfig {
        global_timeout_ms: 300,
        per_call_timeout_ms: 30_000,
        max_retries: 0,
        ..test_config()
    };
    let pipeline = AnalysisPipeline::new(config, provider.clone()).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    assert_eq!(run.insights.len(), 2);
    assert_eq!(
        run.insights[0].status,
        InsightStatus::Failed {
            reason: FailureReason::GlobalTimeout
        }
    );
    assert!(run.insights[1].is_analyzed());
    assert_eq!(run.report.files_failed, 1);
    assert_eq!(run.report.files_analyzed, 1);

    // Aborted tasks drop their permits asynchronously.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let gateway = pipeline.gateway();
    assert_eq!(gateway.available_permits(), gateway.max_concurrent_calls());
    assert_eq!(provider.in_flight(), 0);
}

// ============================================================================
// Configuration and input errors
// ============================================================================

#[tokio::test]
async fn test_missing_project_fails_fast() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(reply(None, &[], "ok")).build();
    let pipeline = AnalysisPipeline::new(test_config(), provider.clone()).unwrap();

    let result = pipeline.run(&dir.path().join("missing")).await;
    assert!(result.is_err());
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_invalid_config_is_rejected_before_scheduling() {
    let provider = ScriptedProvider::new(reply(None, &[], "ok")).build();

    let zero_pool = AnalyzerConfig {
        worker_pool_size: 0,
        ..test_config()
    };
    assert!(AnalysisPipeline::new(zero_pool, provider.clone()).is_err());

    let no_model = AnalyzerConfig {
        model_id: String::new(),
        ..test_config()
    };
    assert!(AnalysisPipeline::new(no_model, provider.clone()).is_err());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_empty_project_yields_empty_report() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(reply(None, &[], "ok")).build();
    let pipeline = AnalysisPipeline::new(test_config(), provider.clone()).unwrap();

    let run = pipeline.run(dir.path()).await.unwrap();

    assert!(run.insights.is_empty());
    assert_eq!(run.report.total_files(), 0);
    assert!(run.report.pattern_index.is_empty());
    assert_eq!(run.report.narrative_source, NarrativeSource::Fallback);
    assert_eq!(provider.calls(), 0);
}

// ============================================================================
// Aggregation properties
// ============================================================================

#[tokio::test]
async fn test_assembly_is_idempotent_for_same_insights() {
    let dir = project(&["A", "B", "C"]);
    let provider = ScriptedProvider::new(reply(Some("Facade"), &["Deep nesting"], "Extract helper"))
        .on(NARRATIVE_MARKER, Duration::ZERO, narrative_reply())
        .on(&file_needle("B"), Duration::ZERO, Behavior::Fail(network_error()))
        .build();

    let pipeline = AnalysisPipeline::new(test_config(), provider).unwrap();
    let run = pipeline.run(dir.path()).await.unwrap();

    let ctx = RunContext {
        project_path: "demo".to_string(),
        files_skipped: 0,
        elapsed_ms: 42,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };
    let first = assemble(&run.insights, ctx.clone(), None);
    let second = assemble(&run.insights, ctx, None);
    assert_eq!(first, second);
    assert_eq!(first.pattern_index.get("Facade"), Some(&paths(&["A", "C"])));
    assert_eq!(first.recommendations, vec!["Extract helper".to_string()]);
}
