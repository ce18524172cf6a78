//! Gateway behavior under concurrency, timeouts and retries.

use std::sync::Arc;
use std::time::Duration;

use arch_insight::services::pipeline::{
    extract_facts, prompt_builder, GatewayConfig, ModelGateway, PromptUnit, RateLimit,
    RetryPolicy, SizeBudget,
};
use arch_insight::AnalyzerConfig;
use arch_insight_core::{FailureKind, ModelOutcome};
use arch_insight_llm::{LlmError, LlmRequestOptions};

use crate::support::{network_error, Behavior, ScriptedProvider};

// ============================================================================
// Helpers
// ============================================================================

fn unit(name: &str) -> PromptUnit {
    let source = format!("public class {} {{}}\n", name);
    let path = format!("src/{}.java", name);
    let facts = extract_facts(&path, source.len() as u64, &source);
    prompt_builder::build(&facts, &source, SizeBudget::default())
        .into_iter()
        .next()
        .unwrap()
}

fn gateway(
    provider: Arc<ScriptedProvider>,
    max_concurrent_calls: usize,
    per_call_timeout: Duration,
    max_retries: u32,
) -> ModelGateway {
    ModelGateway::new(
        provider,
        GatewayConfig {
            max_concurrent_calls,
            per_call_timeout,
            retry: RetryPolicy {
                max_retries,
                base_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
            },
            rate_limit: None,
            request_options: LlmRequestOptions::default(),
        },
    )
}

// ============================================================================
// Timeouts and retries
// ============================================================================

#[tokio::test]
async fn test_every_attempt_timing_out_is_exhausted() {
    let provider = ScriptedProvider::new(Behavior::Hang).build();
    let gw = gateway(provider.clone(), 2, Duration::from_millis(50), 2);

    let outcome = gw.invoke(&unit("Slow")).await;

    match outcome {
        ModelOutcome::Failure { kind, attempts, .. } => {
            assert_eq!(kind, FailureKind::Exhausted);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    let stats = gw.stats();
    assert_eq!(stats.calls, 1);
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.failures, 1);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_single_attempt_reports_its_own_kind() {
    let provider = ScriptedProvider::new(Behavior::Fail(LlmError::RateLimited {
        message: "slow down".to_string(),
        retry_after: None,
    }))
    .build();
    let gw = gateway(provider, 1, Duration::from_secs(1), 0);

    match gw.invoke(&unit("Busy")).await {
        ModelOutcome::Failure { kind, attempts, .. } => {
            assert_eq!(kind, FailureKind::RateLimited);
            assert_eq!(attempts, 1);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_counts_are_tracked_per_call() {
    let provider = ScriptedProvider::new(Behavior::Reply("## Design Patterns\n- Observer".into()))
        .on("class Flaky", Duration::ZERO, Behavior::Fail(network_error()))
        .build();
    let gw = gateway(provider, 1, Duration::from_secs(1), 3);

    // Different file takes the default reply.
    assert!(gw.invoke(&unit("Steady")).await.is_success());
    match gw.invoke(&unit("Flaky")).await {
        ModelOutcome::Failure { kind, attempts, .. } => {
            assert_eq!(kind, FailureKind::Exhausted);
            assert_eq!(attempts, 4);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    let stats = gw.stats();
    assert_eq!(stats.calls, 2);
    assert_eq!(stats.attempts, 5);
    assert_eq!(stats.failures, 1);
}

// ============================================================================
// Concurrency bound
// ============================================================================

#[tokio::test]
async fn test_in_flight_calls_never_exceed_limit() {
    let provider = ScriptedProvider::new(Behavior::Reply("## Quality Issues\n- none".into()))
        .with_default_delay(Duration::from_millis(30))
        .on("class Broken3", Duration::from_millis(10), Behavior::Fail(network_error()))
        .on("class Stuck5", Duration::ZERO, Behavior::Hang)
        .build();
    let gw = Arc::new(gateway(provider.clone(), 3, Duration::from_millis(200), 1));

    let mut handles = Vec::new();
    for i in 0..12 {
        let gw = Arc::clone(&gw);
        handles.push(tokio::spawn(async move {
            let name = match i {
                3 => "Broken3".to_string(),
                5 => "Stuck5".to_string(),
                n => format!("Fine{}", n),
            };
            gw.invoke(&unit(&name)).await
        }));
    }

    let mut failures = 0;
    for handle in handles {
        if !handle.await.unwrap().is_success() {
            failures += 1;
        }
    }

    assert_eq!(failures, 2);
    assert!(provider.max_in_flight() <= 3);
    assert!(provider.max_in_flight() >= 2);
    assert_eq!(gw.available_permits(), 3);
    assert_eq!(provider.in_flight(), 0);
}

// ============================================================================
// Call-rate limit
// ============================================================================

#[test]
fn test_rate_limit_comes_from_analyzer_config() {
    let config = AnalyzerConfig {
        rate_limit_calls: 3,
        rate_limit_period_ms: 500,
        ..AnalyzerConfig::default()
    };
    assert_eq!(
        GatewayConfig::from_analyzer(&config).rate_limit,
        Some(RateLimit {
            calls: 3,
            period: Duration::from_millis(500),
        })
    );

    let unlimited = AnalyzerConfig {
        rate_limit_calls: 0,
        ..AnalyzerConfig::default()
    };
    assert_eq!(GatewayConfig::from_analyzer(&unlimited).rate_limit, None);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_share_one_rate_window() {
    let provider = ScriptedProvider::new(Behavior::Reply("## Design Patterns\n- Facade".into())).build();
    let gw = Arc::new(ModelGateway::new(
        provider.clone(),
        GatewayConfig {
            max_concurrent_calls: 5,
            per_call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: RateLimit::new(2, Duration::from_secs(60)),
            request_options: LlmRequestOptions::default(),
        },
    ));
    let start = tokio::time::Instant::now();

    let mut handles = Vec::new();
    for i in 0..5 {
        let gw = Arc::clone(&gw);
        handles.push(tokio::spawn(async move {
            gw.invoke(&unit(&format!("Limited{}", i))).await;
            start.elapsed()
        }));
    }
    let mut finished = Vec::new();
    for handle in handles {
        finished.push(handle.await.unwrap());
    }
    finished.sort();

    assert!(finished[1] < Duration::from_secs(60));
    assert!(finished[2] >= Duration::from_secs(60));
    assert!(finished[3] < Duration::from_secs(120));
    assert!(finished[4] >= Duration::from_secs(120));
    assert_eq!(provider.calls(), 5);
}
