//! Shared helpers: a scripted `LlmProvider` and project-tree builders.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arch_insight::AnalyzerConfig;
use arch_insight_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
};
use async_trait::async_trait;

/// Marker present only in the project-level narrative request.
pub const NARRATIVE_MARKER: &str = "Findings from the analyzed files";

#[derive(Clone)]
pub enum Behavior {
    Reply(String),
    Fail(LlmError),
    Hang,
}

struct Rule {
    needle: String,
    delay: Duration,
    behavior: Behavior,
}

/// Provider whose answers are chosen by substring match on the prompt.
pub struct ScriptedProvider {
    rules: Vec<Rule>,
    default_delay: Duration,
    default_behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new(default_behavior: Behavior) -> Self {
        Self {
            rules: Vec::new(),
            default_delay: Duration::ZERO,
            default_behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            config: ProviderConfig::default(),
        }
    }

    /// First matching rule wins.
    pub fn on(mut self, needle: &str, delay: Duration, behavior: Behavior) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            delay,
            behavior,
        });
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        _options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let mut prompt = system.unwrap_or_default();
        for message in &messages {
            prompt.push('\n');
            prompt.push_str(&message.content);
        }

        let (delay, behavior) = self
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .map(|rule| (rule.delay, rule.behavior.clone()))
            .unwrap_or_else(|| (self.default_delay, self.default_behavior.clone()));

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match behavior {
            Behavior::Reply(text) => Ok(LlmResponse::text("scripted-model", text)),
            Behavior::Fail(err) => Err(err),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(LlmResponse::text("scripted-model", "too late"))
            }
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// A Markdown reply with one pattern, one issue and one recommendation.
pub fn reply(pattern: Option<&str>, issues: &[&str], recommendation: &str) -> Behavior {
    let mut text = String::from("## Architectural Insights\n- Part of the service layer\n");
    text.push_str("\n## Design Patterns\n");
    match pattern {
        Some(name) => text.push_str(&format!("- {}: single shared instance\n", name)),
        None => text.push_str("- None\n"),
    }
    text.push_str("\n## Quality Issues\n");
    if issues.is_empty() {
        text.push_str("- None\n");
    }
    for issue in issues {
        text.push_str(&format!("- {}\n", issue));
    }
    text.push_str(&format!("\n## Recommendations\n- {}\n", recommendation));
    Behavior::Reply(text)
}

pub fn network_error() -> LlmError {
    LlmError::NetworkError {
        message: "connection refused".to_string(),
    }
}

/// Fast settings for tests: tiny backoff, generous deadlines.
pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig {
        max_files: 20,
        max_concurrent_calls: 2,
        worker_pool_size: 4,
        per_call_timeout_ms: 2_000,
        max_retries: 1,
        base_backoff_ms: 1,
        max_backoff_ms: 5,
        global_timeout_ms: 20_000,
        ..AnalyzerConfig::default()
    }
}

/// Write `class <Name> {}` files named `<Name>.java` under `root`.
pub fn write_java_files(root: &Path, names: &[&str]) {
    for name in names {
        let path = root.join(format!("src/{}.java", name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(
            path,
            format!(
                "package com.example;\n\npublic class {} {{\n    public void run() {{}}\n}}\n",
                name
            ),
        )
        .unwrap();
    }
}

/// Needle matching the per-file prompt for `name`.
pub fn file_needle(name: &str) -> String {
    format!("File: src/{}.java\nPackage", name)
}
