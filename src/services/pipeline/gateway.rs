//! Model Gateway
//!
//! The single path to the external model. Every request goes through a
//! shared semaphore (bounding in-flight calls), a per-attempt timeout and a
//! bounded retry loop with exponential backoff. Errors never escape as `Err`:
//! each `invoke` ends in exactly one [`ModelOutcome`].
//!
//! A permit is held only while an attempt is in flight. It is released
//! before backing off, so a sleeping retry never blocks other files.
//!
//! An optional sliding-window rate limit caps attempts per period. Callers
//! over the limit wait for a slot before they take a permit.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arch_insight_core::{FailureKind, GatewayStats, ModelOutcome};
use arch_insight_llm::{LlmError, LlmProvider, LlmRequestOptions, Message};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use super::prompt_builder::PromptUnit;
use crate::models::AnalyzerConfig;

/// Retry and backoff constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1` (zero-based `attempt`).
    ///
    /// `base * 2^attempt`, capped at `max_backoff`. A provider hint replaces
    /// the computed value but is capped the same way.
    pub fn backoff_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let max_ms = self.max_backoff.as_millis() as u64;
        let wait_ms = match retry_after_secs {
            Some(secs) => secs.saturating_mul(1000),
            None => {
                let base_ms = self.base_backoff.as_millis() as u64;
                base_ms.saturating_mul(1u64 << attempt.min(20))
            }
        };
        Duration::from_millis(wait_ms.min(max_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_millis(10_000),
        }
    }
}

/// At most `calls` provider attempts in any `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub calls: u32,
    pub period: Duration,
}

impl RateLimit {
    /// `None` when either bound is zero, which disables the limit.
    pub fn new(calls: u32, period: Duration) -> Option<Self> {
        if calls == 0 || period.is_zero() {
            None
        } else {
            Some(Self { calls, period })
        }
    }
}

/// Send times of the attempts still inside the window.
struct RateWindow {
    limit: RateLimit,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            sent: Mutex::new(VecDeque::with_capacity(limit.calls as usize)),
        }
    }

    /// Wait until one more attempt fits, then record it.
    ///
    /// The lock is held while waiting so callers are admitted in arrival order.
    async fn admit(&self) {
        let mut sent = self.sent.lock().await;
        loop {
            let now = Instant::now();
            while sent
                .front()
                .is_some_and(|&at| now.duration_since(at) >= self.limit.period)
            {
                sent.pop_front();
            }
            if sent.len() < self.limit.calls as usize {
                sent.push_back(now);
                return;
            }
            let Some(&oldest) = sent.front() else {
                continue;
            };
            let ready_at = oldest + self.limit.period;
            tracing::debug!(
                calls = self.limit.calls,
                period_ms = self.limit.period.as_millis() as u64,
                wait_ms = ready_at.saturating_duration_since(now).as_millis() as u64,
                "call rate limit reached, waiting"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }
}

/// Gateway limits.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_concurrent_calls: usize,
    pub per_call_timeout: Duration,
    pub retry: RetryPolicy,
    /// `None` leaves the call rate unbounded.
    pub rate_limit: Option<RateLimit>,
    pub request_options: LlmRequestOptions,
}

impl GatewayConfig {
    pub fn from_analyzer(config: &AnalyzerConfig) -> Self {
        Self {
            max_concurrent_calls: config.max_concurrent_calls.max(1),
            per_call_timeout: Duration::from_millis(config.per_call_timeout_ms),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_backoff: Duration::from_millis(config.base_backoff_ms),
                max_backoff: Duration::from_millis(config.max_backoff_ms),
            },
            rate_limit: RateLimit::new(
                config.rate_limit_calls,
                Duration::from_millis(config.rate_limit_period_ms),
            ),
            request_options: LlmRequestOptions::default(),
        }
    }
}

/// One failed attempt, classified.
#[derive(Debug, Clone)]
struct AttemptError {
    kind: FailureKind,
    message: String,
    retry_after_secs: Option<u64>,
}

impl AttemptError {
    fn from_llm(err: &LlmError) -> Self {
        let kind = match err {
            LlmError::RateLimited { .. } => FailureKind::RateLimited,
            e if e.is_retryable() => FailureKind::Transport,
            _ => FailureKind::Rejected,
        };
        Self {
            kind,
            message: err.to_string(),
            retry_after_secs: err.retry_after_secs(),
        }
    }
}

/// Bounded, retrying front door to an [`LlmProvider`].
pub struct ModelGateway {
    provider: Arc<dyn LlmProvider>,
    permits: Semaphore,
    max_concurrent_calls: usize,
    per_call_timeout: Duration,
    retry: RetryPolicy,
    rate_window: Option<RateWindow>,
    request_options: LlmRequestOptions,
    calls: AtomicU64,
    attempts: AtomicU64,
    failures: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GatewayConfig) -> Self {
        let max_concurrent_calls = config.max_concurrent_calls.max(1);
        Self {
            provider,
            permits: Semaphore::new(max_concurrent_calls),
            max_concurrent_calls,
            per_call_timeout: config.per_call_timeout,
            retry: config.retry,
            rate_window: config.rate_limit.map(RateWindow::new),
            request_options: config.request_options,
            calls: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// Permits currently free; equals `max_concurrent_calls` when idle.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        self.rate_window.as_ref().map(|w| w.limit)
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            calls: self.calls.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_ms.load(Ordering::Relaxed),
        }
    }

    /// Send one prompt unit, retrying transient failures.
    pub async fn invoke(&self, unit: &PromptUnit) -> ModelOutcome {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let max_attempts = self.retry.max_retries.saturating_add(1);
        let mut last_error: Option<AttemptError> = None;

        for attempt in 0..max_attempts {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            match self.attempt(unit).await {
                Ok((text, latency_ms)) => {
                    tracing::debug!(
                        file = %unit.file_ref,
                        chunk = unit.chunk_index,
                        attempt = attempt + 1,
                        latency_ms,
                        "model call succeeded"
                    );
                    return ModelOutcome::Success { text, latency_ms };
                }
                Err(err) => {
                    if !err.kind.is_transient() {
                        tracing::warn!(
                            file = %unit.file_ref,
                            attempt = attempt + 1,
                            error = %err.message,
                            "model call rejected, not retrying"
                        );
                        return self.fail(FailureKind::Rejected, attempt + 1, err.message);
                    }
                    if attempt + 1 < max_attempts {
                        let wait = self.retry.backoff_for(attempt, err.retry_after_secs);
                        tracing::warn!(
                            file = %unit.file_ref,
                            attempt = attempt + 1,
                            max_attempts,
                            kind = %err.kind,
                            wait_ms = wait.as_millis() as u64,
                            error = %err.message,
                            "model call failed with retryable error, backing off"
                        );
                        last_error = Some(err);
                        tokio::time::sleep(wait).await;
                    } else {
                        last_error = Some(err);
                    }
                }
            }
        }

        let (last_kind, message) = match last_error {
            Some(err) => (err.kind, err.message),
            None => (FailureKind::Transport, "no attempt was made".to_string()),
        };
        // Without retries configured the single attempt's own kind is reported.
        let kind = if self.retry.max_retries == 0 {
            last_kind
        } else {
            FailureKind::Exhausted
        };
        tracing::warn!(
            file = %unit.file_ref,
            attempts = max_attempts,
            kind = %kind,
            error = %message,
            "model call gave up"
        );
        self.fail(kind, max_attempts, message)
    }

    fn fail(&self, kind: FailureKind, attempts: u32, last_error: String) -> ModelOutcome {
        self.failures.fetch_add(1, Ordering::Relaxed);
        ModelOutcome::Failure {
            kind,
            attempts,
            last_error,
        }
    }

    /// One provider call under a rate slot, a permit and the per-call
    /// timeout. The call's latency is recorded whatever its result.
    async fn attempt(&self, unit: &PromptUnit) -> Result<(String, u64), AttemptError> {
        if let Some(window) = &self.rate_window {
            window.admit().await;
        }
        let _permit = self.permits.acquire().await.map_err(|_| AttemptError {
            kind: FailureKind::Rejected,
            message: "gateway is shut down".to_string(),
            retry_after_secs: None,
        })?;

        let call = self.provider.send_message(
            vec![Message::user(unit.user_content.clone())],
            Some(unit.system_instruction.clone()),
            self.request_options.clone(),
        );

        let started = Instant::now();
        let result = tokio::time::timeout(self.per_call_timeout, call).await;
        let latency_ms = started.elapsed().as_millis() as u64;
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);

        match result {
            Err(_) => Err(AttemptError {
                kind: FailureKind::Timeout,
                message: format!(
                    "no response within {} ms",
                    self.per_call_timeout.as_millis()
                ),
                retry_after_secs: None,
            }),
            Ok(Err(err)) => Err(AttemptError::from_llm(&err)),
            Ok(Ok(response)) => Ok((response.content.unwrap_or_default(), latency_ms)),
        }
    }
}
