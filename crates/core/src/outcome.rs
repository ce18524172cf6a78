//! Result of one gateway call to the external model.

use serde::{Deserialize, Serialize};

/// Why a gateway call ended without a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The single permitted attempt exceeded the per-call timeout.
    Timeout,
    /// The provider signalled rate limiting on the single permitted attempt.
    RateLimited,
    /// Connection, server or protocol failure on the single permitted attempt.
    Transport,
    /// The provider refused the request (credentials, malformed request, unknown model).
    Rejected,
    /// Every attempt failed with a transient error and retries ran out.
    Exhausted,
}

impl FailureKind {
    /// Whether this kind belongs to the retryable transport family.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::RateLimited | FailureKind::Transport
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Tagged result of one `invoke` on the model gateway.
///
/// Created exactly once per call and never mutated. Consumers match it
/// exhaustively instead of threading errors through `?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModelOutcome {
    Success {
        text: String,
        latency_ms: u64,
    },
    Failure {
        kind: FailureKind,
        attempts: u32,
        last_error: String,
    },
}

impl ModelOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ModelOutcome::Success { .. })
    }
}
