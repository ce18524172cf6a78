//! Terminal per-file analysis record.

use serde::{Deserialize, Serialize};

use crate::facts::FactSet;
use crate::outcome::FailureKind;

/// A design pattern the model attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMention {
    pub name: String,
    pub rationale: String,
}

impl PatternMention {
    pub fn new(name: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rationale: rationale.into(),
        }
    }
}

/// Why a successful analysis is only partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeCause {
    /// The source excerpt was cut to fit the content budget.
    Truncated,
    /// The model response had no recognisable sections.
    ParseShortfall,
    /// The file was not valid UTF-8; facts were not extracted.
    UndecodableContent,
}

impl std::fmt::Display for DegradeCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeCause::Truncated => write!(f, "source truncated"),
            DegradeCause::ParseShortfall => write!(f, "response not structured"),
            DegradeCause::UndecodableContent => write!(f, "content not valid UTF-8"),
        }
    }
}

/// Why a file produced no analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// The gateway gave up on the file's request.
    Model {
        kind: FailureKind,
        attempts: u32,
        message: String,
    },
    /// The scheduler deadline passed before the file finished.
    GlobalTimeout,
    /// The file could not be read from disk.
    Unreadable { message: String },
    /// The worker running the file ended without a result.
    TaskAborted { message: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Model {
                kind,
                attempts,
                message,
            } => write!(f, "model call {} after {} attempt(s): {}", kind, attempts, message),
            FailureReason::GlobalTimeout => write!(f, "global timeout reached"),
            FailureReason::Unreadable { message } => write!(f, "unreadable file: {}", message),
            FailureReason::TaskAborted { message } => write!(f, "task aborted: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsightStatus {
    Ok,
    Degraded { causes: Vec<DegradeCause> },
    Failed { reason: FailureReason },
}

/// The single terminal record for one scheduled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInsight {
    pub path: String,
    pub architectural_notes: Vec<String>,
    pub patterns: Vec<PatternMention>,
    pub quality_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub status: InsightStatus,
    pub facts: FactSet,
}

impl FileInsight {
    /// A failed insight with every list empty.
    pub fn failed(path: impl Into<String>, facts: FactSet, reason: FailureReason) -> Self {
        Self {
            path: path.into(),
            architectural_notes: Vec::new(),
            patterns: Vec::new(),
            quality_issues: Vec::new(),
            recommendations: Vec::new(),
            status: InsightStatus::Failed { reason },
            facts,
        }
    }

    /// `Ok` or `Degraded`.
    pub fn is_analyzed(&self) -> bool {
        !self.is_failed()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, InsightStatus::Failed { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, InsightStatus::Degraded { .. })
    }

    /// Short status label for tables and logs.
    pub fn status_label(&self) -> &'static str {
        match self.status {
            InsightStatus::Ok => "ok",
            InsightStatus::Degraded { .. } => "degraded",
            InsightStatus::Failed { .. } => "failed",
        }
    }
}
