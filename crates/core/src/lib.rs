//! Arch Insight Core
//!
//! Domain types shared by the arch-insight workspace.
//! This crate has no dependency on HTTP clients, async runtimes or the
//! filesystem walker; everything here is plain data.
//!
//! ## Module Organization
//!
//! - `facts` - Lexical facts extracted from one source file (`FactSet`)
//! - `outcome` - Result of one gateway call (`ModelOutcome`, `FailureKind`)
//! - `insight` - Terminal per-file record (`FileInsight`, `InsightStatus`)
//! - `report` - Project-level aggregate (`AggregateReport`)
//!
//! ## Design Principles
//!
//! 1. **Immutable records** - values are built once and handed on, never patched
//! 2. **Failures are data** - per-file failures live in `InsightStatus`, not in `Err`
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod facts;
pub mod insight;
pub mod outcome;
pub mod report;

// ── Domain Records ─────────────────────────────────────────────────────
pub use facts::FactSet;
pub use insight::{DegradeCause, FailureReason, FileInsight, InsightStatus, PatternMention};
pub use outcome::{FailureKind, ModelOutcome};
pub use report::{AggregateReport, GatewayStats, NarrativeSource};
