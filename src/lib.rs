//! Arch Insight
//!
//! Turns a project's source tree into an architecture report: lexical facts
//! per file, a bounded and retrying fan-out of model requests, and a
//! deterministic merge of the per-file answers.

pub mod commands;
pub mod models;
pub mod services;
pub mod utils;

pub use models::AnalyzerConfig;
pub use services::pipeline::{AnalysisPipeline, AnalysisRun};
pub use utils::error::{AppError, AppResult};
