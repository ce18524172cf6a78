//! Data Models
//!
//! Configuration structures for the application. Domain records (facts,
//! insights, reports) live in `arch-insight-core`.

pub mod settings;

pub use settings::AnalyzerConfig;
