//! Services
//!
//! The analysis pipeline and report rendering.

pub mod pipeline;
pub mod report;
