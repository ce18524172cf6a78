//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;
pub mod logging;
pub mod text;

pub use error::*;
