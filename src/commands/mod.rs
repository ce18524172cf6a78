//! CLI Commands
//!
//! One module per subcommand of the `arch-insight` binary.

pub mod analyze;
pub mod discover;

pub use analyze::AnalyzeArgs;
pub use discover::DiscoverArgs;
