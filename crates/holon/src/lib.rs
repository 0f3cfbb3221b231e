// holon - Intent Orchestration CLI
//
// Drives one intent through the create, plan, select and execute stages.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

//! Command-line front end for `holon-core`.

/// Command-line interface
pub mod cli;

/// Configuration from TOML and environment
pub mod config;

/// Tracing subscriber setup
pub mod logging;

pub use cli::Cli;
pub use config::OrchestratorConfig;
