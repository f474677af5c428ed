//! Sondador: command-line front-end for the sondar harness.
//!
//! ## Usage
//!
//! ```bash
//! sondar login                        # Run every role login flow
//! sondar login --role customer       # One role only
//! sondar responsive                  # Landing check across viewports
//! sondar all --viewport mobile       # Everything, pinned to one viewport
//! ```
//!
//! Exit code is 0 when every scenario passed, 1 otherwise. Screenshots and
//! the aggregate JSON report land in the output directory.

#![warn(missing_docs)]

/// Argument parsing
pub mod cli;
/// Resolved configuration
pub mod config;
/// CLI error types
pub mod error;
/// Progress and summary output
pub mod output;
/// Built-in diagnostic scenario sets
pub mod scenarios;

pub use cli::{Cli, ColorArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use scenarios::{
    build_suite, login_scenario, navigation_scenario, responsive_scenario, Role, Suite,
    SuiteEntry, Viewport,
};
