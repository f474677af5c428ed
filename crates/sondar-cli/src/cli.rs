//! Command-line argument definitions

use crate::config::{CliConfig, ColorChoice, Verbosity};
use crate::scenarios::{Role, Suite, Viewport};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Color output argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorArg {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Always => Self::Always,
            ColorArg::Auto => Self::Auto,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Run diagnostic scenario sets against a locally served web front-end
#[derive(Debug, Parser)]
#[command(name = "sondar", version, about)]
pub struct Cli {
    /// Scenario set to run
    #[arg(value_enum)]
    pub suite: Suite,

    /// Only run scenarios for this role
    #[arg(long, value_enum)]
    pub role: Option<Role>,

    /// Only run scenarios under this viewport
    #[arg(long, value_enum)]
    pub viewport: Option<Viewport>,

    /// Base URL of the application under test
    #[arg(long, env = "SONDAR_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Run the browser headless
    #[arg(
        long,
        env = "SONDAR_HEADLESS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub headless: bool,

    /// Per-scenario deadline in milliseconds
    #[arg(long, env = "SONDAR_TIMEOUT_MS", default_value_t = sondar::DEFAULT_SCENARIO_TIMEOUT_MS)]
    pub scenario_timeout: u64,

    /// Directory for screenshots and reports
    #[arg(long, env = "SONDAR_OUTPUT_DIR", default_value = "test-results")]
    pub output_dir: PathBuf,

    /// Where to write the aggregate JSON report (defaults inside the output
    /// directory)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Browser executable override
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Stop each scenario at its first failed step
    #[arg(long)]
    pub fail_fast: bool,

    /// Increase output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Minimal output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    pub color: ColorArg,
}

impl Cli {
    /// Resolve the arguments into a [`CliConfig`]
    #[must_use]
    pub fn to_config(&self) -> CliConfig {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Debug,
            }
        };

        CliConfig {
            verbosity,
            color: self.color.into(),
            base_url: self.base_url.clone(),
            headless: self.headless,
            scenario_timeout_ms: self.scenario_timeout,
            output_dir: self.output_dir.clone(),
            report_path: self.report.clone(),
            chromium_path: self.chromium_path.clone(),
            fail_fast: self.fail_fast,
        }
    }
}
