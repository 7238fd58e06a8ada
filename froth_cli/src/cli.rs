//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "froth", version, about = "Froth vision-to-control CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/froth_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the metrics and control loops until Ctrl-C
    Run {
        /// Stop on its own after this many seconds
        #[arg(long, value_name = "SECS")]
        duration_s: Option<f64>,
        /// Start the pump in AUTO (PI on bubble count)
        #[arg(long, action = ArgAction::SetTrue)]
        auto: bool,
        /// Report status every N seconds (0 = only at exit)
        #[arg(long, value_name = "SECS", default_value_t = 5.0)]
        report_every_s: f64,
    },
    /// Run the detector and analyzer once on an image file
    Analyze {
        /// PNG or JPEG image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Acquire every device, grab one frame, poll the E-stop, release
    SelfCheck,
}
