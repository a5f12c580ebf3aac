//! CLI argument parsing for crashwatch

use clap::{Parser, Subcommand};

/// crashwatch - in-process crash and hang detector
#[derive(Parser, Debug)]
#[command(name = "crashwatch")]
#[command(about = "Detects crashes and hangs and persists reports to a local log")]
#[command(version)]
pub struct Cli {
    /// Log level for console diagnostics
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Trigger a named failure after a short delay
    Crash {
        /// Failure name, e.g. "segmentationfault", "abort",
        /// "customexception", "stackoverflow"
        name: String,
    },
    /// Print the tail of the persisted crash log
    Log,
    /// Clear the persisted crash log
    Clear,
    /// Print log sink diagnostics
    Diagnostics,
    /// Run the hang watchdog against a demo primary loop
    Hang {
        /// Hang threshold in seconds (defaults to the configured
        /// hang_threshold_secs)
        #[arg(long)]
        threshold: Option<f64>,
        /// How long to block the primary loop, in seconds
        #[arg(long, default_value_t = 2.0)]
        block: f64,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
