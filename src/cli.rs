// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `mediaguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mediaguard",
    version,
    about = "Watch removable media for file changes, monitor processes and scan local ports.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `MediaGuard.toml` in the current working directory. A missing
    /// default file is fine; a missing explicit file is an error.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Directory whose immediate subdirectories are device mount points.
    ///
    /// Overrides `[usb].media_root`.
    #[arg(long, value_name = "PATH")]
    pub media_root: Option<String>,

    /// Also deliver notifications through `notify-send`.
    #[arg(long)]
    pub desktop_notify: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MEDIAGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load + validate the config, print it, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Feature to run directly. Without one, the interactive menu is shown.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Watch removable devices and report every file change on them.
    Usb,
    /// Sample process CPU/memory usage and alert on sustained overuse.
    Processes,
    /// Scan a TCP port range on the configured target.
    Ports {
        /// First port of the range (1-65535).
        start: u32,
        /// Last port of the range (1-65535).
        end: u32,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
