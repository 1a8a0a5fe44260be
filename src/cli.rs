// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Static-site asset pipeline: build, watch, serve and deploy.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project manifest (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. With no subcommand, a full `build` is run.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Delete the output directory and run the full task graph once.
    Build,

    /// Run a single task (plus its transitive predecessors) once.
    Run {
        /// Name of the task, as declared in `[task.<name>]`.
        task: String,
    },

    /// Full build, then watch sources and serve the output with live reload.
    Watch,

    /// Delete the output directory.
    Clean,

    /// Publish the current output directory to the configured target.
    Deploy,

    /// List declared tasks, their kinds and ordering, without executing.
    Tasks,
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
