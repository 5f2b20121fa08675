// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::Overrides;

/// Command-line arguments for `devloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devloop",
    version,
    about = "Rebuild and restart a Go program whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Package directory or `.go` file to build and run.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Arguments passed through to the program.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Verbose output.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Skip `go generate`.
    #[arg(long)]
    pub no_generate: bool,

    /// Directory of where to place the built binary.
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<String>,

    /// Build and run once, without watching.
    #[arg(short = '1', long)]
    pub once: bool,

    /// Regex of files whose changes trigger a rebuild.
    #[arg(long, value_name = "REGEX")]
    pub watch_pattern: Option<String>,

    /// Directory to watch recursively.
    #[arg(long, value_name = "DIR")]
    pub watch_dir: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Devloop.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `-v` selects debug, else `DEVLOOP_LOG` or info is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Install the Vugu code generators with `go install`, then exit.
    #[arg(long)]
    pub install_tools: bool,

    /// Resolve and print the settings, but don't build or run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            target: self.target.clone(),
            args: self.args.clone(),
            bin_dir: self.bin_dir.clone(),
            no_generate: self.no_generate,
            watch_dir: self.watch_dir.clone(),
            watch_pattern: self.watch_pattern.clone(),
            once: self.once,
            verbose: self.verbose,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
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
