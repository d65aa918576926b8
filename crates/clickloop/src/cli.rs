//! Command-line interface definitions for clickloop.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::{PlaybackMode, Role};
use logging::LogArgs;

/// Command-line interface for the `clickloop` binary.
#[derive(Parser, Debug)]
#[command(
    name = "clickloop",
    about = "Global autoclicker and macro recorder",
    version
)]
pub struct Cli {
    /// Logging controls shared across clickloop binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Settings file (defaults to ~/.clickloop/settings.json).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log injected actions instead of performing them. Disables global
    /// hotkeys; use stdin commands instead.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session: global hotkeys plus commands on stdin.
    Run(RunArgs),
    /// Start one run now and exit when it ends.
    Play(PlayArgs),
    /// Record a macro until a line is entered on stdin, then save it.
    Record,
    /// Bind the next key or mouse button to a hotkey role.
    Bind(BindArgs),
    /// Load, normalize and validate a settings file.
    Check(CheckArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Mode that start and the toggle hotkey launch (autoclick|macro).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<PlaybackMode>,

    /// Start a run immediately.
    #[arg(long)]
    pub start: bool,
}

/// Arguments for `play`.
#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// Mode to run (autoclick|macro); defaults to the saved mode.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<PlaybackMode>,
}

/// Arguments for `bind`.
#[derive(Args, Debug, Clone)]
pub struct BindArgs {
    /// Role to bind (toggle|emergency|capture).
    #[arg(value_name = "ROLE")]
    pub role: Role,
}

/// Arguments for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// File to check; defaults to the --config path.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the normalized settings as JSON.
    #[arg(long)]
    pub dump: bool,
}
