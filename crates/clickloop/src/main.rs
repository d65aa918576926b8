#![warn(missing_docs)]

//! Entry point for the `clickloop` binary.

mod app;
mod cli;
mod console;
mod error;

use std::{io, process};

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, registry};

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {}", err.pretty());
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli {
        log,
        config: config_path,
        dry_run,
        command,
    } = Cli::parse();
    let env_filter = logging::env_filter_from_spec(&log.spec());
    registry()
        .with(env_filter)
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .try_init()
        .ok();

    let path = config::resolve_settings_path(config_path.as_deref());
    match command {
        Commands::Run(args) => app::interactive(&path, dry_run, &args),
        Commands::Play(args) => app::play(&path, dry_run, &args),
        Commands::Record => app::record(&path, dry_run),
        Commands::Bind(args) => app::bind(&path, dry_run, &args),
        Commands::Check(args) => app::check(path, &args),
    }
}
