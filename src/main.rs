mod analysis;
mod artifacts;
mod cli;
mod config;
mod context;
mod enrich;
mod frontmatter;
mod ledger;
mod link;
mod model;
mod paths;
mod review;
mod segment;
mod slug;
mod store;
mod util;
mod workflow;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Command, RootArgs};
use config::ConfigError;

/// Exit code for invalid configuration or a missing credential.
const EXIT_CONFIG: u8 = 2;
/// Exit code for a run stopped by rejected analysis credentials.
const EXIT_AUTHORIZATION: u8 = 3;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match dispatch(&args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG)
            } else if workflow::is_authorization(&err) {
                ExitCode::from(EXIT_AUTHORIZATION)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn dispatch(command: &Command) -> Result<()> {
    match command {
        Command::Split(args) => workflow::run_split(args),
        Command::Link(args) => workflow::run_link(args),
        Command::Enrich(args) => workflow::run_enrich(args),
        Command::Run(args) => workflow::run_all(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
