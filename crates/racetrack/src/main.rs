//! # RACETRACK
//!
//! Terminal front end for `racetrack_core`: one progress bar per lane,
//! with start / pause / resume / cancel typed on stdin.
//!
//! ```bash
//! # Interactive, default 17 lanes of 100 steps
//! racetrack
//!
//! # One race from a config file, then exit
//! racetrack --auto race.toml
//!
//! # Runner and coordinator logs on stderr
//! RUST_LOG=racetrack_core=info racetrack
//! ```
//!
//! Exit codes: 0 on success, 1 on a config or runtime error, 2 on bad arguments.

mod cli;
mod render;
mod session;

use cli::{CliError, USAGE};
use racetrack_core::RaceConfig;
use session::Session;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match cli::parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "racetrack failed");
            eprintln!("racetrack: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: cli::Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => RaceConfig::from_file(path)?,
        None => RaceConfig::default(),
    };
    Session::new(config, args.auto).run()
}
