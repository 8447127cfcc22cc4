//! Command line and stdin command parsing.

use racetrack_core::{LaneId, RaceError};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Usage text printed for `--help` and on bad arguments.
pub const USAGE: &str = "\
usage: racetrack [--auto] [CONFIG.toml]

  --auto       run one race immediately and exit when it ends
  -h, --help   print this message

commands (one per line on stdin):
  start | s            start a race
  pause | stop | p     hold every runner
  resume | continue | c
  cancel [LANE] | x    stop one lane, or the whole race
  status               redraw the board
  quit | q             cancel and exit";

/// Front-end errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Unrecognized command line flag.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// More than one config path given.
    #[error("unexpected argument: {0}")]
    ExtraArgument(String),

    /// Unrecognized stdin command.
    #[error("unknown command: {0:?} (try start, pause, resume, cancel, status, quit)")]
    UnknownCommand(String),

    /// Lane argument is not a number.
    #[error("not a lane number: {0:?}")]
    BadLane(String),

    /// Error from the race core.
    #[error(transparent)]
    Race(#[from] RaceError),

    /// Thread spawn or terminal IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Run a single race without reading stdin.
    pub auto: bool,
    /// Print usage and exit.
    pub help: bool,
    /// Optional TOML config path.
    pub config: Option<PathBuf>,
}

/// Parses arguments, excluding the program name.
///
/// # Errors
///
/// [`CliError::UnknownFlag`] or [`CliError::ExtraArgument`].
pub fn parse_args<I>(args: I) -> Result<Args, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    for arg in args {
        match arg.as_str() {
            "--auto" => parsed.auto = true,
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => return Err(CliError::UnknownFlag(arg)),
            _ if parsed.config.is_some() => return Err(CliError::ExtraArgument(arg)),
            _ => parsed.config = Some(PathBuf::from(arg)),
        }
    }
    Ok(parsed)
}

/// A control command typed on stdin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a race.
    Start,
    /// Pause every runner.
    Pause,
    /// Resume every runner.
    Resume,
    /// Cancel one lane, or the whole race with `None`.
    Cancel(Option<LaneId>),
    /// Redraw the board.
    Status,
    /// Cancel and exit.
    Quit,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CliError::UnknownCommand(line.to_string()));
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" | "s" => Self::Start,
            "pause" | "stop" | "p" => Self::Pause,
            "resume" | "continue" | "c" => Self::Resume,
            "cancel" | "x" => match words.next() {
                None => Self::Cancel(None),
                Some(lane) => Self::Cancel(Some(
                    lane.parse()
                        .map_err(|_| CliError::BadLane(lane.to_string()))?,
                )),
            },
            "status" => Self::Status,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return Err(CliError::UnknownCommand(line.trim().to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(CliError::UnknownCommand(format!("{verb} {extra}")));
        }
        Ok(command)
    }
}
