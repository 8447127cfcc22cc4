//! # Race Error Types
//!
//! All recoverable errors that can occur while configuring or driving a race.
//!
//! Precondition violations (advancing a finished track) are not represented
//! here: they are programming errors and panic.

use thiserror::Error;

use crate::LaneId;

/// Errors that can occur in the race core.
#[derive(Error, Debug)]
pub enum RaceError {
    /// A track must have at least one step.
    #[error("invalid track length: {0} (must be at least 1)")]
    InvalidTrackLength(usize),

    /// A race needs at least one lane.
    #[error("a race needs at least one lane")]
    NoLanes,

    /// Lane index outside the race.
    #[error("unknown lane {lane}: race has {lanes} lanes")]
    UnknownLane {
        /// The lane that was asked for.
        lane: LaneId,
        /// Number of lanes in the race.
        lanes: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// Path that was read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to start a runner thread.
    #[error("failed to spawn runner for lane {lane}: {source}")]
    SpawnFailed {
        /// Lane whose runner could not be started.
        lane: LaneId,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for race operations.
pub type RaceResult<T> = Result<T, RaceError>;

/// Marker returned when a runner observes its cancellation token.
///
/// This is the in-crate stand-in for thread interruption: it unwinds the
/// stepping loop through `?` without touching the arrival register.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("runner cancelled")]
pub struct Cancelled;
