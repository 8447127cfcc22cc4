//! # Race Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid config.
//!
//! ```toml
//! lanes = 17
//! track_length = 100
//! step_interval_ms = 100
//! step_jitter_ms = 20
//! seed = 42
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{RaceError, RaceResult};

/// Default number of lanes.
pub const DEFAULT_LANES: usize = 17;

/// Default track length in steps.
pub const DEFAULT_TRACK_LENGTH: usize = 100;

/// Default delay between two steps of a runner.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 100;

/// Default renderer channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Configuration for a race.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RaceConfig {
    /// Number of lanes (runners).
    pub lanes: usize,
    /// Steps from start to finish.
    pub track_length: usize,
    /// Fixed delay before each step, in milliseconds.
    pub step_interval_ms: u64,
    /// Upper bound of a random extra delay per step, in milliseconds.
    /// Zero disables jitter.
    pub step_jitter_ms: u64,
    /// Seed for the jitter. `None` seeds from the race id.
    pub seed: Option<u64>,
    /// Capacity of the renderer event channel.
    pub event_capacity: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
            track_length: DEFAULT_TRACK_LENGTH,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            step_jitter_ms: 0,
            seed: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RaceConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// [`RaceError::InvalidConfig`] on malformed TOML or an invalid value.
    pub fn from_toml_str(text: &str) -> RaceResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RaceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// [`RaceError::ConfigIo`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> RaceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RaceError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`RaceError::NoLanes`], [`RaceError::InvalidTrackLength`], or
    /// [`RaceError::InvalidConfig`] for a zero event capacity.
    pub fn validate(&self) -> RaceResult<()> {
        if self.lanes == 0 {
            return Err(RaceError::NoLanes);
        }
        if self.track_length == 0 {
            return Err(RaceError::InvalidTrackLength(self.track_length));
        }
        if self.event_capacity == 0 {
            return Err(RaceError::InvalidConfig(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fixed per-step delay.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    /// Maximum random extra delay per step.
    #[must_use]
    pub fn step_jitter(&self) -> Duration {
        Duration::from_millis(self.step_jitter_ms)
    }
}
