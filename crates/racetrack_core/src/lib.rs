//! # RACETRACK Core
//!
//! A race of independent runner threads with a shared pause barrier and an
//! atomic finishing register.
//!
//! ## Components (leaf to root)
//!
//! ```text
//! PauseGate ─────────┐
//! ArrivalRegister ───┼──> Runner (one thread per lane) ──> RaceCoordinator
//! Track ─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use racetrack_core::{RaceConfig, RaceCoordinator};
//!
//! let coordinator = RaceCoordinator::new(RaceConfig::default());
//! let handle = coordinator.start_race(4, 5)?;
//! handle.pause();
//! handle.resume();
//! let report = coordinator.await_completion(handle);
//! println!("winner: {:?}", report.winner);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod arrival;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod runner;
pub mod sync;
pub mod track;

/// Index of a lane, `0..lanes`.
pub type LaneId = usize;

/// 1-based finishing position.
pub type Rank = u32;

pub use arrival::{Arrival, ArrivalRegister};
pub use config::RaceConfig;
pub use coordinator::{RaceControl, RaceCoordinator, RaceHandle, RaceReport};
pub use error::{Cancelled, RaceError, RaceResult};
pub use events::{ChannelObserver, EventBus, NullObserver, RaceEvent, RaceObserver};
pub use runner::{Runner, RunnerOutcome, StepPacing};
pub use sync::{CancelToken, PauseGate};
pub use track::Track;
