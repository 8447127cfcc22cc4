//! # Runner
//!
//! One competitor. Owns the stepping loop for a single [`Track`] and runs on
//! its own OS thread.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──spawn──> Running ──(track complete)──> Finished (has a rank)
//!                      │  ▲
//!                pause │  │ resume
//!                      ▼  │
//!                    parked in PauseGate
//!
//! cancel, from Running or parked ──> Cancelled (no rank)
//! ```
//!
//! Each step: sleep the step interval, then pass the gate and advance under
//! the gate's lock, then notify. Once `pause` returns no track moves until
//! `resume`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use crate::arrival::ArrivalRegister;
use crate::error::Cancelled;
use crate::events::RaceObserver;
use crate::sync::{CancelToken, PauseGate};
use crate::track::Track;
use crate::{LaneId, Rank};

/// How a runner's thread ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerOutcome {
    /// Crossed the finish line and was ranked.
    Finished {
        /// Lane of the runner.
        lane: LaneId,
        /// Rank from the arrival register.
        rank: Rank,
        /// Steps taken, equal to the track length.
        steps: usize,
    },
    /// Stopped early. Never ranked.
    Cancelled {
        /// Lane of the runner.
        lane: LaneId,
        /// Steps taken before stopping.
        steps: usize,
    },
}

impl RunnerOutcome {
    /// Lane the outcome belongs to.
    #[must_use]
    pub const fn lane(&self) -> LaneId {
        match *self {
            Self::Finished { lane, .. } | Self::Cancelled { lane, .. } => lane,
        }
    }

    /// Rank, if the runner finished.
    #[must_use]
    pub const fn rank(&self) -> Option<Rank> {
        match *self {
            Self::Finished { rank, .. } => Some(rank),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Delay applied before every step.
#[derive(Debug)]
pub struct StepPacing {
    interval: Duration,
    jitter_ms: u64,
    rng: StdRng,
}

impl StepPacing {
    /// Fixed delay with no jitter.
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self::jittered(interval, Duration::ZERO, 0)
    }

    /// Fixed delay plus a uniform extra delay in `0..=jitter`, from a
    /// seeded generator so a race can be replayed.
    #[must_use]
    pub fn jittered(interval: Duration, jitter: Duration, seed: u64) -> Self {
        Self {
            interval,
            jitter_ms: u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_delay(&mut self) -> Duration {
        if self.jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(self.rng.gen_range(0..=self.jitter_ms))
    }
}

/// A competitor advancing one track.
pub struct Runner {
    lane: LaneId,
    name: String,
    track: Arc<Track>,
    gate: Arc<PauseGate>,
    register: Arc<ArrivalRegister>,
    observer: Arc<dyn RaceObserver>,
    cancel: CancelToken,
    pacing: StepPacing,
    /// Mirrors the track's progress counter.
    steps: usize,
}

impl Runner {
    /// Creates a runner for `lane`. Nothing runs until [`spawn`](Self::spawn)
    /// or [`run`](Self::run).
    #[must_use]
    pub fn new(
        lane: LaneId,
        track: Arc<Track>,
        gate: Arc<PauseGate>,
        register: Arc<ArrivalRegister>,
        observer: Arc<dyn RaceObserver>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            lane,
            name: format!("runner-{lane}"),
            track,
            gate,
            register,
            observer,
            cancel,
            pacing: StepPacing::fixed(Duration::ZERO),
            steps: 0,
        }
    }

    /// Sets the per-step delay.
    #[must_use]
    pub fn with_pacing(mut self, pacing: StepPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Lane of this runner.
    #[must_use]
    pub fn lane(&self) -> LaneId {
        self.lane
    }

    /// Display name, also used as the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts the runner on a dedicated named thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be created.
    pub fn spawn(self) -> io::Result<JoinHandle<RunnerOutcome>> {
        thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || self.run())
    }

    /// Runs the race to completion or cancellation on the current thread.
    ///
    /// Consumes the runner, so it can register an arrival at most once.
    ///
    /// # Panics
    ///
    /// Panics if the track was already complete when a step was attempted,
    /// which means two writers shared one track.
    pub fn run(mut self) -> RunnerOutcome {
        debug!(lane = self.lane, length = self.track.size(), "runner started");
        match self.race() {
            Ok(rank) => RunnerOutcome::Finished {
                lane: self.lane,
                rank,
                steps: self.steps,
            },
            Err(Cancelled) => {
                debug!(lane = self.lane, steps = self.steps, "runner cancelled");
                RunnerOutcome::Cancelled {
                    lane: self.lane,
                    steps: self.steps,
                }
            }
        }
    }

    fn race(&mut self) -> Result<Rank, Cancelled> {
        let total = self.track.size();

        while !self.track.is_complete() {
            self.cancel.sleep(self.pacing.next_delay())?;
            let track = &self.track;
            self.gate.step(&self.cancel, || track.advance_one_step())?;
            self.steps += 1;
            self.observer.on_progress(self.lane, self.steps, total);
        }

        let rank = self.register.take_next_rank();
        self.register.record_arrival(self.lane, rank);
        info!(runner = %self.name, rank, "arrived");
        Ok(rank)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("lane", &self.lane)
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("track_len", &self.track.size())
            .finish_non_exhaustive()
    }
}
