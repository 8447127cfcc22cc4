//! # Race Coordinator
//!
//! Builds a race, starts every runner, and collects the result.
//!
//! ## Lifecycle
//!
//! ```text
//! start_race(lanes, length)
//!   ├─ fresh ArrivalRegister + one Track per lane
//!   ├─ PauseGate reset to resumed
//!   └─ one named thread per Runner ──> RaceHandle
//!
//! pause / resume / cancel   (any thread, through RaceHandle or RaceControl)
//!
//! await_completion(handle)
//!   ├─ join every runner
//!   ├─ winner + ranks from the ArrivalRegister
//!   └─ observer.on_race_finished(report) ──> RaceReport
//! ```
//!
//! Dropping a `RaceHandle` without awaiting it cancels the race and joins
//! every runner, so no thread outlives its race.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::arrival::ArrivalRegister;
use crate::config::RaceConfig;
use crate::error::{RaceError, RaceResult};
use crate::events::{NullObserver, RaceObserver};
use crate::runner::{Runner, RunnerOutcome, StepPacing};
use crate::sync::{CancelToken, PauseGate};
use crate::track::Track;
use crate::{LaneId, Rank};

/// Final result of one race.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaceReport {
    /// Identifier of the race, unique per coordinator.
    pub race_id: u64,
    /// Lane that took rank 1, if anyone finished.
    pub winner: Option<LaneId>,
    /// Rank per lane, indexed by lane. `None` for cancelled lanes.
    pub ranks: Vec<Option<Rank>>,
    /// Number of ranks the register handed out.
    pub issued: u32,
    /// Lanes that stopped before the finish line.
    pub cancelled: Vec<LaneId>,
    /// Wall-clock time from start to the last join.
    pub elapsed: Duration,
}

impl RaceReport {
    /// Rank of `lane`, if it finished.
    #[must_use]
    pub fn rank_of(&self, lane: LaneId) -> Option<Rank> {
        self.ranks.get(lane).copied().flatten()
    }

    /// Number of lanes that crossed the finish line.
    #[must_use]
    pub fn finishers(&self) -> usize {
        self.ranks.iter().filter(|r| r.is_some()).count()
    }

    /// Returns true if no lane was cancelled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cancelled.is_empty()
    }

    /// Lanes in finishing order.
    #[must_use]
    pub fn podium(&self) -> Vec<LaneId> {
        let mut finished: Vec<(Rank, LaneId)> = self
            .ranks
            .iter()
            .enumerate()
            .filter_map(|(lane, rank)| rank.map(|r| (r, lane)))
            .collect();
        finished.sort_unstable();
        finished.into_iter().map(|(_, lane)| lane).collect()
    }
}

/// Cloneable control surface for a running race.
///
/// Lets a control thread pause, resume or cancel while another thread is
/// blocked in [`RaceCoordinator::await_completion`].
#[derive(Clone, Debug)]
pub struct RaceControl {
    gate: Arc<PauseGate>,
    tokens: Arc<[CancelToken]>,
}

impl RaceControl {
    /// Holds every runner at its next step boundary.
    pub fn pause(&self) {
        self.gate.pause();
    }

    /// Releases every held runner.
    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Returns whether the race is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Number of runners currently held by the pause.
    #[must_use]
    pub fn parked(&self) -> usize {
        self.gate.waiting()
    }

    /// Stops one runner. It will not be ranked.
    ///
    /// A runner that already finished keeps its rank.
    ///
    /// # Errors
    ///
    /// [`RaceError::UnknownLane`] if `lane` is out of range.
    pub fn cancel_lane(&self, lane: LaneId) -> RaceResult<()> {
        let token = self.tokens.get(lane).ok_or(RaceError::UnknownLane {
            lane,
            lanes: self.tokens.len(),
        })?;
        token.cancel();
        self.gate.wake_all();
        debug!(lane, "lane cancelled");
        Ok(())
    }

    /// Stops every runner that has not finished.
    pub fn cancel(&self) {
        for token in self.tokens.iter() {
            token.cancel();
        }
        self.gate.wake_all();
        debug!(lanes = self.tokens.len(), "race cancelled");
    }
}

/// A started race.
///
/// Pass it to [`RaceCoordinator::await_completion`] to get the result.
#[derive(Debug)]
pub struct RaceHandle {
    race_id: u64,
    tracks: Vec<Arc<Track>>,
    threads: Vec<JoinHandle<RunnerOutcome>>,
    register: Arc<ArrivalRegister>,
    control: RaceControl,
    started: Instant,
}

impl RaceHandle {
    /// Identifier of this race.
    #[must_use]
    pub fn race_id(&self) -> u64 {
        self.race_id
    }

    /// Number of lanes.
    #[must_use]
    pub fn lanes(&self) -> usize {
        self.tracks.len()
    }

    /// Tracks, indexed by lane, for renderers.
    #[must_use]
    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    /// Current progress of every lane.
    #[must_use]
    pub fn progress(&self) -> Vec<usize> {
        self.tracks.iter().map(|t| t.current_progress()).collect()
    }

    /// Cloneable control surface for this race.
    #[must_use]
    pub fn control(&self) -> RaceControl {
        self.control.clone()
    }

    /// See [`RaceControl::pause`].
    pub fn pause(&self) {
        self.control.pause();
    }

    /// See [`RaceControl::resume`].
    pub fn resume(&self) {
        self.control.resume();
    }

    /// See [`RaceControl::cancel_lane`].
    ///
    /// # Errors
    ///
    /// [`RaceError::UnknownLane`] if `lane` is out of range.
    pub fn cancel_lane(&self, lane: LaneId) -> RaceResult<()> {
        self.control.cancel_lane(lane)
    }

    /// See [`RaceControl::cancel`].
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Joins every runner.
    ///
    /// A runner panic is a broken invariant: the rest of the race is
    /// cancelled and joined, then the panic is re-raised.
    fn join_all(&mut self) -> Vec<RunnerOutcome> {
        let mut outcomes = Vec::with_capacity(self.threads.len());
        let mut panic = None;

        for handle in std::mem::take(&mut self.threads) {
            match handle.join() {
                Ok(outcome) => outcomes.push(outcome),
                Err(payload) => {
                    self.control.cancel();
                    if panic.is_none() {
                        panic = Some(payload);
                    }
                }
            }
        }

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        outcomes
    }
}

impl Drop for RaceHandle {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        warn!(race = self.race_id, "race handle dropped before completion, cancelling");
        self.control.cancel();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Starts races and collects their results.
///
/// One coordinator owns one [`PauseGate`], shared by every race it starts
/// and reset to resumed at the start of each.
pub struct RaceCoordinator {
    config: RaceConfig,
    gate: Arc<PauseGate>,
    observer: Arc<dyn RaceObserver>,
    next_race_id: AtomicU64,
}

impl RaceCoordinator {
    /// Creates a coordinator with no observer.
    #[must_use]
    pub fn new(config: RaceConfig) -> Self {
        Self::with_observer(config, Arc::new(NullObserver))
    }

    /// Creates a coordinator that reports to `observer`.
    #[must_use]
    pub fn with_observer(config: RaceConfig, observer: Arc<dyn RaceObserver>) -> Self {
        Self {
            config,
            gate: Arc::new(PauseGate::new()),
            observer,
            next_race_id: AtomicU64::new(1),
        }
    }

    /// Holds every runner of the current race at its next step boundary.
    ///
    /// Before any race has started this only flips the gate, and the next
    /// [`start_race`](Self::start_race) resets it.
    pub fn pause(&self) {
        self.gate.pause();
    }

    /// Releases every held runner.
    pub fn resume(&self) {
        self.gate.resume();
    }

    /// Returns whether the gate is closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Starts a race with the configured lane count and track length.
    ///
    /// # Errors
    ///
    /// As [`start_race`](Self::start_race).
    pub fn start_configured(&self) -> RaceResult<RaceHandle> {
        self.start_race(self.config.lanes, self.config.track_length)
    }

    /// Starts `lane_count` runners on tracks of `track_length` steps.
    ///
    /// # Errors
    ///
    /// [`RaceError::NoLanes`], [`RaceError::InvalidTrackLength`], or
    /// [`RaceError::SpawnFailed`] if a thread could not be started (runners
    /// already started are cancelled and joined first).
    pub fn start_race(&self, lane_count: usize, track_length: usize) -> RaceResult<RaceHandle> {
        if lane_count == 0 {
            return Err(RaceError::NoLanes);
        }
        let tracks = (0..lane_count)
            .map(|_| Track::new(track_length).map(Arc::new))
            .collect::<RaceResult<Vec<_>>>()?;

        let race_id = self.next_race_id.fetch_add(1, Ordering::Relaxed);
        let register = Arc::new(ArrivalRegister::with_capacity(lane_count));
        let tokens: Arc<[CancelToken]> = (0..lane_count).map(|_| CancelToken::new()).collect();
        let control = RaceControl {
            gate: Arc::clone(&self.gate),
            tokens: Arc::clone(&tokens),
        };

        self.gate.reset();
        let started = Instant::now();

        let seed = self.config.seed.unwrap_or(race_id);
        let mut threads = Vec::with_capacity(lane_count);
        for (lane, track) in tracks.iter().enumerate() {
            let pacing = StepPacing::jittered(
                self.config.step_interval(),
                self.config.step_jitter(),
                lane_seed(seed, lane),
            );
            let runner = Runner::new(
                lane,
                Arc::clone(track),
                Arc::clone(&self.gate),
                Arc::clone(&register),
                Arc::clone(&self.observer),
                tokens[lane].clone(),
            )
            .with_pacing(pacing);

            match runner.spawn() {
                Ok(handle) => threads.push(handle),
                Err(source) => {
                    control.cancel();
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(RaceError::SpawnFailed { lane, source });
                }
            }
        }

        info!(race = race_id, lanes = lane_count, length = track_length, "race started");

        Ok(RaceHandle {
            race_id,
            tracks,
            threads,
            register,
            control,
            started,
        })
    }

    /// Blocks until every runner has stopped and returns the result.
    ///
    /// Calls the observer's `on_race_finished` exactly once.
    ///
    /// # Panics
    ///
    /// Re-raises a runner's panic (a broken track invariant) after the rest
    /// of the race has been cancelled and joined.
    pub fn await_completion(&self, mut handle: RaceHandle) -> RaceReport {
        let outcomes = handle.join_all();

        let mut ranks = vec![None; handle.lanes()];
        for arrival in handle.register.arrivals() {
            ranks[arrival.lane] = Some(arrival.rank);
        }
        let cancelled: Vec<LaneId> = outcomes
            .iter()
            .filter(|o| matches!(o, RunnerOutcome::Cancelled { .. }))
            .map(RunnerOutcome::lane)
            .collect();

        let report = RaceReport {
            race_id: handle.race_id,
            winner: handle.register.winner(),
            ranks,
            issued: handle.register.issued(),
            cancelled,
            elapsed: handle.started.elapsed(),
        };

        info!(
            race = report.race_id,
            winner = ?report.winner,
            finishers = report.finishers(),
            cancelled = report.cancelled.len(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "race finished"
        );
        self.observer.on_race_finished(&report);
        report
    }

    /// Starts a race and waits for it.
    ///
    /// # Errors
    ///
    /// As [`start_race`](Self::start_race).
    pub fn run_race(&self, lane_count: usize, track_length: usize) -> RaceResult<RaceReport> {
        let handle = self.start_race(lane_count, track_length)?;
        Ok(self.await_completion(handle))
    }
}

impl std::fmt::Debug for RaceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceCoordinator")
            .field("config", &self.config)
            .field("paused", &self.gate.is_paused())
            .field("next_race_id", &self.next_race_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Spreads one race seed over the lanes.
fn lane_seed(seed: u64, lane: LaneId) -> u64 {
    seed ^ (lane as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
