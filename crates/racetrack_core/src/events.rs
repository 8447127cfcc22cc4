//! # Race Event System
//!
//! The seam between the race core and whatever draws it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  on_progress   ┌─────────────┐     ┌─────────────┐
//! │  Runner 0..N│───────────────>│  Observer   │────>│  Renderer   │
//! └─────────────┘                │ (or channel)│     │ (any thread)│
//! ┌─────────────┐  on_finished   │             │     │             │
//! │ Coordinator │───────────────>│             │     │             │
//! └─────────────┘                └─────────────┘     └─────────────┘
//! ```
//!
//! Observers are called from runner threads. A front end that draws on its
//! own thread uses [`EventBus`]: progress goes over a bounded crossbeam
//! channel and is dropped when it is full, finish reports go over their own
//! unbounded channel. Neither send ever blocks a race.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::coordinator::RaceReport;
use crate::LaneId;

/// Hook the race core calls to report progress.
///
/// Both methods default to doing nothing.
pub trait RaceObserver: Send + Sync {
    /// Called by a runner after each step.
    fn on_progress(&self, _lane: LaneId, _current: usize, _total: usize) {}

    /// Called once per race by the coordinator, after every runner stopped.
    fn on_race_finished(&self, _report: &RaceReport) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl RaceObserver for NullObserver {}

/// Events that flow from the race core to a renderer.
#[derive(Clone, Debug)]
pub enum RaceEvent {
    /// A runner took a step.
    Progress {
        /// Lane that moved.
        lane: LaneId,
        /// Steps taken so far.
        current: usize,
        /// Track length.
        total: usize,
    },

    /// Every runner has stopped. Only produced by [`EventBus::drain`];
    /// live renderers read [`EventBus::finished`].
    Finished(RaceReport),
}

/// Event bus between race threads and a renderer.
///
/// Pre-allocates a bounded progress channel so a slow renderer cannot grow
/// memory without limit. Finish reports, one per race, are never dropped.
pub struct EventBus {
    sender: Sender<RaceEvent>,
    receiver: Receiver<RaceEvent>,
    finish_sender: Sender<RaceReport>,
    finish_receiver: Receiver<RaceReport>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum progress events in flight. Progress events
    ///   beyond it are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        let (finish_sender, finish_receiver) = unbounded();
        Self {
            sender,
            receiver,
            finish_sender,
            finish_receiver,
        }
    }

    /// Returns an observer that forwards into this bus.
    #[must_use]
    pub fn observer(&self) -> ChannelObserver {
        ChannelObserver {
            sender: self.sender.clone(),
            finish_sender: self.finish_sender.clone(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns the progress receiver for the renderer side.
    #[must_use]
    pub fn receiver(&self) -> Receiver<RaceEvent> {
        self.receiver.clone()
    }

    /// Returns the receiver of finish reports.
    #[must_use]
    pub fn finished(&self) -> Receiver<RaceReport> {
        self.finish_receiver.clone()
    }

    /// Drains all pending events without blocking, progress first.
    pub fn drain(&self) -> impl Iterator<Item = RaceEvent> + '_ {
        self.receiver
            .try_iter()
            .chain(self.finish_receiver.try_iter().map(RaceEvent::Finished))
    }
}

/// [`RaceObserver`] that forwards into an [`EventBus`].
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<RaceEvent>,
    finish_sender: Sender<RaceReport>,
    dropped: AtomicU64,
}

impl ChannelObserver {
    /// Number of progress events dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl RaceObserver for ChannelObserver {
    fn on_progress(&self, lane: LaneId, current: usize, total: usize) {
        match self.sender.try_send(RaceEvent::Progress {
            lane,
            current,
            total,
        }) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!(dropped, "event channel full, dropping progress events");
                }
            }
        }
    }

    fn on_race_finished(&self, report: &RaceReport) {
        if self.finish_sender.send(report.clone()).is_err() {
            debug!(race = report.race_id, "renderer gone, finish report discarded");
        }
    }
}
