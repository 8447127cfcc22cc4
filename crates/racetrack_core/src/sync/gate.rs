//! # Pause Gate
//!
//! A pausable barrier shared by every runner of a race.
//!
//! ## Thread Safety
//!
//! - `pause` / `resume` / `reset`: any thread, any time, idempotent
//! - `await_if_paused` / `step`: runner threads, once per step
//! - `wake_all`: cancelling parties, after flagging a token
//!
//! The paused flag and the waiter count live under one mutex, so a runner
//! either sees the flag cleared or is already parked on the condvar when
//! `resume` notifies. There is no window for a lost wake-up.

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use crate::error::Cancelled;
use crate::sync::CancelToken;

/// Pausable barrier consulted by runners before every step.
#[derive(Debug, Default)]
pub struct PauseGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    paused: bool,
    /// Threads currently parked in `await_if_paused`.
    waiting: usize,
}

impl PauseGate {
    /// Creates a gate in the resumed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the gate. Runners stop at their next step boundary.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if !state.paused {
            state.paused = true;
            debug!("pause gate closed");
        }
    }

    /// Opens the gate and wakes every parked runner.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if state.paused {
            state.paused = false;
            debug!(waiting = state.waiting, "pause gate opened");
        }
        self.changed.notify_all();
    }

    /// Puts the gate back into the resumed state for a new race.
    pub fn reset(&self) {
        self.resume();
    }

    /// Returns whether the gate is currently closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Returns the number of threads parked on the gate right now.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// Wakes every parked thread without changing the paused flag.
    ///
    /// Parked threads re-check their tokens and the flag; those still paused
    /// and not cancelled park again.
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.changed.notify_all();
    }

    /// Blocks while the gate is closed.
    ///
    /// Returns immediately when open. The flag is re-checked after every
    /// wake, so a pause issued between a notify and the wake keeps the
    /// caller parked.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if `token` is cancelled on entry or while parked.
    pub fn await_if_paused(&self, token: &CancelToken) -> Result<(), Cancelled> {
        let mut state = self.state.lock();
        self.wait_open(&mut state, token)
    }

    /// Waits for the gate to open, then runs `step` before releasing it.
    ///
    /// `pause` cannot return between the check and `step`, so once it has
    /// returned no step runs until the next `resume`. Keep `step` short.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if `token` is cancelled on entry or while parked;
    /// `step` is not run.
    pub fn step<T>(&self, token: &CancelToken, step: impl FnOnce() -> T) -> Result<T, Cancelled> {
        let mut state = self.state.lock();
        self.wait_open(&mut state, token)?;
        Ok(step())
    }

    fn wait_open(
        &self,
        state: &mut MutexGuard<'_, GateState>,
        token: &CancelToken,
    ) -> Result<(), Cancelled> {
        loop {
            token.check()?;
            if !state.paused {
                return Ok(());
            }
            state.waiting += 1;
            self.changed.wait(state);
            state.waiting -= 1;
        }
    }
}
