//! Per-runner cancellation token.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Cancelled;

/// Cancellation flag shared between a runner and whoever may stop it.
///
/// Cloning is cheap; all clones observe the same flag. Once cancelled a token
/// stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags the token and wakes any thread sleeping on it.
    ///
    /// Idempotent. Does not wake threads blocked on a [`PauseGate`]; pair it
    /// with [`PauseGate::wake_all`] for that.
    ///
    /// [`PauseGate`]: crate::sync::PauseGate
    /// [`PauseGate::wake_all`]: crate::sync::PauseGate::wake_all
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    /// Returns whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Returns `Err(Cancelled)` if the token has been cancelled.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Blocks on the token's own condvar, so no shared lock is held while
    /// sleeping.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if the token is cancelled before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        loop {
            if *cancelled {
                return Err(Cancelled);
            }
            if self.inner.wake.wait_until(&mut cancelled, deadline).timed_out() {
                return if *cancelled { Err(Cancelled) } else { Ok(()) };
            }
        }
    }
}
