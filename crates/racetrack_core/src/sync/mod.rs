//! # Synchronization Primitives for the Race
//!
//! ## The Problem
//!
//! ```text
//! Runner 1..N:   step, step, step ...   (one OS thread each)
//! Control:       pause ... resume       (any thread, any time)
//! Coordinator:   cancel one lane / all  (shutdown)
//! ```
//!
//! Runners must stop at the next step boundary when paused, wake together on
//! resume, and leave promptly when cancelled, whether they are blocked on the
//! gate or sleeping between steps.
//!
//! ## The Solution
//!
//! ```text
//!   ┌──────────────┐   await_if_paused   ┌──────────────┐
//!   │   Runner     │────────────────────>│  PauseGate   │ Mutex<bool> + Condvar
//!   │              │                     └──────────────┘
//!   │              │   sleep(step)       ┌──────────────┐
//!   │              │────────────────────>│ CancelToken  │ Mutex<bool> + Condvar
//!   └──────────────┘                     └──────────────┘
//! ```
//!
//! Cancelling flags the token (waking its sleeper), then wakes the gate so a
//! paused runner re-checks its token. No polling anywhere.

mod cancel;
mod gate;

pub use cancel::CancelToken;
pub use gate::PauseGate;
