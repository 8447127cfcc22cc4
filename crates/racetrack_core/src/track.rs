//! # Track
//!
//! Per-lane progress. Written by exactly one runner, read by any number of
//! renderers through a shared `Arc<Track>`.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{RaceError, RaceResult};

/// Fixed-length track with a monotonic progress counter.
#[derive(Debug)]
pub struct Track {
    /// Number of steps to the finish line.
    len: usize,
    /// Steps taken so far, in `0..=len`.
    progress: AtomicUsize,
}

impl Track {
    /// Creates a track of `len` steps with no progress.
    ///
    /// # Errors
    ///
    /// [`RaceError::InvalidTrackLength`] if `len` is zero.
    pub fn new(len: usize) -> RaceResult<Self> {
        if len == 0 {
            return Err(RaceError::InvalidTrackLength(len));
        }
        Ok(Self {
            len,
            progress: AtomicUsize::new(0),
        })
    }

    /// Returns the number of steps to the finish line.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.len
    }

    /// Moves one step forward.
    ///
    /// Only the owning runner calls this, so load-then-store cannot race.
    ///
    /// # Panics
    ///
    /// Panics if the track is already complete.
    pub fn advance_one_step(&self) {
        let current = self.progress.load(Ordering::Relaxed);
        assert!(
            current < self.len,
            "advanced a completed track ({current}/{})",
            self.len
        );
        self.progress.store(current + 1, Ordering::Release);
    }

    /// Returns the number of steps taken so far.
    #[inline]
    #[must_use]
    pub fn current_progress(&self) -> usize {
        self.progress.load(Ordering::Acquire)
    }

    /// Returns whether the runner has reached the finish line.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_progress() == self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(Track::new(0), Err(RaceError::InvalidTrackLength(0))));
    }

    #[test]
    fn test_completes_after_exactly_len_steps() {
        let track = Track::new(5).unwrap();
        assert_eq!(track.size(), 5);

        for step in 1..5 {
            track.advance_one_step();
            assert_eq!(track.current_progress(), step);
            assert!(!track.is_complete());
        }

        track.advance_one_step();
        assert!(track.is_complete());
        assert_eq!(track.current_progress(), 5);
    }

    #[test]
    fn test_single_step_track() {
        let track = Track::new(1).unwrap();
        assert!(!track.is_complete());
        track.advance_one_step();
        assert!(track.is_complete());
    }

    #[test]
    #[should_panic(expected = "advanced a completed track")]
    fn test_advance_past_finish_panics() {
        let track = Track::new(2).unwrap();
        track.advance_one_step();
        track.advance_one_step();
        track.advance_one_step();
    }
}
