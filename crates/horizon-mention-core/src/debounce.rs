//! Trailing-edge debouncing.
//!
//! A [`Debouncer`] coalesces a burst of events (window resizes, scrolls) into a
//! single firing once the input has been quiet for the configured delay. Each
//! call restarts the quiet period and bumps a generation counter, so a timer
//! started for an earlier call can never fire after a later one.

use std::time::{Duration, Instant};

use crate::logging::targets;
use crate::timer::{TimerId, TimerManager};

/// Coalesces bursts of events into one trailing firing.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timers: TimerManager,
    pending: Option<TimerId>,
    generation: u64,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: TimerManager::new(),
            pending: None,
            generation: 0,
        }
    }

    /// The quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Generation of the most recent call.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record an event at `now`, restarting the quiet period.
    ///
    /// Returns the generation assigned to this call.
    pub fn call(&mut self, now: Instant) -> u64 {
        if let Some(id) = self.pending.take() {
            let _ = self.timers.stop(id);
        }
        self.generation += 1;
        self.pending = Some(self.timers.start_one_shot(now, self.delay));
        self.generation
    }

    /// Drop any pending firing.
    pub fn cancel(&mut self) {
        if let Some(id) = self.pending.take() {
            let _ = self.timers.stop(id);
            self.generation += 1;
        }
    }

    /// Whether a firing is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some_and(|id| self.timers.is_active(id))
    }

    /// Returns `true` exactly once after the quiet period of the latest call elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let fired = self.timers.process_expired(now);
        match self.pending {
            Some(id) if fired.contains(&id) => {
                self.pending = None;
                tracing::trace!(target: targets::TIMER, generation = self.generation, "debounce fired");
                true
            }
            _ => false,
        }
    }
}
