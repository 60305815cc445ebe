//! The loop predicate driving a test program's main loop.

use std::time::{Duration, Instant};

use crate::config::{LoopCount, StdConfig};

/// Decides whether another iteration should run.
///
/// The test keeps going only while every configured bound allows it: the
/// count must be `Forever` or above `counter`, and when a duration is set the
/// wall clock (measured from the first query) must still be inside it. Between
/// iterations the configured delay is slept before returning.
#[derive(Debug, Clone)]
pub struct Looper {
    count: LoopCount,
    duration: Option<Duration>,
    delay: Option<Duration>,
    started: Option<Instant>,
}

impl Looper {
    #[must_use]
    pub fn new(config: &StdConfig) -> Self {
        Self {
            count: config.loop_count,
            duration: config.duration,
            delay: config.delay,
            started: None,
        }
    }

    pub fn should_continue(&mut self, counter: u64) -> bool {
        let started = *self.started.get_or_insert_with(Instant::now);

        let by_count = match self.count {
            LoopCount::Forever => true,
            LoopCount::Times(n) => counter < n,
        };
        let by_time = self
            .duration
            .is_none_or(|limit| started.elapsed() < limit);

        if !(by_count && by_time) {
            return false;
        }
        if counter > 0
            && let Some(delay) = self.delay
        {
            std::thread::sleep(delay);
        }
        true
    }

    /// Time since the first [`Looper::should_continue`] query.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }
}
