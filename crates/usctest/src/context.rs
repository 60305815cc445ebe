//! Per-run state of a test program.
//!
//! [`UscContext`] owns everything a test program's main loop touches: the
//! parsed configuration, the outcome of the most recent wrapped call, the
//! timing accumulator, the errno tally, and the optional JSONL log.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::StdConfig;
use crate::errno;
use crate::looping::Looper;
use crate::outcome::{self, CallOutcome};
use crate::pause::{PauseError, SignalWake, WakeSource};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel};
use crate::timing::{TimingBlock, TimingSummary};

pub struct UscContext {
    config: StdConfig,
    looper: Looper,
    timing: TimingBlock,
    errno_counts: BTreeMap<i32, u64>,
    last: CallOutcome<i64>,
    iterations: u64,
    current_iteration: Option<u64>,
    wake: Box<dyn WakeSource>,
    log: Option<LogEmitter>,
}

impl std::fmt::Debug for UscContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UscContext")
            .field("config", &self.config)
            .field("timing", &self.timing)
            .field("last", &self.last)
            .field("iterations", &self.iterations)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl UscContext {
    /// Context that pauses on `SIGUSR1` and does not log.
    ///
    /// The default wake source only blocks `SIGUSR1` once [`UscContext::pause`]
    /// runs, so a wake-up sent before that kills the process. A program that
    /// announces its pid to a driver should call [`SignalWake::arm`] first and
    /// install the returned guard with [`UscContext::with_wake_source`]. Signal
    /// masks are per thread: the program must still be single-threaded when it
    /// arms and pauses, or a process-directed signal may land on a thread that
    /// has it unblocked.
    #[must_use]
    pub fn new(config: StdConfig) -> Self {
        Self {
            looper: Looper::new(&config),
            config,
            timing: TimingBlock::new(),
            errno_counts: BTreeMap::new(),
            last: CallOutcome { value: 0, errno: 0 },
            iterations: 0,
            current_iteration: None,
            wake: Box::new(SignalWake::default()),
            log: None,
        }
    }

    #[must_use]
    pub fn with_wake_source<W>(mut self, wake: W) -> Self
    where
        W: WakeSource + 'static,
    {
        self.wake = Box::new(wake);
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn config(&self) -> &StdConfig {
        &self.config
    }

    /// Run `call` as a checked call and remember its outcome.
    ///
    /// With timing on, the elapsed microseconds around the call are added to
    /// the timing accumulator; the clock is read outside the
    /// clear/call/snapshot sequence.
    pub fn test<F>(&mut self, call: F) -> CallOutcome<i64>
    where
        F: FnOnce() -> i64,
    {
        let started = self.config.timing.then(Instant::now);
        let out = outcome::test(call);
        let latency = started.map(|t| micros(t.elapsed()));
        self.record(out, latency);
        out
    }

    /// [`UscContext::test`] for calls that return nothing; the remembered
    /// return value becomes 0.
    pub fn test_void<F>(&mut self, call: F) -> CallOutcome<()>
    where
        F: FnOnce(),
    {
        let started = self.config.timing.then(Instant::now);
        let out = outcome::test_void(call);
        let latency = started.map(|t| micros(t.elapsed()));
        self.record(out.map(|()| 0), latency);
        out
    }

    fn record(&mut self, out: CallOutcome<i64>, latency_us: Option<i64>) {
        self.last = out;
        if let Some(us) = latency_us {
            self.timing.record(us);
        }
        if self.config.errno_log {
            *self.errno_counts.entry(out.errno).or_insert(0) += 1;
        }
        if self.log.is_some() {
            let mut entry = LogEntry::new("", LogLevel::Debug, "call").with_call(out.value, out.errno);
            if let Some(iteration) = self.current_iteration {
                entry = entry.with_iteration(iteration);
            }
            if let Some(us) = latency_us {
                entry = entry.with_latency_us(us);
            }
            self.emit(entry);
        }
    }

    /// Return value of the most recent wrapped call.
    #[must_use]
    pub fn last_return(&self) -> i64 {
        self.last.value
    }

    /// `errno` captured right after the most recent wrapped call.
    #[must_use]
    pub fn last_errno(&self) -> i32 {
        self.last.errno
    }

    #[must_use]
    pub fn last_outcome(&self) -> CallOutcome<i64> {
        self.last
    }

    /// The pause hook: block on the wake source when `-p` was given.
    pub fn pause(&mut self) -> Result<(), PauseError> {
        if !self.config.pause {
            return Ok(());
        }
        self.emit(LogEntry::new("", LogLevel::Info, "pause_wait"));
        self.wake.wait()?;
        self.emit(LogEntry::new("", LogLevel::Info, "pause_resume"));
        Ok(())
    }

    /// The loop predicate; see [`Looper::should_continue`].
    pub fn should_continue(&mut self, counter: u64) -> bool {
        let keep_going = self.looper.should_continue(counter);
        if keep_going {
            self.iterations = self.iterations.max(counter.saturating_add(1));
            self.current_iteration = Some(counter);
        } else {
            self.current_iteration = None;
        }
        keep_going
    }

    #[must_use]
    pub fn timing(&self) -> &TimingBlock {
        &self.timing
    }

    /// Captured errno values and how often each was seen (with `-e`).
    #[must_use]
    pub fn errno_counts(&self) -> &BTreeMap<i32, u64> {
        &self.errno_counts
    }

    /// Append a record to the attached log, if any.
    ///
    /// Log write failures are reported on stderr and never affect the test.
    pub fn emit(&mut self, mut entry: LogEntry) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        if entry.iteration.is_none()
            && let Some(iteration) = self.current_iteration
        {
            entry.iteration = Some(iteration);
        }
        if let Err(err) = log.write_entry(entry) {
            eprintln!("usctest: log write failed: {err}");
        }
    }

    #[must_use]
    pub fn summary(&self, test_name: &str) -> RunSummary {
        RunSummary {
            test_name: test_name.to_string(),
            iterations: self.iterations,
            elapsed: self.looper.elapsed(),
            functional: self.config.functional,
            timing: self.config.timing.then(|| self.timing.summary()),
            errno_counts: self
                .errno_counts
                .iter()
                .map(|(&errno, &count)| ErrnoCount {
                    errno,
                    name: errno::name(errno),
                    count,
                })
                .collect(),
        }
    }

    /// Flush the log; call once the main loop is done.
    pub fn finish(&mut self) -> std::io::Result<()> {
        match self.log.as_mut() {
            Some(log) => log.flush(),
            None => Ok(()),
        }
    }
}

/// How often one errno value was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrnoCount {
    pub errno: i32,
    pub name: &'static str,
    pub count: u64,
}

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub test_name: String,
    pub iterations: u64,
    pub elapsed: Duration,
    pub functional: bool,
    /// Present when timing was on.
    pub timing: Option<TimingSummary>,
    /// Populated when errno logging was on.
    pub errno_counts: Vec<ErrnoCount>,
}

fn micros(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)
}
