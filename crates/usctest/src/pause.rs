//! Checkpoint rendezvous with an external driver.
//!
//! With `-p` a test program blocks before its main loop until something
//! outside wakes it. [`SignalWake`] waits for a signal (`SIGUSR1` unless told
//! otherwise) delivered by e.g. `usc-wake --pid <pid>`; [`PauseGate`] is the
//! in-process equivalent driven from another thread.

use std::ffi::c_int;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PauseError {
    #[error("failed to block signal {signal}: {source}")]
    Mask {
        signal: c_int,
        #[source]
        source: std::io::Error,
    },
    #[error("sigwait for signal {signal} failed: {source}")]
    Wait {
        signal: c_int,
        #[source]
        source: std::io::Error,
    },
}

/// Something a paused test can block on until it is woken.
pub trait WakeSource {
    /// Block the calling thread until woken. There is no timeout.
    fn wait(&self) -> Result<(), PauseError>;
}

// ---------------------------------------------------------------------------
// In-process gate
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GateState {
    released: Mutex<bool>,
    cond: Condvar,
}

/// Condition-variable rendezvous.
///
/// A release that arrives before the wait is kept, and each wait consumes one
/// release so the gate can guard several checkpoints in turn.
#[derive(Debug, Default)]
pub struct PauseGate {
    inner: Arc<GateState>,
}

/// Cloneable waking side of a [`PauseGate`].
#[derive(Debug, Clone)]
pub struct GateHandle {
    inner: Arc<GateState>,
}

impl PauseGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handle(&self) -> GateHandle {
        GateHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Like [`WakeSource::wait`] but gives up after `timeout`.
    ///
    /// Returns whether the gate was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut released = self.inner.released.lock();
        if !*released {
            let _ = self
                .inner
                .cond
                .wait_while_for(&mut released, |released| !*released, timeout);
        }
        std::mem::replace(&mut *released, false)
    }
}

impl WakeSource for PauseGate {
    fn wait(&self) -> Result<(), PauseError> {
        let mut released = self.inner.released.lock();
        while !*released {
            self.inner.cond.wait(&mut released);
        }
        *released = false;
        Ok(())
    }
}

impl GateHandle {
    pub fn release(&self) {
        *self.inner.released.lock() = true;
        self.inner.cond.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Signal wake-up
// ---------------------------------------------------------------------------

/// Waits for a signal with `sigwait`.
///
/// Waiting through this type blocks the signal only when the wait begins, so
/// a signal that arrives earlier still runs its default action (termination
/// for `SIGUSR1`). Call [`SignalWake::arm`] before telling the driver the
/// process is ready and wait on the returned [`ArmedSignal`] instead.
///
/// The mask is changed for the calling thread only. Use this from a
/// single-threaded process: `kill` targets the process, and the kernel may
/// hand the signal to any thread that leaves it unblocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalWake {
    signal: c_int,
}

impl Default for SignalWake {
    fn default() -> Self {
        Self {
            signal: libc::SIGUSR1,
        }
    }
}

impl SignalWake {
    #[must_use]
    pub const fn new(signal: c_int) -> Self {
        Self { signal }
    }

    #[must_use]
    pub const fn signal(&self) -> c_int {
        self.signal
    }

    /// Block the signal in the calling thread so a delivery from now on stays
    /// pending instead of running its default action.
    ///
    /// Arm before announcing readiness to the driver; the returned guard
    /// restores the previous mask when dropped. Other threads keep their own
    /// masks, so arm while the process has a single thread.
    #[allow(unsafe_code)]
    pub fn arm(&self) -> Result<ArmedSignal, PauseError> {
        // SAFETY: sigset_t is plain data and is initialized by sigemptyset
        // before being read.
        let mut set: libc::sigset_t = unsafe { std::mem::zeroed() };
        // SAFETY: as above; filled in by pthread_sigmask.
        let mut previous: libc::sigset_t = unsafe { std::mem::zeroed() };
        // SAFETY: both pointers refer to live local sigset_t values.
        let rc = unsafe {
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, self.signal);
            libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut previous)
        };
        if rc != 0 {
            return Err(PauseError::Mask {
                signal: self.signal,
                source: std::io::Error::from_raw_os_error(rc),
            });
        }
        Ok(ArmedSignal {
            signal: self.signal,
            set,
            previous,
        })
    }
}

/// Arms and waits in one step; see the type docs for the race this leaves.
impl WakeSource for SignalWake {
    fn wait(&self) -> Result<(), PauseError> {
        self.arm()?.wait()
    }
}

/// A signal blocked in the current thread, ready to be waited for.
pub struct ArmedSignal {
    signal: c_int,
    set: libc::sigset_t,
    previous: libc::sigset_t,
}

impl std::fmt::Debug for ArmedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmedSignal")
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl WakeSource for ArmedSignal {
    #[allow(unsafe_code)]
    fn wait(&self) -> Result<(), PauseError> {
        let mut received: c_int = 0;
        // SAFETY: `set` was initialized in `arm` and `received` is a live local.
        let rc = unsafe { libc::sigwait(&self.set, &mut received) };
        if rc != 0 {
            return Err(PauseError::Wait {
                signal: self.signal,
                source: std::io::Error::from_raw_os_error(rc),
            });
        }
        Ok(())
    }
}

impl Drop for ArmedSignal {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: `previous` holds the mask captured by pthread_sigmask in `arm`.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}
