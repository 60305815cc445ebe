//! Driver side of the pause hook: deliver the wake-up signal to a paused
//! test program.

use std::ffi::c_int;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WakeError {
    #[error("refusing to signal pid {0}: only a single positive pid is allowed")]
    InvalidPid(i32),
    #[error("kill({pid}, {signal}) failed: {source}")]
    Kill {
        pid: i32,
        signal: c_int,
        #[source]
        source: std::io::Error,
    },
}

/// Send `signal` to process `pid`.
#[allow(unsafe_code)]
pub fn send_wake(pid: i32, signal: c_int) -> Result<(), WakeError> {
    // 0 and negative pids address process groups.
    if pid <= 0 {
        return Err(WakeError::InvalidPid(pid));
    }
    // SAFETY: kill takes plain integers and has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, signal) };
    if rc != 0 {
        return Err(WakeError::Kill {
            pid,
            signal,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}
