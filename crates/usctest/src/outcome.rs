//! Checked invocation of an operation under test.
//!
//! [`test`] and [`test_void`] clear `errno`, run the call, and snapshot
//! `errno` with nothing in between, so the captured value belongs to the
//! wrapped call. Whether the call failed is for the caller to decide from the
//! operation's own contract.

use serde::Serialize;

use crate::errno;

/// Return value and `errno` captured from one wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallOutcome<T> {
    pub value: T,
    pub errno: i32,
}

impl<T> CallOutcome<T> {
    /// True when the call left `errno` untouched.
    #[must_use]
    pub const fn errno_clear(&self) -> bool {
        self.errno == 0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        CallOutcome {
            value: f(self.value),
            errno: self.errno,
        }
    }
}

impl CallOutcome<i64> {
    /// The conventional `-1` failure return of system calls.
    #[must_use]
    pub const fn is_minus_one(&self) -> bool {
        self.value == -1
    }
}

/// Run `call` with `errno` cleared and capture its result and `errno`.
#[inline]
pub fn test<T, F>(call: F) -> CallOutcome<T>
where
    F: FnOnce() -> T,
{
    errno::clear();
    let value = call();
    let errno = errno::get();
    CallOutcome { value, errno }
}

/// [`test`] for calls that return nothing.
#[inline]
pub fn test_void<F>(call: F) -> CallOutcome<()>
where
    F: FnOnce(),
{
    errno::clear();
    call();
    CallOutcome {
        value: (),
        errno: errno::get(),
    }
}
