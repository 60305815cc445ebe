//! Sample conformance cases.
//!
//! Each case names one operation under test and the outcome its contract
//! promises. `usc-smoke` runs them through the checked-call wrappers.

use thiserror::Error;
use usctest::{CallOutcome, UscContext};

/// How a case invokes its operation.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Call(fn() -> i64),
    Void(fn()),
}

/// What the operation's contract promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Non-negative return value, errno untouched.
    Success,
    /// Return of `-1` with the given errno.
    Failure { errno: i32 },
    /// No return value, errno untouched.
    NoError,
}

#[derive(Debug, Clone, Copy)]
pub struct Case {
    pub name: &'static str,
    pub description: &'static str,
    pub operation: Operation,
    pub expect: Expect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaseError {
    #[error("unknown case {0:?}")]
    Unknown(String),
}

pub const CASES: &[Case] = &[
    Case {
        name: "getpid",
        description: "getpid() returns the caller's pid",
        operation: Operation::Call(sys_getpid),
        expect: Expect::Success,
    },
    Case {
        name: "getppid",
        description: "getppid() returns the parent's pid",
        operation: Operation::Call(sys_getppid),
        expect: Expect::Success,
    },
    Case {
        name: "close_ebadf",
        description: "close(-1) fails with EBADF",
        operation: Operation::Call(sys_close_invalid),
        expect: Expect::Failure {
            errno: libc::EBADF,
        },
    },
    Case {
        name: "dup_ebadf",
        description: "dup(-1) fails with EBADF",
        operation: Operation::Call(sys_dup_invalid),
        expect: Expect::Failure {
            errno: libc::EBADF,
        },
    },
    Case {
        name: "sync",
        description: "sync() returns nothing and sets no errno",
        operation: Operation::Void(sys_sync),
        expect: Expect::NoError,
    },
];

/// Look a case up by name.
pub fn find(name: &str) -> Result<&'static Case, CaseError> {
    CASES
        .iter()
        .find(|case| case.name == name)
        .ok_or_else(|| CaseError::Unknown(name.to_string()))
}

impl Case {
    /// Run the operation through the context's checked-call wrapper.
    pub fn run(&self, ctx: &mut UscContext) -> CallOutcome<i64> {
        match self.operation {
            Operation::Call(call) => ctx.test(call),
            Operation::Void(call) => {
                ctx.test_void(call);
                ctx.last_outcome()
            }
        }
    }

    /// Compare a captured outcome with the contract.
    #[must_use]
    pub fn check(&self, out: CallOutcome<i64>) -> Verdict {
        let ok = match self.expect {
            Expect::Success => out.value >= 0 && out.errno == 0,
            Expect::Failure { errno } => out.value == -1 && out.errno == errno,
            Expect::NoError => out.errno == 0,
        };
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail(format!(
                "{}: expected {:?}, got return={} errno={} ({})",
                self.name,
                self.expect,
                out.value,
                out.errno,
                usctest::errno::name(out.errno)
            ))
        }
    }
}

#[allow(unsafe_code)]
fn sys_getpid() -> i64 {
    // SAFETY: getpid has no preconditions.
    i64::from(unsafe { libc::getpid() })
}

#[allow(unsafe_code)]
fn sys_getppid() -> i64 {
    // SAFETY: getppid has no preconditions.
    i64::from(unsafe { libc::getppid() })
}

#[allow(unsafe_code)]
fn sys_close_invalid() -> i64 {
    // SAFETY: -1 is never an open descriptor.
    i64::from(unsafe { libc::close(-1) })
}

#[allow(unsafe_code)]
fn sys_dup_invalid() -> i64 {
    // SAFETY: -1 is never an open descriptor.
    i64::from(unsafe { libc::dup(-1) })
}

#[allow(unsafe_code)]
fn sys_sync() {
    // SAFETY: sync has no preconditions.
    unsafe { libc::sync() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usctest::StdConfig;

    #[test]
    fn case_names_are_unique() {
        for (i, case) in CASES.iter().enumerate() {
            assert!(
                CASES[i + 1..].iter().all(|other| other.name != case.name),
                "duplicate case {}",
                case.name
            );
        }
    }

    #[test]
    fn every_case_passes_on_host() {
        let mut ctx = UscContext::new(StdConfig::default());
        for case in CASES {
            let out = case.run(&mut ctx);
            assert_eq!(case.check(out), Verdict::Pass, "{}", case.description);
        }
    }

    #[test]
    fn lookup_rejects_unknown_names() {
        assert_eq!(find("dup_ebadf").unwrap().name, "dup_ebadf");
        assert_eq!(find("nope").unwrap_err(), CaseError::Unknown("nope".into()));
    }

    #[test]
    fn mismatched_errno_fails_with_details() {
        let case = find("close_ebadf").unwrap();
        let verdict = case.check(CallOutcome {
            value: -1,
            errno: libc::EINTR,
        });
        match verdict {
            Verdict::Fail(msg) => assert!(msg.contains("EINTR"), "{msg}"),
            Verdict::Pass => panic!("EINTR must not satisfy an EBADF contract"),
        }
    }
}
