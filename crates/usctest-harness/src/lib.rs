//! Sample conformance programs and run reporting built on `usctest`.
//!
//! This crate provides:
//! - Sample cases: a small table of system calls with known outcomes
//! - Report rendering: plain-text and JSON end-of-run summaries
//! - Wake-up delivery: the driver side of the pause hook

pub mod cases;
pub mod report;
pub mod wake;

pub use cases::{CASES, Case, Expect, Verdict};
pub use report::{render_json, render_plain};
pub use wake::{WakeError, send_wake};
