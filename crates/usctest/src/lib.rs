//! Support library for standalone conformance test programs.
//!
//! A test program built on this crate:
//! - parses its command line with [`parse_opts`], getting the standard flags
//!   (`-i`, `-I`, `-P`, `-t`, `-p`, `-e`, `-f`, `-h`) for free;
//! - wraps each operation under test in [`UscContext::test`] (or the free
//!   [`test`]) to capture its return value and `errno` together;
//! - blocks at [`UscContext::pause`] when an external driver asked for it;
//! - loops while [`UscContext::should_continue`] says so;
//! - reports timing and errno statistics from [`UscContext::summary`].
//!
//! ```no_run
//! use usctest::{OptionDescriptor, UscContext, parse_opts};
//!
//! let args: Vec<String> = std::env::args().collect();
//! let mut table = [OptionDescriptor::new("v")];
//! let opts = parse_opts(&args, &mut table, None).unwrap_or_else(|err| {
//!     eprintln!("{err}");
//!     std::process::exit(err.exit_code());
//! });
//! let mut ctx = UscContext::new(opts.config);
//! ctx.pause().ok();
//! let mut counter = 0;
//! while ctx.should_continue(counter) {
//!     let out = ctx.test(|| i64::from(std::process::id()));
//!     assert!(out.value > 0);
//!     counter += 1;
//! }
//! ```

pub mod config;
pub mod context;
pub mod errno;
pub mod looping;
pub mod options;
pub mod outcome;
pub mod pause;
pub mod structured_log;
pub mod timing;

pub use config::{LoopCount, StdConfig};
pub use context::{RunSummary, UscContext};
pub use options::{OptionDescriptor, ParseError, StdOptions, parse_opts};
pub use outcome::{CallOutcome, test, test_void};
pub use pause::{PauseError, PauseGate, SignalWake, WakeSource};
pub use timing::TimingBlock;
