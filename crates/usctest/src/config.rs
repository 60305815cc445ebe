//! Run configuration shared by every test program.
//!
//! The configuration is produced by [`crate::options::parse_opts`] from the
//! standard command-line flags, with `USC_*` environment variables filling in
//! whatever the command line left unset:
//! - `USC_ITERATIONS`: iteration count, same syntax as `-i`.
//! - `USC_LOOP_WALLTIME`: seconds to keep looping, same syntax as `-I`.
//! - `USC_LOOP_DELAY`: seconds to sleep between iterations, same syntax as `-P`.
//! - `USC_NO_FUNC_CHECK`: any value turns functional checking off (`-f`).

use std::time::Duration;

use serde::Serialize;

pub const ENV_ITERATIONS: &str = "USC_ITERATIONS";
pub const ENV_LOOP_WALLTIME: &str = "USC_LOOP_WALLTIME";
pub const ENV_LOOP_DELAY: &str = "USC_LOOP_DELAY";
pub const ENV_NO_FUNC_CHECK: &str = "USC_NO_FUNC_CHECK";

/// How many times the test body runs.
///
/// `-i 0` selects [`LoopCount::Forever`]; any other value is an exact count.
/// A wall-clock duration given without a count also leaves the count at
/// `Forever`, so the duration alone ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopCount {
    Times(u64),
    Forever,
}

impl Default for LoopCount {
    fn default() -> Self {
        Self::Times(1)
    }
}

impl LoopCount {
    /// Parse an iteration count as accepted by `-i`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let n: u64 = raw
            .trim()
            .parse()
            .map_err(|_| "expected a non-negative integer".to_string())?;
        Ok(if n == 0 { Self::Forever } else { Self::Times(n) })
    }
}

/// Parse a non-negative, possibly fractional, number of seconds.
pub fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| "expected a number of seconds".to_string())?;
    Duration::try_from_secs_f64(secs).map_err(|_| "expected a finite, non-negative number".to_string())
}

/// Flags and loop bounds in effect for one test program run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StdConfig {
    /// `-t`: time every wrapped call.
    pub timing: bool,
    /// `-i n`
    pub loop_count: LoopCount,
    /// `-I x`: keep looping until this much wall-clock time has passed.
    pub duration: Option<Duration>,
    /// `-P x`: sleep between iterations.
    pub delay: Option<Duration>,
    /// `-p`: block on the wake source before starting.
    pub pause: bool,
    /// `-e`: tally captured errno values.
    pub errno_log: bool,
    /// Cleared by `-f`; tests skip result verification when false.
    pub functional: bool,
}

impl Default for StdConfig {
    fn default() -> Self {
        Self {
            timing: false,
            loop_count: LoopCount::default(),
            duration: None,
            delay: None,
            pause: false,
            errno_log: false,
            functional: true,
        }
    }
}

/// Which settings were fixed explicitly and must not be touched by the
/// environment or by defaulting rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Explicit {
    pub count: bool,
    pub duration: bool,
    pub delay: bool,
    pub functional: bool,
}

impl StdConfig {
    /// Fill in values from `lookup`, treating every field as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut explicit = Explicit::default();
        self.apply_env_inner(&mut explicit, lookup);
        self.finalize(explicit);
    }

    pub(crate) fn apply_env_inner<F>(&mut self, explicit: &mut Explicit, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !explicit.count
            && let Some(raw) = lookup(ENV_ITERATIONS)
        {
            match LoopCount::parse(&raw) {
                Ok(count) => {
                    self.loop_count = count;
                    explicit.count = true;
                }
                Err(reason) => warn_env(ENV_ITERATIONS, &raw, &reason),
            }
        }
        if !explicit.duration
            && let Some(raw) = lookup(ENV_LOOP_WALLTIME)
        {
            match parse_seconds(&raw) {
                Ok(duration) => {
                    self.duration = Some(duration);
                    explicit.duration = true;
                }
                Err(reason) => warn_env(ENV_LOOP_WALLTIME, &raw, &reason),
            }
        }
        if !explicit.delay
            && let Some(raw) = lookup(ENV_LOOP_DELAY)
        {
            match parse_seconds(&raw) {
                Ok(delay) => {
                    self.delay = Some(delay);
                    explicit.delay = true;
                }
                Err(reason) => warn_env(ENV_LOOP_DELAY, &raw, &reason),
            }
        }
        if !explicit.functional && lookup(ENV_NO_FUNC_CHECK).is_some() {
            self.functional = false;
            explicit.functional = true;
        }
    }

    /// A duration given without an iteration count lifts the default
    /// single-iteration bound; the duration then ends the run on its own.
    pub(crate) fn finalize(&mut self, explicit: Explicit) {
        if self.duration.is_some() && !explicit.count {
            self.loop_count = LoopCount::Forever;
        }
    }
}

fn warn_env(key: &str, raw: &str, reason: &str) {
    eprintln!("usctest: ignoring {key}={raw:?}: {reason}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_run_once_with_functional_checks() {
        let cfg = StdConfig::default();
        assert_eq!(cfg.loop_count, LoopCount::Times(1));
        assert!(cfg.functional);
        assert!(!cfg.timing);
        assert!(cfg.duration.is_none());
    }

    #[test]
    fn zero_iterations_means_forever() {
        assert_eq!(LoopCount::parse("0"), Ok(LoopCount::Forever));
        assert_eq!(LoopCount::parse("7"), Ok(LoopCount::Times(7)));
        assert!(LoopCount::parse("-1").is_err());
        assert!(LoopCount::parse("abc").is_err());
    }

    #[test]
    fn seconds_accept_fractions_and_reject_negatives() {
        assert_eq!(parse_seconds("0.5"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_seconds("2"), Ok(Duration::from_secs(2)));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn env_fills_unset_fields() {
        let mut cfg = StdConfig::default();
        cfg.apply_env_with(lookup_from(&[
            (ENV_ITERATIONS, "12"),
            (ENV_LOOP_DELAY, "0.25"),
            (ENV_NO_FUNC_CHECK, ""),
        ]));
        assert_eq!(cfg.loop_count, LoopCount::Times(12));
        assert_eq!(cfg.delay, Some(Duration::from_millis(250)));
        assert!(!cfg.functional);
    }

    #[test]
    fn env_walltime_alone_lifts_iteration_bound() {
        let mut cfg = StdConfig::default();
        cfg.apply_env_with(lookup_from(&[(ENV_LOOP_WALLTIME, "3")]));
        assert_eq!(cfg.duration, Some(Duration::from_secs(3)));
        assert_eq!(cfg.loop_count, LoopCount::Forever);
    }

    #[test]
    fn explicit_fields_are_not_overridden() {
        let mut cfg = StdConfig {
            loop_count: LoopCount::Times(3),
            ..StdConfig::default()
        };
        let mut explicit = Explicit {
            count: true,
            ..Explicit::default()
        };
        cfg.apply_env_inner(&mut explicit, lookup_from(&[(ENV_ITERATIONS, "99")]));
        cfg.finalize(explicit);
        assert_eq!(cfg.loop_count, LoopCount::Times(3));
    }

    #[test]
    fn env_walltime_keeps_explicit_count() {
        let mut cfg = StdConfig {
            loop_count: LoopCount::Times(3),
            ..StdConfig::default()
        };
        let mut explicit = Explicit {
            count: true,
            ..Explicit::default()
        };
        cfg.apply_env_inner(&mut explicit, lookup_from(&[(ENV_LOOP_WALLTIME, "0.5")]));
        cfg.finalize(explicit);
        assert_eq!(cfg.loop_count, LoopCount::Times(3));
        assert_eq!(cfg.duration, Some(Duration::from_millis(500)));
    }

    #[test]
    fn malformed_env_values_are_ignored() {
        let mut cfg = StdConfig::default();
        cfg.apply_env_with(lookup_from(&[(ENV_ITERATIONS, "lots")]));
        assert_eq!(cfg.loop_count, LoopCount::Times(1));
    }
}
