//! JSONL run log.
//!
//! A log holds one JSON object per line. Four keys appear on every record
//! (`timestamp`, `trace_id`, `level`, `event`); the keys describing a wrapped
//! call are left out when they do not apply. The harness tests accept a run's
//! log only if [`validate_log_file`] finds nothing wrong with it.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REQUIRED_KEYS: [&str; 4] = ["timestamp", "trace_id", "level", "event"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Result a test program assigns to a case, if it checks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Broken,
}

/// One line of the run log.
///
/// An empty `trace_id` or a missing `test_name` is filled in by the
/// [`LogEmitter`] that writes the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// Loop counter at the time of the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_us: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Record stamped with the current time and nothing else attached.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: utc_timestamp(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            test_name: None,
            iteration: None,
            return_value: None,
            errno: None,
            errno_name: None,
            latency_us: None,
            outcome: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_test(mut self, test_name: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self
    }

    #[must_use]
    pub fn with_iteration(mut self, iteration: u64) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Attach what a wrapped call returned; the errno is also logged by name.
    #[must_use]
    pub fn with_call(mut self, return_value: i64, errno: i32) -> Self {
        self.return_value = Some(return_value);
        self.errno = Some(errno);
        self.errno_name = Some(crate::errno::name(errno).to_string());
        self
    }

    #[must_use]
    pub fn with_latency_us(mut self, us: i64) -> Self {
        self.latency_us = Some(us);
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Cloneable in-memory log target; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes [`LogEntry`] records for one test program run.
///
/// Trace ids take the form `<test>::<run_id>::<seq>`, with `seq` counting
/// records from 1.
pub struct LogEmitter {
    out: Box<dyn Write>,
    written: u64,
    test_name: String,
    run_id: String,
}

impl std::fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEmitter")
            .field("written", &self.written)
            .field("test_name", &self.test_name)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl LogEmitter {
    /// Create (or truncate) `path` and log to it through a buffer.
    pub fn to_file(path: &Path, test_name: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::with_output(
            Box::new(std::io::BufWriter::new(file)),
            test_name,
            run_id,
        ))
    }

    #[must_use]
    pub fn to_memory(test_name: &str, run_id: &str) -> (Self, MemorySink) {
        let sink = MemorySink::default();
        let emitter = Self::with_output(Box::new(sink.clone()), test_name, run_id);
        (emitter, sink)
    }

    fn with_output(out: Box<dyn Write>, test_name: &str, run_id: &str) -> Self {
        Self {
            out,
            written: 0,
            test_name: test_name.to_string(),
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.written += 1;
        format!("{}::{}::{:03}", self.test_name, self.run_id, self.written)
    }

    /// Write `entry` as one line, filling in its trace id and test name when
    /// the caller left them empty.
    pub fn write_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.test_name.is_none() {
            entry.test_name = Some(self.test_name.clone());
        }
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(self.out, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// A problem found in one log record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {field}: {problem}")]
pub struct LogViolation {
    pub line: usize,
    /// Offending key, or `<json>` when the line is not a JSON object.
    pub field: &'static str,
    pub problem: String,
}

/// Check one log line and decode it.
///
/// Every problem on the line is reported, not only the first.
pub fn validate_log_line(line: &str, line_no: usize) -> Result<LogEntry, Vec<LogViolation>> {
    let violation = |field: &'static str, problem: String| LogViolation {
        line: line_no,
        field,
        problem,
    };

    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|err| vec![violation("<json>", err.to_string())])?;
    let Some(obj) = value.as_object() else {
        return Err(vec![violation("<json>", "record is not an object".to_string())]);
    };

    let mut found: Vec<LogViolation> = REQUIRED_KEYS
        .into_iter()
        .filter(|key| !obj.contains_key(*key))
        .map(|key| violation(key, "missing".to_string()))
        .collect();

    if let Some(level) = obj.get("level")
        && LogLevel::deserialize(level).is_err()
    {
        found.push(violation("level", format!("unknown level {level}")));
    }
    if let Some(outcome) = obj.get("outcome")
        && Outcome::deserialize(outcome).is_err()
    {
        found.push(violation("outcome", format!("unknown outcome {outcome}")));
    }
    if obj.contains_key("return_value") != obj.contains_key("errno") {
        found.push(violation(
            "errno",
            "return_value and errno are logged as a pair".to_string(),
        ));
    }
    if let Some(id) = obj.get("trace_id").and_then(serde_json::Value::as_str)
        && !is_trace_id(id)
    {
        found.push(violation(
            "trace_id",
            format!("{id:?} is not <test>::<run_id>::<seq>"),
        ));
    }

    if !found.is_empty() {
        return Err(found);
    }
    serde_json::from_value(value).map_err(|err| vec![violation("<json>", err.to_string())])
}

/// Check every non-blank line of a log file.
///
/// Returns the number of records checked together with all violations.
pub fn validate_log_file(path: &Path) -> std::io::Result<(usize, Vec<LogViolation>)> {
    let text = std::fs::read_to_string(path)?;
    let mut records = 0;
    let mut violations = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        records += 1;
        if let Err(mut problems) = validate_log_line(raw, idx + 1) {
            violations.append(&mut problems);
        }
    }
    Ok((records, violations))
}

fn is_trace_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split("::").collect();
    parts.len() == 3 && parts.iter().all(|part| !part.is_empty())
}

fn utc_timestamp() -> String {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    rfc3339(since_epoch.as_secs(), since_epoch.subsec_millis())
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
fn rfc3339(secs: u64, millis: u32) -> String {
    let (year, month, day) = ymd_from_days((secs / 86_400) as i64);
    let of_day = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        of_day / 3600,
        of_day % 3600 / 60,
        of_day % 60,
    )
}

// Gregorian calendar date for a count of days since 1970-01-01, computed over
// 400-year eras starting each March 1st.
fn ymd_from_days(days: i64) -> (i64, u32, u32) {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let march_month = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * march_month + 2) / 5 + 1) as u32;
    let month = (if march_month < 10 { march_month + 3 } else { march_month - 9 }) as u32;
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
