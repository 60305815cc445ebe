//! End-of-run report rendering.

use std::fmt::Write;

use usctest::RunSummary;

/// Human-readable report, one fact per line.
#[must_use]
pub fn render_plain(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} iteration{} in {:.3}s{}",
        summary.test_name,
        summary.iterations,
        if summary.iterations == 1 { "" } else { "s" },
        summary.elapsed.as_secs_f64(),
        if summary.functional {
            ""
        } else {
            " (functional checks off)"
        }
    );

    if let Some(timing) = &summary.timing {
        match (timing.min, timing.max, timing.mean) {
            (Some(min), Some(max), Some(mean)) => {
                let _ = writeln!(
                    out,
                    "timing: calls={} total={}us min={}us max={}us mean={:.2}us",
                    timing.count, timing.total, min, max, mean
                );
            }
            _ => {
                let _ = writeln!(out, "timing: no calls recorded");
            }
        }
    }

    for entry in &summary.errno_counts {
        let _ = writeln!(
            out,
            "errno: {} ({}) x{}",
            entry.name, entry.errno, entry.count
        );
    }
    out
}

/// Pretty-printed JSON report.
pub fn render_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
