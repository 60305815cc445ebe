//! Sample conformance program: runs the built-in cases under the standard
//! test-program options.

use std::path::Path;
use std::process::ExitCode;

use usctest::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use usctest::{OptionDescriptor, ParseError, SignalWake, UscContext, parse_opts};
use usctest_harness::cases::{self, CASES, Case, Verdict};
use usctest_harness::report::{render_json, render_plain};

const TEST_NAME: &str = "usc-smoke";

fn user_help() {
    println!("  -C name Run only the named case");
    println!("  -j      Print the end-of-run report as JSON");
    println!("  -L path Write a JSONL log of every call to path");
    println!("  -v      Print a verdict line per case and iteration");
    println!();
    println!("Cases:");
    for case in CASES {
        println!("  {:<12} {}", case.name, case.description);
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let mut table = [
        OptionDescriptor::new("C:"),
        OptionDescriptor::new("j"),
        OptionDescriptor::new("L:"),
        OptionDescriptor::new("v"),
    ];
    let opts = match parse_opts(&args, &mut table, Some(&user_help)) {
        Ok(opts) => opts,
        Err(ParseError::HelpRequested) => return ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{TEST_NAME}: {err}");
            return ExitCode::from(2);
        }
    };
    let [only, json, log_path, verbose] = &table;

    let selected: Vec<&Case> = match only.arg {
        Some(name) => match cases::find(name) {
            Ok(case) => vec![case],
            Err(err) => {
                eprintln!("{TEST_NAME}: {err}");
                return ExitCode::from(2);
            }
        },
        None => CASES.iter().collect(),
    };

    let config = opts.config;
    let report_wanted = config.timing || config.errno_log;
    let pause_wanted = config.pause;
    let mut ctx = UscContext::new(config);

    if let Some(path) = log_path.arg {
        let run_id = format!("pid{}", std::process::id());
        match LogEmitter::to_file(Path::new(path), TEST_NAME, &run_id) {
            Ok(log) => ctx = ctx.with_log(log),
            Err(err) => {
                eprintln!("{TEST_NAME}: cannot open log {path}: {err}");
                return ExitCode::from(2);
            }
        }
    }

    if pause_wanted {
        // Block the signal before announcing the pid so an early wake-up is
        // kept pending.
        match SignalWake::default().arm() {
            Ok(armed) => ctx = ctx.with_wake_source(armed),
            Err(err) => {
                eprintln!("{TEST_NAME}: {err}");
                return ExitCode::FAILURE;
            }
        }
        eprintln!(
            "{TEST_NAME}: pid {} waiting for SIGUSR1",
            std::process::id()
        );
    }
    if let Err(err) = ctx.pause() {
        eprintln!("{TEST_NAME}: {err}");
        return ExitCode::FAILURE;
    }

    let mut failures = 0_u64;
    let mut counter = 0;
    while ctx.should_continue(counter) {
        for case in &selected {
            let out = case.run(&mut ctx);
            if !ctx.config().functional {
                continue;
            }
            let verdict = case.check(out);
            let outcome = match &verdict {
                Verdict::Pass => Outcome::Pass,
                Verdict::Fail(reason) => {
                    failures += 1;
                    println!("FAIL {reason}");
                    Outcome::Fail
                }
            };
            if verbose.given && verdict.passed() {
                println!("PASS {} (iteration {counter})", case.name);
            }
            ctx.emit(
                LogEntry::new("", LogLevel::Info, "verdict")
                    .with_call(out.value, out.errno)
                    .with_outcome(outcome)
                    .with_details(serde_json::json!({ "case": case.name })),
            );
        }
        counter += 1;
    }

    if let Err(err) = ctx.finish() {
        eprintln!("{TEST_NAME}: log flush failed: {err}");
    }

    if report_wanted {
        let summary = ctx.summary(TEST_NAME);
        if json.given {
            match render_json(&summary) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("{TEST_NAME}: {err}"),
            }
        } else {
            print!("{}", render_plain(&summary));
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
