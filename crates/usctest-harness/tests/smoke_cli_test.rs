//! Integration test: the sample conformance program and the wake-up driver.
//!
//! Validates that:
//! 1. `usc-smoke` passes every case and honors the standard options.
//! 2. Option errors exit with status 2 and `-h` exits with 0.
//! 3. `-L` writes a JSONL log that passes schema validation.
//! 4. A program paused with `-p` resumes when `usc-wake` signals it.
//!
//! Run: cargo test -p usctest-harness --test smoke_cli_test

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use usctest::structured_log::validate_log_file;

fn smoke() -> Command {
    Command::new(env!("CARGO_BIN_EXE_usc-smoke"))
}

fn unique_tmp_path(prefix: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()))
}

#[test]
fn all_cases_pass_with_report() {
    let output = smoke()
        .args(["-i", "3", "-t", "-e", "-v"])
        .env_remove("USC_ITERATIONS")
        .output()
        .expect("usc-smoke should execute");
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("PASS getpid").count(), 3);
    assert!(stdout.contains("usc-smoke: 3 iterations in "), "{stdout}");
    assert!(stdout.contains("timing: calls=15 "), "{stdout}");
    assert!(stdout.contains("errno: EBADF"), "{stdout}");
    assert!(!stdout.contains("FAIL"));
}

#[test]
fn json_report_for_single_case() {
    let output = smoke()
        .args(["-C", "dup_ebadf", "-e", "-j"])
        .env_remove("USC_ITERATIONS")
        .output()
        .expect("usc-smoke should execute");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be JSON");
    assert_eq!(report["iterations"], 1);
    assert_eq!(report["errno_counts"][0]["name"], "EBADF");
    assert_eq!(report["errno_counts"][0]["count"], 1);
    assert!(report["timing"].is_null());
}

#[test]
fn iteration_count_comes_from_environment() {
    let output = smoke()
        .args(["-C", "getpid", "-v"])
        .env("USC_ITERATIONS", "4")
        .output()
        .expect("usc-smoke should execute");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("PASS getpid").count(), 4);
}

#[test]
fn option_errors_exit_with_usage_status() {
    let output = smoke().arg("-x").output().expect("usc-smoke should execute");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid option -- 'x'"), "{stderr}");

    let output = smoke()
        .args(["-C", "no_such_case"])
        .output()
        .expect("usc-smoke should execute");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_lists_standard_and_user_options() {
    let output = smoke().arg("-h").output().expect("usc-smoke should execute");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-i n"));
    assert!(stdout.contains("-C name"));
    assert!(stdout.contains("close_ebadf"));
}

#[test]
fn log_file_passes_validation() {
    let log_path = unique_tmp_path("usc-smoke-log");
    let output = smoke()
        .args(["-i", "2", "-L"])
        .arg(&log_path)
        .env_remove("USC_ITERATIONS")
        .output()
        .expect("usc-smoke should execute");
    assert!(output.status.success());

    let (lines, errors) = validate_log_file(&log_path).expect("log should be readable");
    // Per iteration: one call record and one verdict per case.
    assert_eq!(lines, 2 * 2 * 5);
    assert!(errors.is_empty(), "log violations: {errors:?}");

    let _ = std::fs::remove_file(log_path);
}

#[test]
fn paused_program_resumes_on_wake() {
    let mut child = smoke()
        .args(["-p", "-C", "getpid", "-v"])
        .env_remove("USC_ITERATIONS")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("usc-smoke should start");

    let stderr = child.stderr.take().expect("stderr is piped");
    let mut stderr = BufReader::new(stderr);
    let mut line = String::new();
    stderr.read_line(&mut line).expect("read readiness line");
    assert!(line.contains("waiting for SIGUSR1"), "{line}");

    let status = Command::new(env!("CARGO_BIN_EXE_usc-wake"))
        .arg("--pid")
        .arg(child.id().to_string())
        .status()
        .expect("usc-wake should execute");
    assert!(status.success());

    let output = child.wait_with_output().expect("usc-smoke should exit");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASS getpid"), "{stdout}");
}

#[test]
fn wake_rejects_group_pid() {
    let output = Command::new(env!("CARGO_BIN_EXE_usc-wake"))
        .args(["--pid", "0"])
        .output()
        .expect("usc-wake should execute");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("refusing to signal pid 0"), "{stderr}");
}
