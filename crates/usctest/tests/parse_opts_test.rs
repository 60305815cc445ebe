//! Integration test: option parsing contract.
//!
//! Validates that:
//! 1. Recognized user flags set their slots and borrow their arguments.
//! 2. An unrecognized flag fails with a non-empty message.
//! 3. Standard flags and user flags mix freely on one command line.
//! 4. The parsed configuration drives the loop predicate.
//! 5. A walltime from `-I` ends the run even when `-i` asks for more.
//!
//! Run: cargo test -p usctest --test parse_opts_test

use std::time::Duration;

use usctest::config::LoopCount;
use usctest::options::parse_opts_with_env;
use usctest::{OptionDescriptor, ParseError, UscContext};

fn argv(tokens: &[&str]) -> Vec<String> {
    std::iter::once("conformance01")
        .chain(tokens.iter().copied())
        .map(str::to_string)
        .collect()
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn unknown_flag_fails_with_message() {
    let args = argv(&["-x"]);
    let mut table = [OptionDescriptor::new("a"), OptionDescriptor::new("b:")];
    let err = parse_opts_with_env(&args, &mut table, None, no_env).unwrap_err();
    assert_eq!(err, ParseError::UnknownOption('x'));
    let message = err.to_string();
    assert!(!message.is_empty());
    assert!(message.contains('x'), "message should name the flag: {message}");
}

#[test]
fn known_flags_succeed() {
    let args = argv(&["-a", "-b", "val"]);
    let mut table = [OptionDescriptor::new("a"), OptionDescriptor::new("b:")];
    let parsed = parse_opts_with_env(&args, &mut table, None, no_env).unwrap();
    assert!(parsed.operands.is_empty());
    assert!(table[0].given);
    assert!(table[1].given);
    assert_eq!(table[1].arg, Some("val"));
}

#[test]
fn every_recognized_flag_is_reported() {
    let args = argv(&["-t", "-C", "close_ebadf", "-v", "-i", "3", "extra"]);
    let mut table = [
        OptionDescriptor::new("C:"),
        OptionDescriptor::new("v"),
        OptionDescriptor::new("L:"),
    ];
    let parsed = parse_opts_with_env(&args, &mut table, None, no_env).unwrap();
    assert_eq!(table[0].arg, Some("close_ebadf"));
    assert!(table[1].given);
    assert!(!table[2].given);
    assert_eq!(table[2].arg, None);
    assert!(parsed.config.timing);
    assert_eq!(parsed.config.loop_count, LoopCount::Times(3));
    assert_eq!(parsed.operands, vec!["extra"]);
}

#[test]
fn parsed_count_bounds_the_main_loop() {
    let args = argv(&["-i", "6"]);
    let parsed = parse_opts_with_env(&args, &mut [], None, no_env).unwrap();
    let mut ctx = UscContext::new(parsed.config);
    assert!(ctx.should_continue(5));
    assert!(!ctx.should_continue(6));
}

fn assert_walltime_stops(tokens: &[&str]) {
    let args = argv(tokens);
    let parsed = parse_opts_with_env(&args, &mut [], None, no_env).unwrap();
    let mut ctx = UscContext::new(parsed.config);
    assert!(ctx.should_continue(0));
    std::thread::sleep(Duration::from_millis(100));
    assert!(!ctx.should_continue(1), "{tokens:?} kept looping past its walltime");
}

#[test]
fn walltime_ends_an_infinite_run() {
    assert_walltime_stops(&["-i", "0", "-I", "0.05"]);
}

#[test]
fn walltime_ends_a_long_counted_run() {
    assert_walltime_stops(&["-i", "1000000000", "-I", "0.05"]);
}

#[test]
fn walltime_alone_bounds_the_run() {
    let args = argv(&["-I", "0.05"]);
    let parsed = parse_opts_with_env(&args, &mut [], None, no_env).unwrap();
    let mut ctx = UscContext::new(parsed.config);
    let mut counter = 0;
    while ctx.should_continue(counter) {
        std::thread::sleep(Duration::from_millis(5));
        counter += 1;
    }
    assert!(counter > 1, "walltime alone should allow more than one iteration");
}
