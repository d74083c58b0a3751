//! End-to-end scenarios for spawning and supervising real processes

use std::time::Duration;

use regex::Regex;
use simple_process::{ProcessBuilder, ProcessError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[test]
fn test_echo_to_stdout() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .command(["echo", "hello world"])
        .start()
        .unwrap();
    process.wait_for_successful_termination().unwrap();

    assert_eq!(process.stdout(), "hello world\n");
    assert_eq!(process.stderr(), "");
    assert_eq!(process.exit_value().unwrap(), 0);
}

#[test]
fn test_multiple_lines_to_stdout() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .command(["sh", "-c", "echo 'line 1' && echo 'line 2'"])
        .start()
        .unwrap();
    process.wait_for_successful_termination().unwrap();

    assert_eq!(process.stdout(), "line 1\nline 2\n");
}

#[test]
fn test_echo_to_stderr() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .command(["sh", "-c", "echo 'hello' >&2"])
        .start()
        .unwrap();
    process.wait_for_successful_termination().unwrap();

    assert_eq!(process.stdout(), "");
    assert_eq!(process.stderr(), "hello\n");
}

#[test]
fn test_redirect_error_stream() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .redirect_error_stream(true)
        .command(["sh", "-c", "echo e >&2 && echo o"])
        .start()
        .unwrap();
    process.wait_for_successful_termination().unwrap();

    assert_eq!(process.stdout(), "e\no\n");
    assert_eq!(process.stderr(), "");
}

#[test]
fn test_timeout_then_destroy() {
    init_tracing();
    let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();

    let err = process
        .wait_for_termination_within(Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { .. }));
    assert!(process.is_alive());

    process.destroy().unwrap();
    assert_eq!(process.wait_for_termination().unwrap(), 143);
    assert!(!process.is_alive());
}

#[test]
fn test_timeout_then_destroy_forcibly() {
    init_tracing();
    let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();

    assert!(process
        .wait_for_termination_within(Duration::from_millis(10))
        .is_err());
    assert!(process.is_alive());

    process.destroy_forcibly().unwrap();
    assert_eq!(process.wait_for_termination().unwrap(), 137);
    assert!(!process.is_alive());
}

#[test]
fn test_spawn_failure() {
    init_tracing();
    let err = ProcessBuilder::new()
        .command(["no-such-process"])
        .start()
        .unwrap_err();

    assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    let message = err.to_string();
    assert!(
        message.starts_with("Failed to start process [no-such-process] in working dir null:"),
        "{message}"
    );
    assert!(message.contains("No such file or directory"), "{message}");
}

#[test]
fn test_unexpected_exit_code() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .command(["echo", "hello"])
        .start()
        .unwrap();

    let err = process.wait_for_exit_code(1).unwrap_err();
    let pattern = Regex::new(
        r"^Expected process \d+ \(command 'echo hello'\) to terminate with exit code 1 but was 0$",
    )
    .unwrap();
    assert!(pattern.is_match(&err.to_string()), "{err}");
    // output is drained before the exit code is checked
    assert_eq!(process.stdout(), "hello\n");
}

#[test]
fn test_echo_without_trailing_newline() {
    init_tracing();
    let mut process = ProcessBuilder::new()
        .command(["sh", "-c", "printf X"])
        .start()
        .unwrap();
    process.wait_for_successful_termination().unwrap();

    assert_eq!(process.stdout(), "X\n");
    assert_eq!(process.stdout(), process.stdout());
}
