use std::sync::Arc;
use std::time::Duration;

use simple_process::{
    LineCountCollector, ProcessBuilder, ProcessError, ProcessState, TailCollector,
};
use tracing::Level;

const MIN_TIMEOUT: Duration = Duration::from_millis(3);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::TRACE)
        .try_init();
}

#[cfg(test)]
mod output_tests {
    use super::*;

    #[test]
    fn test_stdout_and_stderr_are_separated() {
        init_tracing();
        let mut process = ProcessBuilder::new()
            .redirect_error_stream(false)
            .command([
                "sh",
                "-c",
                "echo '1: std err' >&2 && echo '2: std out' && echo '3: std err' >&2 && echo '4: std out'",
            ])
            .start()
            .unwrap();
        process.wait_for_termination_within(Duration::from_secs(5)).unwrap();

        assert_eq!(process.stdout(), "2: std out\n4: std out\n");
        assert_eq!(process.stderr(), "1: std err\n3: std err\n");
    }

    #[test]
    fn test_redirect_error_stream_keeps_order() {
        init_tracing();
        let mut process = ProcessBuilder::new()
            .redirect_error_stream(true)
            .command([
                "sh",
                "-c",
                "echo '1: std err' >&2 && echo '2: std out' && echo '3: std err' >&2 && echo '4: std out'",
            ])
            .start()
            .unwrap();
        process.wait_for_termination_within(Duration::from_secs(5)).unwrap();

        assert_eq!(
            process.stdout(),
            "1: std err\n2: std out\n3: std err\n4: std out\n"
        );
        assert_eq!(process.stderr(), "");
    }

    #[test]
    fn test_missing_trailing_newline_is_added() {
        let mut process = ProcessBuilder::new()
            .command(["echo", "-n", "hello world"])
            .start()
            .unwrap();
        process.wait_for_successful_termination().unwrap();

        assert_eq!(process.stdout(), "hello world\n");
        assert_eq!(process.stdout(), process.stdout());
        assert!(process.stderr().is_empty());
    }

    #[test]
    fn test_blank_lines_preserved() {
        let mut process = ProcessBuilder::new()
            .command(["printf", "a\\n\\nb\\n"])
            .start()
            .unwrap();
        process.wait_for_successful_termination().unwrap();
        assert_eq!(process.stdout(), "a\n\nb\n");
    }

    #[test]
    fn test_large_output_is_fully_drained() {
        let mut process = ProcessBuilder::new()
            .command(["sh", "-c", "seq 1 20000"])
            .start_with_collectors(LineCountCollector::new(), LineCountCollector::new())
            .unwrap();
        process.wait_for_successful_termination().unwrap();

        assert_eq!(process.stdout(), 20000);
        assert_eq!(process.stderr(), 0);
    }

    #[test]
    fn test_tail_collector_bounds_output() {
        let mut process = ProcessBuilder::new()
            .command(["sh", "-c", "seq 1 100"])
            .start_with_collectors(TailCollector::new(3), TailCollector::new(3))
            .unwrap();
        process.wait_for_successful_termination().unwrap();

        assert_eq!(process.stdout(), "98\n99\n100\n");
    }

    #[test]
    fn test_working_dir_defaults_to_current_dir() {
        let mut process = ProcessBuilder::new().command(["pwd", "-P"]).start().unwrap();
        process.wait_for_successful_termination().unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(process.stdout(), format!("{}\n", cwd.display()));
    }

    #[test]
    fn test_working_dir_defined() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().canonicalize().unwrap();

        let mut process = ProcessBuilder::new()
            .command(["pwd", "-P"])
            .working_dir(dir.path())
            .start()
            .unwrap();
        process.wait_for_successful_termination().unwrap();

        assert_eq!(process.stdout(), format!("{}\n", expected.display()));
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_exit_non_zero() {
        let mut process = ProcessBuilder::new().command(["false"]).start().unwrap();
        process.wait_for_termination_within(Duration::from_secs(5)).unwrap();

        assert_eq!(process.exit_value().unwrap(), 1);
        assert!(!process.is_alive());
    }

    #[test]
    fn test_exit_zero() {
        let mut process = ProcessBuilder::new().command(["true"]).start().unwrap();
        assert_eq!(process.wait_for_termination().unwrap(), 0);

        assert_eq!(process.exit_value().unwrap(), 0);
        assert_eq!(process.state().unwrap(), ProcessState::Exited(0));
    }

    #[test]
    fn test_timeout_does_not_destroy_process() {
        let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();

        let err = process
            .wait_for_termination_within(Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(err
            .to_string()
            .starts_with("Timeout while waiting 10ms for process"));
        assert!(process.is_alive());

        process.destroy_forcibly().unwrap();
        process.wait_for_termination().unwrap();
    }

    #[test]
    fn test_zero_timeout_on_running_process() {
        let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();
        assert!(matches!(
            process.wait_for_termination_within(Duration::ZERO),
            Err(ProcessError::Timeout { .. })
        ));
        process.destroy_forcibly().unwrap();
        assert_eq!(process.wait_for_termination().unwrap(), 137);
    }

    #[test]
    fn test_destroy_then_timed_wait() {
        let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();
        assert!(process.is_alive());

        process.destroy().unwrap();
        process.wait_for_termination_within(Duration::from_secs(5)).unwrap();
        assert!(!process.is_alive());
        assert_eq!(process.exit_value().unwrap(), 143);
    }

    #[test]
    fn test_destroy_forcibly_then_timed_wait() {
        let mut process = ProcessBuilder::new().command(["sleep", "1"]).start().unwrap();

        process.destroy_forcibly().unwrap();
        process.wait_for_termination_within(Duration::from_secs(5)).unwrap();
        assert!(!process.is_alive());
        assert_eq!(process.exit_value().unwrap(), 137);
    }

    #[test]
    fn test_min_timeout_on_fast_process() {
        let mut process = ProcessBuilder::new()
            .command(["sh", "-c", "exit 3"])
            .start()
            .unwrap();
        // the child may still be starting; retry until it has exited
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            match process.wait_for_termination_within(MIN_TIMEOUT) {
                Ok(()) => break,
                Err(ProcessError::Timeout { .. }) if std::time::Instant::now() < deadline => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(process.exit_value().unwrap(), 3);
    }

    #[test]
    fn test_stream_close_timeout_when_grandchild_holds_stdout() {
        // the background sleep inherits stdout and keeps it open after sh exits
        let mut process = ProcessBuilder::new()
            .command(["sh", "-c", "sleep 2 & echo started"])
            .stream_close_timeout(Duration::from_millis(50))
            .start()
            .unwrap();

        let err = process.wait_for_termination().unwrap_err();
        match err {
            ProcessError::StreamCloseTimeout { stream, pid, .. } => {
                assert_eq!(stream, simple_process::StreamKind::Stdout);
                assert_eq!(pid, process.pid());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[cfg(test)]
mod executor_tests {
    use super::*;

    #[cfg(feature = "tokio")]
    #[test]
    fn test_tokio_blocking_pool_executor() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();

        let mut process = ProcessBuilder::new()
            .command(["sh", "-c", "echo via tokio; echo oops >&2"])
            .executor(Arc::new(runtime.handle().clone()))
            .start()
            .unwrap();
        process.wait_for_successful_termination().unwrap();

        assert_eq!(process.stdout(), "via tokio\n");
        assert_eq!(process.stderr(), "oops\n");
    }

    #[test]
    fn test_shared_interrupt_flag() {
        let flag = simple_process::InterruptFlag::new();
        let mut process = ProcessBuilder::new()
            .command(["sleep", "5"])
            .interrupt_flag(flag.clone())
            .start()
            .unwrap();

        flag.interrupt();
        assert!(matches!(
            process.wait_for_termination(),
            Err(ProcessError::Interrupted { .. })
        ));

        flag.clear();
        process.destroy_forcibly().unwrap();
        assert_eq!(process.wait_for_termination().unwrap(), 137);
    }
}
