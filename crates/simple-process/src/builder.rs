//! Fluent builder spawning a supervised process

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, Level};

use crate::{
    collector::{StreamCollector, StringCollector},
    config::ProcessConfig,
    error::{ProcessError, Result},
    executor::{Executor, ThreadPerTaskExecutor},
    handle::ProcessHandle,
    interrupt::InterruptFlag,
    supervisor::OutputSupervisor,
};

type BoxedInput = Box<dyn Read + Send + 'static>;

/// Builds and starts a [`ProcessHandle`]
///
/// # Examples
/// ```no_run
/// use simple_process::ProcessBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut process = ProcessBuilder::new()
///     .command(["echo", "hello world"])
///     .start()?;
/// process.wait_for_successful_termination()?;
/// assert_eq!(process.stdout(), "hello world\n");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ProcessBuilder {
    config: ProcessConfig,
    executor: Option<Arc<dyn Executor>>,
    interrupt: InterruptFlag,
}

impl ProcessBuilder {
    /// Create new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create builder from an existing configuration
    pub fn from_config(config: ProcessConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set program and arguments
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.command(command);
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.working_dir(dir);
        self
    }

    /// Merge stderr into stdout; the stderr result stays empty
    pub fn redirect_error_stream(mut self, redirect: bool) -> Self {
        self.config = self.config.redirect_error_stream(redirect);
        self
    }

    /// Set the per-stream bound for draining output after exit
    pub fn stream_close_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.stream_close_timeout(timeout);
        self
    }

    /// Set the level at which captured lines are logged
    pub fn stream_log_level(mut self, level: Level) -> Self {
        self.config = self.config.stream_log_level(level);
        self
    }

    /// Run the stream readers on a custom executor
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use a shared interrupt flag for the waits of the started process
    pub fn interrupt_flag(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Get process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Start the process collecting output as text
    pub fn start(self) -> Result<ProcessHandle<String>> {
        self.start_with_collectors(StringCollector::new(), StringCollector::new())
    }

    /// Start the process collecting output with the given collectors
    pub fn start_with_collectors<T, O, E>(
        self,
        stdout_collector: O,
        stderr_collector: E,
    ) -> Result<ProcessHandle<T>>
    where
        O: StreamCollector<T> + 'static,
        E: StreamCollector<T> + 'static,
    {
        let Self {
            config,
            executor,
            interrupt,
        } = self;

        let (child, stdout, stderr) = spawn(&config)?;
        let pid = child.id();
        debug!(pid, command = %config.command_line(), "Process spawned");

        let executor =
            executor.unwrap_or_else(|| Arc::new(ThreadPerTaskExecutor::for_process(pid)));
        let mut supervisor = OutputSupervisor::new(
            executor,
            pid,
            stdout,
            stderr,
            config.stream_close_timeout,
            config.stream_log_level,
            stdout_collector,
            stderr_collector,
        );
        supervisor.start()?;

        Ok(ProcessHandle::new(
            child,
            config.command_line(),
            supervisor,
            interrupt,
        ))
    }
}

impl std::fmt::Debug for ProcessBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessBuilder")
            .field("config", &self.config)
            .field("custom_executor", &self.executor.is_some())
            .finish()
    }
}

/// Spawn the child with piped output; stdin is not connected
fn spawn(config: &ProcessConfig) -> Result<(Child, BoxedInput, BoxedInput)> {
    config.validate()?;
    let spawn_failed = |source: io::Error| ProcessError::SpawnFailed {
        message: format!(
            "Failed to start process {}: {}",
            config.describe_invocation(),
            source
        ),
        source,
    };

    let mut cmd = Command::new(&config.command[0]);
    cmd.args(&config.command[1..]);
    if let Some(ref dir) = config.working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());

    if config.redirect_error_stream {
        // Both descriptors share one pipe; the stderr reader sees an empty stream
        let (reader, writer) = io::pipe().map_err(spawn_failed)?;
        let stderr_writer = writer.try_clone().map_err(spawn_failed)?;
        cmd.stdout(writer);
        cmd.stderr(stderr_writer);

        let child = cmd.spawn().map_err(spawn_failed)?;
        // Close the parent's write ends, otherwise the reader never sees EOF
        drop(cmd);
        return Ok((child, Box::new(reader), Box::new(io::empty())));
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(spawn_failed)?;
    let missing = |name: &str| {
        spawn_failed(io::Error::new(
            io::ErrorKind::Other,
            format!("child {name} was not captured"),
        ))
    };
    let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
    Ok((child, Box::new(stdout), Box::new(stderr)))
}
