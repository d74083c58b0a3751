//! Process configuration

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

use crate::error::{ProcessError, Result};

/// Default bound for draining each output stream after the child exited
pub const DEFAULT_STREAM_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default level at which captured lines are echoed to the log
pub const DEFAULT_STREAM_LOG_LEVEL: Level = Level::DEBUG;

/// Configuration for spawning a supervised process
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Working directory (None = caller's directory)
    pub working_dir: Option<PathBuf>,
    /// Merge stderr into stdout at the OS level
    pub redirect_error_stream: bool,
    /// Per-stream bound for draining output after exit
    pub stream_close_timeout: Duration,
    /// Level for echoing every captured line
    pub stream_log_level: Level,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            command: vec![],
            working_dir: None,
            redirect_error_stream: false,
            stream_close_timeout: DEFAULT_STREAM_CLOSE_TIMEOUT,
            stream_log_level: DEFAULT_STREAM_LOG_LEVEL,
        }
    }
}

impl ProcessConfig {
    /// Create new process configuration
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().command(command)
    }

    /// Set program and arguments
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Merge stderr into stdout
    pub fn redirect_error_stream(mut self, redirect: bool) -> Self {
        self.redirect_error_stream = redirect;
        self
    }

    /// Set stream close timeout
    pub fn stream_close_timeout(mut self, timeout: Duration) -> Self {
        self.stream_close_timeout = timeout;
        self
    }

    /// Set the level used to echo captured lines
    pub fn stream_log_level(mut self, level: Level) -> Self {
        self.stream_log_level = level;
        self
    }

    /// Program name, i.e. the first element of the command
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Check the configuration can be spawned
    pub fn validate(&self) -> Result<()> {
        match self.program() {
            None => Err(ProcessError::InvalidConfig(
                "command must not be empty".to_string(),
            )),
            Some("") => Err(ProcessError::InvalidConfig(
                "program name must not be empty".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Command rendered as a single space separated line
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Command and working directory as shown in spawn failures
    pub(crate) fn describe_invocation(&self) -> InvocationDisplay<'_> {
        InvocationDisplay(self)
    }
}

/// `[prog, arg] in working dir <dir>` rendering used by spawn errors
pub(crate) struct InvocationDisplay<'a>(&'a ProcessConfig);

impl fmt::Display for InvocationDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] in working dir ", self.0.command.join(", "))?;
        match &self.0.working_dir {
            Some(dir) => write!(f, "{}", dir.display()),
            None => f.write_str("null"),
        }
    }
}
