//! Error types for process supervision

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::stream::StreamKind;

/// Process supervision errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The platform failed to start the child
    #[error("{message}")]
    SpawnFailed {
        message: String,
        #[source]
        source: io::Error,
    },

    /// The child did not exit within the timed wait; it is still running
    #[error("Timeout while waiting {timeout:?} for process {pid} (command '{command}')")]
    Timeout {
        pid: u32,
        command: String,
        timeout: Duration,
    },

    /// The child exited with a different code than the caller expected
    #[error(
        "Expected process {pid} (command '{command}') to terminate with exit code {expected} but was {actual}"
    )]
    UnexpectedExitCode {
        pid: u32,
        command: String,
        expected: i32,
        actual: i32,
    },

    /// A stream reader did not reach end-of-stream after the child exited
    #[error("Stream '{stream}' of process {pid} not closed within timeout of {timeout:?}")]
    StreamCloseTimeout {
        stream: StreamKind,
        pid: u32,
        timeout: Duration,
    },

    /// The waiting thread was interrupted through its [`InterruptFlag`](crate::InterruptFlag)
    #[error("Interrupted while waiting for {context}")]
    Interrupted { pid: u32, context: String },

    /// `exit_value()` was called on a child that is still running
    #[error("Process {pid} has not exited")]
    NotExited { pid: u32 },

    /// Failed to deliver a termination signal
    #[error("Failed to signal process {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// Operation not allowed in the current lifecycle state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),

    /// Waiting on the child failed at the OS level
    #[error("I/O error while supervising process: {0}")]
    Io(#[from] io::Error),
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
