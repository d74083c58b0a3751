//! # simple-process
//!
//! **Purpose**: Launch a child process and capture its output reliably
//!
//! Wraps [`std::process::Command`] with a fluent builder, reads stdout and
//! stderr on background tasks into collectors and offers blocking waits that
//! return only after both streams were drained.
//!
//! ## Features
//!
//! - **Output Capture**: One reader per stream, lines fed into pluggable collectors
//! - **Drain Guarantee**: Waits block until both readers hit end-of-stream, bounded by a timeout
//! - **Timed Waits**: Timeouts never kill the child
//! - **Exit Code Checks**: Expect a specific exit code with a descriptive error
//! - **Termination**: Graceful (SIGTERM) and forcible (SIGKILL) destroy
//! - **Custom Executors**: Dedicated threads by default, tokio's blocking pool with the `tokio` feature
//! - **Interruption**: Waits can be interrupted through a shared flag
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use simple_process::ProcessBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut process = ProcessBuilder::new()
//!     .command(["sh", "-c", "echo out && echo err >&2"])
//!     .stream_close_timeout(Duration::from_secs(2))
//!     .start()?;
//!
//! process.wait_for_successful_termination()?;
//! assert_eq!(process.stdout(), "out\n");
//! assert_eq!(process.stderr(), "err\n");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod collector;
pub mod config;
pub mod consumer;
pub mod error;
pub mod executor;
pub mod handle;
pub mod interrupt;
pub mod latch;
pub mod reader;
pub mod stream;
pub mod supervisor;

pub use builder::ProcessBuilder;
pub use collector::{
    LineCollector, LineCountCollector, StreamCollector, StringCollector, TailCollector,
};
pub use config::{ProcessConfig, DEFAULT_STREAM_CLOSE_TIMEOUT, DEFAULT_STREAM_LOG_LEVEL};
pub use consumer::{FanOutConsumer, StreamConsumer, StreamLogger};
pub use error::{ProcessError, Result};
pub use executor::{Executor, Task, ThreadPerTaskExecutor};
pub use handle::{ProcessHandle, ProcessState};
pub use interrupt::InterruptFlag;
pub use latch::{CloseLatch, LatchWait};
pub use reader::AsyncStreamReader;
pub use stream::StreamKind;
pub use supervisor::{OutputSupervisor, SupervisorState};
