//! Output supervision for one child process
//!
//! The supervisor owns both stream readers, their close latches and their
//! collectors. Each stream is wired as
//!
//! ```text
//! reader -> FanOutConsumer [close-latch, collector, logger]
//! ```
//!
//! The latch comes first so a waiting caller is released as soon as the
//! terminal event is delivered.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use tracing::{trace, Level};

use crate::{
    collector::StreamCollector,
    consumer::{FanOutConsumer, StreamConsumer, StreamLogger},
    error::{ProcessError, Result},
    executor::Executor,
    interrupt::InterruptFlag,
    latch::{CloseLatch, LatchWait},
    reader::AsyncStreamReader,
    stream::StreamKind,
};

type BoxedInput = Box<dyn Read + Send + 'static>;

/// Lifecycle of an [`OutputSupervisor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Readers built but not yet handed to the executor
    Created,
    /// Readers submitted
    Running,
    /// Both latches observed closed
    Drained,
}

struct StreamChannel<T> {
    kind: StreamKind,
    latch: Arc<CloseLatch>,
    collector: Arc<dyn StreamCollector<T>>,
    reader: Option<AsyncStreamReader<BoxedInput>>,
}

impl<T> StreamChannel<T> {
    fn new<C>(kind: StreamKind, pid: u32, input: BoxedInput, level: Level, collector: C) -> Self
    where
        C: StreamCollector<T> + 'static,
    {
        let latch = Arc::new(CloseLatch::new(kind, pid));
        let collector = Arc::new(collector);
        let fan_out = FanOutConsumer::new(vec![
            latch.clone() as Arc<dyn StreamConsumer>,
            collector.clone() as Arc<dyn StreamConsumer>,
            Arc::new(StreamLogger::new(pid, kind, level)),
        ]);
        let reader = AsyncStreamReader::new(kind, pid, input, Arc::new(fan_out));

        Self {
            kind,
            latch,
            collector,
            reader: Some(reader),
        }
    }
}

/// Captures stdout and stderr of one child on background tasks
pub struct OutputSupervisor<T> {
    pid: u32,
    executor: Arc<dyn Executor>,
    stream_close_timeout: Duration,
    state: SupervisorState,
    stdout: StreamChannel<T>,
    stderr: StreamChannel<T>,
}

impl<T> OutputSupervisor<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new<O, E>(
        executor: Arc<dyn Executor>,
        pid: u32,
        stdout: impl Read + Send + 'static,
        stderr: impl Read + Send + 'static,
        stream_close_timeout: Duration,
        stream_log_level: Level,
        stdout_collector: O,
        stderr_collector: E,
    ) -> Self
    where
        O: StreamCollector<T> + 'static,
        E: StreamCollector<T> + 'static,
    {
        Self {
            pid,
            executor,
            stream_close_timeout,
            state: SupervisorState::Created,
            stdout: StreamChannel::new(
                StreamKind::Stdout,
                pid,
                Box::new(stdout),
                stream_log_level,
                stdout_collector,
            ),
            stderr: StreamChannel::new(
                StreamKind::Stderr,
                pid,
                Box::new(stderr),
                stream_log_level,
                stderr_collector,
            ),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Submit both readers to the executor
    pub fn start(&mut self) -> Result<()> {
        if self.state != SupervisorState::Created {
            return Err(ProcessError::IllegalState(format!(
                "output supervisor of process {} already started",
                self.pid
            )));
        }
        trace!(pid = self.pid, "Start reading stdout and stderr in background");

        for channel in [&mut self.stdout, &mut self.stderr] {
            if let Some(reader) = channel.reader.take() {
                self.executor.execute(Box::new(move || reader.run()));
            }
        }
        self.state = SupervisorState::Running;
        Ok(())
    }

    /// Wait for stdout, then stderr, to reach a terminal state
    ///
    /// Each stream is bounded by the stream close timeout.
    pub fn await_streams_closed(&mut self, interrupt: &InterruptFlag) -> Result<()> {
        match self.state {
            SupervisorState::Drained => return Ok(()),
            SupervisorState::Created => {
                return Err(ProcessError::IllegalState(format!(
                    "output supervisor of process {} was never started",
                    self.pid
                )))
            }
            SupervisorState::Running => {}
        }

        for channel in [&self.stdout, &self.stderr] {
            trace!(
                pid = self.pid,
                stream = %channel.kind,
                timeout = ?self.stream_close_timeout,
                "Waiting for stream to close"
            );
            match channel.latch.await_closed(self.stream_close_timeout, interrupt) {
                LatchWait::Closed => {}
                LatchWait::TimedOut => {
                    return Err(ProcessError::StreamCloseTimeout {
                        stream: channel.kind,
                        pid: self.pid,
                        timeout: self.stream_close_timeout,
                    })
                }
                LatchWait::Interrupted => {
                    return Err(ProcessError::Interrupted {
                        pid: self.pid,
                        context: format!(
                            "stream '{}' of process {} to be closed",
                            channel.kind, self.pid
                        ),
                    })
                }
            }
        }

        self.state = SupervisorState::Drained;
        Ok(())
    }

    /// Collected stdout; complete only after [`Self::await_streams_closed`]
    pub fn stdout(&self) -> T {
        self.stdout.collector.result()
    }

    /// Collected stderr; complete only after [`Self::await_streams_closed`]
    pub fn stderr(&self) -> T {
        self.stderr.collector.result()
    }
}

impl<T> std::fmt::Debug for OutputSupervisor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSupervisor")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("stream_close_timeout", &self.stream_close_timeout)
            .finish()
    }
}
