//! Line consumers fed by the stream readers
//!
//! A reader delivers every decoded line and exactly one terminal event to a
//! [`StreamConsumer`]. The supervisor wires each stream to a
//! [`FanOutConsumer`] holding `[close-latch, collector, logger]`.

use std::io;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn, Level};

use crate::stream::StreamKind;

/// Receiver of line events from one output stream
///
/// Implementations are called from the reader's thread and must not block for
/// long; the reader does not read ahead while a delivery is in progress.
pub trait StreamConsumer: Send + Sync {
    /// One line without its terminating newline
    fn accept(&self, line: &str);

    /// The stream reached end-of-stream
    fn stream_finished(&self);

    /// Reading the stream failed; no further events follow
    fn stream_read_failed(&self, error: &io::Error);
}

/// Delivers every event to each delegate in list order
#[derive(Clone, Default)]
pub struct FanOutConsumer {
    delegates: Vec<Arc<dyn StreamConsumer>>,
}

impl FanOutConsumer {
    pub fn new(delegates: Vec<Arc<dyn StreamConsumer>>) -> Self {
        Self { delegates }
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

impl std::fmt::Debug for FanOutConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutConsumer")
            .field("delegates", &self.delegates.len())
            .finish()
    }
}

impl StreamConsumer for FanOutConsumer {
    fn accept(&self, line: &str) {
        for delegate in &self.delegates {
            delegate.accept(line);
        }
    }

    fn stream_finished(&self) {
        for delegate in &self.delegates {
            delegate.stream_finished();
        }
    }

    fn stream_read_failed(&self, error: &io::Error) {
        for delegate in &self.delegates {
            delegate.stream_read_failed(error);
        }
    }
}

/// Echoes every line to the log as `<pid>:<stream>> <line>`
#[derive(Debug, Clone)]
pub struct StreamLogger {
    pid: u32,
    stream: StreamKind,
    level: Level,
}

impl StreamLogger {
    pub fn new(pid: u32, stream: StreamKind, level: Level) -> Self {
        Self { pid, stream, level }
    }
}

impl StreamConsumer for StreamLogger {
    fn accept(&self, line: &str) {
        // tracing needs the level at compile time
        match self.level {
            Level::TRACE => trace!("{}:{}> {}", self.pid, self.stream, line),
            Level::DEBUG => debug!("{}:{}> {}", self.pid, self.stream, line),
            Level::INFO => info!("{}:{}> {}", self.pid, self.stream, line),
            Level::WARN => warn!("{}:{}> {}", self.pid, self.stream, line),
            _ => error!("{}:{}> {}", self.pid, self.stream, line),
        }
    }

    fn stream_finished(&self) {}

    fn stream_read_failed(&self, _error: &io::Error) {}
}
