//! One-shot close latch signalling that a stream reader terminated

use std::io;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::consumer::StreamConsumer;
use crate::interrupt::InterruptFlag;
use crate::stream::StreamKind;

/// Upper bound for a single condvar wait so the interrupt flag is noticed
const POLL_SLICE: Duration = Duration::from_millis(10);

/// Outcome of [`CloseLatch::await_closed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchWait {
    Closed,
    TimedOut,
    Interrupted,
}

/// `OPEN -> CLOSED` latch closed by the stream's terminal event
#[derive(Debug)]
pub struct CloseLatch {
    stream: StreamKind,
    pid: u32,
    closed: Mutex<bool>,
    signal: Condvar,
}

impl CloseLatch {
    pub fn new(stream: StreamKind, pid: u32) -> Self {
        Self {
            stream,
            pid,
            closed: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    /// Close the latch; returns `false` if it was already closed
    pub fn close(&self) -> bool {
        let mut closed = self.closed.lock();
        if *closed {
            return false;
        }
        *closed = true;
        self.signal.notify_all();
        trace!(pid = self.pid, stream = %self.stream, "Stream closed");
        true
    }

    /// Block until closed, `timeout` elapsed or `interrupt` was raised
    ///
    /// A timeout too large to be represented as an instant never elapses.
    pub fn await_closed(&self, timeout: Duration, interrupt: &InterruptFlag) -> LatchWait {
        let deadline = Instant::now().checked_add(timeout);
        let mut closed = self.closed.lock();
        loop {
            if *closed {
                return LatchWait::Closed;
            }
            if interrupt.is_interrupted() {
                return LatchWait::Interrupted;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return LatchWait::TimedOut;
                    }
                    remaining.min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            self.signal.wait_for(&mut closed, slice);
        }
    }
}

impl StreamConsumer for CloseLatch {
    fn accept(&self, _line: &str) {}

    fn stream_finished(&self) {
        self.close();
    }

    fn stream_read_failed(&self, _error: &io::Error) {
        self.close();
    }
}
