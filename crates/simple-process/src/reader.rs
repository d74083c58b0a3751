//! Background reader for one output stream of the child

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::consumer::StreamConsumer;
use crate::stream::StreamKind;

/// Message of a read error caused by closing the stream under an active read.
/// It is expected while the child is being destroyed and only logged at TRACE.
pub const STREAM_CLOSED_MESSAGE: &str = "Stream closed";

const LINE_CAPACITY: usize = 256;

/// Reads one stream line by line and feeds a [`StreamConsumer`]
///
/// Exactly one terminal event (`stream_finished` or `stream_read_failed`) is
/// delivered per reader, also when the reader is dropped without being run or
/// when the consumer panics.
pub struct AsyncStreamReader<R> {
    input: R,
    terminal: TerminalGuard,
}

impl<R: Read> AsyncStreamReader<R> {
    pub fn new(stream: StreamKind, pid: u32, input: R, consumer: Arc<dyn StreamConsumer>) -> Self {
        Self {
            input,
            terminal: TerminalGuard {
                stream,
                pid,
                consumer,
                delivered: false,
            },
        }
    }

    /// Read until end-of-stream or the first error
    pub fn run(self) {
        let Self { input, mut terminal } = self;
        let (stream, pid) = (terminal.stream, terminal.pid);
        trace!(pid, stream = %stream, "Start reading stream");

        let mut reader = BufReader::new(input);
        let mut buf = Vec::with_capacity(LINE_CAPACITY);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    trace!(pid, stream = %stream, "Stream finished");
                    terminal.finished();
                    return;
                }
                Ok(_) => terminal.consumer.accept(&decode_line(&buf)),
                Err(err) => {
                    if is_stream_closed(&err) {
                        trace!(pid, stream = %stream, "Stream closed while reading");
                    } else {
                        warn!(
                            pid,
                            stream = %stream,
                            error = %err,
                            "Reading stream '{}' of process {} failed",
                            stream,
                            pid
                        );
                    }
                    terminal.failed(&err);
                    return;
                }
            }
        }
    }
}

impl<R> std::fmt::Debug for AsyncStreamReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStreamReader")
            .field("stream", &self.terminal.stream)
            .field("pid", &self.terminal.pid)
            .finish()
    }
}

/// Owns the consumer and guarantees its single terminal event
struct TerminalGuard {
    stream: StreamKind,
    pid: u32,
    consumer: Arc<dyn StreamConsumer>,
    delivered: bool,
}

impl TerminalGuard {
    fn finished(&mut self) {
        if !std::mem::replace(&mut self.delivered, true) {
            self.consumer.stream_finished();
        }
    }

    fn failed(&mut self, error: &io::Error) {
        if !std::mem::replace(&mut self.delivered, true) {
            self.consumer.stream_read_failed(error);
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.delivered {
            trace!(pid = self.pid, stream = %self.stream, "Reader stopped before end of stream");
            self.failed(&io::Error::new(
                io::ErrorKind::Other,
                "stream reader stopped before end of stream",
            ));
        }
    }
}

fn is_stream_closed(err: &io::Error) -> bool {
    err.to_string() == STREAM_CLOSED_MESSAGE
}

/// Strip `\n` (and a `\r` before it), then decode as lossy UTF-8
pub(crate) fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&raw[..end])
}
