//! Collectors turning line events into a result artifact

use std::collections::VecDeque;
use std::io;

use parking_lot::Mutex;

use crate::consumer::StreamConsumer;

/// A [`StreamConsumer`] that accumulates lines into a value of type `T`
///
/// `result()` may be called any number of times and returns equal values as
/// long as no further lines arrive. Collectors never fail: read errors end the
/// stream and the artifact is whatever accumulated before.
pub trait StreamCollector<T>: StreamConsumer {
    fn result(&self) -> T;
}

/// Concatenates each line followed by `\n`
///
/// A final line without a trailing newline gains one.
#[derive(Debug, Default)]
pub struct StringCollector {
    buffer: Mutex<String>,
}

impl StringCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamConsumer for StringCollector {
    fn accept(&self, line: &str) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(line);
        buffer.push('\n');
    }

    fn stream_finished(&self) {}

    fn stream_read_failed(&self, _error: &io::Error) {}
}

impl StreamCollector<String> for StringCollector {
    fn result(&self) -> String {
        self.buffer.lock().clone()
    }
}

/// Keeps every line as a separate entry
#[derive(Debug, Default)]
pub struct LineCollector {
    lines: Mutex<Vec<String>>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamConsumer for LineCollector {
    fn accept(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }

    fn stream_finished(&self) {}

    fn stream_read_failed(&self, _error: &io::Error) {}
}

impl StreamCollector<Vec<String>> for LineCollector {
    fn result(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

/// Counts lines without storing them
#[derive(Debug, Default)]
pub struct LineCountCollector {
    count: Mutex<usize>,
}

impl LineCountCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamConsumer for LineCountCollector {
    fn accept(&self, _line: &str) {
        *self.count.lock() += 1;
    }

    fn stream_finished(&self) {}

    fn stream_read_failed(&self, _error: &io::Error) {}
}

impl StreamCollector<usize> for LineCountCollector {
    fn result(&self) -> usize {
        *self.count.lock()
    }
}

/// Retains only the last `max_lines` lines, rendered like [`StringCollector`]
#[derive(Debug)]
pub struct TailCollector {
    max_lines: usize,
    lines: Mutex<VecDeque<String>>,
}

impl TailCollector {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            lines: Mutex::new(VecDeque::with_capacity(max_lines.min(1024))),
        }
    }
}

impl StreamConsumer for TailCollector {
    fn accept(&self, line: &str) {
        if self.max_lines == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        if lines.len() == self.max_lines {
            lines.pop_front();
        }
        lines.push_back(line.to_owned());
    }

    fn stream_finished(&self) {}

    fn stream_read_failed(&self, _error: &io::Error) {}
}

impl StreamCollector<String> for TailCollector {
    fn result(&self) -> String {
        self.lines.lock().iter().fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
    }
}
