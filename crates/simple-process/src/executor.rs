//! Executors carrying the stream reader tasks

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::warn;

/// A unit of work handed to an [`Executor`]
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks concurrently with the caller
///
/// No completion signal is required; the supervisor tracks completion through
/// its close latches. An executor that drops a task without running it is
/// allowed: the reader inside reports a read failure when dropped.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Spawns one named OS thread per task
#[derive(Debug, Clone)]
pub struct ThreadPerTaskExecutor {
    thread_name: String,
}

impl ThreadPerTaskExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }

    /// Executor naming its threads `SimpleProcess-<pid>`
    pub fn for_process(pid: u32) -> Self {
        Self::new(format!("SimpleProcess-{pid}"))
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Executor for ThreadPerTaskExecutor {
    fn execute(&self, task: Task) {
        let name = self.thread_name.clone();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                warn!(
                    thread = %name,
                    "Exception occurred in thread '{}': {}",
                    name,
                    panic_message(payload.as_ref())
                );
            }
        });
        if let Err(e) = spawned {
            warn!(thread = %self.thread_name, error = %e, "Failed to spawn stream reader thread");
        }
    }
}

/// Runs tasks on the blocking pool of a tokio runtime
#[cfg(feature = "tokio")]
impl Executor for tokio::runtime::Handle {
    fn execute(&self, task: Task) {
        drop(self.spawn_blocking(task));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
