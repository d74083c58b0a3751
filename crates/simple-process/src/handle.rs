//! Handle to a spawned child process
//!
//! Every wait on the handle couples the wait for the child with the drain of
//! its output streams, so the collected output is complete once a wait
//! returns successfully.

use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{
    error::{ProcessError, Result},
    interrupt::InterruptFlag,
    supervisor::OutputSupervisor,
};

/// First poll interval while waiting for the child
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
/// Poll interval cap; also bounds how late an interrupt is noticed
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Observed state of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Alive,
    Exited(i32),
}

/// Supervised child process whose output is collected into `T`
pub struct ProcessHandle<T> {
    child: Child,
    pid: u32,
    command: String,
    supervisor: OutputSupervisor<T>,
    interrupt: InterruptFlag,
    exit_code: Option<i32>,
}

impl<T> ProcessHandle<T> {
    pub(crate) fn new(
        child: Child,
        command: String,
        supervisor: OutputSupervisor<T>,
        interrupt: InterruptFlag,
    ) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            command,
            supervisor,
            interrupt,
            exit_code: None,
        }
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Program and arguments joined by spaces
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Flag that interrupts the waits of this handle when raised
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// Wait until the child exited and its output is drained
    ///
    /// Returns the exit code. A child killed by a signal reports `128 + signal`.
    pub fn wait_for_termination(&mut self) -> Result<i32> {
        trace!(pid = self.pid, command = %self.command, "Waiting for process to terminate");
        let exit_code = self.wait_child(None)?.ok_or_else(|| {
            ProcessError::IllegalState(format!("process {} has no exit code", self.pid))
        })?;
        self.supervisor.await_streams_closed(&self.interrupt)?;
        Ok(exit_code)
    }

    /// Wait at most `timeout` for the child to exit, then drain its output
    ///
    /// On timeout the child keeps running.
    pub fn wait_for_termination_within(&mut self, timeout: Duration) -> Result<()> {
        trace!(
            pid = self.pid,
            command = %self.command,
            timeout = ?timeout,
            "Waiting for process to terminate"
        );
        // an unrepresentable deadline means no deadline
        let deadline = Instant::now().checked_add(timeout);
        let Some(exit_code) = self.wait_child(deadline)? else {
            return Err(ProcessError::Timeout {
                pid: self.pid,
                command: self.command.clone(),
                timeout,
            });
        };
        trace!(pid = self.pid, exit_code, "Process terminated");
        self.supervisor.await_streams_closed(&self.interrupt)
    }

    /// Wait for termination and require exit code `0`
    pub fn wait_for_successful_termination(&mut self) -> Result<()> {
        self.wait_for_exit_code(0)
    }

    /// Wait for termination and require the given exit code
    pub fn wait_for_exit_code(&mut self, expected: i32) -> Result<()> {
        let actual = self.wait_for_termination()?;
        if actual != expected {
            return Err(ProcessError::UnexpectedExitCode {
                pid: self.pid,
                command: self.command.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Check if process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.poll_exit(), Ok(None))
    }

    /// Exit code of a terminated child
    pub fn exit_value(&mut self) -> Result<i32> {
        self.poll_exit()?
            .ok_or(ProcessError::NotExited { pid: self.pid })
    }

    pub fn state(&mut self) -> Result<ProcessState> {
        Ok(match self.poll_exit()? {
            Some(code) => ProcessState::Exited(code),
            None => ProcessState::Alive,
        })
    }

    /// Request graceful termination (SIGTERM on Unix)
    pub fn destroy(&mut self) -> Result<()> {
        if self.poll_exit()?.is_some() {
            return Ok(());
        }
        debug!(pid = self.pid, "Destroying process");

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            return match kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(errno) => Err(ProcessError::SignalFailed {
                    pid: self.pid,
                    source: errno.into(),
                }),
            };
        }

        #[cfg(not(unix))]
        {
            self.kill()
        }
    }

    /// Request immediate termination (SIGKILL on Unix)
    pub fn destroy_forcibly(&mut self) -> Result<()> {
        if self.poll_exit()?.is_some() {
            return Ok(());
        }
        debug!(pid = self.pid, "Destroying process forcibly");
        self.kill()
    }

    /// Collected stdout; complete only after a successful wait
    pub fn stdout(&self) -> T {
        self.supervisor.stdout()
    }

    /// Collected stderr; complete only after a successful wait
    pub fn stderr(&self) -> T {
        self.supervisor.stderr()
    }

    fn kill(&mut self) -> Result<()> {
        self.child.kill().map_err(|source| ProcessError::SignalFailed {
            pid: self.pid,
            source,
        })
    }

    fn poll_exit(&mut self) -> Result<Option<i32>> {
        if self.exit_code.is_none() {
            self.exit_code = self.child.try_wait()?.map(exit_code);
        }
        Ok(self.exit_code)
    }

    /// Poll the child until it exits, `deadline` passes or the wait is interrupted
    fn wait_child(&mut self, deadline: Option<Instant>) -> Result<Option<i32>> {
        let mut interval = MIN_POLL_INTERVAL;
        loop {
            if let Some(code) = self.poll_exit()? {
                return Ok(Some(code));
            }
            if self.interrupt.is_interrupted() {
                return Err(ProcessError::Interrupted {
                    pid: self.pid,
                    context: format!("process {} (command '{}') to finish", self.pid, self.command),
                });
            }
            let sleep_for = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    interval.min(remaining)
                }
                None => interval,
            };
            thread::sleep(sleep_for);
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }
    }
}

impl<T> std::fmt::Debug for ProcessHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("exit_code", &self.exit_code)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}

/// Exit code, or `128 + signal` for a child terminated by a signal
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
