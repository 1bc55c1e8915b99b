//! The [`ExecutionResult`] of a finished command.

use std::process::ExitStatus;

/// The outcome of a command which has exited and had both of its output streams fully drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The process exit code. Processes killed by a signal have a negative code, `-signal`.
    pub code: i32,
    /// Captured stdout, unless capturing was disabled.
    pub stdout: Option<String>,
    /// Captured stderr, unless capturing was disabled.
    pub stderr: Option<String>,
}

impl ExecutionResult {
    /// Did the command exit successfully?
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Convert an [`ExitStatus`] to a signed exit code.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    // Not reachable on Unix; an exit status is either a code or a signal.
    -1
}
