//! Errors produced while building and running shell commands.

use std::error::Error as StdError;
use std::fmt::Display;

use miette::Diagnostic;

use crate::ExecutionResult;

/// A `Result` with a [`shellby::Error`][Error].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while running a shell command.
#[derive(Debug)]
pub enum Error {
    /// A value passed to [`crate::quote`] can't be represented as shell text.
    InvalidArgumentType {
        /// The Rust type name of the rejected value.
        type_name: &'static str,
    },
    /// A stdin payload was neither bytes nor text.
    UnsupportedStdinType,
    /// The working directory override couldn't be resolved.
    Cwd {
        /// The directory as given.
        path: std::path::PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },
    /// The child process couldn't be created.
    Spawn {
        /// The full invocation, formatted as a shell command.
        invocation: String,
        /// The underlying OS error.
        source: std::io::Error,
    },
    /// Reading from or writing to one of the child's pipes failed.
    Io {
        /// Which pipe failed, like `stdout` or `stdin`.
        stream: &'static str,
        /// The underlying OS error.
        source: std::io::Error,
    },
    /// One of the child's output streams wasn't valid UTF-8.
    InvalidUtf8 {
        /// Which stream produced the data, `stdout` or `stderr`.
        stream: &'static str,
        /// The decoding error.
        source: std::string::FromUtf8Error,
    },
    /// The child exited with a non-zero code and exit codes were checked.
    Execution(ExecutionResult),
    /// [`crate::run_blocking`] was called from inside an async runtime.
    NestedRuntime,
    /// [`crate::run_blocking`] couldn't start an async runtime.
    Runtime {
        /// The underlying OS error.
        source: std::io::Error,
    },
}

impl Error {
    /// If this is an execution failure, get the result of the failed command.
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Error::Execution(result) => Some(result),
            _ => None,
        }
    }

    /// Consume this error, producing the result of the failed command, if any.
    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            Error::Execution(result) => Some(result),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgumentType { type_name } => {
                write!(f, "Invalid command line argument type: {type_name} is not valid UTF-8")
            }
            Error::UnsupportedStdinType => {
                write!(f, "Unsupported stdin type; expected bytes or text")
            }
            Error::Cwd { path, .. } => {
                write!(f, "Failed to resolve working directory {path:?}")
            }
            Error::Spawn { invocation, .. } => write!(f, "Failed to start `{invocation}`"),
            Error::Io { stream, .. } => write!(f, "Failed to communicate over {stream}"),
            Error::InvalidUtf8 { stream, .. } => write!(f, "Read invalid UTF-8 from {stream}"),
            Error::Execution(result) => write!(f, "Process exit with code {}", result.code),
            Error::NestedRuntime => write!(
                f,
                "Cannot block on a command from inside an async runtime; use `shellby::run` instead"
            ),
            Error::Runtime { .. } => write!(f, "Failed to start an async runtime"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Cwd { source, .. }
            | Error::Spawn { source, .. }
            | Error::Io { source, .. }
            | Error::Runtime { source } => Some(source),
            Error::InvalidUtf8 { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self {
            Error::InvalidArgumentType { .. } => "shellby::invalid_argument_type",
            Error::UnsupportedStdinType => "shellby::unsupported_stdin_type",
            Error::Cwd { .. } => "shellby::cwd",
            Error::Spawn { .. } => "shellby::spawn",
            Error::Io { .. } => "shellby::io",
            Error::InvalidUtf8 { .. } => "shellby::invalid_utf8",
            Error::Execution(_) => "shellby::execution",
            Error::NestedRuntime => "shellby::nested_runtime",
            Error::Runtime { .. } => "shellby::runtime",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            Error::Execution(result) => {
                let last_line = result
                    .stderr
                    .as_deref()
                    .and_then(|stderr| stderr.lines().rev().find(|line| !line.trim().is_empty()))?;
                Some(Box::new(format!("Last line of stderr: {}", last_line.trim_end())))
            }
            Error::Spawn { .. } => Some(Box::new("Is `bash` (and `sudo`, if used) installed?")),
            _ => None,
        }
    }
}
