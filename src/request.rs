//! The [`ExecutionRequest`], which configures a single run of a command.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::Command;
use crate::Error;
use crate::OutputSink;

/// Data written to a command's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stdin {
    /// Raw bytes, written as-is.
    Bytes(Vec<u8>),
    /// Text, written as UTF-8.
    Text(String),
}

impl Stdin {
    /// Get the bytes to write.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Stdin::Bytes(bytes) => bytes,
            Stdin::Text(text) => text.as_bytes(),
        }
    }

    /// Consume this payload, producing the bytes to write.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Stdin::Bytes(bytes) => bytes,
            Stdin::Text(text) => text.into_bytes(),
        }
    }
}

impl From<Vec<u8>> for Stdin {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Stdin {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for Stdin {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Stdin {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Accept a dynamically-typed payload, like one pulled out of a plugin or a config map.
///
/// Only byte vectors, strings, and their borrowed `'static` forms are accepted; anything else is
/// an [`Error::UnsupportedStdinType`].
impl TryFrom<Box<dyn Any + Send>> for Stdin {
    type Error = Error;

    fn try_from(value: Box<dyn Any + Send>) -> Result<Self, Self::Error> {
        let value = match value.downcast::<Vec<u8>>() {
            Ok(bytes) => return Ok(Self::Bytes(*bytes)),
            Err(value) => value,
        };
        let value = match value.downcast::<String>() {
            Ok(text) => return Ok(Self::Text(*text)),
            Err(value) => value,
        };
        if let Some(bytes) = value.downcast_ref::<&'static [u8]>() {
            return Ok(Self::Bytes(bytes.to_vec()));
        }
        if let Some(text) = value.downcast_ref::<&'static str>() {
            return Ok(Self::Text((*text).to_owned()));
        }
        Err(Error::UnsupportedStdinType)
    }
}

/// Everything needed to run a command once.
///
/// Construct one with [`ExecutionRequest::new`] and hand it to [`crate::run`] or
/// [`crate::run_blocking`].
#[derive(Clone)]
pub struct ExecutionRequest {
    /// The command to run.
    pub command: Command,
    /// A label printed before every line of output.
    pub name: Option<String>,
    /// Data to write to the command's stdin. If absent, the command inherits our stdin.
    pub stdin: Option<Stdin>,
    /// The working directory to start the shell in, after `~` expansion.
    ///
    /// This is independent of [`Command::directory`], which `cd`s inside the shell.
    pub cwd: Option<PathBuf>,
    /// Fail with [`Error::Execution`] if the command exits with a non-zero code.
    pub check: bool,
    /// Display output line-by-line as it arrives. Otherwise, output is read in one go.
    pub display: bool,
    /// Return the command's output in the [`crate::ExecutionResult`].
    pub capture: bool,
    /// Don't report anything to the sink.
    pub quiet: bool,
    /// Where to report the command's progress. Defaults to a [`crate::TerminalSink`] on stderr.
    pub sink: Option<Arc<dyn OutputSink>>,
}

impl ExecutionRequest {
    /// Construct a request with the default options: exit codes are checked and output is
    /// displayed and captured.
    pub fn new(command: impl Into<Command>) -> Self {
        Self {
            command: command.into(),
            name: None,
            stdin: None,
            cwd: None,
            check: true,
            display: true,
            capture: true,
            quiet: false,
            sink: None,
        }
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Run the command as another user with `sudo`.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.command.set_user(Some(user.into()));
        self
    }

    /// `cd` to a directory inside the shell before running the command.
    pub fn directory(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.command.set_directory(Some(directory.into()));
        self
    }

    /// Start the shell in the given working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Write the given data to the command's stdin.
    pub fn stdin(mut self, stdin: impl Into<Stdin>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Fail if the command exits with a non-zero code.
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Display output line-by-line.
    pub fn display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Capture output.
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Suppress all reporting.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Report progress to the given sink instead of the terminal.
    pub fn sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl std::fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("command", &self.command)
            .field("name", &self.name)
            .field("stdin", &self.stdin.as_ref().map(|stdin| stdin.as_bytes().len()))
            .field("cwd", &self.cwd)
            .field("check", &self.check)
            .field("display", &self.display)
            .field("capture", &self.capture)
            .field("quiet", &self.quiet)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
