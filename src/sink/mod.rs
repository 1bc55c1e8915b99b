//! Reporting a command's lifecycle to a display.
//!
//! An [`OutputSink`] is told when a command starts, about every line it prints, and how it ended.
//! The stdout and stderr readers share one sink and call it concurrently, so implementations take
//! `&self` and must be [`Sync`].

use std::error::Error as StdError;

mod recording;
mod structured;
mod terminal;

pub use recording::RecordingSink;
pub use recording::SinkEvent;
pub use structured::TracingSink;
pub use terminal::TerminalSink;

/// A display for a command's lifecycle events.
pub trait OutputSink: Send + Sync {
    /// A command is about to run. `privileged` is set if it's running as `root`.
    fn announce(&self, command: &str, privileged: bool);

    /// The command printed a line of output. The line terminator has already been stripped.
    fn line(&self, text: &str);

    /// The command exited with the given code.
    fn finish(&self, code: i32);

    /// Something went wrong other than a non-zero exit code, like failing to start the command.
    fn fail(&self, error: &(dyn StdError + 'static));
}

/// A sink which displays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl OutputSink for SilentSink {
    fn announce(&self, _command: &str, _privileged: bool) {}

    fn line(&self, _text: &str) {}

    fn finish(&self, _code: i32) {}

    fn fail(&self, _error: &(dyn StdError + 'static)) {}
}
