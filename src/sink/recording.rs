use std::error::Error as StdError;
use std::sync::Mutex;
use std::sync::PoisonError;

use super::OutputSink;

/// A single call made on an [`OutputSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// [`OutputSink::announce`].
    Announce {
        /// The command text.
        command: String,
        /// Whether the command runs as `root`.
        privileged: bool,
    },
    /// [`OutputSink::line`].
    Line(String),
    /// [`OutputSink::finish`].
    Finish(i32),
    /// [`OutputSink::fail`], with the error's message.
    Fail(String),
}

/// A sink which remembers every event it receives, for inspecting later.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    /// Construct an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far, in order.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    /// The text of all [`SinkEvent::Line`] events received so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Line(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: SinkEvent) {
        self.lock().push(event);
    }
}

impl OutputSink for RecordingSink {
    fn announce(&self, command: &str, privileged: bool) {
        self.push(SinkEvent::Announce {
            command: command.to_owned(),
            privileged,
        });
    }

    fn line(&self, text: &str) {
        self.push(SinkEvent::Line(text.to_owned()));
    }

    fn finish(&self, code: i32) {
        self.push(SinkEvent::Finish(code));
    }

    fn fail(&self, error: &(dyn StdError + 'static)) {
        self.push(SinkEvent::Fail(error.to_string()));
    }
}
