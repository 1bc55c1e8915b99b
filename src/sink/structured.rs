use std::error::Error as StdError;

use super::OutputSink;

/// A sink which reports lifecycle events as [`tracing`] events rather than printing them.
///
/// Useful when command output should end up in structured logs alongside everything else.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    name: Option<String>,
}

impl TracingSink {
    /// Construct a sink tagging every event with the given display name.
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(ToOwned::to_owned),
        }
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl OutputSink for TracingSink {
    fn announce(&self, command: &str, privileged: bool) {
        let symbol = if privileged { '#' } else { '$' };
        tracing::info!(name = self.name(), privileged, "{symbol} {command}");
    }

    fn line(&self, text: &str) {
        tracing::info!(name = self.name(), line = text, "Output");
    }

    fn finish(&self, code: i32) {
        if code == 0 {
            tracing::info!(name = self.name(), code, "Command finished successfully");
        } else {
            tracing::warn!(name = self.name(), code, "Command failed");
        }
    }

    fn fail(&self, error: &(dyn StdError + 'static)) {
        tracing::error!(name = self.name(), "{error}");
    }
}
