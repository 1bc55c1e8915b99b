use std::error::Error as StdError;
use std::io::Stderr;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use owo_colors::OwoColorize;
use owo_colors::Style;

use super::OutputSink;

const BOLD_CHECKMARK: &str = "\u{2714}";

/// Symbol used for lines of command output. Stdout and stderr are not distinguished.
const LINE_SYMBOL: &str = ">";

/// Symbol used for messages which aren't command output.
const MESSAGE_SYMBOL: &str = ":";

/// An interactive sink which prints lines like `name> output` to a terminal, usually stderr.
///
/// Each event is written while holding a lock on the writer, so lines from the stdout and stderr
/// readers are never interleaved mid-line.
pub struct TerminalSink<W = Stderr> {
    name: String,
    color: bool,
    writer: Mutex<W>,
}

impl TerminalSink<Stderr> {
    /// Construct a sink printing to stderr, colored if stderr supports it.
    pub fn stderr(name: Option<&str>) -> Self {
        let color = supports_color::on(supports_color::Stream::Stderr).is_some();
        Self::new(name, std::io::stderr()).with_color(color)
    }
}

impl<W> TerminalSink<W>
where
    W: Write + Send,
{
    /// Construct an uncolored sink printing to the given writer.
    pub fn new(name: Option<&str>, writer: W) -> Self {
        Self {
            name: name.unwrap_or_default().to_owned(),
            color: false,
            writer: Mutex::new(writer),
        }
    }

    /// Enable or disable ANSI colors.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Consume this sink, producing the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_owned()
        }
    }

    fn print(&self, symbol: &str, text: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // There's nowhere to report a failure to write to the display.
        let _ = writeln!(writer, "{}{symbol} {text}", self.name);
        let _ = writer.flush();
    }
}

impl<W> OutputSink for TerminalSink<W>
where
    W: Write + Send,
{
    fn announce(&self, command: &str, privileged: bool) {
        let symbol = if privileged { "#" } else { "$" };
        self.print(symbol, &self.paint(command, Style::new().white()));
    }

    fn line(&self, text: &str) {
        self.print(LINE_SYMBOL, text);
    }

    fn finish(&self, code: i32) {
        if code == 0 {
            let symbol = format!(
                "[{}]",
                self.paint(BOLD_CHECKMARK, Style::new().green())
            );
            self.print(&symbol, "");
        } else {
            self.print(MESSAGE_SYMBOL, &format!("exit with {code}"));
        }
    }

    fn fail(&self, error: &(dyn StdError + 'static)) {
        let message = format!(
            "{} {error}",
            self.paint("[ERR!]", Style::new().red().bold())
        );
        self.print(MESSAGE_SYMBOL, &message);
    }
}

impl<W> std::fmt::Debug for TerminalSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSink")
            .field("name", &self.name)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}
