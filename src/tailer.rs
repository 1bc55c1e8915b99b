//! The [`StreamTailer`], which forwards one of a command's output streams to an [`OutputSink`]
//! line by line.

use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::BufReader;
use tracing::instrument;

use crate::buffers::CAPTURE_BUFFER_CAPACITY;
use crate::buffers::LINE_BUFFER_CAPACITY;
use crate::Error;
use crate::OutputSink;

/// Reads a stream like a child's stdout until it closes, displaying and/or capturing it.
///
/// When displaying, each line is sent to the sink as soon as its terminator arrives, with the
/// terminator and any trailing whitespace stripped. Blank lines are held back until the next
/// non-blank line, so blank lines in the middle of the output are shown but blank lines at the
/// very end are dropped.
///
/// When capturing, the stream's text is returned exactly as read, blank lines included.
pub struct StreamTailer<R> {
    /// Name of the stream for error messages, like `stdout`.
    stream: &'static str,
    reader: BufReader<Pin<Box<R>>>,
    sink: Arc<dyn OutputSink>,
    display: bool,
    capture: bool,
}

impl<R> StreamTailer<R>
where
    R: AsyncRead,
{
    /// Construct a tailer which displays and captures the given stream.
    pub fn new(stream: &'static str, reader: R, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            stream,
            reader: BufReader::new(Box::pin(reader)),
            sink,
            display: true,
            capture: true,
        }
    }

    /// Send lines to the sink as they arrive. If this is disabled, the stream is read to
    /// completion in one go and nothing is displayed.
    pub fn with_display(self, display: bool) -> Self {
        Self { display, ..self }
    }

    /// Keep the stream's text and return it from [`StreamTailer::run`].
    pub fn with_capture(self, capture: bool) -> Self {
        Self { capture, ..self }
    }

    /// Read the stream until it closes, returning the captured text if capturing is enabled.
    #[instrument(skip_all, fields(stream = self.stream), level = "debug")]
    pub async fn run(mut self) -> crate::Result<Option<String>> {
        let result = if self.display {
            self.tail().await
        } else {
            self.read_all().await
        };

        if let Err(Error::InvalidUtf8 { .. }) = &result {
            // Keep the pipe drained so the child can't block writing to it while we wait for it
            // to exit.
            let _ = tokio::io::copy(&mut self.reader, &mut tokio::io::sink()).await;
        }

        result
    }

    async fn tail(&mut self) -> crate::Result<Option<String>> {
        let mut captured = if self.capture {
            String::with_capacity(CAPTURE_BUFFER_CAPACITY)
        } else {
            String::new()
        };
        let mut buffer = Vec::with_capacity(LINE_BUFFER_CAPACITY);
        let mut blank_lines = 0_usize;
        let mut lines = 0_usize;

        loop {
            buffer.clear();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut buffer)
                .await
                .map_err(|source| Error::Io {
                    stream: self.stream,
                    source,
                })?;
            if bytes_read == 0 {
                break;
            }

            let line = self.decode(std::mem::take(&mut buffer))?;
            tracing::trace!(line, "Read line");
            lines += 1;

            if self.capture {
                captured.push_str(&line);
            }

            let stripped = line.trim_end();
            if stripped.trim_start().is_empty() {
                blank_lines += 1;
            } else {
                for _ in 0..blank_lines {
                    self.sink.line("");
                }
                blank_lines = 0;
                self.sink.line(stripped);
            }

            buffer = line.into_bytes();
        }

        tracing::debug!(lines, dropped_blank_lines = blank_lines, "Stream closed");
        Ok(self.capture.then_some(captured))
    }

    async fn read_all(&mut self) -> crate::Result<Option<String>> {
        let map_err = |source| Error::Io {
            stream: self.stream,
            source,
        };

        if !self.capture {
            // The stream still has to be drained, or the child may block on a full pipe.
            let bytes = tokio::io::copy(&mut self.reader, &mut tokio::io::sink())
                .await
                .map_err(map_err)?;
            tracing::debug!(bytes, "Discarded stream");
            return Ok(None);
        }

        let mut buffer = Vec::with_capacity(CAPTURE_BUFFER_CAPACITY);
        self.reader
            .read_to_end(&mut buffer)
            .await
            .map_err(map_err)?;
        tracing::debug!(bytes = buffer.len(), "Read stream");
        self.decode(buffer).map(Some)
    }

    fn decode(&self, bytes: Vec<u8>) -> crate::Result<String> {
        String::from_utf8(bytes).map_err(|source| Error::InvalidUtf8 {
            stream: self.stream,
            source,
        })
    }
}
