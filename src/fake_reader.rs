use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use tokio::io::AsyncRead;
use tokio::io::ReadBuf;

/// A single read delivered by a [`FakeReader`].
#[derive(Debug)]
enum Chunk {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

/// A fake [`AsyncRead`] implementation for testing.
///
/// A `FakeReader` holds a queue of chunks, and each call to [`AsyncRead::poll_read`] delivers at
/// most one of them. This simulates a pipe where a line of output may arrive split across several
/// reads, or where a read fails partway through the stream.
#[derive(Debug, Default)]
pub struct FakeReader {
    chunks: VecDeque<Chunk>,
}

impl FakeReader {
    /// Construct a `FakeReader` from an iterator of strings.
    pub fn with_str_chunks(chunks: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            chunks: chunks
                .into_iter()
                .map(|chunk| Chunk::Data(chunk.as_ref().as_bytes().to_vec()))
                .collect(),
        }
    }

    /// Add a bytes chunk to the end of this reader.
    pub fn push_chunk(&mut self, chunk: impl Into<Vec<u8>>) -> &mut Self {
        self.chunks.push_back(Chunk::Data(chunk.into()));
        self
    }

    /// Make the next read after all current chunks fail with the given error.
    pub fn push_error(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.chunks.push_back(Chunk::Error(kind));
        self
    }
}

impl AsyncRead for FakeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(Chunk::Data(mut chunk)) => {
                let remaining = buf.remaining();
                if chunk.len() > remaining {
                    // Deliver what fits and save the rest for the next read.
                    let rest = chunk.split_off(remaining);
                    self.chunks.push_front(Chunk::Data(rest));
                }
                buf.put_slice(&chunk);
                Poll::Ready(Ok(()))
            }
            Some(Chunk::Error(kind)) => Poll::Ready(Err(io::Error::new(kind, "fake read error"))),
            // Ok(()) without writing any data means EOF.
            None => Poll::Ready(Ok(())),
        }
    }
}
