//! Forward-only line scanning over a raw response stream.
//!
//! The multipart grammar is line-oriented: boundaries, headers, and
//! separators are all lines. `LineReader` performs a single forward pass
//! over an [`AsyncRead`], returning raw lines with their terminators so
//! body bytes can be reassembled exactly. CRLF is canonical; bare LF is
//! tolerated.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{BatchError, ProtocolError};

/// Forward-only, single-pass line scanner.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    searched: usize,
    eof: bool,
    max_line: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a stream with the given line-length limit.
    pub fn new(inner: R, max_line: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(4 * 1024),
            searched: 0,
            eof: false,
            max_line,
        }
    }

    /// Next raw line, including its terminator; a final unterminated line
    /// is returned as-is. `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolError::LineTooLong`] when no terminator
    /// appears within the limit, or [`BatchError::Io`] on read failures.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>, BatchError> {
        loop {
            if let Some(offset) = self.buf[self.searched..]
                .iter()
                .position(|&b| b == b'\n')
            {
                let end = self.searched + offset + 1;
                self.searched = 0;
                return Ok(Some(self.buf.split_to(end).freeze()));
            }
            self.searched = self.buf.len();

            if self.searched > self.max_line {
                return Err(ProtocolError::LineTooLong {
                    limit: self.max_line,
                }
                .into());
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                self.searched = 0;
                return Ok(Some(self.buf.split().freeze()));
            }
            let read = self.inner.read_buf(&mut self.buf).await?;
            if read == 0 {
                self.eof = true;
            }
        }
    }

    /// Consume the rest of the stream, returning the number of bytes
    /// discarded. Used when closing a response early so a pooled
    /// connection sees a fully drained stream.
    ///
    /// # Errors
    ///
    /// Fails with [`BatchError::Io`] on read failures.
    pub async fn drain(&mut self) -> Result<u64, BatchError> {
        let mut discarded = self.buf.len() as u64;
        self.buf.clear();
        self.searched = 0;
        if !self.eof {
            let mut sink = [0_u8; 4096];
            loop {
                let read = self.inner.read(&mut sink).await?;
                if read == 0 {
                    self.eof = true;
                    break;
                }
                discarded += read as u64;
            }
        }
        Ok(discarded)
    }
}

/// Strip a trailing CRLF or bare LF.
#[must_use]
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Whether the line is empty after removing its terminator.
#[must_use]
pub fn is_blank(line: &[u8]) -> bool { trim_line_ending(line).is_empty() }
