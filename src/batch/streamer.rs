//! Low-level multipart framing writer.
//!
//! `PartStreamer` knows how to emit dash-boundary lines, header lines,
//! blank-line separators, and raw passthrough bytes over any
//! [`AsyncWrite`]. It carries no boundary-management state of its own; the
//! batch and changeset builders decide *what* to frame and compose this
//! type for the *how*.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::boundary::BoundaryToken;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Framing writer over an outgoing batch body.
#[derive(Debug)]
pub struct PartStreamer<W> {
    writer: W,
}

impl<W> PartStreamer<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self { Self { writer } }

    /// Consume the streamer and return the underlying writer.
    pub fn into_inner(self) -> W { self.writer }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W { &self.writer }
}

impl<W: AsyncWrite + Unpin> PartStreamer<W> {
    /// Write a dash-boundary line: `--<token>` CRLF.
    pub async fn write_boundary(&mut self, boundary: &BoundaryToken) -> io::Result<()> {
        self.write_line(&boundary.delimiter()).await
    }

    /// Write a closing delimiter line: `--<token>--` CRLF.
    pub async fn write_closing(&mut self, boundary: &BoundaryToken) -> io::Result<()> {
        self.write_line(&boundary.closing()).await
    }

    /// Write a `Name: value` header line.
    pub async fn write_header(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.writer.write_all(name.as_bytes()).await?;
        self.writer.write_all(b": ").await?;
        self.writer.write_all(value.as_bytes()).await?;
        self.writer.write_all(CRLF).await
    }

    /// Write a blank separator line.
    pub async fn write_blank_line(&mut self) -> io::Result<()> {
        self.writer.write_all(CRLF).await
    }

    /// Write one text line followed by CRLF.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(CRLF).await
    }

    /// Pass through already-serialized bytes unchanged.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await
    }

    /// Flush buffered bytes to the underlying writer.
    pub async fn flush(&mut self) -> io::Result<()> { self.writer.flush().await }

    /// Flush and shut down the underlying writer, signalling end of body.
    pub async fn shutdown(&mut self) -> io::Result<()> { self.writer.shutdown().await }
}
