//! Response-item states and multipart parsing primitives.
//!
//! The response side is a pull-based state machine: an item moves
//! `NotStarted → Iterating → {Breaking | Closed}` and every transition is
//! a returned value, never a flag flipped deep inside iteration logic.
//! The free functions here do the line-level work shared by single and
//! changeset items.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use super::line_reader::{LineReader, is_blank, trim_line_ending};
use crate::{
    boundary::{BoundaryLine, BoundaryToken},
    error::{BatchError, ProtocolError},
    headers::Headers,
    slot::ResponseSlot,
};

/// Iteration state of one response item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    /// No response has been read yet.
    NotStarted,
    /// Responses are being consumed.
    Iterating,
    /// Iteration stopped early on an error or async status; remaining
    /// sub-responses of this item are not consumed.
    Breaking,
    /// Terminal; the item no longer touches the stream.
    Closed,
}

/// Which boundary terminated a body scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Terminator {
    /// A nested changeset boundary line.
    Nested(BoundaryLine),
    /// A top-level batch boundary line.
    Outer(BoundaryLine),
}

/// Parse-time state of a single response item.
#[derive(Debug)]
pub(crate) struct SingleProgress {
    pub(crate) slot: ResponseSlot,
    pub(crate) yielded: bool,
}

/// Parse-time state of a changeset response item.
#[derive(Debug)]
pub(crate) struct ChangesetProgress {
    pub(crate) slots: HashMap<String, ResponseSlot>,
    pub(crate) nested: BoundaryToken,
    /// A nested delimiter was just consumed; a sub-part starts here.
    pub(crate) at_sub_part: bool,
    /// The nested closing delimiter was consumed; only the outer boundary
    /// remains.
    pub(crate) nested_closed: bool,
    /// The outer boundary after this item was consumed.
    pub(crate) done: bool,
}

/// Read a header block: lines up to and including the blank separator,
/// normalized to CRLF so the block parser sees canonical input.
pub(crate) async fn read_header_block<R>(
    reader: &mut LineReader<R>,
) -> Result<Vec<u8>, BatchError>
where
    R: AsyncRead + Unpin,
{
    let mut block = Vec::new();
    loop {
        let Some(line) = reader.next_line().await? else {
            return Err(ProtocolError::UnexpectedEof.into());
        };
        if is_blank(&line) {
            block.extend_from_slice(b"\r\n");
            return Ok(block);
        }
        block.extend_from_slice(trim_line_ending(&line));
        block.extend_from_slice(b"\r\n");
    }
}

/// Parse an embedded `HTTP/1.1 <status> <reason>` block.
pub(crate) fn parse_status_block(
    block: &[u8],
    max_headers: usize,
) -> Result<(u16, String, Headers), BatchError> {
    let mut storage = vec![httparse::EMPTY_HEADER; max_headers];
    let mut response = httparse::Response::new(&mut storage);
    match response.parse(block) {
        Ok(httparse::Status::Complete(_)) => {
            let status = response.code.ok_or_else(|| ProtocolError::MalformedStatusLine {
                detail: "missing status code".to_owned(),
            })?;
            let reason = response.reason.unwrap_or("").to_owned();
            Ok((status, reason, collect_headers(response.headers)))
        }
        Ok(httparse::Status::Partial) => Err(ProtocolError::MalformedStatusLine {
            detail: "truncated status block".to_owned(),
        }
        .into()),
        Err(httparse::Error::TooManyHeaders) => {
            Err(ProtocolError::TooManyHeaders { limit: max_headers }.into())
        }
        Err(error) => Err(ProtocolError::MalformedStatusLine {
            detail: error.to_string(),
        }
        .into()),
    }
}

/// Parse a MIME part header block (no status line).
pub(crate) fn parse_part_headers(
    block: &[u8],
    max_headers: usize,
) -> Result<Headers, BatchError> {
    let mut storage = vec![httparse::EMPTY_HEADER; max_headers];
    match httparse::parse_headers(block, &mut storage) {
        Ok(httparse::Status::Complete((_, parsed))) => Ok(collect_headers(parsed)),
        Ok(httparse::Status::Partial) => Err(ProtocolError::MalformedHeaders {
            detail: "truncated header block".to_owned(),
        }
        .into()),
        Err(httparse::Error::TooManyHeaders) => {
            Err(ProtocolError::TooManyHeaders { limit: max_headers }.into())
        }
        Err(error) => Err(ProtocolError::MalformedHeaders {
            detail: error.to_string(),
        }
        .into()),
    }
}

fn collect_headers(parsed: &[httparse::Header<'_>]) -> Headers {
    let mut headers = Headers::new();
    for header in parsed {
        headers.insert(
            header.name,
            String::from_utf8_lossy(header.value).into_owned(),
        );
    }
    headers
}

/// Accumulate raw body lines until a boundary line of `outer` or, when
/// given, `nested`. The CRLF preceding the boundary belongs to the
/// delimiter and is trimmed from the body.
pub(crate) async fn read_body_until<R>(
    reader: &mut LineReader<R>,
    outer: &BoundaryToken,
    nested: Option<&BoundaryToken>,
) -> Result<(Bytes, Terminator), BatchError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let Some(line) = reader.next_line().await? else {
            return Err(ProtocolError::UnexpectedEof.into());
        };
        if let Some(token) = nested {
            if let Some(kind) = token.match_line(&line) {
                return Ok((finish_body(body), Terminator::Nested(kind)));
            }
        }
        if let Some(kind) = outer.match_line(&line) {
            return Ok((finish_body(body), Terminator::Outer(kind)));
        }
        body.extend_from_slice(&line);
    }
}

/// Discard lines until a boundary line for `boundary` appears.
pub(crate) async fn skip_to_boundary<R>(
    reader: &mut LineReader<R>,
    boundary: &BoundaryToken,
) -> Result<BoundaryLine, BatchError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(line) = reader.next_line().await? else {
            return Err(ProtocolError::UnexpectedEof.into());
        };
        if let Some(kind) = boundary.match_line(&line) {
            return Ok(kind);
        }
    }
}

fn finish_body(mut body: BytesMut) -> Bytes {
    if body.ends_with(b"\r\n") {
        body.truncate(body.len() - 2);
    } else if body.ends_with(b"\n") {
        body.truncate(body.len() - 1);
    }
    body.freeze()
}
