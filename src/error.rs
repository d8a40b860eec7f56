//! Canonical error types for the batch subsystem.
//!
//! `BatchError` separates caller contract violations from multipart framing
//! failures and transport-level failures. Upstream HTTP error statuses are
//! never errors at this layer; they surface as ordinary
//! [`PartResponse`](crate::response::PartResponse) values the caller inspects
//! like any other response.

use std::{io, time::Duration};

use thiserror::Error;

use crate::request::Method;

/// Top-level error type exposed by `batchwire`.
#[derive(Debug, Error)]
pub enum BatchError {
    /// GET requests are not batchable inside an atomic changeset.
    #[error("retrieve (GET) requests cannot be added to a changeset")]
    RetrieveInChangeset,
    /// A non-GET request was passed to the retrieve-only entry point.
    #[error("expected a retrieve (GET) request, found {method}")]
    RetrieveExpected {
        /// Method carried by the rejected request.
        method: Method,
    },
    /// An operation was attempted on a changeset scope that is already
    /// closed.
    #[error("changeset scope is closed")]
    ChangesetClosed,
    /// A response placeholder received a second assignment.
    #[error("response placeholder already bound (content id {content_id:?})")]
    SlotAlreadyBound {
        /// Content id of the part that attempted the second binding, when
        /// one was present.
        content_id: Option<String>,
    },
    /// The response stream violated the multipart framing rules.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// No response headers arrived within the allowed time.
    #[error("batch response timed out after {timeout:?}")]
    Timeout {
        /// Timeout the caller passed to `send`.
        timeout: Duration,
    },
    /// Transport or pipe I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Framing errors raised while parsing a multipart response stream.
///
/// These indicate a non-conformant server or transport corruption; this
/// layer never retries them.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line exceeded the configured length limit without a terminator.
    #[error("line exceeds the {limit}-byte limit")]
    LineTooLong {
        /// Configured maximum line length.
        limit: usize,
    },
    /// The embedded status line could not be parsed.
    #[error("malformed status line in response part: {detail}")]
    MalformedStatusLine {
        /// Parser diagnostic for the offending block.
        detail: String,
    },
    /// A part header block could not be parsed.
    #[error("malformed header block in response part: {detail}")]
    MalformedHeaders {
        /// Parser diagnostic for the offending block.
        detail: String,
    },
    /// A part carried more headers than the configured limit.
    #[error("response part carries more than {limit} headers")]
    TooManyHeaders {
        /// Configured maximum header count per part.
        limit: usize,
    },
    /// A `multipart/mixed` content type carried no `boundary` parameter.
    #[error("no multipart boundary in content type {content_type:?}")]
    MissingBoundary {
        /// The content type that was inspected.
        content_type: String,
    },
    /// A part declared `multipart/mixed` where a single response was
    /// expected, or vice versa.
    #[error("response part kind mismatch: expected {expected}, found content type {found:?}")]
    PartKindMismatch {
        /// Kind the request order called for.
        expected: &'static str,
        /// Content type found on the wire.
        found: String,
    },
    /// A changeset sub-response carried no content id matching a pending
    /// placeholder, outside continue-on-error mode.
    #[error("changeset response part has unresolvable content id {found:?}")]
    UnresolvedContentId {
        /// Content id found on the part, when one was present.
        found: Option<String>,
    },
    /// The response carried more top-level parts than requests were sent.
    #[error("unexpected response part after all expected items were consumed")]
    UnexpectedPart,
    /// The stream ended before the closing boundary delimiter.
    #[error("response stream ended before the closing boundary delimiter")]
    UnexpectedEof,
}

/// Canonical result alias used by `batchwire` public APIs.
pub type Result<T> = std::result::Result<T, BatchError>;
