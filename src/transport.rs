//! Transport collaborator interface.
//!
//! The batch subsystem never opens sockets itself: it hands an assembled
//! body stream to a [`BatchTransport`] and gets back status, headers, and
//! a response body stream. Cancellation follows the transport task's
//! lifetime; dropping the future aborts the exchange.

use std::{fmt, io};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::headers::Headers;

/// Type-erased byte stream carrying a request or response body.
pub type BodyStream = Box<dyn AsyncRead + Send + Unpin>;

/// One outgoing `POST <serviceRoot>/$batch` exchange.
pub struct TransportRequest {
    /// Absolute URL of the batch endpoint.
    pub url: String,
    /// Outer request headers (content type with boundary, protocol
    /// version, preferences).
    pub headers: Headers,
    /// The multipart body, produced incrementally by the builder.
    pub body: BodyStream,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The raw response to a batch exchange.
pub struct TransportResponse {
    /// Outer HTTP status.
    pub status: u16,
    /// Outer response headers; the multipart boundary is read from here.
    pub headers: Headers,
    /// The multipart response body, consumed lazily by the parser.
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// HTTP transport submitting assembled batch bodies.
///
/// Implementations are expected to stream the request body as it arrives
/// (the builder blocks on the shared pipe once it fills) and to return as
/// soon as response headers are available, leaving the body to be pulled
/// on demand.
#[async_trait]
pub trait BatchTransport: Send + Sync + 'static {
    /// Submit the request and return the response headers and body
    /// stream.
    async fn execute(&self, request: TransportRequest) -> io::Result<TransportResponse>;
}
