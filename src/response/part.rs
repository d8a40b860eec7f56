//! Materialized per-operation responses.

use bytes::Bytes;

use crate::headers::{Headers, LOCATION};

/// One parsed response part.
///
/// Upstream HTTP failures are never surfaced as errors by the parser;
/// a part with status ≥ 400 is an ordinary value the caller inspects via
/// [`is_error`](Self::is_error). A 202 part is an async placeholder whose
/// completion the caller polls through
/// [`monitor_location`](Self::monitor_location).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartResponse {
    status: u16,
    reason: String,
    headers: Headers,
    body: Bytes,
    content_id: Option<String>,
}

impl PartResponse {
    pub(crate) fn new(
        status: u16,
        reason: String,
        headers: Headers,
        body: Bytes,
        content_id: Option<String>,
    ) -> Self {
        Self {
            status,
            reason,
            headers,
            body,
            content_id,
        }
    }

    /// HTTP status code of this part.
    #[must_use]
    pub fn status(&self) -> u16 { self.status }

    /// Reason phrase from the status line.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }

    /// Headers of the embedded response.
    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Body bytes of the embedded response.
    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Content id this part resolved to, when the part carried one.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> { self.content_id.as_deref() }

    /// Whether this part reports an upstream HTTP error (status ≥ 400).
    #[must_use]
    pub fn is_error(&self) -> bool { self.status >= 400 }

    /// Whether this part is an async placeholder (status 202).
    #[must_use]
    pub fn is_async(&self) -> bool { self.status == 202 }

    /// The `Location` header an async placeholder is polled through.
    #[must_use]
    pub fn monitor_location(&self) -> Option<&str> { self.headers.get(LOCATION) }
}
