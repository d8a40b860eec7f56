//! The batchable request collaborator.
//!
//! A [`BatchRequest`] carries everything the framing layer needs to emit
//! one `application/http` part: method, target URI, headers, and an opaque
//! body. Entity serialization happens upstream; this layer passes the bytes
//! through untouched.

use std::fmt;

use bytes::Bytes;
use tokio::io::AsyncWrite;

use crate::{
    batch::streamer::PartStreamer,
    error::BatchError,
    headers::{CONTENT_LENGTH, Headers},
};

/// HTTP methods batchable through this library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Retrieve; allowed only outside changesets.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Merge-update.
    Patch,
    /// Remove.
    Delete,
}

impl Method {
    /// Canonical wire form of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether this is a retrieve (GET) request.
    #[must_use]
    pub fn is_retrieve(self) -> bool { matches!(self, Method::Get) }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One request destined for a batch part.
#[derive(Clone, Debug)]
pub struct BatchRequest {
    method: Method,
    target: String,
    headers: Headers,
    body: Bytes,
}

impl BatchRequest {
    /// Create a request with the given method and target URI.
    ///
    /// The target may be relative to the service root or absolute, per the
    /// protocol rules for batch parts.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(target: impl Into<String>) -> Self { Self::new(Method::Get, target) }

    /// Shorthand for a POST request.
    pub fn post(target: impl Into<String>) -> Self { Self::new(Method::Post, target) }

    /// Shorthand for a PUT request.
    pub fn put(target: impl Into<String>) -> Self { Self::new(Method::Put, target) }

    /// Shorthand for a PATCH request.
    pub fn patch(target: impl Into<String>) -> Self { Self::new(Method::Patch, target) }

    /// Shorthand for a DELETE request.
    pub fn delete(target: impl Into<String>) -> Self { Self::new(Method::Delete, target) }

    /// Append a header to the serialized request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a request body. `Content-Length` is added on serialization
    /// when not already present.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> Method { self.method }

    /// The target URI.
    #[must_use]
    pub fn target(&self) -> &str { &self.target }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// The request body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> &Bytes { &self.body }

    /// Stream the raw `application/http` form: method line, headers, blank
    /// line, body.
    pub(crate) async fn write_raw<W>(&self, streamer: &mut PartStreamer<W>) -> Result<(), BatchError>
    where
        W: AsyncWrite + Unpin,
    {
        streamer
            .write_line(&format!("{} {} HTTP/1.1", self.method, self.target))
            .await?;
        for (name, value) in self.headers.iter() {
            streamer.write_header(name, value).await?;
        }
        if !self.body.is_empty() && !self.headers.contains(CONTENT_LENGTH) {
            streamer
                .write_header(CONTENT_LENGTH, &self.body.len().to_string())
                .await?;
        }
        streamer.write_blank_line().await?;
        if !self.body.is_empty() {
            streamer.write_raw(&self.body).await?;
            streamer.write_blank_line().await?;
        }
        Ok(())
    }
}
