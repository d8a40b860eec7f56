//! Shared helpers for integration tests: a canned transport and multipart
//! response payload builders.

use std::{io, sync::Mutex, time::Duration};

use async_trait::async_trait;
use batchwire::{BatchTransport, Headers, TransportRequest, TransportResponse};
use tokio::io::AsyncReadExt;

/// Install a fmt subscriber once so `RUST_LOG`-style debugging works in
/// tests; repeated calls are no-ops.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// The request a [`MockTransport`] saw, captured for assertions.
#[derive(Clone, Debug)]
pub struct Captured {
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Transport double: drains the request body, optionally sleeps, then
/// serves a canned multipart response.
pub struct MockTransport {
    status: u16,
    boundary: String,
    payload: Vec<u8>,
    delay: Option<Duration>,
    captured: Mutex<Option<Captured>>,
}

impl MockTransport {
    pub fn multipart(boundary: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            boundary: boundary.to_owned(),
            payload: payload.into(),
            delay: None,
            captured: Mutex::new(None),
        }
    }

    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The captured request; panics when `execute` never ran.
    #[allow(dead_code)]
    pub fn captured(&self) -> Captured {
        self.captured
            .lock()
            .expect("captured lock")
            .clone()
            .expect("transport was never driven")
    }
}

#[async_trait]
impl BatchTransport for MockTransport {
    async fn execute(&self, mut request: TransportRequest) -> io::Result<TransportResponse> {
        let mut body = Vec::new();
        request.body.read_to_end(&mut body).await?;
        *self.captured.lock().expect("captured lock") = Some(Captured {
            url: request.url,
            headers: request.headers,
            body,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut headers = Headers::new();
        headers.insert(
            "Content-Type",
            format!("multipart/mixed; boundary={}", self.boundary),
        );
        Ok(TransportResponse {
            status: self.status,
            headers,
            body: Box::new(io::Cursor::new(self.payload.clone())),
        })
    }
}

/// Builds multipart response payloads with canonical CRLF framing.
pub struct MultipartBody {
    boundary: String,
    out: String,
}

#[allow(dead_code)]
impl MultipartBody {
    pub fn new(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_owned(),
            out: String::new(),
        }
    }

    pub fn single(mut self, status: u16, reason: &str, body: &str) -> Self {
        self.out.push_str(&format!(
            "--{}\r\nContent-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n\r\n",
            self.boundary
        ));
        self.out
            .push_str(&format!("HTTP/1.1 {status} {reason}\r\n\r\n"));
        if !body.is_empty() {
            self.out.push_str(body);
            self.out.push_str("\r\n");
        }
        self
    }

    /// A changeset part; each member is `(content_id, status, reason, body)`.
    pub fn changeset(mut self, nested: &str, members: &[(&str, u16, &str, &str)]) -> Self {
        self.out.push_str(&format!(
            "--{}\r\nContent-Type: multipart/mixed; boundary={nested}\r\n\r\n",
            self.boundary
        ));
        for (content_id, status, reason, body) in members {
            self.out.push_str(&format!(
                "--{nested}\r\nContent-Type: application/http\r\n\
                 Content-Transfer-Encoding: binary\r\nContent-ID: {content_id}\r\n\r\n"
            ));
            self.out
                .push_str(&format!("HTTP/1.1 {status} {reason}\r\n\r\n"));
            if !body.is_empty() {
                self.out.push_str(body);
                self.out.push_str("\r\n");
            }
        }
        self.out.push_str(&format!("--{nested}--\r\n"));
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.out.push_str(&format!("--{}--\r\n", self.boundary));
        self.out.into_bytes()
    }
}
