//! Test-only helpers for building multipart response fixtures.

use std::{
    collections::HashMap,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, ReadBuf};

use crate::slot::{ExpectedItem, ExpectedItems, ResponseSlot};

/// Builds multipart response bodies with canonical CRLF framing.
pub(crate) struct MultipartPayload {
    boundary: String,
    out: String,
}

/// One changeset sub-part in a fixture payload.
pub(crate) struct SubPart<'a> {
    pub content_id: Option<&'a str>,
    /// Place `Content-ID` on the framing headers (`true`) or on the
    /// embedded response headers (`false`).
    pub id_on_framing: bool,
    pub status: u16,
    pub reason: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a str,
}

impl<'a> SubPart<'a> {
    pub(crate) fn ok(content_id: &'a str, status: u16, body: &'a str) -> Self {
        Self {
            content_id: Some(content_id),
            id_on_framing: true,
            status,
            reason: "OK",
            headers: &[],
            body,
        }
    }
}

impl MultipartPayload {
    pub(crate) fn new(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_owned(),
            out: String::new(),
        }
    }

    pub(crate) fn single(
        mut self,
        status: u16,
        reason: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Self {
        self.out.push_str(&format!("--{}\r\n", self.boundary));
        self.out
            .push_str("Content-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n\r\n");
        self.out
            .push_str(&format!("HTTP/1.1 {status} {reason}\r\n"));
        for (name, value) in headers {
            self.out.push_str(&format!("{name}: {value}\r\n"));
        }
        self.out.push_str("\r\n");
        if !body.is_empty() {
            self.out.push_str(body);
            self.out.push_str("\r\n");
        }
        self
    }

    pub(crate) fn changeset(mut self, nested: &str, parts: &[SubPart<'_>]) -> Self {
        self.out.push_str(&format!("--{}\r\n", self.boundary));
        self.out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary={nested}\r\n\r\n"
        ));
        for part in parts {
            self.out.push_str(&format!("--{nested}\r\n"));
            self.out.push_str(
                "Content-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n",
            );
            if let (Some(id), true) = (part.content_id, part.id_on_framing) {
                self.out.push_str(&format!("Content-ID: {id}\r\n"));
            }
            self.out.push_str("\r\n");
            self.out
                .push_str(&format!("HTTP/1.1 {} {}\r\n", part.status, part.reason));
            if let (Some(id), false) = (part.content_id, part.id_on_framing) {
                self.out.push_str(&format!("Content-ID: {id}\r\n"));
            }
            for (name, value) in part.headers {
                self.out.push_str(&format!("{name}: {value}\r\n"));
            }
            self.out.push_str("\r\n");
            if !part.body.is_empty() {
                self.out.push_str(part.body);
                self.out.push_str("\r\n");
            }
        }
        self.out.push_str(&format!("--{nested}--\r\n"));
        self
    }

    /// Append raw text verbatim, for deliberately malformed payloads.
    pub(crate) fn raw(mut self, text: &str) -> Self {
        self.out.push_str(text);
        self
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.out.push_str(&format!("--{}--\r\n", self.boundary));
        self.out.into_bytes()
    }
}

/// Expected items for `n` single requests, with the slot handles.
pub(crate) fn expected_singles(n: usize) -> (ExpectedItems, Vec<ResponseSlot>) {
    let slots: Vec<ResponseSlot> = (0..n).map(|_| ResponseSlot::default()).collect();
    let items = slots
        .iter()
        .map(|slot| ExpectedItem::Single(slot.clone()))
        .collect();
    (ExpectedItems { items }, slots)
}

/// Expected items for one changeset keyed by `ids`, with the slot handles.
pub(crate) fn expected_changeset(ids: &[&str]) -> (ExpectedItems, HashMap<String, ResponseSlot>) {
    let slots: HashMap<String, ResponseSlot> = ids
        .iter()
        .map(|id| ((*id).to_owned(), ResponseSlot::default()))
        .collect();
    let items = [ExpectedItem::Changeset {
        slots: slots.clone(),
    }]
    .into_iter()
    .collect();
    (ExpectedItems { items }, slots)
}

/// An `AsyncRead` that serves a fixed buffer in bounded chunks, for
/// exercising reads that straddle buffer boundaries.
pub(crate) struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub(crate) fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk: chunk.max(1),
        }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pos < this.data.len() {
            let take = this
                .chunk
                .min(this.data.len() - this.pos)
                .min(buf.remaining());
            buf.put_slice(&this.data[this.pos..this.pos + take]);
            this.pos += take;
        }
        Poll::Ready(Ok(()))
    }
}
