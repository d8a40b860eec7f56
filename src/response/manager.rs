//! Batch response handle and the flat response-item iterator.
//!
//! `BatchResponse` is what `send` returns; `ResponseItems` drives the
//! single-pass parse over the response body, lending out one
//! [`ResponseItem`] at a time in the exact order the request items were
//! added.

use bytes::Bytes;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use super::{
    item::{
        ChangesetProgress,
        ItemState,
        SingleProgress,
        Terminator,
        parse_part_headers,
        parse_status_block,
        read_body_until,
        read_header_block,
        skip_to_boundary,
    },
    line_reader::LineReader,
    part::PartResponse,
};
use crate::{
    boundary::{BoundaryLine, BoundaryToken},
    config::{BatchConfig, ErrorPolicy},
    error::{BatchError, ProtocolError},
    headers::{
        APPLICATION_HTTP,
        CONTENT_ID,
        CONTENT_TYPE,
        Headers,
        MULTIPART_MIXED,
        boundary_parameter,
        is_media_type,
    },
    metrics,
    slot::{ExpectedItem, ExpectedItems},
    transport::{BodyStream, TransportResponse},
};

/// The response to one batch call.
///
/// Holds the transport response plus the expected-item plan recorded while
/// the batch was built. Nothing is parsed until [`into_items`] is called;
/// the body is consumed lazily from there.
///
/// [`into_items`]: Self::into_items
pub struct BatchResponse {
    status: u16,
    headers: Headers,
    body: BodyStream,
    expected: ExpectedItems,
    config: BatchConfig,
}

impl std::fmt::Debug for BatchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("expected", &self.expected.len())
            .finish_non_exhaustive()
    }
}

impl BatchResponse {
    pub(crate) fn new(
        response: TransportResponse,
        expected: ExpectedItems,
        config: BatchConfig,
    ) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            expected,
            config,
        }
    }

    /// Status of the outer `$batch` response.
    #[must_use]
    pub fn status(&self) -> u16 { self.status }

    /// Headers of the outer `$batch` response.
    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Begin consuming the multipart body.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolError::MissingBoundary`] when the response
    /// content type carries no multipart boundary (including non-multipart
    /// error responses to the outer request).
    pub fn into_items(self) -> Result<ResponseItems<BodyStream>, BatchError> {
        let content_type = self.headers.get(CONTENT_TYPE).unwrap_or("").to_owned();
        let Some(boundary) = boundary_parameter(&content_type) else {
            return Err(ProtocolError::MissingBoundary { content_type }.into());
        };
        let boundary = BoundaryToken::from_value(boundary);
        debug!(status = self.status, boundary = %boundary, "parsing batch response");
        Ok(ResponseItems::new(
            self.body,
            boundary,
            self.expected,
            &self.config,
        ))
    }
}

/// Where the manager stands in the response stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    /// Nothing consumed; the preamble and first boundary are ahead.
    Start,
    /// A top-level delimiter was consumed; part headers follow.
    PendingPart,
    /// Inside the current item's part.
    InItem,
    /// The closing delimiter was consumed.
    Finished,
    /// `close()` drained the stream.
    Closed,
}

/// Flat forward iterator over top-level response items, in request order.
#[derive(Debug)]
pub struct ResponseItems<R> {
    reader: LineReader<R>,
    boundary: BoundaryToken,
    expected: ExpectedItems,
    policy: ErrorPolicy,
    max_headers: usize,
    cursor: Cursor,
}

impl<R: AsyncRead + Unpin> ResponseItems<R> {
    /// Drive a parse over `body`, delimited by `boundary`, against the
    /// expected items recorded at build time.
    #[must_use]
    pub fn new(
        body: R,
        boundary: BoundaryToken,
        expected: ExpectedItems,
        config: &BatchConfig,
    ) -> Self {
        Self {
            reader: LineReader::new(body, config.max_line_length),
            boundary,
            expected,
            policy: config.policy,
            max_headers: config.max_part_headers,
            cursor: Cursor::Start,
        }
    }

    /// Number of expected items not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize { self.expected.len() }

    /// Advance to the next response item.
    ///
    /// The returned item borrows this manager; an item dropped before its
    /// responses were fully consumed is skipped on the next call.
    ///
    /// # Errors
    ///
    /// Fails with a [`ProtocolError`] on framing violations, including a
    /// response part with no matching request item.
    pub async fn next_item(&mut self) -> Result<Option<ResponseItem<'_, R>>, BatchError> {
        loop {
            match self.cursor {
                Cursor::Finished | Cursor::Closed => return Ok(None),
                Cursor::PendingPart => break,
                Cursor::Start | Cursor::InItem => {
                    match skip_to_boundary(&mut self.reader, &self.boundary).await? {
                        BoundaryLine::Delimiter => self.cursor = Cursor::PendingPart,
                        BoundaryLine::Closing => {
                            self.cursor = Cursor::Finished;
                            if !self.expected.is_empty() {
                                warn!(
                                    missing = self.expected.len(),
                                    "batch response closed with unanswered items"
                                );
                            }
                            return Ok(None);
                        }
                    }
                }
            }
        }

        let Some(expected) = self.expected.items.pop_front() else {
            metrics::inc_parse_errors();
            return Err(ProtocolError::UnexpectedPart.into());
        };
        let block = read_header_block(&mut self.reader).await?;
        let part_headers = parse_part_headers(&block, self.max_headers)?;
        self.cursor = Cursor::InItem;

        let kind = match expected {
            ExpectedItem::Single(slot) => {
                let content_type = part_headers.get(CONTENT_TYPE).unwrap_or("");
                if is_media_type(content_type, MULTIPART_MIXED) {
                    metrics::inc_parse_errors();
                    return Err(ProtocolError::PartKindMismatch {
                        expected: APPLICATION_HTTP,
                        found: content_type.to_owned(),
                    }
                    .into());
                }
                ItemKind::Single(SingleProgress {
                    slot,
                    yielded: false,
                })
            }
            ExpectedItem::Changeset { slots } => {
                let content_type = part_headers.get(CONTENT_TYPE).unwrap_or("");
                let Some(nested) = boundary_parameter(content_type) else {
                    metrics::inc_parse_errors();
                    return Err(ProtocolError::MissingBoundary {
                        content_type: content_type.to_owned(),
                    }
                    .into());
                };
                ItemKind::Changeset(ChangesetProgress {
                    slots,
                    nested: BoundaryToken::from_value(nested),
                    at_sub_part: false,
                    nested_closed: false,
                    done: false,
                })
            }
        };
        Ok(Some(ResponseItem {
            items: self,
            kind,
            state: ItemState::NotStarted,
        }))
    }

    /// Force-close the response: drain the remaining stream so the
    /// underlying connection can be returned to a pool, regardless of how
    /// far iteration got.
    ///
    /// # Errors
    ///
    /// Fails with [`BatchError::Io`] if draining the stream fails.
    pub async fn close(&mut self) -> Result<(), BatchError> {
        if self.cursor == Cursor::Closed {
            return Ok(());
        }
        let discarded = self.reader.drain().await?;
        debug!(discarded, "batch response closed");
        self.cursor = Cursor::Closed;
        Ok(())
    }

    fn note_outer(&mut self, kind: BoundaryLine) {
        self.cursor = match kind {
            BoundaryLine::Delimiter => Cursor::PendingPart,
            BoundaryLine::Closing => Cursor::Finished,
        };
    }
}

#[derive(Debug)]
enum ItemKind {
    Single(SingleProgress),
    Changeset(ChangesetProgress),
}

/// One top-level response item, lent out by [`ResponseItems::next_item`].
#[derive(Debug)]
pub struct ResponseItem<'a, R> {
    items: &'a mut ResponseItems<R>,
    kind: ItemKind,
    state: ItemState,
}

impl<R: AsyncRead + Unpin> ResponseItem<'_, R> {
    /// Current iteration state.
    #[must_use]
    pub fn state(&self) -> ItemState { self.state }

    /// Whether this item mirrors a changeset request.
    #[must_use]
    pub fn is_changeset(&self) -> bool { matches!(self.kind, ItemKind::Changeset(_)) }

    /// Next response of this item, or `Ok(None)` when the item is
    /// exhausted or stopped early (`Breaking`).
    ///
    /// # Errors
    ///
    /// Fails with a [`ProtocolError`] on framing violations; upstream HTTP
    /// errors are returned as ordinary responses, never as `Err`.
    pub async fn next_response(&mut self) -> Result<Option<PartResponse>, BatchError> {
        match self.state {
            ItemState::Breaking | ItemState::Closed => return Ok(None),
            ItemState::NotStarted => self.state = ItemState::Iterating,
            ItemState::Iterating => {}
        }
        let step = match &mut self.kind {
            ItemKind::Single(progress) => next_single(self.items, progress).await?,
            ItemKind::Changeset(progress) => next_changeset(self.items, progress).await?,
        };
        match step {
            Some((part, state)) => {
                self.state = state;
                Ok(Some(part))
            }
            None => Ok(None),
        }
    }

    /// Close this item, skipping whatever remains of its part.
    ///
    /// # Errors
    ///
    /// Fails with a [`ProtocolError`] if the stream ends before the
    /// enclosing boundary.
    pub async fn close(&mut self) -> Result<(), BatchError> {
        if self.state != ItemState::Closed && self.items.cursor == Cursor::InItem {
            let kind = skip_to_boundary(&mut self.items.reader, &self.items.boundary).await?;
            self.items.note_outer(kind);
        }
        self.state = ItemState::Closed;
        Ok(())
    }
}

async fn next_single<R>(
    items: &mut ResponseItems<R>,
    progress: &mut SingleProgress,
) -> Result<Option<(PartResponse, ItemState)>, BatchError>
where
    R: AsyncRead + Unpin,
{
    if progress.yielded {
        return Ok(None);
    }
    let block = read_header_block(&mut items.reader).await?;
    let (status, reason, headers) = parse_status_block(&block, items.max_headers)?;
    let (body, terminator) = read_body_until(&mut items.reader, &items.boundary, None).await?;
    if let Terminator::Outer(kind) = terminator {
        items.note_outer(kind);
    }
    progress.yielded = true;
    metrics::inc_parts_parsed();

    if status == 202 {
        debug!(status, "async placeholder item");
        let part = PartResponse::new(status, reason, headers, Bytes::new(), None);
        return Ok(Some((part, ItemState::Breaking)));
    }
    let part = PartResponse::new(status, reason, headers, body, None);
    if part.is_error() {
        warn!(status, "batch item failed");
        return Ok(Some((part, ItemState::Breaking)));
    }
    progress.slot.bind(part.clone())?;
    Ok(Some((part, ItemState::Iterating)))
}

async fn next_changeset<R>(
    items: &mut ResponseItems<R>,
    progress: &mut ChangesetProgress,
) -> Result<Option<(PartResponse, ItemState)>, BatchError>
where
    R: AsyncRead + Unpin,
{
    if progress.done {
        return Ok(None);
    }
    if progress.nested_closed {
        let kind = skip_to_boundary(&mut items.reader, &items.boundary).await?;
        items.note_outer(kind);
        progress.done = true;
        return Ok(None);
    }
    if !progress.at_sub_part {
        loop {
            let Some(line) = items.reader.next_line().await? else {
                return Err(ProtocolError::UnexpectedEof.into());
            };
            if let Some(kind) = progress.nested.match_line(&line) {
                match kind {
                    BoundaryLine::Delimiter => break,
                    BoundaryLine::Closing => {
                        let outer = skip_to_boundary(&mut items.reader, &items.boundary).await?;
                        items.note_outer(outer);
                        progress.done = true;
                        return Ok(None);
                    }
                }
            } else if let Some(kind) = items.boundary.match_line(&line) {
                warn!("changeset part ended without a nested closing delimiter");
                items.note_outer(kind);
                progress.done = true;
                return Ok(None);
            }
        }
    }
    progress.at_sub_part = false;

    let framing_block = read_header_block(&mut items.reader).await?;
    let framing_headers = parse_part_headers(&framing_block, items.max_headers)?;
    let status_block = read_header_block(&mut items.reader).await?;
    let (status, reason, headers) = parse_status_block(&status_block, items.max_headers)?;

    // Servers differ in whether Content-ID sits on the framing headers or
    // the embedded response; first match wins.
    let content_id = framing_headers
        .get(CONTENT_ID)
        .or_else(|| headers.get(CONTENT_ID))
        .map(|id| id.trim().to_owned());

    let (body, terminator) =
        read_body_until(&mut items.reader, &items.boundary, Some(&progress.nested)).await?;
    match terminator {
        Terminator::Nested(BoundaryLine::Delimiter) => progress.at_sub_part = true,
        Terminator::Nested(BoundaryLine::Closing) => progress.nested_closed = true,
        Terminator::Outer(kind) => {
            warn!("changeset part ended without a nested closing delimiter");
            items.note_outer(kind);
            progress.done = true;
        }
    }
    metrics::inc_parts_parsed();
    let part = PartResponse::new(status, reason, headers, body, content_id.clone());

    match content_id.as_ref().and_then(|id| progress.slots.remove(id)) {
        Some(slot) => slot.bind(part.clone())?,
        None => {
            if !items.policy.tolerates_unresolved() {
                metrics::inc_parse_errors();
                return Err(ProtocolError::UnresolvedContentId { found: content_id }.into());
            }
            warn!(
                content_id = ?part.content_id(),
                status,
                "unresolved changeset part tolerated under continue-on-error"
            );
        }
    }

    if part.is_error() {
        warn!(
            status,
            content_id = ?part.content_id(),
            "changeset member failed; remaining members are not consumed"
        );
        return Ok(Some((part, ItemState::Breaking)));
    }
    Ok(Some((part, ItemState::Iterating)))
}
