//! Changeset scopes: atomic groups of non-GET requests.
//!
//! A [`ChangesetWriter`] mutably borrows its [`BatchWriter`], so the
//! "one open item at a time" invariant is enforced by the borrow checker
//! rather than by hidden builder state. Closing consumes the scope; a
//! dropped scope is closed by the batch writer on its next operation.

use tokio::io::AsyncWrite;
use tracing::debug;

use super::builder::BatchWriter;
use crate::{
    boundary::BoundaryToken,
    error::BatchError,
    headers::{
        APPLICATION_HTTP,
        BINARY,
        CONTENT_ID,
        CONTENT_TRANSFER_ENCODING,
        CONTENT_TYPE,
        MULTIPART_MIXED,
    },
    metrics,
    request::BatchRequest,
    slot::ResponseSlot,
};

/// Accumulated state of one changeset scope.
///
/// Lives inside the scope handle while it is open; handed back to the
/// batch writer when the handle is dropped without an explicit close.
#[derive(Debug)]
pub(crate) struct ChangesetState {
    pub(crate) boundary: BoundaryToken,
    pub(crate) last_content_id: u64,
    pub(crate) opened: bool,
    pub(crate) slots: std::collections::HashMap<String, ResponseSlot>,
}

impl ChangesetState {
    pub(crate) fn new() -> Self {
        Self {
            boundary: BoundaryToken::changeset(),
            last_content_id: 0,
            opened: false,
            slots: std::collections::HashMap::new(),
        }
    }
}

/// Open changeset scope borrowing its batch writer.
#[derive(Debug)]
pub struct ChangesetWriter<'a, W> {
    batch: &'a mut BatchWriter<W>,
    state: Option<ChangesetState>,
}

impl<'a, W> ChangesetWriter<'a, W> {
    pub(crate) fn new(batch: &'a mut BatchWriter<W>) -> Self {
        Self {
            batch,
            state: Some(ChangesetState::new()),
        }
    }

    /// The nested boundary token used by this changeset.
    #[must_use]
    pub fn boundary(&self) -> Option<&BoundaryToken> {
        self.state.as_ref().map(|s| &s.boundary)
    }

    /// The most recently assigned content id, used for `$<id>` references
    /// in dependent requests of the same changeset.
    #[must_use]
    pub fn last_content_id(&self) -> Option<u64> {
        self.state
            .as_ref()
            .map(|s| s.last_content_id)
            .filter(|&id| id > 0)
    }
}

impl<W: AsyncWrite + Unpin> ChangesetWriter<'_, W> {
    /// Add one non-GET request to the changeset.
    ///
    /// Assigns the next sequential content id (starting at 1), streams the
    /// nested part, and returns the placeholder the response parser will
    /// bind. The top-level part and its `multipart/mixed` header are
    /// emitted lazily on the first accepted request, so an unused changeset
    /// leaves the body untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::RetrieveInChangeset`] for GET requests, before
    /// any byte is written, and propagates I/O failures from the body pipe.
    pub async fn add_request(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        if request.method().is_retrieve() {
            return Err(BatchError::RetrieveInChangeset);
        }
        let Some(state) = self.state.as_mut() else {
            return Err(BatchError::ChangesetClosed);
        };

        let batch_boundary = self.batch.boundary().clone();
        let streamer = self.batch.streamer_mut();
        if !state.opened {
            streamer.write_boundary(&batch_boundary).await?;
            streamer
                .write_header(
                    CONTENT_TYPE,
                    &format!("{MULTIPART_MIXED}; boundary={}", state.boundary),
                )
                .await?;
            streamer.write_blank_line().await?;
            state.opened = true;
        }

        state.last_content_id += 1;
        let content_id = state.last_content_id;
        streamer.write_boundary(&state.boundary).await?;
        streamer.write_header(CONTENT_TYPE, APPLICATION_HTTP).await?;
        streamer
            .write_header(CONTENT_TRANSFER_ENCODING, BINARY)
            .await?;
        streamer
            .write_header(CONTENT_ID, &content_id.to_string())
            .await?;
        streamer.write_blank_line().await?;
        request.write_raw(streamer).await?;
        metrics::inc_parts_written();
        debug!(
            content_id,
            method = %request.method(),
            target = request.target(),
            "queued changeset request"
        );

        let slot = ResponseSlot::new();
        state.slots.insert(content_id.to_string(), slot.clone());
        Ok(slot)
    }

    /// Close the scope, emitting the nested closing delimiter if and only
    /// if at least one request was streamed.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the body pipe.
    pub async fn close(mut self) -> Result<(), BatchError> {
        match self.state.take() {
            Some(state) => self.batch.finish_changeset(state).await,
            None => Ok(()),
        }
    }
}

impl<W> Drop for ChangesetWriter<'_, W> {
    fn drop(&mut self) {
        // A scope dropped without close() defers its closing delimiter to
        // the batch writer's next operation.
        if let Some(state) = self.state.take() {
            self.batch.adopt_changeset(state);
        }
    }
}
