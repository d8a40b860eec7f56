//! Top-level batch body assembly and submission.
//!
//! [`BatchWriter`] owns the framing state for one outgoing multipart body
//! over any [`AsyncWrite`]; [`Batch`] couples a writer to a
//! [`BatchTransport`] through a bounded in-memory pipe and drives the
//! request/response exchange.

use std::{io, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncWrite, DuplexStream},
    task::JoinHandle,
};
use tracing::debug;

use super::{
    changeset::{ChangesetState, ChangesetWriter},
    streamer::PartStreamer,
};
use crate::{
    boundary::BoundaryToken,
    config::{BatchConfig, ErrorPolicy},
    error::BatchError,
    headers::{
        APPLICATION_HTTP,
        BINARY,
        CONTENT_TRANSFER_ENCODING,
        CONTENT_TYPE,
        CONTINUE_ON_ERROR,
        Headers,
        MULTIPART_MIXED,
        ODATA_VERSION,
        PREFER,
    },
    metrics,
    request::BatchRequest,
    response::BatchResponse,
    slot::{ExpectedItem, ExpectedItems, ResponseSlot},
    transport::{BatchTransport, TransportRequest, TransportResponse},
};

/// Assembles one multipart batch body over an arbitrary writer.
///
/// Items are streamed as they are added; nothing is buffered beyond the
/// underlying writer. The writer is usually one end of the pipe owned by a
/// [`Batch`], but any [`AsyncWrite`] works, which keeps the framing logic
/// testable without a transport.
#[derive(Debug)]
pub struct BatchWriter<W> {
    streamer: PartStreamer<W>,
    boundary: BoundaryToken,
    expected: Vec<ExpectedItem>,
    pending: Option<ChangesetState>,
    config: BatchConfig,
}

impl<W> BatchWriter<W> {
    /// Start a batch body over `writer` with a fresh boundary token.
    pub fn from_writer(writer: W, config: BatchConfig) -> Self {
        Self {
            streamer: PartStreamer::new(writer),
            boundary: BoundaryToken::batch(),
            expected: Vec::new(),
            pending: None,
            config,
        }
    }

    /// The batch boundary token.
    #[must_use]
    pub fn boundary(&self) -> &BoundaryToken { &self.boundary }

    /// The configuration this batch was created with.
    #[must_use]
    pub fn config(&self) -> &BatchConfig { &self.config }

    pub(crate) fn streamer_mut(&mut self) -> &mut PartStreamer<W> { &mut self.streamer }

    pub(crate) fn adopt_changeset(&mut self, state: ChangesetState) { self.pending = Some(state); }
}

impl<W: AsyncWrite + Unpin> BatchWriter<W> {
    /// Add a single retrieve (GET) item.
    ///
    /// Closes any open changeset scope, streams the part, and returns the
    /// placeholder the response parser will bind. The item is closed as
    /// soon as it is written; a bare retrieve cannot receive further
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::RetrieveExpected`] for non-GET requests and
    /// propagates I/O failures from the body pipe.
    pub async fn add_retrieve(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        if !request.method().is_retrieve() {
            return Err(BatchError::RetrieveExpected {
                method: request.method(),
            });
        }
        self.write_single(request).await
    }

    /// Add a single standalone item of any method.
    ///
    /// Non-GET requests added here are *not* atomic with anything else;
    /// use a changeset for atomicity.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the body pipe.
    pub async fn add_request(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        self.write_single(request).await
    }

    /// Open a changeset scope.
    ///
    /// The returned scope mutably borrows this writer, so only one item
    /// can be open at a time by construction. Closes any scope left open
    /// by a previously dropped handle first.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from closing a previously open scope.
    pub async fn begin_changeset(&mut self) -> Result<ChangesetWriter<'_, W>, BatchError> {
        self.close_pending().await?;
        Ok(ChangesetWriter::new(self))
    }

    /// Close the body: finish any open scope, write the closing delimiter,
    /// and flush.
    ///
    /// Returns the expected response items, in request order, and the
    /// underlying writer.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the body pipe.
    pub async fn finish(mut self) -> Result<(ExpectedItems, W), BatchError> {
        self.close_pending().await?;
        self.streamer.write_closing(&self.boundary).await?;
        self.streamer.flush().await?;
        debug!(boundary = %self.boundary, items = self.expected.len(), "batch body closed");
        let expected = ExpectedItems {
            items: self.expected.into_iter().collect(),
        };
        Ok((expected, self.streamer.into_inner()))
    }

    async fn write_single(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        self.close_pending().await?;
        self.streamer.write_boundary(&self.boundary).await?;
        self.streamer.write_header(CONTENT_TYPE, APPLICATION_HTTP).await?;
        self.streamer
            .write_header(CONTENT_TRANSFER_ENCODING, BINARY)
            .await?;
        self.streamer.write_blank_line().await?;
        request.write_raw(&mut self.streamer).await?;
        metrics::inc_parts_written();
        debug!(method = %request.method(), target = request.target(), "queued batch item");

        let slot = ResponseSlot::new();
        self.expected.push(ExpectedItem::Single(slot.clone()));
        Ok(slot)
    }

    /// Close a scope whose handle was dropped without an explicit close.
    async fn close_pending(&mut self) -> Result<(), BatchError> {
        if let Some(state) = self.pending.take() {
            self.finish_changeset(state).await?;
        }
        Ok(())
    }

    pub(crate) async fn finish_changeset(&mut self, state: ChangesetState) -> Result<(), BatchError> {
        if state.last_content_id == 0 {
            // Nothing was streamed; an unused changeset leaves no trace.
            return Ok(());
        }
        self.streamer.write_closing(&state.boundary).await?;
        debug!(
            boundary = %state.boundary,
            requests = state.last_content_id,
            "changeset closed"
        );
        self.expected.push(ExpectedItem::Changeset { slots: state.slots });
        Ok(())
    }
}

/// One batch call against a transport.
///
/// Created with [`Batch::open`], which spawns the transport task and wires
/// the builder to it through a bounded duplex pipe: the caller blocks on
/// writes once the pipe fills, until the transport drains it.
#[derive(Debug)]
pub struct Batch {
    writer: BatchWriter<DuplexStream>,
    task: JoinHandle<io::Result<TransportResponse>>,
}

impl Batch {
    /// Open a batch against `transport`, targeting
    /// `<service_root>/$batch`.
    pub fn open(
        transport: Arc<dyn BatchTransport>,
        service_root: impl Into<String>,
        config: BatchConfig,
    ) -> Self {
        let service_root = service_root.into();
        let (body_tx, body_rx) = tokio::io::duplex(config.pipe_capacity);
        let writer = BatchWriter::from_writer(body_tx, config);

        let mut headers = Headers::new();
        headers.insert(
            CONTENT_TYPE,
            format!("{MULTIPART_MIXED}; boundary={}", writer.boundary()),
        );
        headers.insert(ODATA_VERSION, "4.0");
        if config.policy == ErrorPolicy::Continue {
            headers.insert(PREFER, CONTINUE_ON_ERROR);
        }
        let request = TransportRequest {
            url: format!("{}/$batch", service_root.trim_end_matches('/')),
            headers,
            body: Box::new(body_rx),
        };
        debug!(url = %request.url, boundary = %writer.boundary(), "batch opened");
        let task = tokio::spawn(async move { transport.execute(request).await });
        Self { writer, task }
    }

    /// The batch boundary token.
    #[must_use]
    pub fn boundary(&self) -> &BoundaryToken { self.writer.boundary() }

    /// Add a single retrieve (GET) item. See [`BatchWriter::add_retrieve`].
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::RetrieveExpected`] for non-GET requests and
    /// propagates I/O failures from the body pipe.
    pub async fn add_retrieve(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        self.writer.add_retrieve(request).await
    }

    /// Add a single standalone item of any method. See
    /// [`BatchWriter::add_request`].
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the body pipe.
    pub async fn add_request(&mut self, request: BatchRequest) -> Result<ResponseSlot, BatchError> {
        self.writer.add_request(request).await
    }

    /// Open a changeset scope. See [`BatchWriter::begin_changeset`].
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from closing a previously open scope.
    pub async fn begin_changeset(
        &mut self,
    ) -> Result<ChangesetWriter<'_, DuplexStream>, BatchError> {
        self.writer.begin_changeset().await
    }

    /// Close the body, hand it to the transport, and wait up to `timeout`
    /// for the response headers.
    ///
    /// Consuming `self` makes adding items after submission a compile
    /// error rather than a runtime illegal-state failure.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Timeout`] if the transport does not respond
    /// in time (the transport task is cancelled; no partial response is
    /// returned), or [`BatchError::Io`] for transport failures.
    pub async fn send(self, timeout: Duration) -> Result<BatchResponse, BatchError> {
        let Batch { writer, mut task } = self;
        let config = *writer.config();
        let (expected, mut body) = writer.finish().await?;
        tokio::io::AsyncWriteExt::shutdown(&mut body).await?;
        drop(body);
        metrics::inc_batches_sent();

        match tokio::time::timeout(timeout, &mut task).await {
            Err(_) => {
                task.abort();
                Err(BatchError::Timeout { timeout })
            }
            Ok(Err(join_error)) => Err(BatchError::Io(io::Error::other(join_error))),
            Ok(Ok(Err(io_error))) => Err(BatchError::Io(io_error)),
            Ok(Ok(Ok(response))) => Ok(BatchResponse::new(response, expected, config)),
        }
    }
}
