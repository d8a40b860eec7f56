//! Single-assignment placeholders correlating requests with responses.
//!
//! A [`ResponseSlot`] is created the moment a request is added to a batch
//! and bound exactly once when the response parser reaches the matching
//! part. "Not yet available" is an explicit, checkable state rather than a
//! mutable object silently filled in later.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, OnceLock},
};

use crate::{error::BatchError, response::PartResponse};

/// A cloneable single-assignment cell holding one part response.
#[derive(Clone, Debug, Default)]
pub struct ResponseSlot {
    cell: Arc<OnceLock<PartResponse>>,
}

impl ResponseSlot {
    pub(crate) fn new() -> Self { Self::default() }

    /// The bound response, or `None` while the batch response has not been
    /// parsed up to this part.
    #[must_use]
    pub fn get(&self) -> Option<&PartResponse> { self.cell.get() }

    /// Whether a response has been bound.
    #[must_use]
    pub fn is_bound(&self) -> bool { self.cell.get().is_some() }

    /// Bind the response. Binding twice is a protocol-level defect and
    /// fails without replacing the first assignment.
    pub(crate) fn bind(&self, response: PartResponse) -> Result<(), BatchError> {
        let content_id = response.content_id().map(str::to_owned);
        self.cell
            .set(response)
            .map_err(|_| BatchError::SlotAlreadyBound { content_id })
    }
}

/// One expected top-level response item, mirroring a request item.
#[derive(Debug)]
pub(crate) enum ExpectedItem {
    /// A single request part with its placeholder.
    Single(ResponseSlot),
    /// A changeset part with placeholders keyed by content-id string.
    Changeset {
        slots: HashMap<String, ResponseSlot>,
    },
}

/// Ordered expected response items for one sent batch.
///
/// Produced by the batch writer when the body is finished and consumed by
/// the response manager to correlate parts in request order.
#[derive(Debug, Default)]
pub struct ExpectedItems {
    pub(crate) items: VecDeque<ExpectedItem>,
}

impl ExpectedItems {
    /// Number of top-level items awaiting responses.
    #[must_use]
    pub fn len(&self) -> usize { self.items.len() }

    /// Whether no items await responses.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}
