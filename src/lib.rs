#![doc(html_root_url = "https://docs.rs/batchwire/latest")]
//! Building blocks for OData `multipart/mixed` batch requests and
//! responses.
//!
//! This crate assembles many independent OData operations into a single
//! batch body, including atomic changeset groups, streams it to a
//! pluggable HTTP transport, and parses the multipart response back into
//! per-operation results with partial-failure semantics.

pub mod batch;
pub mod boundary;
pub mod config;
pub mod error;
pub mod headers;
pub mod metrics;
pub mod request;
pub mod response;
pub mod slot;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{Batch, BatchWriter, ChangesetWriter, PartStreamer};
pub use boundary::{BoundaryLine, BoundaryToken};
pub use config::{BatchConfig, ErrorPolicy};
pub use error::{BatchError, ProtocolError, Result};
pub use headers::Headers;
pub use request::{BatchRequest, Method};
pub use response::{BatchResponse, ItemState, PartResponse, ResponseItem, ResponseItems};
pub use slot::{ExpectedItems, ResponseSlot};
pub use transport::{BatchTransport, BodyStream, TransportRequest, TransportResponse};
