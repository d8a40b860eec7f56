//! Metric helpers for `batchwire`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics`
//! feature disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use ::metrics::counter;

/// Name of the counter tracking batches handed to the transport.
pub const BATCHES_SENT: &str = "batchwire_batches_sent_total";
/// Name of the counter tracking request parts written to batch bodies.
pub const PARTS_WRITTEN: &str = "batchwire_parts_written_total";
/// Name of the counter tracking response parts parsed from batch responses.
pub const PARTS_PARSED: &str = "batchwire_parts_parsed_total";
/// Name of the counter tracking multipart framing errors.
pub const PARSE_ERRORS: &str = "batchwire_parse_errors_total";

/// Record a batch body handed to the transport.
pub fn inc_batches_sent() {
    #[cfg(feature = "metrics")]
    counter!(BATCHES_SENT).increment(1);
}

/// Record a request part written to a batch body.
pub fn inc_parts_written() {
    #[cfg(feature = "metrics")]
    counter!(PARTS_WRITTEN).increment(1);
}

/// Record a response part parsed from a batch response.
pub fn inc_parts_parsed() {
    #[cfg(feature = "metrics")]
    counter!(PARTS_PARSED).increment(1);
}

/// Record a multipart framing error.
pub fn inc_parse_errors() {
    #[cfg(feature = "metrics")]
    counter!(PARSE_ERRORS).increment(1);
}
