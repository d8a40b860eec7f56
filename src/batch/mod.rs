//! Outgoing batch assembly: builders and framing.

pub mod builder;
pub mod changeset;
pub mod streamer;

pub use builder::{Batch, BatchWriter};
pub use changeset::ChangesetWriter;
pub use streamer::PartStreamer;
