//! Extraction of binary message parts to standalone files.

pub mod attachment_writer;
pub mod naming;

pub use attachment_writer::{AttachmentStats, AttachmentWriter, AttachmentWriterBuilder};
