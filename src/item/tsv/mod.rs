/// Tab-delimited output.
///
/// One table per record kind (`sms.tsv`, `mms.tsv`, `calls.tsv`) with a
/// fixed column order, plus the derived contact directory (`contacts.tsv`).
/// Cells are written unquoted; characters that would break the table are
/// escaped instead.
pub mod contacts_writer;
pub mod tsv_writer;

pub use contacts_writer::{write_contacts, write_contacts_to_path};
pub use tsv_writer::{Truncate, TsvWriter, TsvWriterBuilder};
