/// Relational output.
///
/// Messages are stored in three tables, `sms`, `mms` and `mms_parts`, with a
/// `mms_view` joining a message to its parts. The recipient list of a
/// multi-recipient message is kept as a JSON array in `mms.addresses_joined`,
/// and attachment payloads are stored decoded in `mms_parts.raw_data`.
pub mod sqlite_writer;

pub use sqlite_writer::{SqliteWriter, SqliteWriterBuilder};
