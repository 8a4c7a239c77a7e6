#[cfg(feature = "logger")]
/// This module provides a writer that logs every decoded record.
pub mod logger;

#[cfg(feature = "rdbc-sqlite")]
/// This module provides a relational writer backed by SQLite.
pub mod rdbc;

/// This module provides the writer extracting binary message parts to files.
pub mod attachment;

/// Payload and recipient-list encodings shared by the writers.
pub mod payload;

/// This module provides tab-separated table writers.
pub mod tsv;

/// This module provides the streaming backup decoder.
pub mod xml;
