use thiserror::Error;

#[derive(Error, Debug)]
/// Fatal errors raised while importing one backup file.
///
/// Every variant aborts the current file only: a [`BatchJob`](crate::core::job::BatchJob)
/// records the failure and moves on to the next file. Non-fatal problems are
/// reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
pub enum BackupError {
    /// No recognized root element, wrong backup kind, or an unreadable stream.
    #[error("Structural error: {0}")]
    Structural(String),

    /// Malformed XML encountered while scanning or decoding a subtree.
    #[error("Parse error in <{element}> at byte {position}: {message}")]
    Parse {
        element: String,
        position: u64,
        message: String,
    },

    /// A sink failed to accept a record, to commit, or to roll back.
    #[error("Sink {sink} failed: {message}")]
    Sink { sink: String, message: String },

    /// The pipeline was assembled in a way that can never produce output.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A progress listener asked the import to stop.
    #[error("Import cancelled after {0} records")]
    Cancelled(usize),
}

impl BackupError {
    pub(crate) fn sink<S: Into<String>, M: ToString>(sink: S, message: M) -> Self {
        BackupError::Sink {
            sink: sink.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type BackupResult<T> = Result<T, BackupError>;
