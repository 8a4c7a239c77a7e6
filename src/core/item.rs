use log::{debug, error};

use crate::diagnostics::Diagnostics;
use crate::error::BackupResult;
use crate::model::{BackupInfo, Record};

/// A consumer of decoded records producing one output artifact.
///
/// A writer is used for exactly one backup file at a time:
///
/// 1. [`open`](RecordWriter::open) once, with the file's root metadata,
/// 2. [`write`](RecordWriter::write) once per record, in document order,
/// 3. [`close`](RecordWriter::close) after the last record, or
///    [`abort`](RecordWriter::abort) as soon as anything upstream failed.
///
/// Writers never see each other. Interior mutability keeps the methods on
/// `&self` so a single writer can sit in a [`CompositeWriter`] next to others.
pub trait RecordWriter {
    /// A short name used in logs and in [`BackupError::Sink`](crate::error::BackupError::Sink).
    fn name(&self) -> &str;

    fn open(&self, _info: &BackupInfo) -> BackupResult<()> {
        Ok(())
    }

    fn write(&self, record: &Record) -> BackupResult<()>;

    /// Clean completion: flush or commit.
    fn close(&self) -> BackupResult<()> {
        Ok(())
    }

    /// Upstream failure: roll back, or cut output back to the last whole row.
    fn abort(&self) -> BackupResult<()> {
        Ok(())
    }

    /// Non-fatal problems met since the last call, drained by the step after
    /// the writer was closed or aborted.
    fn take_diagnostics(&self) -> Diagnostics {
        Diagnostics::new()
    }
}

/// Fans every record out to its writers, in registration order.
///
/// The first failing writer stops the fan-out; writers after it do not see
/// the record.
#[derive(Default)]
pub struct CompositeWriter<'a> {
    writers: Vec<&'a dyn RecordWriter>,
}

impl<'a> CompositeWriter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, writer: &'a dyn RecordWriter) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn push(&mut self, writer: &'a dyn RecordWriter) {
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Aborts every writer, even when some of them fail to abort.
    ///
    /// Returns the first abort error, if any.
    pub fn abort_all(&self) -> BackupResult<()> {
        let mut first_error = None;
        for writer in &self.writers {
            if let Err(err) = writer.abort() {
                error!("Writer {} failed to abort: {}", writer.name(), err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl RecordWriter for CompositeWriter<'_> {
    fn name(&self) -> &str {
        "composite"
    }

    fn open(&self, info: &BackupInfo) -> BackupResult<()> {
        for writer in &self.writers {
            debug!("Opening writer {}", writer.name());
            writer.open(info)?;
        }
        Ok(())
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        for writer in &self.writers {
            writer.write(record)?;
        }
        Ok(())
    }

    /// Closes in registration order and stops at the first failure, leaving
    /// the remaining writers to [`abort_all`](CompositeWriter::abort_all).
    fn close(&self) -> BackupResult<()> {
        for writer in &self.writers {
            debug!("Closing writer {}", writer.name());
            writer.close()?;
        }
        Ok(())
    }

    fn abort(&self) -> BackupResult<()> {
        self.abort_all()
    }

    fn take_diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for writer in &self.writers {
            diagnostics.append(&mut writer.take_diagnostics());
        }
        diagnostics
    }
}
