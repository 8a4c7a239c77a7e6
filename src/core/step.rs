use std::{
    cell::Cell,
    io::Read,
    time::{Duration, Instant},
};

use log::{debug, error, info};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{BackupError, BackupResult};
use crate::item::xml::{BackupReader, BackupReaderBuilder, Handler, HandlerSet, RecordCounts};
use crate::model::{BackupInfo, BackupKind, Call, Mms, Record, RecordKind, Sms};

use super::build_name;
use super::item::{CompositeWriter, RecordWriter};

/// Consulted after every record has reached all writers.
pub trait ProgressListener {
    /// Returns `false` to cancel the import of the current file.
    fn on_record(&self, kind: RecordKind, processed: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Error,
    Cancelled,
}

/// Outcome of importing one backup file.
#[derive(Debug)]
pub struct StepResult {
    pub name: String,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    pub status: StepStatus,
    /// Root metadata, when the file got far enough to be opened.
    pub info: Option<BackupInfo>,
    /// Records that reached every writer.
    pub counts: RecordCounts,
    pub expected_count: Option<u64>,
    pub diagnostics: Diagnostics,
    pub error: Option<BackupError>,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Imports one backup file through a chain of writers.
///
/// The decoder runs in push mode: every record is handed to each writer, then
/// to the progress listener, before the next element is scanned. Writers are
/// closed once the whole file went through; on any error they are all aborted.
pub struct ImportStep<'a> {
    name: String,
    kind: BackupKind,
    capacity: Option<usize>,
    writers: CompositeWriter<'a>,
    listener: Option<&'a dyn ProgressListener>,
}

impl<'a> ImportStep<'a> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BackupKind {
        self.kind
    }

    pub fn execute<R: Read>(&self, source: R) -> StepResult {
        let start = Instant::now();
        info!("Start of step: {} ({} backup)", self.name, self.kind);

        let processed = Cell::new(RecordCounts::default());
        let mut diagnostics = Diagnostics::new();
        let mut info = None;

        let outcome = self.open_reader(source).and_then(|mut reader| {
            info = Some(reader.info().clone());
            let outcome = self.run(&mut reader, &processed);
            diagnostics.append(&mut reader.take_diagnostics());
            diagnostics.append(&mut self.writers.take_diagnostics());
            outcome.map(|()| reader.decoded())
        });

        let counts = processed.get();
        let expected_count = info.as_ref().and_then(BackupInfo::expected_count);

        let (status, error) = match outcome {
            Ok(decoded) => {
                if let Some(info) = &info {
                    check_count(info, decoded.total(), &mut diagnostics);
                }
                (StepStatus::Success, None)
            }
            Err(err) => {
                error!("Step {} failed: {}", self.name, err);
                let status = match err {
                    BackupError::Cancelled(_) => StepStatus::Cancelled,
                    _ => StepStatus::Error,
                };
                (status, Some(err))
            }
        };

        info!(
            "End of step: {}, sms: {}, mms: {}, calls: {}",
            self.name, counts.sms, counts.mms, counts.calls
        );

        StepResult {
            name: self.name.clone(),
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            status,
            info,
            counts,
            expected_count,
            diagnostics,
            error,
        }
    }

    fn open_reader<R: Read>(&self, source: R) -> BackupResult<BackupReader<R>> {
        let mut builder = BackupReaderBuilder::new().expect(self.kind);
        if let Some(capacity) = self.capacity {
            builder = builder.capacity(capacity);
        }
        builder.from_reader(source)
    }

    /// Opens the writers, streams the records and closes or aborts the writers.
    fn run<R: Read>(
        &self,
        reader: &mut BackupReader<R>,
        processed: &Cell<RecordCounts>,
    ) -> BackupResult<()> {
        let result = self
            .writers
            .open(reader.info())
            .and_then(|()| self.stream(reader, processed))
            .and_then(|()| self.writers.close());

        if let Err(err) = result {
            debug!("Aborting writers of step {}", self.name);
            if let Err(abort_err) = self.writers.abort_all() {
                error!("Step {} could not abort cleanly: {}", self.name, abort_err);
            }
            return Err(err);
        }
        Ok(())
    }

    fn stream<R: Read>(
        &self,
        reader: &mut BackupReader<R>,
        processed: &Cell<RecordCounts>,
    ) -> BackupResult<()> {
        let accept = |record: Record| self.accept(record, processed);

        let handlers = match self.kind {
            BackupKind::Messages => HandlerSet::messages(
                Handler::push(|sms: Sms| accept(Record::Sms(sms))),
                Handler::push(|mms: Mms| accept(Record::Mms(mms))),
            )?,
            BackupKind::Calls => {
                HandlerSet::calls(Handler::push(|call: Call| accept(Record::Call(call))))?
            }
        };

        reader.decode(handlers)?;
        Ok(())
    }

    fn accept(&self, record: Record, processed: &Cell<RecordCounts>) -> BackupResult<()> {
        let kind = record.kind();
        self.writers.write(&record)?;

        let mut counts = processed.get();
        counts.add(kind);
        processed.set(counts);

        if let Some(listener) = self.listener
            && !listener.on_record(kind, counts.total())
        {
            info!("Step {} cancelled after {} records", self.name, counts.total());
            return Err(BackupError::Cancelled(counts.total()));
        }
        Ok(())
    }
}

fn check_count(info: &BackupInfo, decoded: usize, diagnostics: &mut Diagnostics) {
    let Some(raw) = info.count.as_deref() else {
        return;
    };

    match info.expected_count() {
        Some(expected) if expected == decoded as u64 => {
            debug!("Record count matches the expected {}", expected);
        }
        Some(expected) => diagnostics.push(
            DiagnosticKind::CountMismatch,
            format!("expected {} records but decoded {}", expected, decoded),
        ),
        None => diagnostics.push(
            DiagnosticKind::CountMismatch,
            format!("unparseable count {:?}, decoded {} records", raw, decoded),
        ),
    }
}

pub struct StepBuilder<'a> {
    name: Option<String>,
    kind: BackupKind,
    capacity: Option<usize>,
    writers: CompositeWriter<'a>,
    listener: Option<&'a dyn ProgressListener>,
}

impl<'a> StepBuilder<'a> {
    pub fn new(kind: BackupKind) -> StepBuilder<'a> {
        Self {
            name: None,
            kind,
            capacity: None,
            writers: CompositeWriter::new(),
            listener: None,
        }
    }

    pub fn name(mut self, name: String) -> StepBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Read buffer capacity handed to the decoder.
    pub fn capacity(mut self, capacity: usize) -> StepBuilder<'a> {
        self.capacity = Some(capacity);
        self
    }

    /// Adds a writer; records reach writers in the order they were added.
    ///
    /// Writers are closed in the same order and a failed close aborts the
    /// rest, so a transactional writer belongs after the ones whose close can
    /// fail.
    pub fn writer(mut self, writer: &'a dyn RecordWriter) -> StepBuilder<'a> {
        self.writers.push(writer);
        self
    }

    pub fn listener(mut self, listener: &'a dyn ProgressListener) -> StepBuilder<'a> {
        self.listener = Some(listener);
        self
    }

    /// Fails when no writer was registered: such a step can never produce output.
    pub fn build(self) -> BackupResult<ImportStep<'a>> {
        if self.writers.is_empty() {
            return Err(BackupError::Configuration(
                "an import step needs at least one writer".to_string(),
            ));
        }

        Ok(ImportStep {
            name: self.name.unwrap_or_else(build_name),
            kind: self.kind,
            capacity: self.capacity,
            writers: self.writers,
            listener: self.listener,
        })
    }
}
