use std::{
    cell::RefCell,
    io::Read,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use uuid::Uuid;

use crate::contact::{ContactCollector, ContactResolver};
use crate::diagnostics::Diagnostics;
use crate::error::BackupError;
use crate::item::xml::RecordCounts;
use crate::model::BackupKind;

use super::build_name;
use super::item::RecordWriter;
use super::step::{ProgressListener, StepBuilder, StepResult, StepStatus};

/// One backup file handed to a [`BatchJob`].
///
/// The kind is decided by the caller, usually from the file name.
pub struct BackupSource<R> {
    pub name: String,
    pub kind: BackupKind,
    pub reader: R,
}

impl<R: Read> BackupSource<R> {
    pub fn new<S: Into<String>>(name: S, kind: BackupKind, reader: R) -> Self {
        Self {
            name: name.into(),
            kind,
            reader,
        }
    }
}

/// A file whose import failed; the rest of the batch went on without it.
#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub error: BackupError,
}

/// State carried from one file to the next within a batch.
#[derive(Debug, Default)]
pub struct BatchContext {
    /// Records of successfully imported files.
    pub totals: RecordCounts,
    pub succeeded: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub diagnostics: Diagnostics,
    /// Contact directory built from every successful messages file.
    pub contacts: ContactResolver,
}

impl BatchContext {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record(&mut self, mut result: StepResult) {
        self.diagnostics.append(&mut result.diagnostics);
        match result.error {
            None => {
                self.totals.merge(&result.counts);
                self.succeeded.push(result.name);
            }
            Some(error) => self.failures.push(FileFailure {
                name: result.name,
                error,
            }),
        }
    }
}

/// Timing of a finished batch.
#[derive(Debug)]
pub struct JobExecution {
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
}

/// Runs several backup files, one after the other, through the same writers.
///
/// A file that fails is recorded in the [`BatchContext`] and the job moves on
/// to the next one. Writers registered for a kind only see files of that kind.
pub struct BatchJob<'a> {
    id: Uuid,
    name: String,
    message_writers: Vec<&'a dyn RecordWriter>,
    call_writers: Vec<&'a dyn RecordWriter>,
    listener: Option<&'a dyn ProgressListener>,
    capacity: Option<usize>,
    resolve_contacts: bool,
}

impl BatchJob<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn run<R, I>(&self, sources: I) -> (BatchContext, JobExecution)
    where
        R: Read,
        I: IntoIterator<Item = BackupSource<R>>,
    {
        let start = Instant::now();
        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut context = BatchContext::default();
        let resolver = RefCell::new(ContactResolver::new());

        for source in sources {
            let result = self.import(source, &resolver);
            match &result.error {
                None => info!(
                    "Imported {}: {} records in {:?}",
                    result.name,
                    result.counts.total(),
                    result.duration
                ),
                Some(err) if result.status == StepStatus::Cancelled => {
                    warn!("Import of {} cancelled: {}", result.name, err)
                }
                Some(err) => error!("Import of {} failed: {}", result.name, err),
            }
            context.record(result);
        }

        context.contacts = resolver.into_inner();
        let mut contact_diagnostics = context.contacts.take_diagnostics();
        context.diagnostics.append(&mut contact_diagnostics);

        for line in context.diagnostics.summary() {
            info!("Diagnostics of job {}: {}", self.name, line);
        }
        info!(
            "End of job: {}, id: {}, {} file(s) imported, {} failed",
            self.name,
            self.id,
            context.succeeded.len(),
            context.failures.len()
        );

        let execution = JobExecution {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
        };
        (context, execution)
    }

    fn import<R: Read>(
        &self,
        source: BackupSource<R>,
        resolver: &RefCell<ContactResolver>,
    ) -> StepResult {
        let collector = ContactCollector::new(resolver);

        let writers = match source.kind {
            BackupKind::Messages => &self.message_writers,
            BackupKind::Calls => &self.call_writers,
        };

        let mut builder = StepBuilder::new(source.kind).name(source.name.clone());
        for writer in writers {
            builder = builder.writer(*writer);
        }
        if self.resolve_contacts && source.kind == BackupKind::Messages {
            builder = builder.writer(&collector);
        }
        if let Some(listener) = self.listener {
            builder = builder.listener(listener);
        }
        if let Some(capacity) = self.capacity {
            builder = builder.capacity(capacity);
        }

        match builder.build() {
            Ok(step) => step.execute(source.reader),
            Err(err) => failed_before_start(source.name, err),
        }
    }
}

fn failed_before_start(name: String, error: BackupError) -> StepResult {
    let now = Instant::now();
    StepResult {
        name,
        start: now,
        end: now,
        duration: Duration::ZERO,
        status: StepStatus::Error,
        info: None,
        counts: RecordCounts::default(),
        expected_count: None,
        diagnostics: Diagnostics::new(),
        error: Some(error),
    }
}

#[derive(Default)]
pub struct JobBuilder<'a> {
    name: Option<String>,
    message_writers: Vec<&'a dyn RecordWriter>,
    call_writers: Vec<&'a dyn RecordWriter>,
    listener: Option<&'a dyn ProgressListener>,
    capacity: Option<usize>,
    resolve_contacts: bool,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Registers a writer for every file of the given kind.
    pub fn writer(mut self, kind: BackupKind, writer: &'a dyn RecordWriter) -> JobBuilder<'a> {
        match kind {
            BackupKind::Messages => self.message_writers.push(writer),
            BackupKind::Calls => self.call_writers.push(writer),
        }
        self
    }

    pub fn listener(mut self, listener: &'a dyn ProgressListener) -> JobBuilder<'a> {
        self.listener = Some(listener);
        self
    }

    pub fn capacity(mut self, capacity: usize) -> JobBuilder<'a> {
        self.capacity = Some(capacity);
        self
    }

    /// Feeds every successfully imported messages file to the contact resolver.
    pub fn resolve_contacts(mut self, yes: bool) -> JobBuilder<'a> {
        self.resolve_contacts = yes;
        self
    }

    pub fn build(self) -> BatchJob<'a> {
        BatchJob {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            message_writers: self.message_writers,
            call_writers: self.call_writers,
            listener: self.listener,
            capacity: self.capacity,
            resolve_contacts: self.resolve_contacts,
        }
    }
}
