use std::{
    cell::RefCell,
    fs::{self, File},
    io::{self, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use csv::{QuoteStyle, WriterBuilder};
use log::{debug, info, warn};

use crate::core::item::RecordWriter;
use crate::error::{BackupError, BackupResult};
use crate::item::payload::recipients_json;
use crate::model::scalar::optional_text;
use crate::model::text::{clean_cell, remove_commas_before_suffixes};
use crate::model::{BackupKind, Call, Mms, Record, RecordKind, Sms};

pub const SMS_HEADERS: [&str; 14] = [
    "SMS Index #",
    "Protocol",
    "Address",
    "Type",
    "Subject",
    "Body",
    "Service Center",
    "Status",
    "Read",
    "Date",
    "Locked",
    "Date Sent",
    "Readable Date",
    "Contact Name",
];

pub const MMS_HEADERS: [&str; 14] = [
    "MMS Index #",
    "Text Only",
    "Read",
    "Date",
    "Locked",
    "Date Sent",
    "Readable Date",
    "Contact Name",
    "Seen",
    "From Address",
    "Address",
    "Message Classifier",
    "Message Size",
    "Addresses",
];

pub const CALL_HEADERS: [&str; 7] = [
    "Call Index #",
    "Number",
    "Duration (Seconds)",
    "Date",
    "Type",
    "Readable Date",
    "Contact Name",
];

/// Rows accepted between two flushes to the underlying output.
const DEFAULT_FLUSH_INTERVAL: usize = 256;

/// An output that can be cut back to a previous length.
///
/// Used to drop a partially written row after a failed flush.
pub trait Truncate {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

impl Truncate for Vec<u8> {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(io::Error::other)?;
        self.truncate(len);
        Ok(())
    }
}

/// One tab-delimited table: a header followed by one row per record.
///
/// Rows are encoded whole into memory and handed to the output in batches.
/// Only bytes that were flushed successfully count as durable, so an abort
/// can always cut the output back to the last complete row.
struct TsvTable<W: Write + Truncate> {
    name: &'static str,
    out: W,
    encoder: WriterBuilder,
    row: Vec<u8>,
    buffer: Vec<u8>,
    flush_interval: usize,
    rows_written: usize,
    rows_durable: usize,
    bytes_durable: u64,
    /// Set when a flush failed: the output may hold part of a batch.
    torn: bool,
}

impl<W: Write + Truncate> TsvTable<W> {
    /// Writes the header immediately, so even an empty run leaves a valid table.
    fn new(
        name: &'static str,
        out: W,
        headers: &[&str],
        flush_interval: usize,
    ) -> BackupResult<Self> {
        let mut encoder = WriterBuilder::new();
        encoder
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .has_headers(false);

        let mut table = Self {
            name,
            out,
            encoder,
            row: Vec::with_capacity(512),
            buffer: Vec::new(),
            flush_interval: flush_interval.max(1),
            rows_written: 0,
            rows_durable: 0,
            bytes_durable: 0,
            torn: false,
        };

        table.encode(headers.iter().copied())?;
        table.buffer.extend_from_slice(&table.row);
        table.flush()?;
        Ok(table)
    }

    fn encode<'c, I>(&mut self, cells: I) -> BackupResult<()>
    where
        I: IntoIterator<Item = &'c str>,
    {
        self.row.clear();
        let mut wtr = self.encoder.from_writer(&mut self.row);
        wtr.write_record(cells.into_iter().map(str::as_bytes))
            .map_err(|e| BackupError::sink(self.name, e))?;
        wtr.flush().map_err(|e| BackupError::sink(self.name, e))?;
        Ok(())
    }

    /// Appends a row; the leading index cell is assigned here.
    fn append(&mut self, cells: &[String]) -> BackupResult<()> {
        let index = self.rows_written.to_string();
        let cells: Vec<&str> = std::iter::once(index.as_str())
            .chain(cells.iter().map(String::as_str))
            .collect();
        self.encode(cells)?;

        self.buffer.extend_from_slice(&self.row);
        self.rows_written += 1;

        if self.rows_written - self.rows_durable >= self.flush_interval {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> BackupResult<()> {
        if self.torn {
            self.cut_back()?;
        }
        self.torn = true;
        if !self.buffer.is_empty() {
            self.out
                .write_all(&self.buffer)
                .map_err(|e| BackupError::sink(self.name, e))?;
        }
        self.out.flush().map_err(|e| BackupError::sink(self.name, e))?;
        self.torn = false;

        self.bytes_durable += self.buffer.len() as u64;
        self.rows_durable = self.rows_written;
        self.buffer.clear();
        Ok(())
    }

    /// Keeps every complete row, dropping a torn one if the output failed.
    fn abort(&mut self) -> BackupResult<()> {
        if let Err(err) = self.flush() {
            warn!(
                "{}: flush failed during abort ({}), cutting back to row {}",
                self.name, err, self.rows_durable
            );
            self.buffer.clear();
            self.rows_written = self.rows_durable;
            self.cut_back()?;
        }
        Ok(())
    }

    /// Drops whatever reached the output after the last successful flush.
    fn cut_back(&mut self) -> BackupResult<()> {
        self.out
            .truncate_to(self.bytes_durable)
            .map_err(|e| BackupError::sink(self.name, e))?;
        self.torn = false;
        Ok(())
    }

    fn into_inner(self) -> W {
        self.out
    }
}

/// Writes records as tab-delimited tables, one per record kind.
///
/// Every cell is escaped so that a row never spans lines or gains columns.
/// The leading index column counts rows per table from 0, across all files
/// written through the same writer.
pub struct TsvWriter<W: Write + Truncate> {
    sms: Option<RefCell<TsvTable<W>>>,
    mms: Option<RefCell<TsvTable<W>>>,
    calls: Option<RefCell<TsvTable<W>>>,
}

impl<W: Write + Truncate> TsvWriter<W> {
    fn table(&self, kind: RecordKind) -> Option<&RefCell<TsvTable<W>>> {
        match kind {
            RecordKind::Sms => self.sms.as_ref(),
            RecordKind::Mms => self.mms.as_ref(),
            RecordKind::Call => self.calls.as_ref(),
        }
    }

    fn tables(&self) -> impl Iterator<Item = &RefCell<TsvTable<W>>> {
        [&self.sms, &self.mms, &self.calls].into_iter().flatten()
    }

    /// Rows written so far for a record kind, header excluded.
    pub fn rows(&self, kind: RecordKind) -> usize {
        self.table(kind).map_or(0, |table| table.borrow().rows_written)
    }

    /// Returns the outputs as `(sms, mms, calls)`, flushing nothing.
    pub fn into_inner(self) -> (Option<W>, Option<W>, Option<W>) {
        (
            self.sms.map(|table| table.into_inner().into_inner()),
            self.mms.map(|table| table.into_inner().into_inner()),
            self.calls.map(|table| table.into_inner().into_inner()),
        )
    }
}

impl<W: Write + Truncate> RecordWriter for TsvWriter<W> {
    fn name(&self) -> &str {
        "tsv"
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        let Some(table) = self.table(record.kind()) else {
            debug!("No tsv table for <{}>", record.kind().element_name());
            return Ok(());
        };

        let cells = match record {
            Record::Sms(sms) => sms_cells(sms),
            Record::Mms(mms) => mms_cells(mms)?,
            Record::Call(call) => call_cells(call),
        };
        table.borrow_mut().append(&cells)
    }

    fn close(&self) -> BackupResult<()> {
        for table in self.tables() {
            table.borrow_mut().flush()?;
        }
        Ok(())
    }

    fn abort(&self) -> BackupResult<()> {
        let mut first_error = None;
        for table in self.tables() {
            if let Err(err) = table.borrow_mut().abort() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn cell(value: &str) -> String {
    clean_cell(value).into_owned()
}

fn optional_cell(value: &str) -> String {
    optional_text(value).map(cell).unwrap_or_default()
}

fn name_cell(value: &str) -> String {
    cell(&remove_commas_before_suffixes(value))
}

fn sms_cells(sms: &Sms) -> Vec<String> {
    vec![
        cell(&sms.protocol),
        cell(&sms.address),
        sms.message_type.to_string(),
        optional_cell(&sms.subject),
        cell(&sms.body),
        optional_cell(&sms.service_center),
        sms.status.to_string(),
        sms.read.to_string(),
        sms.date.to_string(),
        sms.locked.to_string(),
        sms.date_sent.to_string(),
        cell(&sms.readable_date),
        name_cell(&sms.contact_name),
    ]
}

fn mms_cells(mms: &Mms) -> BackupResult<Vec<String>> {
    let recipients = recipients_json(mms).map_err(|e| BackupError::sink("tsv:mms", e))?;
    Ok(vec![
        mms.text_only.to_string(),
        mms.read.to_string(),
        mms.date.to_string(),
        mms.locked.to_string(),
        mms.date_sent.to_string(),
        cell(&mms.readable_date),
        name_cell(&mms.contact_name),
        mms.seen.to_string(),
        optional_cell(&mms.from_address),
        cell(&mms.address),
        optional_cell(&mms.message_classifier),
        optional_cell(&mms.message_size),
        cell(&recipients),
    ])
}

fn call_cells(call: &Call) -> Vec<String> {
    vec![
        cell(&call.number),
        call.duration.value_or_zero().to_string(),
        call.date.to_string(),
        call.call_type.to_string(),
        cell(&call.readable_date),
        name_cell(&call.contact_name),
    ]
}

/// Builds a [`TsvWriter`]; headers are written as soon as the writer is built.
///
/// # Examples
///
/// ```
/// use sbr_batch::core::item::RecordWriter;
/// use sbr_batch::item::tsv::TsvWriterBuilder;
/// use sbr_batch::model::{Call, Record};
///
/// let writer = TsvWriterBuilder::new()
///     .calls_to(Vec::new())
///     .build()
///     .unwrap();
///
/// let call = Call { number: "5551234567".to_string(), ..Default::default() };
/// writer.write(&Record::Call(call)).unwrap();
/// writer.close().unwrap();
///
/// let (_, _, calls) = writer.into_inner();
/// let text = String::from_utf8(calls.unwrap()).unwrap();
/// assert!(text.starts_with("Call Index #\tNumber\t"));
/// assert!(text.lines().nth(1).unwrap().starts_with("0\t5551234567\t0\t"));
/// ```
pub struct TsvWriterBuilder<W> {
    sms: Option<W>,
    mms: Option<W>,
    calls: Option<W>,
    flush_interval: usize,
}

impl<W: Write + Truncate> Default for TsvWriterBuilder<W> {
    fn default() -> Self {
        Self {
            sms: None,
            mms: None,
            calls: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl<W: Write + Truncate> TsvWriterBuilder<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sms_to(mut self, out: W) -> Self {
        self.sms = Some(out);
        self
    }

    pub fn mms_to(mut self, out: W) -> Self {
        self.mms = Some(out);
        self
    }

    pub fn calls_to(mut self, out: W) -> Self {
        self.calls = Some(out);
        self
    }

    /// Number of rows kept in memory before they are handed to the output.
    pub fn flush_interval(mut self, rows: usize) -> Self {
        self.flush_interval = rows;
        self
    }

    pub fn build(self) -> BackupResult<TsvWriter<W>> {
        let interval = self.flush_interval;
        let table = |name, out: Option<W>, headers: &[&str]| -> BackupResult<_> {
            out.map(|out| TsvTable::new(name, out, headers, interval).map(RefCell::new))
                .transpose()
        };

        let writer = TsvWriter {
            sms: table("tsv:sms", self.sms, &SMS_HEADERS[..])?,
            mms: table("tsv:mms", self.mms, &MMS_HEADERS[..])?,
            calls: table("tsv:calls", self.calls, &CALL_HEADERS[..])?,
        };

        if writer.tables().next().is_none() {
            return Err(BackupError::Configuration(
                "a tsv writer needs at least one output".to_string(),
            ));
        }
        Ok(writer)
    }
}

impl TsvWriterBuilder<File> {
    /// Creates the tables a backup kind needs in `dir`: `sms.tsv` and
    /// `mms.tsv` for messages, `calls.tsv` for calls. Existing files are
    /// replaced.
    pub fn from_directory<P: AsRef<Path>>(
        self,
        dir: P,
        kind: BackupKind,
    ) -> BackupResult<TsvWriter<File>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| BackupError::sink("tsv", e))?;

        let builder = match kind {
            BackupKind::Messages => self
                .sms_to(create(dir.join("sms.tsv"))?)
                .mms_to(create(dir.join("mms.tsv"))?),
            BackupKind::Calls => self.calls_to(create(dir.join("calls.tsv"))?),
        };
        builder.build()
    }
}

fn create(path: PathBuf) -> BackupResult<File> {
    info!("Creating {}", path.display());
    File::create(&path).map_err(|e| BackupError::sink("tsv", format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MessageType, Timestamp};

    fn messages_writer() -> TsvWriter<Vec<u8>> {
        TsvWriterBuilder::new()
            .sms_to(Vec::new())
            .mms_to(Vec::new())
            .build()
            .unwrap()
    }

    fn text(out: Option<Vec<u8>>) -> String {
        String::from_utf8(out.unwrap()).unwrap()
    }

    #[test]
    fn header_is_written_at_construction() {
        let writer = messages_writer();
        let (sms, mms, calls) = writer.into_inner();

        assert_eq!(text(sms), format!("{}\n", SMS_HEADERS.join("\t")));
        assert_eq!(text(mms), format!("{}\n", MMS_HEADERS.join("\t")));
        assert!(calls.is_none());
    }

    #[test]
    fn sms_row_follows_column_order() {
        let writer = messages_writer();
        let sms = Sms {
            protocol: "0".to_string(),
            address: "+15551234567".to_string(),
            message_type: MessageType::Sent,
            subject: "null".to_string(),
            body: "line one\nline\ttwo".to_string(),
            date: Timestamp::from_millis(1518530000000),
            contact_name: "John Doe, Jr.".to_string(),
            ..Default::default()
        };

        writer.write(&Record::Sms(sms.clone())).unwrap();
        writer.write(&Record::Sms(sms)).unwrap();
        writer.close().unwrap();

        let (out, _, _) = writer.into_inner();
        let out = text(out);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 3);

        let cells: Vec<&str> = rows[1].split('\t').collect();
        assert_eq!(cells.len(), SMS_HEADERS.len());
        assert_eq!(cells[0], "0");
        assert_eq!(cells[3], "Sent");
        assert_eq!(cells[4], "");
        assert_eq!(cells[5], "line one\\nline\\ttwo");
        assert_eq!(cells[9], "1518530000000");
        assert_eq!(cells[13], "John Doe Jr.");
        assert!(rows[2].starts_with("1\t"));
    }

    #[test]
    fn mms_row_serializes_recipients() {
        let writer = messages_writer();
        writer.write(&Record::Mms(Mms::default())).unwrap();
        writer.close().unwrap();

        let (_, out, _) = writer.into_inner();
        let out = text(out);
        let row = out.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split('\t').collect();

        assert_eq!(cells.len(), MMS_HEADERS.len());
        assert_eq!(cells[13], "[]");
    }

    #[test]
    fn kinds_without_table_are_ignored() {
        let writer = messages_writer();
        writer.write(&Record::Call(Call::default())).unwrap();
        assert_eq!(writer.rows(RecordKind::Call), 0);
    }

    #[test]
    fn writer_without_output_is_rejected() {
        let result = TsvWriterBuilder::<Vec<u8>>::new().build();
        assert!(matches!(result, Err(BackupError::Configuration(_))));
    }

    /// Accepts bytes up to `limit`, then fails a single write.
    struct ShortWrite {
        data: Vec<u8>,
        limit: Option<usize>,
    }

    impl Write for ShortWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.limit {
                Some(limit) if self.data.len() >= limit => {
                    self.limit = None;
                    Err(io::Error::other("disk full"))
                }
                Some(limit) => {
                    let accepted = buf.len().min(limit - self.data.len());
                    self.data.extend_from_slice(&buf[..accepted]);
                    Ok(accepted)
                }
                None => {
                    self.data.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Truncate for ShortWrite {
        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[test]
    fn short_write_leaves_no_torn_row() {
        let header_len = CALL_HEADERS.join("\t").len() + 1;
        let writer = TsvWriterBuilder::new()
            .calls_to(ShortWrite {
                data: Vec::new(),
                limit: Some(header_len + 10),
            })
            .flush_interval(1)
            .build()
            .unwrap();

        assert!(writer.write(&Record::Call(Call::default())).is_err());
        writer.abort().unwrap();
        writer.write(&Record::Call(Call::default())).unwrap();
        writer.close().unwrap();

        let (_, _, calls) = writer.into_inner();
        let out = String::from_utf8(calls.unwrap().data).unwrap();
        let rows: Vec<&str> = out.lines().skip(1).collect();

        assert_eq!(rows.len(), 2);
        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<&str> = row.split('\t').collect();
            assert_eq!(cells.len(), CALL_HEADERS.len());
            assert_eq!(cells[0], index.to_string());
        }
    }

    #[test]
    fn abort_keeps_complete_rows() {
        let writer = TsvWriterBuilder::new()
            .calls_to(Vec::new())
            .flush_interval(100)
            .build()
            .unwrap();

        for _ in 0..3 {
            writer.write(&Record::Call(Call::default())).unwrap();
        }
        writer.abort().unwrap();

        let (_, _, calls) = writer.into_inner();
        assert_eq!(text(calls).lines().count(), 4);
    }
}
