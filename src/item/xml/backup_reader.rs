use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{BackupError, BackupResult};
use crate::model::{
    BackupInfo, BackupKind, Call, Calls, Messages, Mms, Number, Record, RecordKind, Sms,
    Timestamp,
};
use log::{debug, info};
use quick_xml::de::from_str;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader as XmlReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::char_refs::repair_char_refs;

/// Default read buffer: backups are routinely several hundred megabytes.
const DEFAULT_CAPACITY: usize = 1024 * 1024;

/// A builder for opening backup readers.
///
/// # Examples
///
/// ```
/// use sbr_batch::item::xml::BackupReaderBuilder;
/// use sbr_batch::model::BackupKind;
///
/// let xml = r#"<smses count="1" backup_set="abc" backup_date="1518530142000">
///   <sms address="+15551234567" type="1" body="hello" date="1518530000000" contact_name="Alice" />
/// </smses>"#;
///
/// let mut reader = BackupReaderBuilder::new()
///     .expect(BackupKind::Messages)
///     .from_reader(xml.as_bytes())
///     .unwrap();
///
/// assert_eq!(reader.info().expected_count(), Some(1));
/// let messages = reader.collect_messages().unwrap();
/// assert_eq!(messages.sms[0].body, "hello");
/// ```
pub struct BackupReaderBuilder {
    capacity: usize,
    expected_kind: Option<BackupKind>,
}

impl Default for BackupReaderBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            expected_kind: None,
        }
    }
}

impl BackupReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity of the buffered reader wrapped around the stream.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Requires the root element to be of the given kind.
    ///
    /// The kind is usually derived from the file name by the caller; a
    /// mismatch is reported as a structural error when the reader is opened.
    pub fn expect(mut self, kind: BackupKind) -> Self {
        self.expected_kind = Some(kind);
        self
    }

    /// Opens a reader over any byte stream and positions it after the root element.
    pub fn from_reader<R: Read>(self, reader: R) -> BackupResult<BackupReader<R>> {
        let backup_reader = BackupReader::open(reader, self.capacity)?;

        if let Some(expected) = self.expected_kind
            && expected != backup_reader.kind
        {
            return Err(BackupError::Structural(format!(
                "expected a {} backup (<{}>) but found <{}>",
                expected,
                expected.root_name(),
                backup_reader.kind.root_name()
            )));
        }

        Ok(backup_reader)
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> BackupResult<BackupReader<File>> {
        let file_path = path.as_ref();
        let file = File::open(file_path).map_err(|e| {
            BackupError::Structural(format!(
                "Failed to open backup file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        self.from_reader(file)
    }
}

/// A consumer of one record kind.
pub type RecordHandler<'h, T> = Box<dyn FnMut(T) -> BackupResult<()> + 'h>;

/// What to do with the elements of one record kind.
pub enum Handler<'h, T> {
    /// Skip the elements without decoding them.
    Skip,
    /// Decode each element and hand the record to the consumer.
    Push(RecordHandler<'h, T>),
}

impl<'h, T> Handler<'h, T> {
    pub fn push<F>(consumer: F) -> Self
    where
        F: FnMut(T) -> BackupResult<()> + 'h,
    {
        Handler::Push(Box::new(consumer))
    }

    fn is_skip(&self) -> bool {
        matches!(self, Handler::Skip)
    }

    fn handle(&mut self, record: T) -> BackupResult<()> {
        match self {
            Handler::Skip => Ok(()),
            Handler::Push(consumer) => consumer(record),
        }
    }
}

enum Handlers<'h> {
    Messages {
        sms: Handler<'h, Sms>,
        mms: Handler<'h, Mms>,
    },
    Calls {
        call: Handler<'h, Call>,
    },
}

/// Validated set of consumers for one backup kind.
///
/// Construction fails when no record kind of the backup would be consumed,
/// so a misconfigured pipeline is caught before any byte is read.
pub struct HandlerSet<'h> {
    handlers: Handlers<'h>,
}

impl<'h> HandlerSet<'h> {
    pub fn messages(sms: Handler<'h, Sms>, mms: Handler<'h, Mms>) -> BackupResult<Self> {
        if sms.is_skip() && mms.is_skip() {
            return Err(BackupError::Configuration(
                "a messages backup needs a handler for sms, mms or both".to_string(),
            ));
        }
        Ok(Self {
            handlers: Handlers::Messages { sms, mms },
        })
    }

    pub fn calls(call: Handler<'h, Call>) -> BackupResult<Self> {
        if call.is_skip() {
            return Err(BackupError::Configuration(
                "a calls backup needs a call handler".to_string(),
            ));
        }
        Ok(Self {
            handlers: Handlers::Calls { call },
        })
    }

    pub fn kind(&self) -> BackupKind {
        match self.handlers {
            Handlers::Messages { .. } => BackupKind::Messages,
            Handlers::Calls { .. } => BackupKind::Calls,
        }
    }

    fn wants(&self, kind: RecordKind) -> bool {
        match (&self.handlers, kind) {
            (Handlers::Messages { sms, .. }, RecordKind::Sms) => !sms.is_skip(),
            (Handlers::Messages { mms, .. }, RecordKind::Mms) => !mms.is_skip(),
            (Handlers::Calls { call }, RecordKind::Call) => !call.is_skip(),
            _ => false,
        }
    }

    fn dispatch(&mut self, record: Record) -> BackupResult<()> {
        match (&mut self.handlers, record) {
            (Handlers::Messages { sms, .. }, Record::Sms(record)) => sms.handle(record),
            (Handlers::Messages { mms, .. }, Record::Mms(record)) => mms.handle(record),
            (Handlers::Calls { call }, Record::Call(record)) => call.handle(record),
            (_, record) => Err(BackupError::Configuration(format!(
                "no handler registered for <{}>",
                record.kind().element_name()
            ))),
        }
    }
}

/// Number of records decoded per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub sms: usize,
    pub mms: usize,
    pub calls: usize,
}

impl RecordCounts {
    pub fn add(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::Sms => self.sms += 1,
            RecordKind::Mms => self.mms += 1,
            RecordKind::Call => self.calls += 1,
        }
    }

    pub fn get(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Sms => self.sms,
            RecordKind::Mms => self.mms,
            RecordKind::Call => self.calls,
        }
    }

    pub fn total(&self) -> usize {
        self.sms + self.mms + self.calls
    }

    pub fn merge(&mut self, other: &RecordCounts) {
        self.sms += other.sms;
        self.mms += other.mms;
        self.calls += other.calls;
    }
}

/// Single-pass streaming decoder for one backup file.
///
/// Only the record currently being decoded is held in memory: each child
/// element of the root is captured, deserialized and handed out before the
/// scanner moves on. Elements that are not records of the backup's kind are
/// skipped, so newer exporter versions that add elements keep working.
pub struct BackupReader<R> {
    reader: XmlReader<BufReader<R>>,
    buffer: Vec<u8>,
    info: BackupInfo,
    kind: BackupKind,
    finished: bool,
    decoded: RecordCounts,
    diagnostics: Diagnostics,
}

impl<R: Read> BackupReader<R> {
    fn open(rdr: R, capacity: usize) -> BackupResult<Self> {
        let buf_reader = BufReader::with_capacity(capacity, rdr);
        let mut xml_reader = XmlReader::from_reader(buf_reader);
        xml_reader.config_mut().trim_text(true);

        let mut buffer = Vec::with_capacity(1024);

        loop {
            buffer.clear();
            let event = match xml_reader.read_event_into(&mut buffer) {
                Ok(event) => event,
                Err(e) => {
                    return Err(BackupError::Structural(format!(
                        "unreadable stream before the root element (byte {}): {}",
                        xml_reader.error_position(),
                        e
                    )));
                }
            };

            let (root, finished) = match event {
                Event::Start(e) => (e.into_owned(), false),
                Event::Empty(e) => (e.into_owned(), true),
                Event::Eof => {
                    return Err(BackupError::Structural(
                        "no <smses> or <calls> root element found before end of stream"
                            .to_string(),
                    ));
                }
                _ => continue,
            };

            let Some(kind) = BackupKind::from_root_name(root.name().as_ref()) else {
                debug!(
                    "Ignoring <{}> while looking for the root element",
                    String::from_utf8_lossy(root.name().as_ref())
                );
                continue;
            };

            let info = read_backup_info(&root).map_err(|e| {
                attribute_error(kind.root_name(), xml_reader.buffer_position(), e)
            })?;
            info!(
                "Opened {} backup: count={:?}, backup_set={:?}",
                kind, info.count, info.backup_set
            );

            return Ok(Self {
                reader: xml_reader,
                buffer,
                info,
                kind,
                finished,
                decoded: RecordCounts::default(),
                diagnostics: Diagnostics::new(),
            });
        }
    }

    pub fn info(&self) -> &BackupInfo {
        &self.info
    }

    pub fn kind(&self) -> BackupKind {
        self.kind
    }

    /// Records decoded so far (skipped elements are not counted).
    pub fn decoded(&self) -> RecordCounts {
        self.decoded
    }

    /// Field-level fallbacks reported so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Lazily yields every record of the backup in document order.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }

    /// Decodes the rest of the stream in push mode.
    ///
    /// Each record is passed to its handler before the next element is read.
    /// The first error, from the scanner or from a handler, stops decoding.
    pub fn decode(&mut self, mut handlers: HandlerSet<'_>) -> BackupResult<RecordCounts> {
        if handlers.kind() != self.kind {
            return Err(BackupError::Configuration(format!(
                "handlers for a {} backup cannot decode a {} backup",
                handlers.kind(),
                self.kind
            )));
        }

        let mut counts = RecordCounts::default();
        loop {
            let next = self.next_matching(&|kind| handlers.wants(kind))?;
            let Some(record) = next else {
                break;
            };
            counts.add(record.kind());
            handlers.dispatch(record)?;
        }
        Ok(counts)
    }

    /// Aggregate mode: decodes every message into memory.
    pub fn collect_messages(mut self) -> BackupResult<Messages> {
        let mut sms = Vec::new();
        let mut mms = Vec::new();

        let handlers = HandlerSet::messages(
            Handler::push(|record: Sms| {
                sms.push(record);
                Ok(())
            }),
            Handler::push(|record: Mms| {
                mms.push(record);
                Ok(())
            }),
        )?;
        self.decode(handlers)?;

        Ok(Messages {
            info: self.info,
            sms,
            mms,
        })
    }

    /// Aggregate mode: decodes every call into memory.
    pub fn collect_calls(mut self) -> BackupResult<Calls> {
        let mut calls = Vec::new();

        let handlers = HandlerSet::calls(Handler::push(|record: Call| {
            calls.push(record);
            Ok(())
        }))?;
        self.decode(handlers)?;

        Ok(Calls {
            info: self.info,
            calls,
        })
    }

    /// Scans to the next wanted record, skipping everything else.
    fn next_matching(
        &mut self,
        wanted: &dyn Fn(RecordKind) -> bool,
    ) -> BackupResult<Option<Record>> {
        if self.finished {
            return Ok(None);
        }

        let result = self.scan(wanted);
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn scan(&mut self, wanted: &dyn Fn(RecordKind) -> bool) -> BackupResult<Option<Record>> {
        loop {
            self.buffer.clear();
            let position = self.reader.buffer_position();

            let event = match self.reader.read_event_into(&mut self.buffer) {
                Ok(event) => event,
                Err(e) => {
                    return Err(BackupError::Parse {
                        element: self.kind.root_name().to_string(),
                        position: self.reader.error_position(),
                        message: e.to_string(),
                    });
                }
            };

            let (tag, is_empty) = match event {
                Event::Start(e) => (e.into_owned(), false),
                Event::Empty(e) => (e.into_owned(), true),
                Event::End(_) => {
                    debug!("Reached end of <{}>", self.kind.root_name());
                    return Ok(None);
                }
                Event::Eof => {
                    return Err(BackupError::Parse {
                        element: self.kind.root_name().to_string(),
                        position: self.reader.buffer_position(),
                        message: "unexpected end of stream before the root element was closed"
                            .to_string(),
                    });
                }
                _ => continue,
            };

            let element = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
            let kind = RecordKind::from_element_name(tag.name().as_ref())
                .filter(|kind| self.kind.record_kinds().contains(kind));

            match kind {
                Some(kind) if wanted(kind) => {
                    let record = self.decode_element(kind, &tag, is_empty, &element, position)?;
                    return Ok(Some(record));
                }
                Some(_) => {
                    debug!("No handler for <{}>, skipping it", element);
                    self.skip_element(&tag, is_empty, &element)?;
                }
                None => {
                    debug!("Skipping unrecognized element <{}>", element);
                    self.skip_element(&tag, is_empty, &element)?;
                }
            }
        }
    }

    fn skip_element(
        &mut self,
        tag: &BytesStart<'_>,
        is_empty: bool,
        element: &str,
    ) -> BackupResult<()> {
        if is_empty {
            return Ok(());
        }
        self.buffer.clear();
        self.reader
            .read_to_end_into(tag.name(), &mut self.buffer)
            .map_err(|e| BackupError::Parse {
                element: element.to_string(),
                position: self.reader.error_position(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn decode_element(
        &mut self,
        kind: RecordKind,
        tag: &BytesStart<'_>,
        is_empty: bool,
        element: &str,
        position: u64,
    ) -> BackupResult<Record> {
        let mut xml_string = String::new();
        push_start_tag(&mut xml_string, tag, is_empty)
            .map_err(|e| attribute_error(element, position, e))?;
        if !is_empty {
            self.capture_children(&mut xml_string, element)?;
        }

        let xml_string = repair_char_refs(&xml_string);
        debug!("Finished reading <{}> at byte {}", element, position);

        let record = deserialize_record(kind, &xml_string).map_err(|e| BackupError::Parse {
            element: element.to_string(),
            position,
            message: e.to_string(),
        })?;

        self.decoded.add(kind);
        self.report_fallbacks(&record, element);
        Ok(record)
    }

    /// Appends the subtree below an already consumed start tag, up to and
    /// including its end tag.
    fn capture_children(&mut self, xml_string: &mut String, element: &str) -> BackupResult<()> {
        let mut depth = 1;
        while depth > 0 {
            self.buffer.clear();
            match self.reader.read_event_into(&mut self.buffer) {
                Ok(Event::Start(ref start)) => {
                    depth += 1;
                    push_start_tag(xml_string, start, false).map_err(|e| {
                        attribute_error(element, self.reader.buffer_position(), e)
                    })?;
                }
                Ok(Event::Empty(ref empty)) => {
                    push_start_tag(xml_string, empty, true).map_err(|e| {
                        attribute_error(element, self.reader.buffer_position(), e)
                    })?;
                }
                Ok(Event::End(ref end)) => {
                    depth -= 1;
                    xml_string.push_str("</");
                    xml_string.push_str(&String::from_utf8_lossy(end.name().as_ref()));
                    xml_string.push('>');
                }
                Ok(Event::Text(ref text)) => {
                    xml_string.push_str(&String::from_utf8_lossy(text.as_ref()));
                }
                Ok(Event::GeneralRef(ref reference)) => {
                    xml_string.push('&');
                    xml_string.push_str(&String::from_utf8_lossy(reference.as_ref()));
                    xml_string.push(';');
                }
                Ok(Event::CData(ref cdata)) => {
                    xml_string.push_str("<![CDATA[");
                    xml_string.push_str(&String::from_utf8_lossy(cdata.as_ref()));
                    xml_string.push_str("]]>");
                }
                Ok(Event::Eof) => {
                    return Err(BackupError::Parse {
                        element: element.to_string(),
                        position: self.reader.buffer_position(),
                        message: "unexpected end of stream inside element".to_string(),
                    });
                }
                Err(e) => {
                    return Err(BackupError::Parse {
                        element: element.to_string(),
                        position: self.reader.error_position(),
                        message: e.to_string(),
                    });
                }
                _ => { /* comments, processing instructions */ }
            }
        }
        Ok(())
    }

    fn report_fallbacks(&mut self, record: &Record, element: &str) {
        let ordinal = self.decoded.get(record.kind()) - 1;
        for (field, raw) in record.fallbacks() {
            self.diagnostics.push(
                DiagnosticKind::FieldFallback,
                format!(
                    "<{}> #{}: unrecognized {} value {:?}, kept as unknown",
                    element, ordinal, field, raw
                ),
            );
        }
    }
}

/// Iterator returned by [`BackupReader::records`].
pub struct Records<'a, R> {
    reader: &'a mut BackupReader<R>,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = BackupResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_matching(&|_| true).transpose()
    }
}

fn deserialize_record(kind: RecordKind, xml: &str) -> Result<Record, quick_xml::DeError> {
    Ok(match kind {
        RecordKind::Sms => Record::Sms(from_str(xml)?),
        RecordKind::Mms => Record::Mms(from_str(xml)?),
        RecordKind::Call => Record::Call(from_str(xml)?),
    })
}

fn read_backup_info(root: &BytesStart<'_>) -> Result<BackupInfo, AttrError> {
    let mut attributes: HashMap<Vec<u8>, String> = HashMap::new();
    for attr in root.attributes() {
        let attr = attr?;
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(attr.value.as_ref()).into_owned(),
        };
        attributes.insert(attr.key.local_name().as_ref().to_vec(), value);
    }

    Ok(BackupInfo {
        count: attributes.remove(b"count".as_slice()),
        backup_set: attributes.remove(b"backup_set".as_slice()).unwrap_or_default(),
        backup_date: attributes
            .remove(b"backup_date".as_slice())
            .map(|raw| Timestamp(Number::parse(&raw)))
            .unwrap_or_default(),
    })
}

/// Malformed attributes (unquoted, duplicated, missing `=`) make the
/// document ill-formed, unlike an attribute value that fails to parse.
fn attribute_error(element: &str, position: u64, error: AttrError) -> BackupError {
    BackupError::Parse {
        element: element.to_string(),
        position,
        message: error.to_string(),
    }
}

/// Re-serializes a start tag with its raw (still escaped) attribute values.
fn push_start_tag(
    xml_string: &mut String,
    tag: &BytesStart<'_>,
    is_empty: bool,
) -> Result<(), AttrError> {
    xml_string.push('<');
    xml_string.push_str(&String::from_utf8_lossy(tag.name().as_ref()));

    for attr in tag.attributes() {
        let attr = attr?;
        let value = String::from_utf8_lossy(attr.value.as_ref());
        let quote = if value.contains('"') { '\'' } else { '"' };

        xml_string.push(' ');
        xml_string.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        xml_string.push('=');
        xml_string.push(quote);
        xml_string.push_str(&value);
        xml_string.push(quote);
    }

    if is_empty {
        xml_string.push_str("/>");
    } else {
        xml_string.push('>');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressType, CallType, MessageType};

    const MESSAGES: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<!--File Created By SMS Backup & Restore-->
<smses count="3" backup_set="a1b2" backup_date="1518530142000">
  <sms protocol="0" address="+15551234567" type="1" subject="null" body="first &amp; &#55357;&#56832;" date="1518530000000" status="-1" read="1" locked="0" contact_name="Alice" />
  <mms text_only="0" read="1" date="1518530001000" address="+15551234567~5559876543" contact_name="Alice, Bob" m_cls="personal">
    <parts>
      <part ct="text/plain" text="hi" data="null" />
      <part ct="image/jpeg" name="IMG_1.jpg" data="AQID" />
    </parts>
    <addrs>
      <addr address="+15551234567" type="137" charset="106" />
      <addr address="5559876543" type="151" charset="106" />
    </addrs>
  </mms>
  <sms address="5559876543" type="2" body="second" date="1518530002000" />
</smses>"#;

    fn open(xml: &str) -> BackupReader<&[u8]> {
        BackupReaderBuilder::new()
            .from_reader(xml.as_bytes())
            .expect("reader should open")
    }

    #[test]
    fn root_attributes_become_backup_info() {
        let reader = open(MESSAGES);

        assert_eq!(reader.kind(), BackupKind::Messages);
        assert_eq!(reader.info().expected_count(), Some(3));
        assert_eq!(reader.info().backup_set, "a1b2");
        assert_eq!(reader.info().backup_date.millis(), Some(1518530142000));
    }

    #[test]
    fn records_keep_document_order() {
        let mut reader = open(MESSAGES);
        let kinds: Vec<RecordKind> = reader
            .records()
            .map(|record| record.map(|r| r.kind()))
            .collect::<BackupResult<_>>()
            .unwrap();

        assert_eq!(kinds, vec![RecordKind::Sms, RecordKind::Mms, RecordKind::Sms]);
        assert_eq!(reader.decoded().total(), 3);
    }

    #[test]
    fn mms_children_keep_source_order() {
        let messages = open(MESSAGES).collect_messages().unwrap();
        let mms = &messages.mms[0];

        assert_eq!(mms.parts.len(), 2);
        assert_eq!(mms.parts[0].content_type, "text/plain");
        assert_eq!(mms.parts[1].name, "IMG_1.jpg");
        assert_eq!(mms.parts[1].data, "AQID");
        assert_eq!(mms.addresses[0].address_type, AddressType::From);
        assert_eq!(mms.addresses[1].address_type, AddressType::To);
        assert_eq!(mms.message_classifier, "personal");
    }

    #[test]
    fn entities_and_split_surrogates_are_decoded() {
        let messages = open(MESSAGES).collect_messages().unwrap();

        assert_eq!(messages.sms[0].body, "first & \u{1F600}");
        assert_eq!(messages.sms[0].message_type, MessageType::Inbox);
        assert_eq!(messages.sms[1].message_type, MessageType::Sent);
    }

    #[test]
    fn skipped_kinds_are_not_decoded() {
        let mut bodies = Vec::new();
        let mut reader = open(MESSAGES);
        let handlers = HandlerSet::messages(
            Handler::push(|sms: Sms| {
                bodies.push(sms.body);
                Ok(())
            }),
            Handler::Skip,
        )
        .unwrap();

        let counts = reader.decode(handlers).unwrap();

        assert_eq!(counts, RecordCounts { sms: 2, mms: 0, calls: 0 });
        assert_eq!(bodies.len(), 2);
    }

    #[test]
    fn all_skip_handlers_fail_at_setup() {
        let result = HandlerSet::messages(Handler::Skip, Handler::Skip);
        assert!(matches!(result, Err(BackupError::Configuration(_))));

        let result = HandlerSet::calls(Handler::Skip);
        assert!(matches!(result, Err(BackupError::Configuration(_))));
    }

    #[test]
    fn handlers_must_match_backup_kind() {
        let mut reader = open(MESSAGES);
        let handlers = HandlerSet::calls(Handler::push(|_: Call| Ok(()))).unwrap();

        assert!(matches!(
            reader.decode(handlers),
            Err(BackupError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<calls count="1">
            <future version="2"><nested /></future>
            <call number="123" duration="5" type="9" />
            <sms body="not a call" />
        </calls>"#;

        let calls = open(xml).collect_calls().unwrap();

        assert_eq!(calls.calls.len(), 1);
        assert_eq!(calls.calls[0].call_type, CallType::Unknown("9".to_string()));
    }

    #[test]
    fn field_fallbacks_are_reported() {
        let xml = r#"<calls><call number="1" duration="abc" type="42" /></calls>"#;
        let mut reader = open(xml);
        let records: Vec<_> = reader.records().collect();

        assert_eq!(records.len(), 1);
        assert_eq!(reader.diagnostics().count(DiagnosticKind::FieldFallback), 2);
    }

    #[test]
    fn missing_root_is_structural() {
        let result = BackupReaderBuilder::new().from_reader("<other/>".as_bytes());
        assert!(matches!(result, Err(BackupError::Structural(_))));

        let result = BackupReaderBuilder::new().from_reader("".as_bytes());
        assert!(matches!(result, Err(BackupError::Structural(_))));
    }

    #[test]
    fn malformed_attribute_is_a_parse_error() {
        let unquoted = r#"<smses count="1"><sms address=5551234567 body="hi" /></smses>"#;
        let result = open(unquoted).collect_messages();
        assert!(matches!(result, Err(BackupError::Parse { ref element, .. }) if element == "sms"));

        let nested = r#"<smses><mms address="1"><parts><part ct="a" ct="b" /></parts></mms></smses>"#;
        let result = open(nested).collect_messages();
        assert!(matches!(result, Err(BackupError::Parse { ref element, .. }) if element == "mms"));

        let root = BackupReaderBuilder::new().from_reader(r#"<calls count=2></calls>"#.as_bytes());
        assert!(matches!(root, Err(BackupError::Parse { .. })));
    }

    #[test]
    fn wrong_kind_is_structural() {
        let result = BackupReaderBuilder::new()
            .expect(BackupKind::Calls)
            .from_reader(MESSAGES.as_bytes());
        assert!(matches!(result, Err(BackupError::Structural(_))));
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let xml = r#"<smses count="2"><sms body="ok" /><sms body="cut"#;
        let mut reader = open(xml);
        let records: Vec<_> = reader.records().collect();

        assert!(records[0].is_ok());
        assert!(matches!(records.last(), Some(Err(BackupError::Parse { .. }))));
    }

    #[test]
    fn empty_root_yields_no_records() {
        let calls = open(r#"<calls count="0" />"#).collect_calls().unwrap();
        assert!(calls.calls.is_empty());
        assert_eq!(calls.info.expected_count(), Some(0));
    }

    #[test]
    fn iteration_stops_after_error() {
        let xml = r#"<smses><sms body="a" /><mms><parts></mms></smses>"#;
        let mut reader = open(xml);
        let mut records = reader.records();

        assert!(records.next().unwrap().is_ok());
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }
}
