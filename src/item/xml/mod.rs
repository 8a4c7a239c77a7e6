/// Streaming decoder for backup XML documents.
///
/// The decoder scans the document once, event by event, with `quick-xml`.
/// Each record element is captured as an isolated subtree and deserialized
/// with serde into the types of [`crate::model`], so memory use stays
/// bounded by the largest single record rather than by the file size.
///
/// # Examples
///
/// ## Push mode
///
/// ```
/// use sbr_batch::item::xml::{BackupReaderBuilder, Handler, HandlerSet};
///
/// let xml = r#"<calls count="2">
///   <call number="5551234567" duration="42" date="1518530000000" type="1" />
///   <call number="5559876543" duration="0" date="1518530001000" type="3" />
/// </calls>"#;
///
/// let mut numbers = Vec::new();
/// let mut reader = BackupReaderBuilder::new().from_reader(xml.as_bytes()).unwrap();
/// let handlers = HandlerSet::calls(Handler::push(|call: sbr_batch::model::Call| {
///     numbers.push(call.number);
///     Ok(())
/// }))
/// .unwrap();
///
/// let counts = reader.decode(handlers).unwrap();
/// assert_eq!(counts.calls, 2);
/// assert_eq!(numbers, vec!["5551234567", "5559876543"]);
/// ```
///
/// ## Lazy iteration
///
/// ```
/// use sbr_batch::item::xml::BackupReaderBuilder;
/// use sbr_batch::model::RecordKind;
///
/// let xml = r#"<smses><sms body="a" /><mms /><sms body="b" /></smses>"#;
/// let mut reader = BackupReaderBuilder::new().from_reader(xml.as_bytes()).unwrap();
///
/// let kinds: Vec<RecordKind> = reader
///     .records()
///     .map(|record| record.unwrap().kind())
///     .collect();
/// assert_eq!(kinds, vec![RecordKind::Sms, RecordKind::Mms, RecordKind::Sms]);
/// ```
pub mod backup_reader;

mod char_refs;

pub use backup_reader::{
    BackupReader, BackupReaderBuilder, Handler, HandlerSet, RecordCounts, Records,
};
