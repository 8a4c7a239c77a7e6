mod common;

use std::{cell::RefCell, io::Write};

use anyhow::Result;
use common::fixtures;

use sbr_batch::{
    error::BackupError,
    item::xml::{BackupReaderBuilder, Handler, HandlerSet},
    model::{BackupKind, CallType, Mms, Record, Sms},
};

fn large_backup(records: usize) -> String {
    let records: Vec<String> = (0..records)
        .map(|i| {
            let address = format!("555000{:04}", i);
            if i % 10 == 9 {
                fixtures::mms(
                    &address,
                    "Group",
                    i as i64,
                    &[fixtures::text_part(&format!("mms {}", i))],
                    &[(address.as_str(), 137)],
                )
            } else {
                fixtures::sms(&address, "Friend", &format!("sms {}", i), i as i64)
            }
        })
        .collect();
    fixtures::messages(&records)
}

#[test]
fn small_buffer_streams_a_large_document_in_order() -> Result<()> {
    let xml = large_backup(2_000);

    let mut reader = BackupReaderBuilder::new()
        .capacity(256)
        .from_reader(xml.as_bytes())?;

    let mut dates = Vec::new();
    for record in reader.records() {
        let date = match record? {
            Record::Sms(sms) => sms.date.millis(),
            Record::Mms(mms) => mms.date.millis(),
            Record::Call(_) => unreachable!(),
        };
        dates.push(date.unwrap());
    }

    assert_eq!(dates.len(), 2_000);
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(reader.decoded().sms, 1_800);
    assert_eq!(reader.decoded().mms, 200);
    Ok(())
}

#[test]
fn push_mode_skips_unwanted_kinds() -> Result<()> {
    let xml = large_backup(100);
    let bodies = RefCell::new(Vec::new());

    let mut reader = BackupReaderBuilder::new().from_reader(xml.as_bytes())?;
    let counts = reader.decode(HandlerSet::messages(
        Handler::Skip,
        Handler::push(|mms: Mms| {
            bodies.borrow_mut().push(mms.parts[0].text.clone());
            Ok(())
        }),
    )?)?;

    assert_eq!(counts.mms, 10);
    assert_eq!(counts.sms, 0);
    assert_eq!(bodies.borrow()[0], "mms 9");
    Ok(())
}

#[test]
fn broken_surrogates_and_bad_scalars_do_not_fail_the_record() -> Result<()> {
    let xml = format!(
        "{}<smses count=\"1\"><sms address=\"5551234567\" date=\"yesterday\" type=\"1\" body=\"hi &#55357;&#56832; &#0;&#55357;\" read=\"maybe\" /></smses>",
        fixtures::PROLOG
    );

    let sms = RefCell::new(Vec::<Sms>::new());
    let mut reader = BackupReaderBuilder::new().from_reader(xml.as_bytes())?;
    reader.decode(HandlerSet::messages(
        Handler::push(|record: Sms| {
            sms.borrow_mut().push(record);
            Ok(())
        }),
        Handler::Skip,
    )?)?;

    let sms = sms.into_inner();
    assert_eq!(sms.len(), 1);
    assert_eq!(sms[0].body, "hi \u{1F600} \u{FFFD}");
    assert_eq!(sms[0].date.millis(), None);
    assert!(reader.diagnostics().len() >= 2);
    Ok(())
}

#[test]
fn calls_file_from_disk() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        "{}",
        fixtures::calls(&[
            fixtures::call("5551234567", "Alice", "42", 2, 10),
            fixtures::call("5559876543", "null", "oops", 3, 20),
        ])
    )?;
    file.flush()?;

    let calls = BackupReaderBuilder::new()
        .expect(BackupKind::Calls)
        .from_path(file.path())?
        .collect_calls()?;

    assert_eq!(calls.info.expected_count(), Some(2));
    assert_eq!(calls.calls.len(), 2);
    assert_eq!(calls.calls[0].call_type, CallType::Outgoing);
    assert_eq!(calls.calls[0].duration.get(), Some(42));
    assert_eq!(calls.calls[1].duration.get(), None);
    Ok(())
}

#[test]
fn messages_file_is_not_a_calls_file() {
    let xml = fixtures::messages(&[]);
    let result = BackupReaderBuilder::new()
        .expect(BackupKind::Calls)
        .from_reader(xml.as_bytes());

    assert!(matches!(result, Err(BackupError::Structural(_))));
}
