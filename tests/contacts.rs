mod common;

use std::fs;

use anyhow::Result;
use common::fixtures;

use sbr_batch::{
    contact::{ContactResolver, UNKNOWN_NAME},
    core::job::{BackupSource, JobBuilder},
    diagnostics::DiagnosticKind,
    item::{
        tsv::{write_contacts_to_path, TsvWriterBuilder},
        xml::BackupReaderBuilder,
    },
    model::BackupKind,
};

fn family_backup() -> String {
    fixtures::messages(&[
        fixtures::sms("+1 (555) 123-4567", UNKNOWN_NAME, "who is this?", 1),
        fixtures::sms("555.123.4567", "Alice", "it's me", 2),
        fixtures::sms("15551234567", "Ally", "nickname", 3),
        fixtures::mms(
            "5551234567~5559876543",
            "Alice, Smith, Jr., Bob",
            4,
            &[fixtures::text_part("group")],
            &[("5551234567", 151), ("5559876543", 151)],
        ),
        fixtures::mms(
            "5552223333~5554445555",
            "Carol, Dave",
            5,
            &[fixtures::text_part("pair")],
            &[("5552223333", 151), ("5554445555", 151)],
        ),
    ])
}

#[test]
fn resolver_merges_spellings_of_one_number() -> Result<()> {
    let xml = family_backup();
    let messages = BackupReaderBuilder::new()
        .from_reader(xml.as_bytes())?
        .collect_messages()?;

    let resolver = ContactResolver::resolve(&messages.sms, &messages.mms);

    let alice = resolver.lookup("+15551234567").unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.canonical_number, "5551234567");
    assert!(alice.raw_numbers.contains("+1 (555) 123-4567"));
    assert!(alice.raw_numbers.contains("555.123.4567"));
    assert!(alice.raw_numbers.contains("15551234567"));

    assert_eq!(resolver.get("5552223333").unwrap().name, "Carol");
    assert_eq!(resolver.get("5554445555").unwrap().name, "Dave");
    assert_eq!(resolver.len(), 3);

    let diagnostics = resolver.diagnostics();
    // "Ally" conflicts with "Alice".
    assert_eq!(diagnostics.count(DiagnosticKind::ContactConflict), 1);
    // "Alice, Smith, Jr., Bob" gives three names for two numbers.
    assert_eq!(diagnostics.count(DiagnosticKind::ContactAmbiguity), 1);
    Ok(())
}

#[test]
fn job_builds_the_directory_across_files() -> Result<()> {
    let tsv = TsvWriterBuilder::new()
        .sms_to(Vec::new())
        .mms_to(Vec::new())
        .build()?;

    let first = fixtures::messages(&[fixtures::sms("+15551234567", UNKNOWN_NAME, "hi", 1)]);
    let broken = format!(
        "{}<smses count=\"1\">{}",
        fixtures::PROLOG,
        fixtures::sms("5559990000", "Mallory", "lost", 2)
    );
    let second = fixtures::messages(&[fixtures::sms("5551234567", "Alice", "hi", 3)]);

    let job = JobBuilder::new()
        .writer(BackupKind::Messages, &tsv)
        .resolve_contacts(true)
        .build();
    let (context, _) = job.run([
        BackupSource::new("sms-1.xml", BackupKind::Messages, first.as_bytes()),
        BackupSource::new("sms-2.xml", BackupKind::Messages, broken.as_bytes()),
        BackupSource::new("sms-3.xml", BackupKind::Messages, second.as_bytes()),
    ]);

    assert_eq!(context.failures.len(), 1);
    assert_eq!(context.contacts.len(), 1);
    assert_eq!(context.contacts.get("5551234567").unwrap().name, "Alice");
    assert!(context.contacts.get("5559990000").is_none());

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("contacts.tsv");
    assert_eq!(write_contacts_to_path(&context.contacts, &path)?, 1);

    let content = fs::read_to_string(&path)?;
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("Canonical Number\tName\tRaw Numbers"));
    assert_eq!(lines.next(), Some("5551234567\tAlice\t+15551234567~5551234567"));
    assert_eq!(lines.next(), None);
    Ok(())
}
