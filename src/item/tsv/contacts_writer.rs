use std::{fs::File, io::Write, path::Path};

use csv::{QuoteStyle, WriterBuilder};
use log::info;

use crate::contact::ContactResolver;
use crate::error::{BackupError, BackupResult};
use crate::model::text::{clean_cell, ADDRESS_SEPARATOR};

pub const CONTACT_HEADERS: [&str; 3] = ["Canonical Number", "Name", "Raw Numbers"];

/// Writes the contact directory as a tab-delimited table, ordered by
/// canonical number. Returns the number of contacts written.
pub fn write_contacts<W: Write>(contacts: &ContactResolver, out: W) -> BackupResult<usize> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .has_headers(false)
        .from_writer(out);

    let sink_error = |e: csv::Error| BackupError::sink("tsv:contacts", e);

    wtr.write_record(CONTACT_HEADERS).map_err(sink_error)?;
    for contact in contacts.contacts() {
        let raw_numbers = contact
            .raw_numbers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&ADDRESS_SEPARATOR.to_string());

        wtr.write_record([
            &*clean_cell(&contact.canonical_number),
            &*clean_cell(&contact.name),
            &*clean_cell(&raw_numbers),
        ])
        .map_err(sink_error)?;
    }
    wtr.flush()
        .map_err(|e| BackupError::sink("tsv:contacts", e))?;

    Ok(contacts.len())
}

/// Writes `contacts.tsv` at the given path, replacing any existing file.
pub fn write_contacts_to_path<P: AsRef<Path>>(
    contacts: &ContactResolver,
    path: P,
) -> BackupResult<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| BackupError::sink("tsv:contacts", format!("{}: {}", path.display(), e)))?;

    let written = write_contacts(contacts, file)?;
    info!("Wrote {} contacts to {}", written, path.display());
    Ok(written)
}
