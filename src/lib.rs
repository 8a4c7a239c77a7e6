#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # sbr-batch

 Streaming converter for the XML exports of the *SMS Backup & Restore* Android
 app. A backup of any size is scanned once, element by element, and every
 message or call record is fanned out to a chain of writers: tab-separated
 tables, a SQLite database and a directory of extracted attachments. A best
 effort contact directory is derived from the names the phone attached to
 each number.

 ## Core Concepts

- **Record:** one `<sms>`, `<mms>` or `<call>` element decoded into a typed
  value. Malformed scalar attributes never fail a record: they fall back to a
  sentinel and are reported as diagnostics.
- **BackupReader:** the streaming decoder. It either pushes records to
  per-kind handlers or yields them lazily, always in document order.
- **RecordWriter:** a consumer of records with an `open`/`write`/`close`
  lifecycle and an `abort` for upstream failures.
- **ImportStep:** one backup file through one chain of writers.
- **BatchJob:** several backup files in sequence; a failed file is recorded
  and the batch goes on.
- **ContactResolver:** reconciles the many spellings of a phone number into
  one contact.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| rdbc-sqlite   | Enables the SQLite `RecordWriter`                             |
| logger        | Enables a logger `RecordWriter`, useful for debugging purposes |
| full          | Enables all available features                                |

 The decoder, the TSV and attachment writers and the contact resolver are
 always available.

 ## Getting Started

```toml
[dependencies]
sbr-batch = { version = "0.1", features = ["rdbc-sqlite"] }
```

 ## Example

```rust
use sbr_batch::core::job::{BackupSource, JobBuilder};
use sbr_batch::item::tsv::TsvWriterBuilder;
use sbr_batch::model::{BackupKind, RecordKind};
# use sbr_batch::error::BackupError;

# fn main() -> Result<(), BackupError> {
let xml = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<smses count="2" backup_set="e5b1" backup_date="1700000000000">
  <sms protocol="0" address="+1 555-123-4567" date="1699999000000" type="1"
       body="Hello" read="1" status="-1" locked="0" contact_name="Alice" />
  <mms date="1699999500000" msg_box="2" address="5551234567" contact_name="Alice">
    <parts>
      <part ct="text/plain" name="null" text="Hi there" />
    </parts>
    <addrs>
      <addr address="5551234567" type="151" charset="106" />
    </addrs>
  </mms>
</smses>"#;

let writer = TsvWriterBuilder::new()
    .sms_to(Vec::new())
    .mms_to(Vec::new())
    .build()?;

let job = JobBuilder::new()
    .writer(BackupKind::Messages, &writer)
    .resolve_contacts(true)
    .build();

let (context, _execution) = job.run([BackupSource::new(
    "sms-20231114.xml",
    BackupKind::Messages,
    xml.as_bytes(),
)]);

assert!(!context.has_failures());
assert_eq!(context.totals.total(), 2);
assert_eq!(writer.rows(RecordKind::Mms), 1);
assert_eq!(context.contacts.lookup("+15551234567").unwrap().name, "Alice");
# Ok(())
# }
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Export settings and the writers they describe
pub mod config;

/// Contact directory derived from message records
pub mod contact;

/// Core module for import steps and batch jobs
pub mod core;

/// Non-fatal problems collected while importing
pub mod diagnostics;

/// Error types for import operations
pub mod error;
#[doc(inline)]
pub use error::*;

/// Decoder and writers, grouped by format
pub mod item;

/// Typed backup records
pub mod model;
