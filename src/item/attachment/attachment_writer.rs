use std::{
    cell::{Cell, RefCell},
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::core::item::RecordWriter;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{BackupError, BackupResult};
use crate::item::payload::decode_base64;
use crate::model::{Mms, MmsPart, Record};

use super::naming::{attachment_file_name, is_attachment};

/// Attachment counters of an [`AttachmentWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentStats {
    /// Binary parts with a payload.
    pub identified: usize,
    /// Parts whose bytes reached the disk.
    pub written: usize,
}

/// Extracts the binary parts of multi-recipient messages into a directory.
///
/// Every file is named `<stem>_<message index>-<part index>.<ext>`, where the
/// message index counts the `mms` records this writer has seen, from 0, and
/// the part index is the position of the part inside its message. A name that
/// was already used is overwritten, so the last part wins.
///
/// A part that cannot be decoded or saved is reported as an
/// [`Attachment`](DiagnosticKind::Attachment) diagnostic and the remaining
/// parts and records are still processed.
///
/// # Examples
///
/// ```
/// use sbr_batch::core::item::RecordWriter;
/// use sbr_batch::item::attachment::AttachmentWriterBuilder;
/// use sbr_batch::model::{Mms, MmsPart, Record};
///
/// let dir = tempfile::tempdir().unwrap();
/// let writer = AttachmentWriterBuilder::new().directory(dir.path()).build().unwrap();
///
/// let mms = Mms {
///     parts: vec![MmsPart {
///         content_type: "image/png".to_string(),
///         name: "cat.png".to_string(),
///         data: "iVBORw0KGgo=".to_string(),
///         ..Default::default()
///     }],
///     ..Default::default()
/// };
/// writer.write(&Record::Mms(mms)).unwrap();
///
/// assert!(dir.path().join("cat_0-0.png").exists());
/// assert_eq!(writer.stats().written, 1);
/// ```
pub struct AttachmentWriter {
    directory: PathBuf,
    next_mms_index: Cell<usize>,
    stats: Cell<AttachmentStats>,
    diagnostics: RefCell<Diagnostics>,
}

impl AttachmentWriter {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn stats(&self) -> AttachmentStats {
        self.stats.get()
    }

    fn extract(&self, mms: &Mms, mms_index: usize) {
        for (part_index, part) in mms.parts.iter().enumerate() {
            if !is_attachment(part) {
                continue;
            }

            let mut stats = self.stats.get();
            stats.identified += 1;
            self.stats.set(stats);

            let file_name = attachment_file_name(part, mms_index, part_index);
            match self.save(part, &file_name) {
                Ok(len) => {
                    debug!("Extracted {} ({} bytes)", file_name, len);
                    let mut stats = self.stats.get();
                    stats.written += 1;
                    self.stats.set(stats);
                }
                Err(message) => self.diagnostics.borrow_mut().push(
                    DiagnosticKind::Attachment,
                    format!(
                        "part {} of mms {} ({}) not extracted: {}",
                        part_index, mms_index, file_name, message
                    ),
                ),
            }
        }
    }

    fn save(&self, part: &MmsPart, file_name: &str) -> Result<usize, String> {
        let bytes = decode_base64(&part.data).map_err(|e| format!("invalid base64: {}", e))?;
        write_atomic(&self.directory.join(file_name), &bytes)
            .map_err(|e| format!("cannot write file: {}", e))?;
        Ok(bytes.len())
    }
}

/// Writes to a sibling temporary file then renames it over `path`, so a
/// failed write never leaves a truncated attachment behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let result = File::create(&temp_path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });

    match result.and_then(|()| fs::rename(&temp_path, path)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&temp_path);
            Err(err)
        }
    }
}

impl RecordWriter for AttachmentWriter {
    fn name(&self) -> &str {
        "attachments"
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        if let Record::Mms(mms) = record {
            let mms_index = self.next_mms_index.get();
            self.next_mms_index.set(mms_index + 1);
            self.extract(mms, mms_index);
        }
        Ok(())
    }

    fn close(&self) -> BackupResult<()> {
        let stats = self.stats.get();
        info!(
            "Attachments in {}: {} identified, {} written",
            self.directory.display(),
            stats.identified,
            stats.written
        );
        Ok(())
    }

    fn take_diagnostics(&self) -> Diagnostics {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

#[derive(Default)]
pub struct AttachmentWriterBuilder {
    directory: Option<PathBuf>,
}

impl AttachmentWriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target directory, created when missing.
    pub fn directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> BackupResult<AttachmentWriter> {
        let directory = self.directory.ok_or_else(|| {
            BackupError::Configuration("attachment writer needs a directory".to_string())
        })?;

        fs::create_dir_all(&directory).map_err(|e| {
            BackupError::sink(
                "attachments",
                format!("cannot create {}: {}", directory.display(), e),
            )
        })?;

        Ok(AttachmentWriter {
            directory,
            next_mms_index: Cell::new(0),
            stats: Cell::new(AttachmentStats::default()),
            diagnostics: RefCell::new(Diagnostics::new()),
        })
    }
}
