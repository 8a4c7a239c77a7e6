//! Export settings, loadable from JSON.
//!
//! ```
//! use sbr_batch::config::ExportConfig;
//!
//! let config = ExportConfig::from_json_str(r#"{ "output_dir": "out", "sqlite": false }"#).unwrap();
//!
//! assert!(config.tsv);
//! assert!(!config.sqlite);
//! assert_eq!(config.attachment_dir, "attachments");
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::item::RecordWriter;
use crate::core::job::JobBuilder;
use crate::error::{BackupError, BackupResult};
use crate::item::attachment::{AttachmentWriter, AttachmentWriterBuilder};
use crate::item::tsv::{TsvWriter, TsvWriterBuilder};
use crate::model::BackupKind;

#[cfg(feature = "logger")]
use crate::item::logger::LoggerWriter;
#[cfg(feature = "rdbc-sqlite")]
use crate::item::rdbc::{SqliteWriter, SqliteWriterBuilder};

/// Which outputs an export produces and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving every output.
    pub output_dir: PathBuf,

    /// Tab-separated tables.
    pub tsv: bool,

    /// Relational database. Needs the `rdbc-sqlite` feature.
    pub sqlite: bool,

    /// Extracted attachment files.
    pub attachments: bool,

    /// Log every record. Needs the `logger` feature.
    pub logger: bool,

    /// Database file name, relative to `output_dir`.
    pub sqlite_file: String,

    /// Attachment directory, relative to `output_dir`.
    pub attachment_dir: String,

    /// Decoder read buffer in bytes; the decoder default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_capacity: Option<usize>,

    /// Build a contact directory from the messages files.
    pub resolve_contacts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            tsv: true,
            sqlite: cfg!(feature = "rdbc-sqlite"),
            attachments: true,
            logger: false,
            sqlite_file: "sbr.db".to_string(),
            attachment_dir: "attachments".to_string(),
            reader_capacity: None,
            resolve_contacts: true,
        }
    }
}

impl ExportConfig {
    pub fn from_json_str(json: &str) -> BackupResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BackupError::Configuration(format!("invalid export config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> BackupResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BackupError::Configuration(format!("cannot open {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            BackupError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        debug!("Loaded export config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> BackupResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BackupError::Configuration(e.to_string()))
    }

    /// Rejects settings no export could run with.
    pub fn validate(&self) -> BackupResult<()> {
        if !(self.tsv || self.sqlite || self.attachments || self.logger) {
            return Err(BackupError::Configuration("no output is enabled".to_string()));
        }
        if self.sqlite && !cfg!(feature = "rdbc-sqlite") {
            return Err(BackupError::Configuration(
                "sqlite output needs the rdbc-sqlite feature".to_string(),
            ));
        }
        if self.logger && !cfg!(feature = "logger") {
            return Err(BackupError::Configuration(
                "logger output needs the logger feature".to_string(),
            ));
        }
        if self.sqlite && self.sqlite_file.trim().is_empty() {
            return Err(BackupError::Configuration("sqlite_file is empty".to_string()));
        }
        if self.attachments && self.attachment_dir.trim().is_empty() {
            return Err(BackupError::Configuration(
                "attachment_dir is empty".to_string(),
            ));
        }
        if self.reader_capacity == Some(0) {
            return Err(BackupError::Configuration(
                "reader_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.output_dir.join(&self.sqlite_file)
    }

    pub fn attachment_path(&self) -> PathBuf {
        self.output_dir.join(&self.attachment_dir)
    }

    pub fn contacts_path(&self) -> PathBuf {
        self.output_dir.join("contacts.tsv")
    }

    /// Builds the enabled writers that have something to do with `kind`.
    ///
    /// The relational store and the attachment directory only hold messages,
    /// so a calls backup gets neither.
    pub fn open_writers(&self, kind: BackupKind) -> BackupResult<ExportWriters> {
        self.validate()?;
        info!("Opening {} writers in {}", kind, self.output_dir.display());

        let messages = kind == BackupKind::Messages;
        let mut writers = ExportWriters::default();

        if self.tsv {
            writers.tsv = Some(TsvWriterBuilder::new().from_directory(&self.output_dir, kind)?);
        }
        #[cfg(feature = "rdbc-sqlite")]
        {
            if self.sqlite && messages {
                writers.sqlite = Some(SqliteWriterBuilder::new().path(self.sqlite_path()).build()?);
            }
        }
        if self.attachments && messages {
            writers.attachments = Some(
                AttachmentWriterBuilder::new()
                    .directory(self.attachment_path())
                    .build()?,
            );
        }
        #[cfg(feature = "logger")]
        {
            if self.logger {
                writers.logger = Some(LoggerWriter::default());
            }
        }

        if writers.is_empty() {
            return Err(BackupError::Configuration(format!(
                "no enabled output handles {} backups",
                kind
            )));
        }
        Ok(writers)
    }

    /// Registers `writers` for `kind` on a job and applies the reader and
    /// contact settings.
    pub fn configure_job<'a>(
        &self,
        mut builder: JobBuilder<'a>,
        kind: BackupKind,
        writers: &'a ExportWriters,
    ) -> JobBuilder<'a> {
        for writer in writers.writers() {
            builder = builder.writer(kind, writer);
        }
        if let Some(capacity) = self.reader_capacity {
            builder = builder.capacity(capacity);
        }
        builder.resolve_contacts(self.resolve_contacts)
    }
}

/// The writers built by [`ExportConfig::open_writers`].
#[derive(Default)]
pub struct ExportWriters {
    pub tsv: Option<TsvWriter<File>>,
    #[cfg(feature = "rdbc-sqlite")]
    pub sqlite: Option<SqliteWriter>,
    pub attachments: Option<AttachmentWriter>,
    #[cfg(feature = "logger")]
    pub logger: Option<LoggerWriter>,
}

impl ExportWriters {
    /// Every built writer, in fan-out order. The database comes last, so it
    /// only commits once every other output closed cleanly.
    pub fn writers(&self) -> Vec<&dyn RecordWriter> {
        let mut writers: Vec<&dyn RecordWriter> = Vec::new();
        if let Some(tsv) = &self.tsv {
            writers.push(tsv);
        }
        if let Some(attachments) = &self.attachments {
            writers.push(attachments);
        }
        #[cfg(feature = "logger")]
        {
            if let Some(logger) = &self.logger {
                writers.push(logger);
            }
        }
        #[cfg(feature = "rdbc-sqlite")]
        {
            if let Some(sqlite) = &self.sqlite {
                writers.push(sqlite);
            }
        }
        writers
    }

    pub fn is_empty(&self) -> bool {
        self.writers().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsv_only(dir: &Path) -> ExportConfig {
        ExportConfig {
            output_dir: dir.to_path_buf(),
            sqlite: false,
            attachments: false,
            ..Default::default()
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = ExportConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn json_round_trip_keeps_settings() {
        let config = ExportConfig {
            reader_capacity: Some(4096),
            resolve_contacts: false,
            ..Default::default()
        };
        let loaded = ExportConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn unusable_settings_are_rejected() {
        let none = r#"{ "tsv": false, "sqlite": false, "attachments": false, "logger": false }"#;
        assert!(matches!(
            ExportConfig::from_json_str(none),
            Err(BackupError::Configuration(_))
        ));
        assert!(matches!(
            ExportConfig::from_json_str(r#"{ "reader_capacity": 0 }"#),
            Err(BackupError::Configuration(_))
        ));
        assert!(matches!(
            ExportConfig::from_json_str(r#"{ "tsv": "yes" }"#),
            Err(BackupError::Configuration(_))
        ));
    }

    #[test]
    fn config_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{ "output_dir": "/tmp/out", "attachment_dir": "media" }"#).unwrap();

        let config = ExportConfig::from_path(&path).unwrap();
        assert_eq!(config.attachment_path(), PathBuf::from("/tmp/out/media"));
        assert!(ExportConfig::from_path(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn writers_follow_backup_kind() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            attachments: true,
            ..tsv_only(dir.path())
        };

        let messages = config.open_writers(BackupKind::Messages).unwrap();
        assert!(messages.tsv.is_some());
        assert!(messages.attachments.is_some());
        assert!(dir.path().join("sms.tsv").exists());
        assert!(dir.path().join("mms.tsv").exists());

        let calls = config.open_writers(BackupKind::Calls).unwrap();
        assert!(calls.attachments.is_none());
        assert_eq!(calls.writers().len(), 1);
        assert!(dir.path().join("calls.tsv").exists());
    }

    #[test]
    fn calls_without_a_calls_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            tsv: false,
            attachments: true,
            ..tsv_only(dir.path())
        };

        assert!(matches!(
            config.open_writers(BackupKind::Calls),
            Err(BackupError::Configuration(_))
        ));
    }

    #[cfg(feature = "rdbc-sqlite")]
    #[test]
    fn sqlite_database_is_created_for_messages() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            sqlite: true,
            ..tsv_only(dir.path())
        };

        let writers = config.open_writers(BackupKind::Messages).unwrap();
        assert!(writers.sqlite.is_some());
        assert!(config.sqlite_path().exists());

        let last = writers.writers().last().map(|w| w.name().to_string());
        assert_eq!(last.as_deref(), Some("sqlite"));
    }
}
