use std::{
    cell::{Cell, RefCell},
    path::PathBuf,
    str::FromStr,
};

use log::{debug, error, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite, Transaction,
};
use tokio::runtime::{Builder, Runtime};

use crate::core::item::RecordWriter;
use crate::error::{BackupError, BackupResult};
use crate::item::payload::{decode_base64, recipients_json};
use crate::model::scalar::optional_text;
use crate::model::{BackupInfo, Flag, Mms, Record, Sms};

const SINK: &str = "sqlite";

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS sms (
        id integer primary key autoincrement,
        protocol text,
        address text,
        ty text,
        subject text,
        body text,
        service_center text,
        status integer,
        read integer,
        date long,
        locked boolean,
        date_sent long,
        readable_date text,
        contact_name text
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mms (
        id integer primary key autoincrement,
        text_only boolean,
        read integer,
        date long,
        locked boolean,
        date_sent long,
        readable_date text,
        contact_name text,
        seen boolean,
        from_address text,
        address text,
        message_classifier text,
        message_size text,
        addresses_joined text
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mms_parts (
        id integer primary key autoincrement,
        mms_id integer references mms(id),
        content_type text,
        name text,
        file_name text,
        content_display text,
        text text,
        raw_data blob
    )
    "#,
    r#"
    CREATE VIEW IF NOT EXISTS mms_view AS
    SELECT * FROM mms JOIN mms_parts ON mms.id = mms_parts.mms_id
    "#,
];

const INSERT_SMS: &str = r#"
    INSERT INTO sms (protocol, address, ty, subject, body, service_center, status, read, date, locked, date_sent, readable_date, contact_name)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const INSERT_MMS: &str = r#"
    INSERT INTO mms (text_only, read, date, locked, date_sent, readable_date, contact_name, seen, from_address, address, message_classifier, message_size, addresses_joined)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const INSERT_PART: &str = r#"
    INSERT INTO mms_parts (mms_id, content_type, name, file_name, content_display, text, raw_data)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const TABLES: [&str; 3] = ["sms", "mms", "mms_parts"];

fn sink_error(e: sqlx::Error) -> BackupError {
    BackupError::sink(SINK, e)
}

/// The numeric value of a raw code, `NULL` when absent or not a number.
fn code_value(code: &str) -> Option<i64> {
    code.trim().parse().ok()
}

fn flag_value(flag: &Flag) -> Option<bool> {
    flag.as_bool()
}

/// Writes messages into a SQLite database, one transaction per backup file.
///
/// The schema is created if absent when the writer is built. Each file is
/// imported inside a transaction begun by [`open`](RecordWriter::open) and
/// committed by [`close`](RecordWriter::close); an aborted or dropped writer
/// rolls back, so readers never see a partially imported file.
///
/// The writer owns a single-threaded tokio runtime and blocks on it, so it
/// must not be used from within another tokio runtime.
pub struct SqliteWriter {
    transaction: RefCell<Option<Transaction<'static, Sqlite>>>,
    pool: Pool<Sqlite>,
    runtime: Runtime,
    sms_rows: Cell<usize>,
    mms_rows: Cell<usize>,
    part_rows: Cell<usize>,
}

impl SqliteWriter {
    /// Rows inserted in the current transaction, as `(sms, mms, parts)`.
    pub fn pending_rows(&self) -> (usize, usize, usize) {
        (self.sms_rows.get(), self.mms_rows.get(), self.part_rows.get())
    }

    /// Committed rows of one of the `sms`, `mms` or `mms_parts` tables.
    ///
    /// Must not be called while a file is being imported.
    pub fn count_rows(&self, table: &str) -> BackupResult<i64> {
        if !TABLES.contains(&table) {
            return Err(BackupError::Configuration(format!("unknown table {}", table)));
        }
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.runtime
            .block_on(async { sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await })
            .map_err(sink_error)
    }

    fn reset_counters(&self) {
        self.sms_rows.set(0);
        self.mms_rows.set(0);
        self.part_rows.set(0);
    }

    fn rollback(&self) -> BackupResult<()> {
        let Some(tx) = self.transaction.borrow_mut().take() else {
            return Ok(());
        };
        let (sms, mms, parts) = self.pending_rows();
        self.reset_counters();

        self.runtime.block_on(tx.rollback()).map_err(sink_error)?;
        info!("Rolled back {} sms, {} mms and {} parts", sms, mms, parts);
        Ok(())
    }
}

impl RecordWriter for SqliteWriter {
    fn name(&self) -> &str {
        SINK
    }

    fn open(&self, _info: &BackupInfo) -> BackupResult<()> {
        self.rollback()?;

        let tx = self.runtime.block_on(self.pool.begin()).map_err(sink_error)?;
        debug!("Began sqlite transaction");
        *self.transaction.borrow_mut() = Some(tx);
        Ok(())
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        let mut guard = self.transaction.borrow_mut();
        let Some(tx) = guard.as_mut() else {
            return Err(BackupError::sink(SINK, "record written outside of a transaction"));
        };

        match record {
            Record::Sms(sms) => {
                self.runtime.block_on(insert_sms(tx, sms))?;
                self.sms_rows.set(self.sms_rows.get() + 1);
            }
            Record::Mms(mms) => {
                let parts = self.runtime.block_on(insert_mms(tx, mms))?;
                self.mms_rows.set(self.mms_rows.get() + 1);
                self.part_rows.set(self.part_rows.get() + parts);
            }
            Record::Call(_) => debug!("Calls are not stored in sqlite"),
        }
        Ok(())
    }

    fn close(&self) -> BackupResult<()> {
        let Some(tx) = self.transaction.borrow_mut().take() else {
            return Ok(());
        };
        let (sms, mms, parts) = self.pending_rows();
        self.reset_counters();

        self.runtime.block_on(tx.commit()).map_err(sink_error)?;
        info!("Committed {} sms, {} mms and {} parts", sms, mms, parts);
        Ok(())
    }

    fn abort(&self) -> BackupResult<()> {
        self.rollback()
    }
}

impl Drop for SqliteWriter {
    fn drop(&mut self) {
        if let Err(err) = self.rollback() {
            error!("Failed to roll back sqlite transaction: {}", err);
        }
        self.runtime.block_on(self.pool.close());
    }
}

async fn insert_sms(tx: &mut Transaction<'static, Sqlite>, sms: &Sms) -> BackupResult<()> {
    sqlx::query(INSERT_SMS)
        .bind(optional_text(&sms.protocol))
        .bind(sms.address.as_str())
        .bind(sms.message_type.to_string())
        .bind(optional_text(&sms.subject))
        .bind(sms.body.as_str())
        .bind(optional_text(&sms.service_center))
        .bind(code_value(sms.status.code()))
        .bind(code_value(sms.read.code()))
        .bind(sms.date.millis())
        .bind(flag_value(&sms.locked))
        .bind(sms.date_sent.millis())
        .bind(sms.readable_date.as_str())
        .bind(sms.contact_name.as_str())
        .execute(&mut **tx)
        .await
        .map_err(sink_error)?;
    Ok(())
}

/// Inserts the message then its parts; returns the number of parts.
async fn insert_mms(tx: &mut Transaction<'static, Sqlite>, mms: &Mms) -> BackupResult<usize> {
    let recipients = recipients_json(mms).map_err(|e| BackupError::sink(SINK, e))?;

    let result = sqlx::query(INSERT_MMS)
        .bind(flag_value(&mms.text_only))
        .bind(code_value(mms.read.code()))
        .bind(mms.date.millis())
        .bind(flag_value(&mms.locked))
        .bind(mms.date_sent.millis())
        .bind(mms.readable_date.as_str())
        .bind(mms.contact_name.as_str())
        .bind(flag_value(&mms.seen))
        .bind(optional_text(&mms.from_address))
        .bind(mms.address.as_str())
        .bind(optional_text(&mms.message_classifier))
        .bind(optional_text(&mms.message_size))
        .bind(recipients)
        .execute(&mut **tx)
        .await
        .map_err(sink_error)?;
    let mms_id = result.last_insert_rowid();

    for (index, part) in mms.parts.iter().enumerate() {
        let raw_data = match optional_text(&part.data) {
            Some(data) => Some(decode_base64(data).map_err(|e| {
                BackupError::sink(
                    SINK,
                    format!("part {} of mms {}: invalid base64 data: {}", index, mms_id, e),
                )
            })?),
            None => None,
        };

        sqlx::query(INSERT_PART)
            .bind(mms_id)
            .bind(optional_text(&part.content_type))
            .bind(optional_text(&part.name))
            .bind(optional_text(&part.file_name))
            .bind(optional_text(&part.content_display))
            .bind(optional_text(&part.text))
            .bind(raw_data)
            .execute(&mut **tx)
            .await
            .map_err(sink_error)?;
    }

    Ok(mms.parts.len())
}

/// Builds a [`SqliteWriter`] and creates the schema.
///
/// # Examples
///
/// ```
/// use sbr_batch::core::item::RecordWriter;
/// use sbr_batch::item::rdbc::SqliteWriterBuilder;
/// use sbr_batch::model::{BackupInfo, Record, Sms};
///
/// let writer = SqliteWriterBuilder::new().in_memory().build().unwrap();
///
/// writer.open(&BackupInfo::default()).unwrap();
/// writer.write(&Record::Sms(Sms::default())).unwrap();
/// writer.close().unwrap();
///
/// assert_eq!(writer.count_rows("sms").unwrap(), 1);
/// ```
#[derive(Default)]
pub struct SqliteWriterBuilder {
    path: Option<PathBuf>,
    in_memory: bool,
}

impl SqliteWriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database file, created if missing.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// A private in-memory database, mostly useful for tests.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn build(self) -> BackupResult<SqliteWriter> {
        let options = match (self.path, self.in_memory) {
            (_, true) => SqliteConnectOptions::from_str("sqlite::memory:").map_err(sink_error)?,
            (Some(path), false) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            (None, false) => {
                return Err(BackupError::Configuration(
                    "a sqlite writer needs a database path".to_string(),
                ));
            }
        };

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackupError::sink(SINK, e))?;

        // One connection: an in-memory database lives and dies with it.
        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options),
            )
            .map_err(sink_error)?;

        runtime
            .block_on(async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&pool).await?;
                }
                Ok::<(), sqlx::Error>(())
            })
            .map_err(sink_error)?;
        debug!("Sqlite schema ready");

        Ok(SqliteWriter {
            transaction: RefCell::new(None),
            pool,
            runtime,
            sms_rows: Cell::new(0),
            mms_rows: Cell::new(0),
            part_rows: Cell::new(0),
        })
    }
}
