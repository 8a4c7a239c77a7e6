use log::info;

use crate::{
    core::item::RecordWriter,
    error::BackupResult,
    model::{BackupInfo, Record},
};

/// Logs every record at `info` level, for a quick look at a backup.
#[derive(Default)]
pub struct LoggerWriter {}

impl RecordWriter for LoggerWriter {
    fn name(&self) -> &str {
        "logger"
    }

    fn open(&self, info: &BackupInfo) -> BackupResult<()> {
        info!("Backup:{:?}", info);
        Ok(())
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        info!("Record:{:?}", record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sms;

    #[test]
    fn logger_accepts_every_record() {
        let writer = LoggerWriter::default();
        writer.open(&BackupInfo::default()).unwrap();
        writer.write(&Record::Sms(Sms::default())).unwrap();
        writer.close().unwrap();
    }
}
