//! Mocks of the outputs and writers the pipeline talks to.
use mockall::mock;

use std::io::{self, Write};

use sbr_batch::{
    core::item::RecordWriter,
    diagnostics::Diagnostics,
    error::BackupResult,
    item::tsv::Truncate,
    model::{BackupInfo, Record},
};

mock! {
    pub Output {}
    impl Write for Output {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
    impl Truncate for Output {
        fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    }
}

mock! {
    pub Writer {}
    impl RecordWriter for Writer {
        fn name(&self) -> &str;
        fn open(&self, info: &BackupInfo) -> BackupResult<()>;
        fn write(&self, record: &Record) -> BackupResult<()>;
        fn close(&self) -> BackupResult<()>;
        fn abort(&self) -> BackupResult<()>;
        fn take_diagnostics(&self) -> Diagnostics;
    }
}
