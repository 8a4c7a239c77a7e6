use std::cell::RefCell;

use log::debug;

use crate::core::item::RecordWriter;
use crate::error::BackupResult;
use crate::model::{BackupInfo, Record};

use super::resolver::ContactResolver;

/// Feeds one file's messages to a shared [`ContactResolver`].
///
/// Observations are buffered while the file is imported and only applied on
/// [`close`](RecordWriter::close), single-recipient messages first. An aborted
/// file contributes nothing.
pub struct ContactCollector<'r> {
    resolver: &'r RefCell<ContactResolver>,
    single: RefCell<Vec<(String, String)>>,
    group: RefCell<Vec<(String, String)>>,
}

impl<'r> ContactCollector<'r> {
    pub fn new(resolver: &'r RefCell<ContactResolver>) -> Self {
        Self {
            resolver,
            single: RefCell::new(Vec::new()),
            group: RefCell::new(Vec::new()),
        }
    }

    fn clear(&self) {
        self.single.borrow_mut().clear();
        self.group.borrow_mut().clear();
    }
}

impl RecordWriter for ContactCollector<'_> {
    fn name(&self) -> &str {
        "contacts"
    }

    fn open(&self, _info: &BackupInfo) -> BackupResult<()> {
        self.clear();
        Ok(())
    }

    fn write(&self, record: &Record) -> BackupResult<()> {
        match record {
            Record::Sms(sms) => self
                .single
                .borrow_mut()
                .push((sms.address.clone(), sms.contact_name.clone())),
            Record::Mms(mms) => self
                .group
                .borrow_mut()
                .push((mms.address.clone(), mms.contact_name.clone())),
            Record::Call(_) => {}
        }
        Ok(())
    }

    fn close(&self) -> BackupResult<()> {
        let mut resolver = self.resolver.borrow_mut();
        let single = self.single.take();
        let group = self.group.take();
        debug!(
            "Applying {} sms and {} mms contact observations",
            single.len(),
            group.len()
        );

        for (number, name) in &single {
            resolver.observe_sms(number, name);
        }
        for (numbers, names) in &group {
            resolver.observe_mms(numbers, names);
        }
        Ok(())
    }

    fn abort(&self) -> BackupResult<()> {
        self.clear();
        Ok(())
    }
}
