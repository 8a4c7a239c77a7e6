use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::text::{split_addresses, split_contact_names};
use crate::model::{Mms, Sms};

use super::normalize::{canonical_number, display_name, is_unknown_name};

/// One person as guessed from the messages exchanged with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub canonical_number: String,
    /// Every raw spelling of the number seen in the backups.
    pub raw_numbers: BTreeSet<String>,
}

/// Best-effort directory from canonical phone number to [`Contact`].
///
/// Nothing fed to the resolver can fail: conflicting names and records that
/// cannot be paired reliably are reported as diagnostics and left out.
#[derive(Debug, Clone, Default)]
pub struct ContactResolver {
    contacts: BTreeMap<String, Contact>,
    diagnostics: Diagnostics,
}

impl ContactResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a materialized record set.
    ///
    /// All single-recipient messages are applied before the multi-recipient
    /// ones, so a name seen on a direct message takes precedence.
    pub fn resolve(sms: &[Sms], mms: &[Mms]) -> Self {
        let mut resolver = Self::new();
        sms.iter().for_each(|sms| resolver.add_sms(sms));
        mms.iter().for_each(|mms| resolver.add_mms(mms));
        resolver
    }

    pub fn add_sms(&mut self, sms: &Sms) {
        self.observe_sms(&sms.address, &sms.contact_name);
    }

    pub fn add_mms(&mut self, mms: &Mms) {
        self.observe_mms(&mms.address, &mms.contact_name);
    }

    /// Records one raw number and its display name.
    pub fn observe_sms(&mut self, raw_number: &str, contact_name: &str) {
        self.merge(raw_number, display_name(contact_name));
    }

    /// Pairs a tilde-joined number list with a comma-joined name list.
    ///
    /// Lists of different lengths are skipped: the pairing cannot be recovered
    /// when a name contains a comma or a number has no name.
    pub fn observe_mms(&mut self, joined_numbers: &str, joined_names: &str) {
        let numbers = split_addresses(joined_numbers);
        let names = split_contact_names(joined_names);

        if numbers.len() != names.len() {
            let reason = if numbers.len() > names.len() {
                "a number probably has no known contact"
            } else {
                "a contact name probably contains a comma"
            };
            self.diagnostics.push(
                DiagnosticKind::ContactAmbiguity,
                format!(
                    "mms with {} numbers {:?} but {} names {:?} skipped: {}",
                    numbers.len(),
                    numbers,
                    names.len(),
                    names,
                    reason
                ),
            );
            return;
        }

        for (number, name) in numbers.into_iter().zip(&names) {
            self.merge(number, display_name(name));
        }
    }

    fn merge(&mut self, raw_number: &str, name: &str) {
        let raw_number = raw_number.trim();
        if raw_number.is_empty() {
            debug!("Ignoring empty number for {}", name);
            return;
        }
        let canonical = canonical_number(raw_number);

        let Some(contact) = self.contacts.get_mut(&canonical) else {
            self.contacts.insert(
                canonical.clone(),
                Contact {
                    name: name.to_string(),
                    canonical_number: canonical,
                    raw_numbers: BTreeSet::from([raw_number.to_string()]),
                },
            );
            return;
        };

        contact.raw_numbers.insert(raw_number.to_string());

        if contact.name == name || is_unknown_name(name) {
            return;
        }
        if is_unknown_name(&contact.name) {
            contact.name = name.to_string();
            return;
        }

        let message = format!(
            "{} has multiple names: keeping {:?}, ignoring {:?}",
            canonical, contact.name, name
        );
        self.diagnostics.push(DiagnosticKind::ContactConflict, message);
    }

    pub fn get(&self, canonical_number: &str) -> Option<&Contact> {
        self.contacts.get(canonical_number)
    }

    /// Looks a raw number up after canonicalizing it.
    pub fn lookup(&self, raw_number: &str) -> Option<&Contact> {
        self.contacts.get(&canonical_number(raw_number))
    }

    /// Contacts ordered by canonical number.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_map(self) -> BTreeMap<String, Contact> {
        self.contacts
    }
}
