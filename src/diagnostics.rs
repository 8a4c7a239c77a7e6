use std::fmt;

use log::warn;

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A scalar attribute could not be parsed and a sentinel was substituted.
    FieldFallback,
    /// One attachment part could not be decoded or written.
    Attachment,
    /// Two different display names were seen for the same canonical number.
    ContactConflict,
    /// A multi-recipient message could not be paired with its names.
    ContactAmbiguity,
    /// The root `count` attribute disagrees with the decoded record count.
    CountMismatch,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::FieldFallback => "field fallback",
            DiagnosticKind::Attachment => "attachment",
            DiagnosticKind::ContactConflict => "contact conflict",
            DiagnosticKind::ContactAmbiguity => "contact ambiguity",
            DiagnosticKind::CountMismatch => "count mismatch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Ordered list of diagnostics gathered while processing one or more files.
///
/// Every pushed entry is also logged at `warn` level, so callers that never
/// inspect the list still see the problem in their logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<M: Into<String>>(&mut self, kind: DiagnosticKind, message: M) {
        let diagnostic = Diagnostic {
            kind,
            message: message.into(),
        };
        warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Moves every entry of `other` to the end of this list without logging them again.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.entries.append(&mut other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// One line per kind, e.g. `field fallback: 3`, in a stable order.
    pub fn summary(&self) -> Vec<String> {
        let mut kinds: Vec<DiagnosticKind> = self.entries.iter().map(|d| d.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
            .into_iter()
            .map(|kind| format!("{}: {}", kind, self.count(kind)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
