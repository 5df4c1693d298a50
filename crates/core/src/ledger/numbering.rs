//! Journal entry numbering.

use chrono::{Datelike, NaiveDate};
use folio_shared::types::CompanyId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Serial number source for journal entries.
pub trait EntryNumbering: Send + Sync {
    /// Returns the next entry number for a company and entry date.
    fn next_number(&self, company_id: CompanyId, entry_date: NaiveDate) -> String;
}

/// `{prefix}-{year}-{sequence:06}` numbering backed by an in-process counter.
///
/// The persistence layer seeds it from the highest stored number inside the
/// same transaction that uses it.
#[derive(Debug)]
pub struct SequentialNumbering {
    prefix: String,
    next: AtomicU64,
}

impl SequentialNumbering {
    /// Starts numbering at 1.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    /// Starts numbering at `next`.
    #[must_use]
    pub fn starting_at(prefix: impl Into<String>, next: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(next.max(1)),
        }
    }

    /// Extracts the sequence from a number produced with `prefix`.
    #[must_use]
    pub fn parse_sequence(prefix: &str, number: &str) -> Option<u64> {
        let rest = number.strip_prefix(prefix)?.strip_prefix('-')?;
        let (_year, sequence) = rest.split_once('-')?;
        sequence.parse().ok()
    }
}

impl EntryNumbering for SequentialNumbering {
    fn next_number(&self, _company_id: CompanyId, entry_date: NaiveDate) -> String {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{sequence:06}", self.prefix, entry_date.year())
    }
}
