//! Double-entry bookkeeping logic.
//!
//! This module implements the general ledger kernel:
//! - Accounts and the account balance store
//! - Fiscal years, accounting periods and posting rules
//! - The journal entry aggregate and its state machine
//! - Posting, reversal and recurring generation
//! - Entry numbering

pub mod account;
pub mod error;
pub mod fiscal;
pub mod journal;
pub mod numbering;
pub mod posting;
pub mod recurring;
pub mod reversal;
pub mod types;

#[cfg(test)]
mod posting_props;

pub use account::{Account, AccountBook, AccountType, BalanceDelta, NormalBalance};
pub use error::LedgerError;
pub use fiscal::{
    AccountingPeriod, FiscalYear, FiscalYearStatus, PeriodStatus, find_period_for_date,
    resolve_active_period, validate_posting_period,
};
pub use journal::{
    EntryAudit, EntryTotals, ForeignAmounts, JournalEntry, JournalLine, NewJournalEntry,
    StoredJournalEntry,
};
pub use numbering::{EntryNumbering, SequentialNumbering};
pub use posting::{PostingReceipt, PostingService};
pub use recurring::{Frequency, RecurringService, RecurringTemplate, TemplateLine};
pub use reversal::{ReversalRequest, ReversalService};
pub use types::{
    Dimensions, EntrySide, JournalEntryType, JournalStatus, PostingContext, SourceReference,
};
