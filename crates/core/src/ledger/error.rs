//! Ledger error types for validation and state errors.
//!
//! Every variant carries the offending values so an operator can correct the
//! source data without guessing.

use chrono::NaiveDate;
use folio_shared::types::{AccountId, CompanyId, JournalEntryId, JournalLineId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::fiscal::PeriodStatus;
use super::types::JournalStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Journal entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Journal entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Amount must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Line must carry exactly one non-zero side.
    #[error("Journal line needs a debit or a credit, not both (debit {debit}, credit {credit})")]
    InvalidLine {
        /// Debit amount supplied.
        debit: Decimal,
        /// Credit amount supplied.
        credit: Decimal,
    },

    /// Line not found on the entry.
    #[error("Journal line not found: {0}")]
    LineNotFound(JournalLineId),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    // ========== Fiscal Period Errors ==========
    /// No fiscal year or period covers the date.
    #[error("No fiscal period found for date {0}")]
    NoFiscalPeriod(NaiveDate),

    /// No open period in the company's default fiscal year covers the date.
    #[error("No active fiscal period for company {company_id} on {date}")]
    NoActivePeriod {
        /// Company being processed.
        company_id: CompanyId,
        /// Date that needed a period.
        date: NaiveDate,
    },

    /// Accounting period does not accept postings.
    #[error("Accounting period {period} is {status}, no posting allowed")]
    ClosedPeriod {
        /// Period name.
        period: String,
        /// Current period status.
        status: PeriodStatus,
    },

    /// Entry date falls outside the entry's accounting period.
    #[error("Entry date {date} is outside the accounting period {start} to {end}")]
    EntryDateOutsidePeriod {
        /// Entry date.
        date: NaiveDate,
        /// Period start (inclusive).
        start: NaiveDate,
        /// Period end (inclusive).
        end: NaiveDate,
    },

    // ========== State Errors ==========
    /// Journal entry has already been posted.
    #[error("Journal entry {0} is already posted")]
    EntryAlreadyPosted(JournalEntryId),

    /// Source document has already been posted to the ledger.
    #[error("{document} is already posted to journal entry {journal_entry_id}")]
    DocumentAlreadyPosted {
        /// Document description, e.g. "Sales invoice INV-001".
        document: String,
        /// The existing journal entry.
        journal_entry_id: JournalEntryId,
    },

    /// Entity is not in the state the operation requires.
    #[error("{entity} is {current}, expected {required}")]
    InvalidState {
        /// Entity description.
        entity: String,
        /// Current state.
        current: String,
        /// Required state(s).
        required: String,
    },

    /// Lines can only be modified while the entry is a draft.
    #[error("Cannot modify lines of a {0} journal entry")]
    CannotModify(JournalStatus),

    /// Only posted entries can be reversed.
    #[error("Journal entry {0} is not posted")]
    NotPosted(JournalEntryId),

    /// Reversals cannot be reversed.
    #[error("Journal entry {0} is itself a reversal")]
    AlreadyReversal(JournalEntryId),

    /// Entry already has a reversal.
    #[error("Journal entry {entry_id} is already reversed by {reversal_entry_id}")]
    AlreadyReversed {
        /// The original entry.
        entry_id: JournalEntryId,
        /// Its existing reversal.
        reversal_entry_id: JournalEntryId,
    },

    /// Adding a schedule step overflowed the calendar.
    #[error("Cannot advance schedule beyond {0}")]
    ScheduleOverflow(NaiveDate),

    /// A generated entry failed its post-construction balance check.
    #[error("Internal inconsistency: generated entry unbalanced. Debit: {debit}, Credit: {credit}")]
    InternalInconsistency {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Builds an [`LedgerError::InvalidState`].
    pub fn invalid_state(
        entity: impl Into<String>,
        current: impl ToString,
        required: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity: entity.into(),
            current: current.to_string(),
            required: required.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::LineNotFound(_) => "LINE_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::NoFiscalPeriod(_) => "NO_FISCAL_PERIOD",
            Self::NoActivePeriod { .. } => "NO_ACTIVE_PERIOD",
            Self::ClosedPeriod { .. } => "CLOSED_PERIOD",
            Self::EntryDateOutsidePeriod { .. } => "ENTRY_DATE_OUTSIDE_PERIOD",
            Self::EntryAlreadyPosted(_) | Self::DocumentAlreadyPosted { .. } => "ALREADY_POSTED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::CannotModify(_) => "CANNOT_MODIFY",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::AlreadyReversal(_) => "ALREADY_REVERSAL",
            Self::AlreadyReversed { .. } => "ALREADY_REVERSED",
            Self::ScheduleOverflow(_) => "SCHEDULE_OVERFLOW",
            Self::InternalInconsistency { .. } => "INTERNAL_INCONSISTENCY",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::UnbalancedEntry { .. }
            | Self::InvalidAmount(_)
            | Self::InvalidLine { .. }
            | Self::AccountInactive(_)
            | Self::EntryDateOutsidePeriod { .. } => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::LineNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::EntryAlreadyPosted(_)
            | Self::DocumentAlreadyPosted { .. }
            | Self::AlreadyReversal(_)
            | Self::AlreadyReversed { .. } => 409,

            // 422 Unprocessable - business rule violations
            Self::NoFiscalPeriod(_)
            | Self::NoActivePeriod { .. }
            | Self::ClosedPeriod { .. }
            | Self::InvalidState { .. }
            | Self::CannotModify(_)
            | Self::NotPosted(_)
            | Self::ScheduleOverflow(_) => 422,

            // 500 Internal Server Error
            Self::InternalInconsistency { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
