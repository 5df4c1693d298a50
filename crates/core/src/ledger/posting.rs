//! Posting service: applies a journal entry to account balances.
//!
//! Posting is all-or-nothing. Every precondition is checked and every balance
//! delta is planned before the entry or the account book is touched.

use chrono::NaiveDate;
use folio_shared::types::JournalEntryId;
use rust_decimal::Decimal;

use super::account::{AccountBook, BalanceDelta};
use super::error::LedgerError;
use super::fiscal::AccountingPeriod;
use super::journal::JournalEntry;
use super::types::{JournalStatus, PostingContext};

/// Outcome of a successful posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingReceipt {
    /// The posted entry.
    pub entry_id: JournalEntryId,
    /// Posting date recorded on the entry.
    pub posting_date: NaiveDate,
    /// Authoritative debit total.
    pub total_debit: Decimal,
    /// Authoritative credit total.
    pub total_credit: Decimal,
    /// Per-account balance changes, ordered by account id.
    pub deltas: Vec<BalanceDelta>,
}

/// Stateless posting logic.
pub struct PostingService;

impl PostingService {
    /// Checks everything that does not depend on account state.
    ///
    /// Order of checks:
    /// 1. status is draft or submitted (`EntryAlreadyPosted` / `InvalidState`)
    /// 2. totals are equal (`UnbalancedEntry`)
    /// 3. at least two lines (`InsufficientLines`)
    /// 4. the period is the entry's own, open (`ClosedPeriod`), and covers the
    ///    entry date (`EntryDateOutsidePeriod`)
    pub fn validate(entry: &JournalEntry, period: &AccountingPeriod) -> Result<(), LedgerError> {
        match entry.status() {
            JournalStatus::Draft | JournalStatus::Submitted => {}
            JournalStatus::Posted => return Err(LedgerError::EntryAlreadyPosted(entry.id())),
            JournalStatus::Cancelled => {
                return Err(LedgerError::invalid_state(
                    entry.label(),
                    JournalStatus::Cancelled,
                    "draft or submitted",
                ));
            }
        }

        if !entry.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debit: entry.total_debit(),
                credit: entry.total_credit(),
            });
        }

        if entry.lines().len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }

        if period.id != entry.accounting_period_id() {
            return Err(LedgerError::NoFiscalPeriod(entry.entry_date()));
        }
        period.ensure_accepts(entry.entry_date())
    }

    /// Posts an entry against the account book.
    ///
    /// On success the entry is `Posted` (posting date, poster and timestamp
    /// recorded from `ctx`) and every line's signed delta has been added to its
    /// account. On error neither the entry nor the book has changed.
    pub fn post(
        entry: &mut JournalEntry,
        period: &AccountingPeriod,
        accounts: &mut AccountBook,
        ctx: &PostingContext,
    ) -> Result<PostingReceipt, LedgerError> {
        Self::validate(entry, period)?;

        let deltas = accounts.plan(entry.lines())?;
        accounts.apply(&deltas)?;
        entry.mark_posted(ctx);

        Ok(PostingReceipt {
            entry_id: entry.id(),
            posting_date: ctx.today(),
            total_debit: entry.total_debit(),
            total_credit: entry.total_credit(),
            deltas,
        })
    }
}
