//! Reversal of posted journal entries.
//!
//! A reversal is a new entry whose lines mirror the original (debits and
//! credits swapped, foreign amounts included). Original and reversal are linked
//! both ways, and an entry can be reversed at most once.

use chrono::NaiveDate;

use super::account::AccountBook;
use super::error::LedgerError;
use super::fiscal::AccountingPeriod;
use super::journal::{JournalEntry, NewJournalEntry};
use super::numbering::EntryNumbering;
use super::posting::PostingService;
use super::types::{JournalEntryType, JournalStatus, PostingContext};

/// Options for a reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReversalRequest {
    /// Narrative; defaults to "Reversal of <entry number>".
    pub description: Option<String>,
    /// Entry date; defaults to the original entry date.
    pub date: Option<NaiveDate>,
    /// Post the reversal in the same unit of work.
    pub post_immediately: bool,
}

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Checks that `original` can be reversed.
    pub fn validate(original: &JournalEntry) -> Result<(), LedgerError> {
        if original.status() != JournalStatus::Posted {
            return Err(LedgerError::NotPosted(original.id()));
        }
        if original.is_reversal() {
            return Err(LedgerError::AlreadyReversal(original.id()));
        }
        if let Some(reversal_entry_id) = original.reversal_entry_id() {
            return Err(LedgerError::AlreadyReversed {
                entry_id: original.id(),
                reversal_entry_id,
            });
        }
        Ok(())
    }

    /// Builds the draft mirror of `original` without linking it.
    ///
    /// `period` must cover the reversal date (the original's period unless a
    /// different date is requested).
    pub fn build(
        original: &JournalEntry,
        request: &ReversalRequest,
        period: &AccountingPeriod,
        numbering: &dyn EntryNumbering,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, LedgerError> {
        Self::validate(original)?;

        let entry_date = request.date.unwrap_or(original.entry_date());
        if !period.contains_date(entry_date) {
            return Err(LedgerError::EntryDateOutsidePeriod {
                date: entry_date,
                start: period.start_date,
                end: period.end_date,
            });
        }

        let description = request.description.clone().unwrap_or_else(|| {
            let number = original
                .entry_number()
                .map_or_else(|| original.id().to_string(), str::to_owned);
            format!("Reversal of {number}")
        });

        let mut reversal = JournalEntry::new(
            NewJournalEntry {
                company_id: original.company_id(),
                fiscal_year_id: period.fiscal_year_id,
                accounting_period_id: period.id,
                entry_type: JournalEntryType::Reversing,
                entry_date,
                description,
                reference: original.reference(),
                reference_number: original.reference_number().map(str::to_owned),
                currency: original.currency(),
                exchange_rate: original.exchange_rate(),
            },
            ctx,
        );
        reversal.assign_number(numbering);
        reversal.mark_reversal_of(original.id());
        reversal.replace_lines(original.lines().iter().map(|l| l.mirrored()).collect())?;

        Ok(reversal)
    }

    /// Reverses a posted entry.
    ///
    /// The original is linked to the reversal only after everything else
    /// succeeded, including posting when `post_immediately` is set, so a
    /// failure leaves the original unchanged.
    pub fn reverse(
        original: &mut JournalEntry,
        request: &ReversalRequest,
        period: &AccountingPeriod,
        accounts: &mut AccountBook,
        numbering: &dyn EntryNumbering,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, LedgerError> {
        let mut reversal = Self::build(original, request, period, numbering, ctx)?;

        if request.post_immediately {
            PostingService::post(&mut reversal, period, accounts, ctx)?;
        }

        original.link_reversal(reversal.id());
        Ok(reversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::{Account, AccountType};
    use crate::ledger::fiscal::PeriodStatus;
    use crate::ledger::journal::JournalLine;
    use crate::ledger::journal::tests::ctx;
    use crate::ledger::numbering::SequentialNumbering;
    use crate::ledger::posting::tests::{draft, fixture};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn posted(fx: &mut crate::ledger::posting::tests::Fixture, amount: Decimal) -> JournalEntry {
        let mut entry = draft(fx, amount);
        entry.assign_number(&SequentialNumbering::starting_at("JE", 7));
        PostingService::post(&mut entry, &fx.period, &mut fx.book, &ctx()).unwrap();
        entry
    }

    #[test]
    fn test_reverse_builds_linked_mirror_draft() {
        let mut fx = fixture();
        let mut original = posted(&mut fx, dec!(300));
        let numbering = SequentialNumbering::new("JE");

        let reversal = ReversalService::reverse(
            &mut original,
            &ReversalRequest::default(),
            &fx.period,
            &mut fx.book,
            &numbering,
            &ctx(),
        )
        .unwrap();

        assert_eq!(reversal.status(), JournalStatus::Draft);
        assert_eq!(reversal.entry_type(), JournalEntryType::Reversing);
        assert!(reversal.is_reversal());
        assert_eq!(reversal.reversed_entry_id(), Some(original.id()));
        assert_eq!(original.reversal_entry_id(), Some(reversal.id()));
        assert_eq!(reversal.description(), "Reversal of JE-2024-000007");
        assert_eq!(reversal.entry_date(), original.entry_date());
        assert_eq!(reversal.lines()[0].credit, dec!(300));
        assert_eq!(reversal.lines()[1].debit, dec!(300));
        assert!(reversal.is_balanced());

        // Draft reversal leaves balances alone.
        assert_eq!(fx.book.balance(fx.cash), Some(dec!(300)));
    }

    #[test]
    fn test_reverse_and_post_restores_balances() {
        let mut fx = fixture();
        let mut original = posted(&mut fx, dec!(300));
        let request = ReversalRequest {
            post_immediately: true,
            ..ReversalRequest::default()
        };

        let reversal = ReversalService::reverse(
            &mut original,
            &request,
            &fx.period,
            &mut fx.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        )
        .unwrap();

        assert_eq!(reversal.status(), JournalStatus::Posted);
        assert_eq!(fx.book.balance(fx.cash), Some(Decimal::ZERO));
        assert_eq!(fx.book.balance(fx.revenue), Some(Decimal::ZERO));
    }

    #[test]
    fn test_reverse_three_line_invoice_entry() {
        let mut fx = fixture();
        let ar = Account::new(fx.company_id, "1100", "Receivable", AccountType::Asset);
        let tax = Account::new(fx.company_id, "2200", "Tax payable", AccountType::Liability);
        let (ar_id, tax_id) = (ar.id, tax.id);
        fx.book.insert(ar);
        fx.book.insert(tax);

        let mut original = draft(&fx, dec!(1000));
        original
            .replace_lines(vec![
                JournalLine::debit(ar_id, dec!(1100)).unwrap(),
                JournalLine::credit(fx.revenue, dec!(1000)).unwrap(),
                JournalLine::credit(tax_id, dec!(100)).unwrap(),
            ])
            .unwrap();
        PostingService::post(&mut original, &fx.period, &mut fx.book, &ctx()).unwrap();
        assert_eq!(fx.book.balance(ar_id), Some(dec!(1100)));
        assert_eq!(fx.book.balance(tax_id), Some(dec!(100)));

        let request = ReversalRequest {
            post_immediately: true,
            ..ReversalRequest::default()
        };
        let reversal = ReversalService::reverse(
            &mut original,
            &request,
            &fx.period,
            &mut fx.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        )
        .unwrap();

        let mirrored: Vec<_> = reversal
            .lines()
            .iter()
            .map(|l| (l.account_id, l.debit, l.credit))
            .collect();
        assert_eq!(
            mirrored,
            vec![
                (ar_id, Decimal::ZERO, dec!(1100)),
                (fx.revenue, dec!(1000), Decimal::ZERO),
                (tax_id, dec!(100), Decimal::ZERO),
            ]
        );
        assert_eq!(reversal.total_debit(), dec!(1100));
        assert_eq!(reversal.total_credit(), dec!(1100));
        assert_eq!(fx.book.balance(ar_id), Some(Decimal::ZERO));
        assert_eq!(fx.book.balance(fx.revenue), Some(Decimal::ZERO));
        assert_eq!(fx.book.balance(tax_id), Some(Decimal::ZERO));
    }

    #[test]
    fn test_reverse_preconditions() {
        let mut fx = fixture();
        let numbering = SequentialNumbering::new("JE");

        let mut unposted = draft(&fx, dec!(10));
        let err = ReversalService::reverse(
            &mut unposted,
            &ReversalRequest::default(),
            &fx.period,
            &mut fx.book,
            &numbering,
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::NotPosted(unposted.id()));

        let mut original = posted(&mut fx, dec!(10));
        let request = ReversalRequest {
            post_immediately: true,
            ..ReversalRequest::default()
        };
        let mut reversal = ReversalService::reverse(
            &mut original,
            &request,
            &fx.period,
            &mut fx.book,
            &numbering,
            &ctx(),
        )
        .unwrap();

        let err = ReversalService::reverse(
            &mut original,
            &ReversalRequest::default(),
            &fx.period,
            &mut fx.book,
            &numbering,
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyReversed {
                entry_id: original.id(),
                reversal_entry_id: reversal.id(),
            }
        );

        let err = ReversalService::reverse(
            &mut reversal,
            &ReversalRequest::default(),
            &fx.period,
            &mut fx.book,
            &numbering,
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::AlreadyReversal(reversal.id()));
    }

    #[test]
    fn test_failed_immediate_post_leaves_original_unlinked() {
        let mut fx = fixture();
        let mut original = posted(&mut fx, dec!(80));
        fx.period.status = PeriodStatus::Closed;
        let request = ReversalRequest {
            post_immediately: true,
            ..ReversalRequest::default()
        };

        let err = ReversalService::reverse(
            &mut original,
            &request,
            &fx.period,
            &mut fx.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CLOSED_PERIOD");
        assert_eq!(original.reversal_entry_id(), None);
        assert_eq!(fx.book.balance(fx.cash), Some(dec!(80)));
    }

    #[test]
    fn test_custom_date_and_description() {
        let mut fx = fixture();
        let mut original = posted(&mut fx, dec!(15));
        let request = ReversalRequest {
            description: Some("Wrong customer".into()),
            date: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
            post_immediately: false,
        };
        let reversal = ReversalService::reverse(
            &mut original,
            &request,
            &fx.period,
            &mut fx.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        )
        .unwrap();
        assert_eq!(reversal.description(), "Wrong customer");
        assert_eq!(reversal.entry_date(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());

        let mut other = posted(&mut fx, dec!(15));
        let outside = ReversalRequest {
            date: Some(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            ..ReversalRequest::default()
        };
        let err = ReversalService::reverse(
            &mut other,
            &outside,
            &fx.period,
            &mut fx.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "ENTRY_DATE_OUTSIDE_PERIOD");
    }
}
