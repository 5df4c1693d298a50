//! Property-based tests for posting and reversal.
//!
//! - Balance conservation: every account equals opening + Σ posted deltas
//! - Trial balance: debit-normal changes equal credit-normal changes
//! - No double posting
//! - Reversal round-trip restores every balance

use chrono::NaiveDate;
use folio_shared::types::{AccountId, AccountingPeriodId, CompanyId, Currency, FiscalYearId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::account::{Account, AccountBook, AccountType, NormalBalance};
use super::error::LedgerError;
use super::fiscal::{AccountingPeriod, PeriodStatus};
use super::journal::tests::ctx;
use super::journal::{JournalEntry, JournalLine, NewJournalEntry};
use super::numbering::SequentialNumbering;
use super::posting::PostingService;
use super::reversal::{ReversalRequest, ReversalService};
use super::types::JournalEntryType;

const ACCOUNT_TYPES: [AccountType; 5] = [
    AccountType::Asset,
    AccountType::Liability,
    AccountType::Equity,
    AccountType::Income,
    AccountType::Expense,
];

/// Strategy to generate positive amounts (0.0001 to 100,000.0000).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Strategy to generate opening balances.
fn opening_balance() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|v| Decimal::new(v, 2))
}

/// A balanced entry as (debit account index, credit account index, amount) pairs.
fn entry_shape(accounts: usize) -> impl Strategy<Value = Vec<(usize, usize, Decimal)>> {
    prop::collection::vec((0..accounts, 0..accounts, positive_amount()), 1..5)
}

struct Ledger {
    book: AccountBook,
    ids: Vec<AccountId>,
    period: AccountingPeriod,
    company_id: CompanyId,
}

fn ledger(openings: &[Decimal]) -> Ledger {
    let company_id = CompanyId::new();
    let mut book = AccountBook::new();
    let ids = openings
        .iter()
        .enumerate()
        .map(|(i, opening)| {
            let account = Account::new(
                company_id,
                format!("{i:04}"),
                format!("Account {i}"),
                ACCOUNT_TYPES[i % 5],
            )
            .with_opening_balance(*opening);
            let id = account.id;
            book.insert(account);
            id
        })
        .collect();
    let period = AccountingPeriod {
        id: AccountingPeriodId::new(),
        fiscal_year_id: FiscalYearId::new(),
        company_id,
        name: "March 2024".into(),
        start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        status: PeriodStatus::Open,
    };
    Ledger {
        book,
        ids,
        period,
        company_id,
    }
}

fn build_entry(ledger: &Ledger, shape: &[(usize, usize, Decimal)]) -> JournalEntry {
    let mut entry = JournalEntry::new(
        NewJournalEntry {
            company_id: ledger.company_id,
            fiscal_year_id: ledger.period.fiscal_year_id,
            accounting_period_id: ledger.period.id,
            entry_type: JournalEntryType::Manual,
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            description: "generated".into(),
            reference: None,
            reference_number: None,
            currency: Currency::USD,
            exchange_rate: Decimal::ONE,
        },
        &ctx(),
    );
    let lines = shape
        .iter()
        .flat_map(|(d, c, amount)| {
            [
                JournalLine::debit(ledger.ids[*d], *amount).unwrap(),
                JournalLine::credit(ledger.ids[*c], *amount).unwrap(),
            ]
        })
        .collect();
    entry.replace_lines(lines).unwrap();
    entry
}

fn balances(book: &AccountBook, ids: &[AccountId]) -> Vec<Decimal> {
    ids.iter().map(|id| book.balance(*id).unwrap()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any sequence of balanced entries, each account's balance equals its
    /// opening balance plus the signed deltas of its posted lines.
    #[test]
    fn prop_balance_conservation(
        openings in prop::collection::vec(opening_balance(), 5..9),
        shapes in prop::collection::vec(entry_shape(5), 1..8),
    ) {
        let mut ledger = ledger(&openings);
        let mut posted_lines = Vec::new();

        for shape in &shapes {
            let mut entry = build_entry(&ledger, shape);
            PostingService::post(&mut entry, &ledger.period, &mut ledger.book, &ctx()).unwrap();
            posted_lines.extend(entry.lines().iter().cloned());
        }

        let mut check = ledger.book.clone();
        for id in &ledger.ids {
            let expected = check.recompute(*id, posted_lines.iter()).unwrap();
            prop_assert_eq!(ledger.book.balance(*id).unwrap(), expected);
        }

        // Trial balance: total debit-normal movement equals credit-normal movement.
        let (debit_side, credit_side) = ledger.ids.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(d, c), id| {
                let account = ledger.book.get(*id).unwrap();
                let movement = account.current_balance - account.opening_balance;
                match account.normal_balance {
                    NormalBalance::Debit => (d + movement, c),
                    NormalBalance::Credit => (d, c + movement),
                }
            },
        );
        prop_assert_eq!(debit_side, credit_side);
    }

    /// Posting the same entry twice fails the second time and applies once.
    #[test]
    fn prop_no_double_posting(
        openings in prop::collection::vec(opening_balance(), 5..6),
        shape in entry_shape(5),
    ) {
        let mut ledger = ledger(&openings);
        let mut entry = build_entry(&ledger, &shape);

        PostingService::post(&mut entry, &ledger.period, &mut ledger.book, &ctx()).unwrap();
        let after_first = balances(&ledger.book, &ledger.ids);

        let err = PostingService::post(&mut entry, &ledger.period, &mut ledger.book, &ctx())
            .unwrap_err();
        prop_assert_eq!(err, LedgerError::EntryAlreadyPosted(entry.id()));
        prop_assert_eq!(balances(&ledger.book, &ledger.ids), after_first);
    }

    /// Posting an entry and then its reversal leaves every balance unchanged.
    #[test]
    fn prop_reversal_round_trip(
        openings in prop::collection::vec(opening_balance(), 5..6),
        shape in entry_shape(5),
    ) {
        let mut ledger = ledger(&openings);
        let before = balances(&ledger.book, &ledger.ids);

        let mut entry = build_entry(&ledger, &shape);
        PostingService::post(&mut entry, &ledger.period, &mut ledger.book, &ctx()).unwrap();

        let request = ReversalRequest { post_immediately: true, ..ReversalRequest::default() };
        let reversal = ReversalService::reverse(
            &mut entry,
            &request,
            &ledger.period,
            &mut ledger.book,
            &SequentialNumbering::new("JE"),
            &ctx(),
        ).unwrap();

        prop_assert_eq!(balances(&ledger.book, &ledger.ids), before);
        prop_assert_eq!(reversal.total_debit(), entry.total_credit());
        prop_assert_eq!(reversal.lines().len(), entry.lines().len());
    }
}
