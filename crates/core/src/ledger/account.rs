//! Accounts and the account balance store.
//!
//! Balances are mutated only through posting: a posting plans its deltas
//! against the book first (every account must exist and be active), then
//! applies them all at once.

use folio_shared::types::{AccountId, CompanyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::error::LedgerError;
use super::journal::JournalLine;

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owners' residual interest.
    Equity,
    /// Revenue and other income.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Returns the normal balance side implied by the type.
    ///
    /// Asset/Expense are debit-normal; Liability/Equity/Income are credit-normal.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }

    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "income" | "revenue" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// The side on which an account's balance naturally grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// balance += debit - credit
    Debit,
    /// balance += credit - debit
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance change for a debit/credit pair.
    #[must_use]
    pub fn signed_delta(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }

    /// Returns the string representation of the side.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Parses a side from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for NormalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Chart-of-accounts code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Normal balance side.
    pub normal_balance: NormalBalance,
    /// Balance brought forward.
    pub opening_balance: Decimal,
    /// Opening balance plus every posted delta.
    pub current_balance: Decimal,
    /// Inactive accounts reject postings.
    pub is_active: bool,
    /// Parent account in the chart.
    pub parent_id: Option<AccountId>,
}

impl Account {
    /// Creates an active account with a zero balance and the type's normal side.
    #[must_use]
    pub fn new(
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: AccountId::new(),
            company_id,
            code: code.into(),
            name: name.into(),
            account_type,
            normal_balance: account_type.normal_balance(),
            opening_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            is_active: true,
            parent_id: None,
        }
    }

    /// Sets the opening balance and resets the current balance to it.
    #[must_use]
    pub fn with_opening_balance(mut self, opening_balance: Decimal) -> Self {
        self.opening_balance = opening_balance;
        self.current_balance = opening_balance;
        self
    }
}

/// The net effect of one posting on one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// Account being changed.
    pub account_id: AccountId,
    /// Sum of debits on this account within the posting.
    pub debit: Decimal,
    /// Sum of credits on this account within the posting.
    pub credit: Decimal,
    /// Signed change according to the account's normal side.
    pub delta: Decimal,
}

/// In-memory account balance store.
///
/// The persistence layer fills it with the accounts a posting touches, loaded
/// under row locks, and writes back the changed balances afterwards.
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    accounts: HashMap<AccountId, Account>,
}

impl AccountBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account.
    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    /// Returns an account.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Returns an account's current balance.
    #[must_use]
    pub fn balance(&self, id: AccountId) -> Option<Decimal> {
        self.accounts.get(&id).map(|a| a.current_balance)
    }

    /// Iterates over all accounts.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Computes per-account deltas for a set of lines without mutating anything.
    ///
    /// Lines on the same account are folded into one delta. The result is
    /// ordered by ascending account id, the same order locks are taken in.
    pub fn plan(&self, lines: &[JournalLine]) -> Result<Vec<BalanceDelta>, LedgerError> {
        let mut sums: BTreeMap<AccountId, (Decimal, Decimal)> = BTreeMap::new();
        for line in lines {
            let entry = sums.entry(line.account_id).or_default();
            entry.0 += line.debit;
            entry.1 += line.credit;
        }

        sums.into_iter()
            .map(|(account_id, (debit, credit))| {
                let account = self
                    .accounts
                    .get(&account_id)
                    .ok_or(LedgerError::AccountNotFound(account_id))?;
                if !account.is_active {
                    return Err(LedgerError::AccountInactive(account_id));
                }
                Ok(BalanceDelta {
                    account_id,
                    debit,
                    credit,
                    delta: account.normal_balance.signed_delta(debit, credit),
                })
            })
            .collect()
    }

    /// Applies planned deltas.
    ///
    /// Deltas must come from [`AccountBook::plan`] on this book; an unknown
    /// account is reported and nothing is changed.
    pub fn apply(&mut self, deltas: &[BalanceDelta]) -> Result<(), LedgerError> {
        if let Some(missing) = deltas.iter().find(|d| !self.accounts.contains_key(&d.account_id)) {
            return Err(LedgerError::AccountNotFound(missing.account_id));
        }
        for delta in deltas {
            if let Some(account) = self.accounts.get_mut(&delta.account_id) {
                account.current_balance += delta.delta;
            }
        }
        Ok(())
    }

    /// Recomputes an account's balance from its opening balance and posted lines.
    ///
    /// Returns the recomputed balance and stores it as the current balance.
    pub fn recompute<'a>(
        &mut self,
        account_id: AccountId,
        posted_lines: impl IntoIterator<Item = &'a JournalLine>,
    ) -> Result<Decimal, LedgerError> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let balance = posted_lines
            .into_iter()
            .filter(|line| line.account_id == account_id)
            .fold(account.opening_balance, |acc, line| {
                acc + account.normal_balance.signed_delta(line.debit, line.credit)
            });
        account.current_balance = balance;
        Ok(balance)
    }
}
