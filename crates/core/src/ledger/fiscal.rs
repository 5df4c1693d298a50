//! Fiscal years, accounting periods and period posting rules.

use chrono::NaiveDate;
use folio_shared::types::{AccountingPeriodId, CompanyId, FiscalYearId};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LedgerError;

/// Status of a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalYearStatus {
    /// Year accepts postings in its open periods.
    Open,
    /// Year has been closed.
    Closed,
}

/// Fiscal year definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// Unique identifier.
    pub id: FiscalYearId,
    /// Company this fiscal year belongs to.
    pub company_id: CompanyId,
    /// Year name (e.g., "FY2024").
    pub name: String,
    /// Start date of the fiscal year.
    pub start_date: NaiveDate,
    /// End date of the fiscal year.
    pub end_date: NaiveDate,
    /// Whether this is the company's default fiscal year.
    pub is_default: bool,
    /// Current status.
    pub status: FiscalYearStatus,
}

impl FiscalYear {
    /// Returns true if the date falls inside the year (inclusive).
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Status of an accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Period is open for posting.
    Open,
    /// Period is closed, no new postings allowed.
    Closed,
    /// Period is locked, no changes allowed.
    Locked,
}

impl PeriodStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Locked => "locked",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accounting period within a fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    /// Unique identifier.
    pub id: AccountingPeriodId,
    /// Fiscal year this period belongs to.
    pub fiscal_year_id: FiscalYearId,
    /// Company this period belongs to.
    pub company_id: CompanyId,
    /// Period name (e.g., "January 2024").
    pub name: String,
    /// Start date of the period.
    pub start_date: NaiveDate,
    /// End date of the period.
    pub end_date: NaiveDate,
    /// Current status.
    pub status: PeriodStatus,
}

impl AccountingPeriod {
    /// Returns true if postings are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Returns true if the date falls inside the period (inclusive).
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Checks that the period is open and covers `date`.
    pub fn ensure_accepts(&self, date: NaiveDate) -> Result<(), LedgerError> {
        if !self.is_open() {
            return Err(LedgerError::ClosedPeriod {
                period: self.name.clone(),
                status: self.status,
            });
        }
        if !self.contains_date(date) {
            return Err(LedgerError::EntryDateOutsidePeriod {
                date,
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }
}

/// Finds the period of `company_id` whose date range covers `date`.
///
/// Periods never overlap within a company, so the first hit is the only one.
pub fn find_period_for_date(
    periods: &[AccountingPeriod],
    company_id: CompanyId,
    date: NaiveDate,
) -> Option<&AccountingPeriod> {
    periods
        .iter()
        .find(|p| p.company_id == company_id && p.contains_date(date))
}

/// Validates that a looked-up period permits posting on `date`.
///
/// - no period → `NoFiscalPeriod`
/// - period not open → `ClosedPeriod`
pub fn validate_posting_period(
    period: Option<&AccountingPeriod>,
    date: NaiveDate,
) -> Result<&AccountingPeriod, LedgerError> {
    let period = period.ok_or(LedgerError::NoFiscalPeriod(date))?;
    period.ensure_accepts(date)?;
    Ok(period)
}

/// Resolves the company's default fiscal year and an open period covering `date`.
///
/// Used by recurring generation, which has no document date of its own.
pub fn resolve_active_period<'a>(
    years: &'a [FiscalYear],
    periods: &'a [AccountingPeriod],
    company_id: CompanyId,
    date: NaiveDate,
) -> Result<(&'a FiscalYear, &'a AccountingPeriod), LedgerError> {
    let no_period = || LedgerError::NoActivePeriod { company_id, date };

    let year = years
        .iter()
        .find(|y| y.company_id == company_id && y.is_default)
        .ok_or_else(no_period)?;

    let period = periods
        .iter()
        .find(|p| p.fiscal_year_id == year.id && p.is_open() && p.contains_date(date))
        .ok_or_else(no_period)?;

    Ok((year, period))
}
