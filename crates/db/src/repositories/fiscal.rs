//! Fiscal calendar repository: years, periods and period lookup for posting.

use chrono::NaiveDate;
use folio_core::ledger::{
    AccountingPeriod, FiscalYear, LedgerError, PeriodStatus, PostingContext, find_period_for_date,
    validate_posting_period,
};
use folio_shared::types::{AccountingPeriodId, CompanyId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use crate::entities::{accounting_periods, fiscal_years};

/// Fiscal calendar repository.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    db: DatabaseConnection,
}

impl FiscalRepository {
    /// Creates a new fiscal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a fiscal year with its periods.
    ///
    /// A default year replaces the company's previous default.
    ///
    /// # Errors
    ///
    /// Returns `EntryDateOutsidePeriod` if a period falls outside the year, or
    /// an error if the database operation fails (overlapping names or start
    /// dates are rejected by constraints).
    pub async fn create_year(
        &self,
        year: FiscalYear,
        periods: Vec<AccountingPeriod>,
        ctx: &PostingContext,
    ) -> Result<(FiscalYear, Vec<AccountingPeriod>), RepositoryError> {
        if let Some(outside) = periods
            .iter()
            .find(|p| !year.contains_date(p.start_date) || !year.contains_date(p.end_date))
        {
            return Err(LedgerError::EntryDateOutsidePeriod {
                date: outside.start_date,
                start: year.start_date,
                end: year.end_date,
            }
            .into());
        }

        let now = ctx.as_of.into();
        let txn = self.db.begin().await?;

        if year.is_default {
            fiscal_years::Entity::update_many()
                .col_expr(fiscal_years::Column::IsDefault, Expr::value(false))
                .filter(fiscal_years::Column::CompanyId.eq(Uuid::from(year.company_id)))
                .filter(fiscal_years::Column::IsDefault.eq(true))
                .exec(&txn)
                .await?;
        }

        let stored_year = fiscal_years::ActiveModel {
            id: Set(year.id.into()),
            company_id: Set(year.company_id.into()),
            name: Set(year.name.clone()),
            start_date: Set(year.start_date),
            end_date: Set(year.end_date),
            is_default: Set(year.is_default),
            status: Set(year.status.into()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut stored_periods = Vec::with_capacity(periods.len());
        for period in periods {
            let model = accounting_periods::ActiveModel {
                id: Set(period.id.into()),
                fiscal_year_id: Set(stored_year.id),
                company_id: Set(year.company_id.into()),
                name: Set(period.name),
                start_date: Set(period.start_date),
                end_date: Set(period.end_date),
                status: Set(period.status.into()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            stored_periods.push(convert::accounting_period(model));
        }

        txn.commit().await?;

        tracing::info!(
            fiscal_year_id = %stored_year.id,
            company_id = %year.company_id,
            periods = stored_periods.len(),
            "Fiscal year created"
        );
        Ok((convert::fiscal_year(stored_year), stored_periods))
    }

    /// Returns the open period that accepts postings dated `date`.
    ///
    /// # Errors
    ///
    /// Returns `NoFiscalPeriod` if no period covers the date and `ClosedPeriod`
    /// if the covering period is closed or locked.
    pub async fn resolve_period(
        &self,
        company_id: CompanyId,
        date: NaiveDate,
    ) -> Result<AccountingPeriod, RepositoryError> {
        let periods = load_periods(&self.db, company_id).await?;
        let period =
            validate_posting_period(find_period_for_date(&periods, company_id, date), date)?;
        Ok(period.clone())
    }

    /// Lists a company's fiscal years and periods.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn calendar(
        &self,
        company_id: CompanyId,
    ) -> Result<(Vec<FiscalYear>, Vec<AccountingPeriod>), RepositoryError> {
        load_calendar(&self.db, company_id).await
    }

    /// Opens, closes or locks a period.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the period does not exist.
    pub async fn set_period_status(
        &self,
        id: AccountingPeriodId,
        status: PeriodStatus,
        ctx: &PostingContext,
    ) -> Result<AccountingPeriod, RepositoryError> {
        let existing = accounting_periods::Entity::find_by_id(Uuid::from(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Accounting period", id))?;

        let mut active: accounting_periods::ActiveModel = existing.into();
        active.status = Set(status.into());
        active.updated_at = Set(ctx.as_of.into());
        let updated = active.update(&self.db).await?;

        tracing::info!(
            accounting_period_id = %id,
            status = %status,
            actor = %ctx.actor,
            "Accounting period status changed"
        );
        Ok(convert::accounting_period(updated))
    }
}

/// Loads a company's periods ordered by start date.
pub(crate) async fn load_periods<C>(
    conn: &C,
    company_id: CompanyId,
) -> Result<Vec<AccountingPeriod>, RepositoryError>
where
    C: ConnectionTrait,
{
    let models = accounting_periods::Entity::find()
        .filter(accounting_periods::Column::CompanyId.eq(Uuid::from(company_id)))
        .order_by_asc(accounting_periods::Column::StartDate)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(convert::accounting_period).collect())
}

/// Loads a company's fiscal years and periods.
pub(crate) async fn load_calendar<C>(
    conn: &C,
    company_id: CompanyId,
) -> Result<(Vec<FiscalYear>, Vec<AccountingPeriod>), RepositoryError>
where
    C: ConnectionTrait,
{
    let years = fiscal_years::Entity::find()
        .filter(fiscal_years::Column::CompanyId.eq(Uuid::from(company_id)))
        .order_by_asc(fiscal_years::Column::StartDate)
        .all(conn)
        .await?
        .into_iter()
        .map(convert::fiscal_year)
        .collect();
    let periods = load_periods(conn, company_id).await?;
    Ok((years, periods))
}

/// Loads a single period.
pub(crate) async fn load_period<C>(
    conn: &C,
    id: AccountingPeriodId,
) -> Result<AccountingPeriod, RepositoryError>
where
    C: ConnectionTrait,
{
    accounting_periods::Entity::find_by_id(Uuid::from(id))
        .one(conn)
        .await?
        .map(convert::accounting_period)
        .ok_or_else(|| RepositoryError::not_found("Accounting period", id))
}
