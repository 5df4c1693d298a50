//! Account repository: chart of accounts and balance maintenance.

use std::collections::BTreeSet;

use folio_core::ledger::{Account, AccountBook, BalanceDelta, PostingContext};
use folio_shared::types::{AccountId, CompanyId};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use crate::entities::{accounts, journal_entries, journal_entry_lines};

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is already used by the company or the
    /// database operation fails.
    pub async fn create(
        &self,
        account: Account,
        ctx: &PostingContext,
    ) -> Result<Account, RepositoryError> {
        let model = convert::new_account(&account, ctx.as_of.into())
            .insert(&self.db)
            .await?;
        Ok(convert::account(model))
    }

    /// Finds an account by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub async fn find(&self, id: AccountId) -> Result<Account, RepositoryError> {
        accounts::Entity::find_by_id(Uuid::from(id))
            .one(&self.db)
            .await?
            .map(convert::account)
            .ok_or_else(|| RepositoryError::not_found("Account", id))
    }

    /// Lists a company's accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<Account>, RepositoryError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(Uuid::from(company_id)))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(convert::account).collect())
    }

    /// Rebuilds an account's balance from its opening balance and the lines of
    /// every entry that was ever posted, and stores it.
    ///
    /// An entry cancelled after its reversal still counts: its effect and the
    /// reversal's cancel out, as they did when both were applied.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist, or an error if a
    /// stored line cannot be read or the database operation fails.
    pub async fn recompute_balance(
        &self,
        id: AccountId,
        ctx: &PostingContext,
    ) -> Result<Decimal, RepositoryError> {
        let txn = self.db.begin().await?;

        let mut book = lock_accounts(&txn, [id]).await?;
        let previous = book
            .balance(id)
            .ok_or_else(|| RepositoryError::not_found("Account", id))?;

        let lines = journal_entry_lines::Entity::find()
            .join(JoinType::InnerJoin, journal_entry_lines::Relation::JournalEntries.def())
            .filter(journal_entry_lines::Column::AccountId.eq(Uuid::from(id)))
            .filter(journal_entries::Column::PostingDate.is_not_null())
            .all(&txn)
            .await?
            .into_iter()
            .map(convert::journal_line)
            .collect::<Result<Vec<_>, _>>()?;

        let balance = book.recompute(id, &lines)?;
        store_balance(&txn, id, balance, ctx.as_of.into()).await?;
        txn.commit().await?;

        if balance != previous {
            tracing::warn!(
                account_id = %id,
                %previous,
                %balance,
                "Account balance drift corrected"
            );
        }
        Ok(balance)
    }
}

// ============================================================================
// Shared unit-of-work helpers
// ============================================================================

/// Loads accounts under exclusive row locks, taken in ascending id order.
///
/// Unknown ids are skipped; the posting plan reports them.
pub(crate) async fn lock_accounts<C>(
    conn: &C,
    ids: impl IntoIterator<Item = AccountId>,
) -> Result<AccountBook, RepositoryError>
where
    C: ConnectionTrait,
{
    let ids: BTreeSet<Uuid> = ids.into_iter().map(Uuid::from).collect();
    let mut book = AccountBook::new();
    if ids.is_empty() {
        return Ok(book);
    }

    let models = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids))
        .order_by_asc(accounts::Column::Id)
        .lock_exclusive()
        .all(conn)
        .await?;
    for model in models {
        book.insert(convert::account(model));
    }
    Ok(book)
}

/// Writes back the balances a posting changed.
pub(crate) async fn save_balances<C>(
    conn: &C,
    book: &AccountBook,
    deltas: &[BalanceDelta],
    now: DateTimeWithTimeZone,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    for delta in deltas {
        let balance = book
            .balance(delta.account_id)
            .ok_or_else(|| RepositoryError::not_found("Account", delta.account_id))?;
        tracing::debug!(
            account_id = %delta.account_id,
            debit = %delta.debit,
            credit = %delta.credit,
            delta = %delta.delta,
            %balance,
            "Applying balance delta"
        );
        store_balance(conn, delta.account_id, balance, now).await?;
    }
    Ok(())
}

async fn store_balance<C>(
    conn: &C,
    id: AccountId,
    balance: Decimal,
    now: DateTimeWithTimeZone,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    accounts::ActiveModel {
        id: Set(id.into()),
        current_balance: Set(balance),
        updated_at: Set(now),
        ..Default::default()
    }
    .update(conn)
    .await?;
    Ok(())
}
