//! Journal repository: draft lifecycle, posting and reversal of journal
//! entries.
//!
//! Every state change is one database transaction. The entry row is locked
//! before its status is inspected, so of two concurrent posts of the same
//! entry exactly one succeeds and the other sees it already posted. Account
//! rows touched by a posting are locked in ascending id order.

use chrono::{Datelike, NaiveDate};
use folio_core::ledger::{
    AccountBook, JournalEntry, JournalLine, LedgerError, NewJournalEntry, PostingContext,
    PostingReceipt, PostingService, ReversalRequest, ReversalService, SequentialNumbering,
    SourceReference, find_period_for_date,
};
use folio_shared::types::{CompanyId, JournalEntryId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use super::account::{lock_accounts, save_balances};
use super::convert;
use super::error::RepositoryError;
use super::fiscal::{load_period, load_periods};
use crate::entities::{journal_entries, journal_entry_lines};

/// Default entry number prefix.
pub const DEFAULT_ENTRY_NUMBER_PREFIX: &str = "JE";

/// Journal entry repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    entry_number_prefix: String,
}

impl JournalRepository {
    /// Creates a new journal repository numbering entries `JE-{year}-{seq}`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            entry_number_prefix: DEFAULT_ENTRY_NUMBER_PREFIX.to_string(),
        }
    }

    /// Uses another entry number prefix.
    #[must_use]
    pub fn with_entry_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_number_prefix = prefix.into();
        self
    }

    /// Creates a draft entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a line is invalid or the database operation fails.
    pub async fn create_draft(
        &self,
        header: NewJournalEntry,
        lines: Vec<JournalLine>,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut entry = JournalEntry::new(header, ctx);
        entry.replace_lines(lines)?;

        let txn = self.db.begin().await?;
        insert_entry(&txn, &entry, ctx.as_of.into()).await?;
        txn.commit().await?;

        tracing::info!(
            journal_entry_id = %entry.id(),
            company_id = %entry.company_id(),
            "Draft journal entry created"
        );
        Ok(entry)
    }

    /// Finds an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist.
    pub async fn find(&self, id: JournalEntryId) -> Result<JournalEntry, RepositoryError> {
        load_entry(&self.db, id, false).await
    }

    /// Finds the entries generated from a source document, oldest first.
    ///
    /// A reversed posting returns both the original and its reversal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_reference(
        &self,
        reference: SourceReference,
    ) -> Result<Vec<JournalEntry>, RepositoryError> {
        let models = journal_entries::Entity::find()
            .filter(journal_entries::Column::ReferenceType.eq(reference.reference_type()))
            .filter(journal_entries::Column::ReferenceId.eq(reference.reference_id()))
            .order_by_asc(journal_entries::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            let lines = load_lines(&self.db, model.id).await?;
            entries.push(convert::journal_entry(model, lines)?);
        }
        Ok(entries)
    }

    /// Replaces the lines of a draft entry.
    ///
    /// # Errors
    ///
    /// Returns `CannotModify` unless the entry is a draft.
    pub async fn replace_lines(
        &self,
        id: JournalEntryId,
        lines: Vec<JournalLine>,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut entry = load_entry(&txn, id, true).await?;
        entry.replace_lines(lines)?;

        let now = ctx.as_of.into();
        journal_entry_lines::Entity::delete_many()
            .filter(journal_entry_lines::Column::JournalEntryId.eq(Uuid::from(id)))
            .exec(&txn)
            .await?;
        insert_lines(&txn, &entry, now).await?;
        update_entry(&txn, &entry, now).await?;
        txn.commit().await?;

        Ok(entry)
    }

    /// Submits a draft entry for posting.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState`, `InsufficientLines` or `UnbalancedEntry` if the
    /// entry cannot be submitted.
    pub async fn submit(
        &self,
        id: JournalEntryId,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut entry = load_entry(&txn, id, true).await?;
        entry.submit(ctx)?;
        update_entry(&txn, &entry, ctx.as_of.into()).await?;
        txn.commit().await?;

        tracing::info!(journal_entry_id = %id, actor = %ctx.actor, "Journal entry submitted");
        Ok(entry)
    }

    /// Posts a draft or submitted entry and updates account balances.
    ///
    /// An entry without a number is numbered in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `EntryAlreadyPosted` if the entry is posted (including by a
    /// concurrent caller), or any posting rule violation. On error nothing is
    /// written.
    pub async fn post(
        &self,
        id: JournalEntryId,
        ctx: &PostingContext,
    ) -> Result<PostingReceipt, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut entry = load_entry(&txn, id, true).await?;
        let period = load_period(&txn, entry.accounting_period_id()).await?;
        let mut book = lock_accounts(&txn, entry.lines().iter().map(|l| l.account_id)).await?;

        let receipt = PostingService::post(&mut entry, &period, &mut book, ctx)?;
        if entry.entry_number().is_none() {
            let numbering = seeded_numbering(
                &txn,
                &self.entry_number_prefix,
                entry.company_id(),
                entry.entry_date(),
            )
            .await?;
            entry.assign_number(&numbering);
        }

        let now = ctx.as_of.into();
        update_entry(&txn, &entry, now).await?;
        save_balances(&txn, &book, &receipt.deltas, now).await?;
        txn.commit().await?;

        tracing::info!(
            journal_entry_id = %id,
            entry_number = entry.entry_number().unwrap_or_default(),
            total = %receipt.total_debit,
            actor = %ctx.actor,
            "Journal entry posted"
        );
        Ok(receipt)
    }

    /// Cancels an entry. A posted entry must have been reversed first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the entry cannot be cancelled.
    pub async fn cancel(
        &self,
        id: JournalEntryId,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut entry = load_entry(&txn, id, true).await?;
        entry.cancel(ctx)?;
        update_entry(&txn, &entry, ctx.as_of.into()).await?;
        txn.commit().await?;

        tracing::info!(journal_entry_id = %id, actor = %ctx.actor, "Journal entry cancelled");
        Ok(entry)
    }

    /// Creates the reversal of a posted entry, optionally posting it.
    ///
    /// The reversal is dated `request.date` or, by default, the original's
    /// entry date, and lands in the period covering that date.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted`, `AlreadyReversal` or `AlreadyReversed` if the
    /// original cannot be reversed, `NoFiscalPeriod` if no period covers the
    /// reversal date, or any posting rule violation when posting immediately.
    pub async fn reverse(
        &self,
        id: JournalEntryId,
        request: &ReversalRequest,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut original = load_entry(&txn, id, true).await?;
        ReversalService::validate(&original)?;

        let period = match request.date {
            None => load_period(&txn, original.accounting_period_id()).await?,
            Some(date) => {
                let periods = load_periods(&txn, original.company_id()).await?;
                find_period_for_date(&periods, original.company_id(), date)
                    .cloned()
                    .ok_or(LedgerError::NoFiscalPeriod(date))?
            }
        };
        let reversal_date = request.date.unwrap_or(original.entry_date());

        let mut book = if request.post_immediately {
            lock_accounts(&txn, original.lines().iter().map(|l| l.account_id)).await?
        } else {
            AccountBook::new()
        };
        let numbering = seeded_numbering(
            &txn,
            &self.entry_number_prefix,
            original.company_id(),
            reversal_date,
        )
        .await?;

        let reversal =
            ReversalService::reverse(&mut original, request, &period, &mut book, &numbering, ctx)?;

        let now = ctx.as_of.into();
        insert_entry(&txn, &reversal, now).await?;
        update_entry(&txn, &original, now).await?;
        if request.post_immediately {
            let deltas = book.plan(reversal.lines())?;
            save_balances(&txn, &book, &deltas, now).await?;
        }
        txn.commit().await?;

        tracing::info!(
            journal_entry_id = %id,
            reversal_entry_id = %reversal.id(),
            posted = request.post_immediately,
            actor = %ctx.actor,
            "Journal entry reversed"
        );
        Ok(reversal)
    }
}

// ============================================================================
// Shared unit-of-work helpers
// ============================================================================

/// Loads an entry and its lines, optionally under an exclusive row lock.
pub(crate) async fn load_entry<C>(
    conn: &C,
    id: JournalEntryId,
    lock: bool,
) -> Result<JournalEntry, RepositoryError>
where
    C: ConnectionTrait,
{
    let mut query = journal_entries::Entity::find_by_id(Uuid::from(id));
    if lock {
        query = query.lock_exclusive();
    }
    let model = query
        .one(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Journal entry", id))?;
    let lines = load_lines(conn, model.id).await?;
    convert::journal_entry(model, lines)
}

async fn load_lines<C>(
    conn: &C,
    entry_id: Uuid,
) -> Result<Vec<journal_entry_lines::Model>, RepositoryError>
where
    C: ConnectionTrait,
{
    Ok(journal_entry_lines::Entity::find()
        .filter(journal_entry_lines::Column::JournalEntryId.eq(entry_id))
        .order_by_asc(journal_entry_lines::Column::SortOrder)
        .all(conn)
        .await?)
}

/// Inserts a new entry with its lines.
pub(crate) async fn insert_entry<C>(
    conn: &C,
    entry: &JournalEntry,
    now: DateTimeWithTimeZone,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    journal_entries::Entity::insert(convert::journal_entry_row(entry, now))
        .exec(conn)
        .await?;
    insert_lines(conn, entry, now).await
}

async fn insert_lines<C>(
    conn: &C,
    entry: &JournalEntry,
    now: DateTimeWithTimeZone,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    let rows = convert::journal_line_rows(entry, now);
    if !rows.is_empty() {
        journal_entry_lines::Entity::insert_many(rows).exec(conn).await?;
    }
    Ok(())
}

/// Writes an entry's header state.
pub(crate) async fn update_entry<C>(
    conn: &C,
    entry: &JournalEntry,
    now: DateTimeWithTimeZone,
) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    convert::journal_entry_row(entry, now).update(conn).await?;
    Ok(())
}

/// Returns a numbering source that continues after the highest stored number
/// for the company, prefix and year of `date`.
///
/// Takes a transaction-scoped advisory lock on that sequence first, so
/// concurrent transactions numbering in the same year queue up instead of
/// colliding on the unique constraint.
pub(crate) async fn seeded_numbering<C>(
    conn: &C,
    prefix: &str,
    company_id: CompanyId,
    date: NaiveDate,
) -> Result<SequentialNumbering, RepositoryError>
where
    C: ConnectionTrait,
{
    let series = format!("{prefix}-{}-", date.year());

    conn.execute(Statement::from_sql_and_values(
        conn.get_database_backend(),
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        [Value::from(format!("{company_id}:{series}"))],
    ))
    .await?;

    let latest = journal_entries::Entity::find()
        .filter(journal_entries::Column::CompanyId.eq(Uuid::from(company_id)))
        .filter(journal_entries::Column::EntryNumber.like(format!("{series}%")))
        .order_by_desc(journal_entries::Column::EntryNumber)
        .one(conn)
        .await?;

    let next = latest
        .and_then(|model| model.entry_number)
        .and_then(|number| SequentialNumbering::parse_sequence(prefix, &number))
        .map_or(1, |sequence| sequence + 1);

    tracing::debug!(%company_id, series = %series, next, "Entry numbering seeded");
    Ok(SequentialNumbering::starting_at(prefix, next))
}
