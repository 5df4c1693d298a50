//! Recurring template repository and the generation job.

use folio_core::BatchOutcome;
use folio_core::ledger::{
    JournalEntry, LedgerError, PostingContext, RecurringService, RecurringTemplate,
};
use folio_shared::types::RecurringTemplateId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::error::RepositoryError;
use super::fiscal::load_calendar;
use super::journal::{DEFAULT_ENTRY_NUMBER_PREFIX, insert_entry, seeded_numbering};
use crate::entities::recurring_journal_templates;

/// Recurring journal template repository.
#[derive(Debug, Clone)]
pub struct RecurringRepository {
    db: DatabaseConnection,
    entry_number_prefix: String,
}

impl RecurringRepository {
    /// Creates a new recurring template repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            entry_number_prefix: DEFAULT_ENTRY_NUMBER_PREFIX.to_string(),
        }
    }

    /// Uses another entry number prefix for generated entries.
    #[must_use]
    pub fn with_entry_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_number_prefix = prefix.into();
        self
    }

    /// Stores a new template.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already used by the company or the
    /// database operation fails.
    pub async fn create(
        &self,
        template: RecurringTemplate,
        ctx: &PostingContext,
    ) -> Result<RecurringTemplate, RepositoryError> {
        let model = convert::recurring_template_row(&template, ctx.as_of.into())?
            .insert(&self.db)
            .await?;
        convert::recurring_template(model)
    }

    /// Finds a template by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub async fn find(
        &self,
        id: RecurringTemplateId,
    ) -> Result<RecurringTemplate, RepositoryError> {
        let model = recurring_journal_templates::Entity::find_by_id(Uuid::from(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Recurring template", id))?;
        convert::recurring_template(model)
    }

    /// Generates the next draft entry from a template, dated `ctx.today()`.
    ///
    /// The template row is locked, the entry inserted and the schedule
    /// advanced in one transaction. Whether the template is due is decided
    /// on the locked row, so concurrent runs generate an occurrence once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the template is inactive, exhausted, ended
    /// or not yet due,
    /// `NoActivePeriod` if the company has no open period in its default year
    /// for today, or an error if the database operation fails.
    pub async fn generate(
        &self,
        id: RecurringTemplateId,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let txn = self.db.begin().await?;

        let model = recurring_journal_templates::Entity::find_by_id(Uuid::from(id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Recurring template", id))?;
        let mut template = convert::recurring_template(model)?;

        let (years, periods) = load_calendar(&txn, template.company_id).await?;
        let numbering =
            seeded_numbering(&txn, &self.entry_number_prefix, template.company_id, ctx.today())
                .await?;
        let entry =
            RecurringService::generate_for_today(&mut template, &years, &periods, &numbering, ctx)?;

        let now = ctx.as_of.into();
        insert_entry(&txn, &entry, now).await?;
        convert::recurring_template_row(&template, now)?
            .update(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(
            template_id = %id,
            journal_entry_id = %entry.id(),
            occurrences = template.occurrences_count,
            next_generation_date = ?template.next_generation_date,
            "Recurring entry generated"
        );
        Ok(entry)
    }

    /// Generates an entry for every due template, one transaction each.
    ///
    /// A failing template is logged and reported; the others proceed. A
    /// template another run generated first is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the due templates cannot be listed.
    pub async fn generate_due(
        &self,
        ctx: &PostingContext,
    ) -> Result<BatchOutcome<RecurringTemplateId, JournalEntry, RepositoryError>, RepositoryError> {
        let today = ctx.today();
        let candidates = recurring_journal_templates::Entity::find()
            .filter(recurring_journal_templates::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(recurring_journal_templates::Column::NextGenerationDate.is_null())
                    .add(recurring_journal_templates::Column::NextGenerationDate.lte(today)),
            )
            .order_by_asc(recurring_journal_templates::Column::Id)
            .all(&self.db)
            .await?;

        let mut outcome = BatchOutcome::new();
        for model in candidates {
            let id = RecurringTemplateId::from(model.id);
            let due = match convert::recurring_template(model) {
                Ok(template) => template.should_generate(today),
                Err(err) => {
                    tracing::error!(
                        template_id = %id,
                        error = %err,
                        "Recurring template unreadable"
                    );
                    outcome.record(id, Err(err));
                    continue;
                }
            };
            if !due {
                continue;
            }

            let result = self.generate(id, ctx).await;
            match &result {
                Ok(_) => {}
                Err(RepositoryError::Ledger(LedgerError::InvalidState { current, .. })) => {
                    tracing::debug!(
                        template_id = %id,
                        %current,
                        "Recurring template no longer due"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::error!(template_id = %id, error = %err, "Recurring generation failed");
                }
            }
            outcome.record(id, result);
        }

        tracing::info!(
            generated = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            %today,
            "Recurring generation run finished"
        );
        Ok(outcome)
    }
}
