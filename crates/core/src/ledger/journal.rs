//! Journal entry aggregate.
//!
//! A journal entry owns its ordered lines. Totals are cached on the entry and
//! recomputed after every line mutation, so `total_debit`/`total_credit`
//! always reflect the lines. Status, posting data and reversal linkage can only
//! change through the transition methods.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, AccountingPeriodId, CompanyId, Currency, FiscalYearId, JournalEntryId, JournalLineId,
    UserId, normalize_amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::numbering::EntryNumbering;
use super::types::{
    Dimensions, EntrySide, JournalEntryType, JournalStatus, PostingContext, SourceReference,
};

/// Amounts in a foreign currency mirrored on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignAmounts {
    /// Foreign currency.
    pub currency: Currency,
    /// Debit in the foreign currency.
    pub debit: Decimal,
    /// Credit in the foreign currency.
    pub credit: Decimal,
}

impl ForeignAmounts {
    /// Returns the amounts with debit and credit swapped.
    #[must_use]
    pub fn swapped(self) -> Self {
        Self {
            currency: self.currency,
            debit: self.credit,
            credit: self.debit,
        }
    }
}

/// A single line of a journal entry.
///
/// Exactly one of `debit`/`credit` is non-zero and neither is negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// Account affected by this line.
    pub account_id: AccountId,
    /// Debit amount (entry currency).
    pub debit: Decimal,
    /// Credit amount (entry currency).
    pub credit: Decimal,
    /// Optional line narrative.
    pub description: Option<String>,
    /// Analytic tags.
    #[serde(default)]
    pub dimensions: Dimensions,
    /// Foreign-currency mirror amounts.
    pub foreign: Option<ForeignAmounts>,
    /// Position within the entry.
    pub sort_order: u32,
}

impl JournalLine {
    /// Creates a line from a debit/credit pair.
    ///
    /// Amounts are normalized to four decimal places.
    pub fn new(
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<Self, LedgerError> {
        let debit = normalize_amount(debit);
        let credit = normalize_amount(credit);

        if debit < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(debit));
        }
        if credit < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(credit));
        }
        if debit.is_zero() == credit.is_zero() {
            return Err(LedgerError::InvalidLine { debit, credit });
        }

        Ok(Self {
            id: JournalLineId::new(),
            account_id,
            debit,
            credit,
            description: None,
            dimensions: Dimensions::default(),
            foreign: None,
            sort_order: 0,
        })
    }

    /// Creates a debit line. The amount must be positive.
    pub fn debit(account_id: AccountId, amount: Decimal) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Self::new(account_id, amount, Decimal::ZERO)
    }

    /// Creates a credit line. The amount must be positive.
    pub fn credit(account_id: AccountId, amount: Decimal) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        Self::new(account_id, Decimal::ZERO, amount)
    }

    /// Sets the line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the analytic tags.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Sets the foreign-currency mirror amounts.
    #[must_use]
    pub fn with_foreign(mut self, foreign: ForeignAmounts) -> Self {
        self.foreign = Some(foreign);
        self
    }

    /// Returns which side of the ledger this line is on.
    #[must_use]
    pub fn side(&self) -> EntrySide {
        if self.debit.is_zero() {
            EntrySide::Credit
        } else {
            EntrySide::Debit
        }
    }

    /// Returns the non-zero amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }

    /// Returns a copy with a fresh id and debit/credit (including foreign
    /// amounts) swapped.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            id: JournalLineId::new(),
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
            description: self.description.clone(),
            dimensions: self.dimensions,
            foreign: self.foreign.map(ForeignAmounts::swapped),
            sort_order: self.sort_order,
        }
    }
}

/// Debit/credit totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debits.
    pub total_debit: Decimal,
    /// Sum of credits.
    pub total_credit: Decimal,
    /// Number of lines.
    pub line_count: usize,
}

impl EntryTotals {
    /// Computes totals over lines.
    #[must_use]
    pub fn from_lines(lines: &[JournalLine]) -> Self {
        let (total_debit, total_credit) = lines
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), line| (d + line.debit, c + line.credit));
        Self {
            total_debit,
            total_credit,
            line_count: lines.len(),
        }
    }

    /// Exact decimal comparison of the two totals.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// Who did what to an entry, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAudit {
    /// Creator.
    pub created_by: UserId,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Submitter.
    pub submitted_by: Option<UserId>,
    /// Submission instant.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Poster.
    pub posted_by: Option<UserId>,
    /// Posting instant.
    pub posted_at: Option<DateTime<Utc>>,
    /// Canceller.
    pub cancelled_by: Option<UserId>,
    /// Cancellation instant.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl EntryAudit {
    fn created(ctx: &PostingContext) -> Self {
        Self {
            created_by: ctx.actor,
            created_at: ctx.as_of,
            submitted_by: None,
            submitted_at: None,
            posted_by: None,
            posted_at: None,
            cancelled_by: None,
            cancelled_at: None,
        }
    }
}

/// Header data for a new draft entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal year.
    pub fiscal_year_id: FiscalYearId,
    /// Accounting period.
    pub accounting_period_id: AccountingPeriodId,
    /// Classification.
    pub entry_type: JournalEntryType,
    /// Economic date of the entry.
    pub entry_date: NaiveDate,
    /// Narrative.
    pub description: String,
    /// Source document.
    pub reference: Option<SourceReference>,
    /// Human-readable source document number.
    pub reference_number: Option<String>,
    /// Entry currency.
    pub currency: Currency,
    /// Exchange rate snapshot to the company currency.
    pub exchange_rate: Decimal,
}

/// Full persisted state of an entry, used to rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJournalEntry {
    /// Entry id.
    pub id: JournalEntryId,
    /// Header fields.
    pub header: NewJournalEntry,
    /// Assigned number.
    pub entry_number: Option<String>,
    /// Status.
    pub status: JournalStatus,
    /// Date the entry was posted.
    pub posting_date: Option<NaiveDate>,
    /// Whether this entry reverses another.
    pub is_reversal: bool,
    /// Entry this one reverses.
    pub reversed_entry_id: Option<JournalEntryId>,
    /// Entry reversing this one.
    pub reversal_entry_id: Option<JournalEntryId>,
    /// Audit trail.
    pub audit: EntryAudit,
    /// Lines in sort order.
    pub lines: Vec<JournalLine>,
}

/// A journal entry: header plus ordered, balanced lines.
///
/// Header fields are fixed at creation; only the number can be assigned
/// later, and only once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    id: JournalEntryId,
    company_id: CompanyId,
    fiscal_year_id: FiscalYearId,
    accounting_period_id: AccountingPeriodId,
    entry_number: Option<String>,
    entry_type: JournalEntryType,
    entry_date: NaiveDate,
    description: String,
    reference: Option<SourceReference>,
    reference_number: Option<String>,
    currency: Currency,
    exchange_rate: Decimal,
    status: JournalStatus,
    posting_date: Option<NaiveDate>,
    is_reversal: bool,
    reversed_entry_id: Option<JournalEntryId>,
    reversal_entry_id: Option<JournalEntryId>,
    total_debit: Decimal,
    total_credit: Decimal,
    lines: Vec<JournalLine>,
    audit: EntryAudit,
}

impl JournalEntry {
    /// Creates an empty draft entry.
    #[must_use]
    pub fn new(header: NewJournalEntry, ctx: &PostingContext) -> Self {
        Self::from_header(JournalEntryId::new(), header, EntryAudit::created(ctx))
    }

    fn from_header(id: JournalEntryId, header: NewJournalEntry, audit: EntryAudit) -> Self {
        Self {
            id,
            company_id: header.company_id,
            fiscal_year_id: header.fiscal_year_id,
            accounting_period_id: header.accounting_period_id,
            entry_number: None,
            entry_type: header.entry_type,
            entry_date: header.entry_date,
            description: header.description,
            reference: header.reference,
            reference_number: header.reference_number,
            currency: header.currency,
            exchange_rate: header.exchange_rate,
            status: JournalStatus::Draft,
            posting_date: None,
            is_reversal: false,
            reversed_entry_id: None,
            reversal_entry_id: None,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            lines: Vec::new(),
            audit,
        }
    }

    /// Rebuilds an entry from persisted state. Totals are recomputed from lines.
    #[must_use]
    pub fn restore(stored: StoredJournalEntry) -> Self {
        let mut entry = Self::from_header(stored.id, stored.header, stored.audit);
        entry.entry_number = stored.entry_number;
        entry.status = stored.status;
        entry.posting_date = stored.posting_date;
        entry.is_reversal = stored.is_reversal;
        entry.reversed_entry_id = stored.reversed_entry_id;
        entry.reversal_entry_id = stored.reversal_entry_id;
        entry.lines = stored.lines;
        entry.lines.sort_by_key(|l| l.sort_order);
        entry.update_totals();
        entry
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> JournalEntryId {
        self.id
    }

    /// Owning company.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Fiscal year.
    #[must_use]
    pub fn fiscal_year_id(&self) -> FiscalYearId {
        self.fiscal_year_id
    }

    /// Accounting period.
    #[must_use]
    pub fn accounting_period_id(&self) -> AccountingPeriodId {
        self.accounting_period_id
    }

    /// Number assigned by the numbering collaborator.
    #[must_use]
    pub fn entry_number(&self) -> Option<&str> {
        self.entry_number.as_deref()
    }

    /// Classification.
    #[must_use]
    pub fn entry_type(&self) -> JournalEntryType {
        self.entry_type
    }

    /// Economic date of the entry.
    #[must_use]
    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    /// Narrative.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Source document.
    #[must_use]
    pub fn reference(&self) -> Option<SourceReference> {
        self.reference
    }

    /// Human-readable source document number.
    #[must_use]
    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    /// Entry currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Exchange rate snapshot.
    #[must_use]
    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    /// Numbers the entry from `numbering` unless it already has a number.
    pub fn assign_number<N>(&mut self, numbering: &N)
    where
        N: EntryNumbering + ?Sized,
    {
        if self.entry_number.is_none() {
            self.entry_number = Some(numbering.next_number(self.company_id, self.entry_date));
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> JournalStatus {
        self.status
    }

    /// Date the entry was posted.
    #[must_use]
    pub fn posting_date(&self) -> Option<NaiveDate> {
        self.posting_date
    }

    /// Whether this entry reverses another.
    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.is_reversal
    }

    /// The entry this one reverses.
    #[must_use]
    pub fn reversed_entry_id(&self) -> Option<JournalEntryId> {
        self.reversed_entry_id
    }

    /// The entry reversing this one.
    #[must_use]
    pub fn reversal_entry_id(&self) -> Option<JournalEntryId> {
        self.reversal_entry_id
    }

    /// Cached debit total.
    #[must_use]
    pub fn total_debit(&self) -> Decimal {
        self.total_debit
    }

    /// Cached credit total.
    #[must_use]
    pub fn total_credit(&self) -> Decimal {
        self.total_credit
    }

    /// Lines in sort order.
    #[must_use]
    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    /// Audit trail.
    #[must_use]
    pub fn audit(&self) -> &EntryAudit {
        &self.audit
    }

    /// Totals as a value.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        EntryTotals {
            total_debit: self.total_debit,
            total_credit: self.total_credit,
            line_count: self.lines.len(),
        }
    }

    /// Recomputes cached totals from the lines.
    pub fn update_totals(&mut self) {
        let totals = EntryTotals::from_lines(&self.lines);
        self.total_debit = totals.total_debit;
        self.total_credit = totals.total_credit;
    }

    /// Exact comparison of the cached totals.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }

    fn ensure_editable(&self) -> Result<(), LedgerError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::CannotModify(self.status))
        }
    }

    fn renumber(&mut self) {
        for (index, line) in self.lines.iter_mut().enumerate() {
            line.sort_order = u32::try_from(index).unwrap_or(u32::MAX);
        }
    }

    /// Appends a line (draft only).
    pub fn add_line(&mut self, line: JournalLine) -> Result<(), LedgerError> {
        self.ensure_editable()?;
        self.lines.push(line);
        self.renumber();
        self.update_totals();
        Ok(())
    }

    /// Removes a line by id (draft only).
    pub fn remove_line(&mut self, line_id: JournalLineId) -> Result<JournalLine, LedgerError> {
        self.ensure_editable()?;
        let index = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or(LedgerError::LineNotFound(line_id))?;
        let removed = self.lines.remove(index);
        self.renumber();
        self.update_totals();
        Ok(removed)
    }

    /// Replaces all lines (draft only). Sort order follows the given order.
    pub fn replace_lines(&mut self, lines: Vec<JournalLine>) -> Result<(), LedgerError> {
        self.ensure_editable()?;
        self.lines = lines;
        self.renumber();
        self.update_totals();
        Ok(())
    }

    /// Draft → Submitted. Requires at least two lines and balanced totals.
    pub fn submit(&mut self, ctx: &PostingContext) -> Result<(), LedgerError> {
        if self.status != JournalStatus::Draft {
            return Err(LedgerError::invalid_state(self.label(), self.status, "draft"));
        }
        if self.lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        if !self.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debit: self.total_debit,
                credit: self.total_credit,
            });
        }
        self.status = JournalStatus::Submitted;
        self.audit.submitted_by = Some(ctx.actor);
        self.audit.submitted_at = Some(ctx.as_of);
        Ok(())
    }

    /// Cancels the entry.
    ///
    /// Drafts and submitted entries can always be cancelled. A posted entry can
    /// only be cancelled once a reversal exists, so its net effect is zero.
    pub fn cancel(&mut self, ctx: &PostingContext) -> Result<(), LedgerError> {
        let allowed = match self.status {
            JournalStatus::Draft | JournalStatus::Submitted => true,
            JournalStatus::Posted => self.reversal_entry_id.is_some(),
            JournalStatus::Cancelled => false,
        };
        if !allowed {
            return Err(LedgerError::invalid_state(
                self.label(),
                self.status,
                "draft, submitted, or posted with a reversal",
            ));
        }
        self.status = JournalStatus::Cancelled;
        self.audit.cancelled_by = Some(ctx.actor);
        self.audit.cancelled_at = Some(ctx.as_of);
        Ok(())
    }

    /// Marks the entry posted. Callers validate first.
    pub(crate) fn mark_posted(&mut self, ctx: &PostingContext) {
        self.status = JournalStatus::Posted;
        self.posting_date = Some(ctx.today());
        self.audit.posted_by = Some(ctx.actor);
        self.audit.posted_at = Some(ctx.as_of);
    }

    /// Records the reversal of this entry.
    pub(crate) fn link_reversal(&mut self, reversal_id: JournalEntryId) {
        self.reversal_entry_id = Some(reversal_id);
    }

    /// Marks this entry as the reversal of `original_id`.
    pub(crate) fn mark_reversal_of(&mut self, original_id: JournalEntryId) {
        self.is_reversal = true;
        self.reversed_entry_id = Some(original_id);
    }

    /// Short human label used in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.entry_number {
            Some(number) => format!("Journal entry {number}"),
            None => format!("Journal entry {}", self.id),
        }
    }
}
