//! Document repository: posts invoices, payments and notes to the ledger.
//!
//! Each posting locks the document row, the accounts the entry touches and
//! the company's number series, then writes the entry, the new balances and
//! the document's GL link in one transaction.

use chrono::NaiveDate;
use folio_core::BatchOutcome;
use folio_core::documents::{
    DocumentPostingService, Invoice, InvoiceKind, LedgerContext, NoteAccounts, NoteKind, Payment,
    PaymentAccounts, PaymentKind, PostedDocument, SalesInvoiceAccounts, SupplierInvoiceAccounts,
};
use folio_core::ledger::{LedgerError, PostingContext, SourceReference};
use folio_shared::types::{AccountId, CompanyId, InvoiceId, NoteId, PaymentId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::account::{lock_accounts, save_balances};
use super::convert;
use super::error::RepositoryError;
use super::fiscal::load_periods;
use super::journal::{DEFAULT_ENTRY_NUMBER_PREFIX, insert_entry, seeded_numbering};
use crate::entities::sea_orm_active_enums as db;
use crate::entities::{
    adjustment_notes, company_posting_accounts, invoice_items, invoices, payments,
};

/// A company's control accounts for document postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlAccounts {
    /// Accounts receivable.
    pub receivable: AccountId,
    /// Accounts payable.
    pub payable: AccountId,
    /// Bank or cash account payments go through.
    pub cash: AccountId,
    /// Output tax; sales tax is not posted when absent.
    pub sales_tax: Option<AccountId>,
    /// Input tax; purchase tax is not posted when absent.
    pub purchase_tax: Option<AccountId>,
    /// Debited by customer credit notes.
    pub sales_returns: AccountId,
    /// Credited by supplier debit notes.
    pub purchase_returns: AccountId,
}

impl ControlAccounts {
    /// Accounts for a sales invoice.
    #[must_use]
    pub const fn sales_invoice(&self) -> SalesInvoiceAccounts {
        SalesInvoiceAccounts {
            receivable: self.receivable,
            tax_payable: self.sales_tax,
        }
    }

    /// Accounts for a supplier invoice.
    #[must_use]
    pub const fn supplier_invoice(&self) -> SupplierInvoiceAccounts {
        SupplierInvoiceAccounts {
            payable: self.payable,
            tax_receivable: self.purchase_tax,
        }
    }

    /// Accounts for a payment: receipts clear receivables, vouchers payables.
    #[must_use]
    pub const fn payment(&self, kind: PaymentKind) -> PaymentAccounts {
        PaymentAccounts {
            cash: self.cash,
            counterparty: match kind {
                PaymentKind::Receipt => self.receivable,
                PaymentKind::Voucher => self.payable,
            },
        }
    }

    /// Accounts for a credit or debit note.
    #[must_use]
    pub const fn note(&self, kind: NoteKind) -> NoteAccounts {
        match kind {
            NoteKind::Credit => NoteAccounts {
                returns: self.sales_returns,
                counterparty: self.receivable,
            },
            NoteKind::Debit => NoteAccounts {
                returns: self.purchase_returns,
                counterparty: self.payable,
            },
        }
    }
}

impl From<company_posting_accounts::Model> for ControlAccounts {
    fn from(model: company_posting_accounts::Model) -> Self {
        Self {
            receivable: model.receivable_account_id.into(),
            payable: model.payable_account_id.into(),
            cash: model.cash_account_id.into(),
            sales_tax: model.sales_tax_account_id.map(AccountId::from),
            purchase_tax: model.purchase_tax_account_id.map(AccountId::from),
            sales_returns: model.sales_returns_account_id.into(),
            purchase_returns: model.purchase_returns_account_id.into(),
        }
    }
}

/// Source document repository.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
    entry_number_prefix: String,
}

impl DocumentRepository {
    /// Creates a new document repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            entry_number_prefix: DEFAULT_ENTRY_NUMBER_PREFIX.to_string(),
        }
    }

    /// Uses another entry number prefix for document entries.
    #[must_use]
    pub fn with_entry_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_number_prefix = prefix.into();
        self
    }

    /// Stores or replaces a company's control accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_control_accounts(
        &self,
        company_id: CompanyId,
        accounts: ControlAccounts,
        ctx: &PostingContext,
    ) -> Result<(), RepositoryError> {
        let row = company_posting_accounts::ActiveModel {
            company_id: Set(company_id.into()),
            receivable_account_id: Set(accounts.receivable.into()),
            payable_account_id: Set(accounts.payable.into()),
            cash_account_id: Set(accounts.cash.into()),
            sales_tax_account_id: Set(accounts.sales_tax.map(Uuid::from)),
            purchase_tax_account_id: Set(accounts.purchase_tax.map(Uuid::from)),
            sales_returns_account_id: Set(accounts.sales_returns.into()),
            purchase_returns_account_id: Set(accounts.purchase_returns.into()),
            updated_at: Set(ctx.as_of.into()),
        };

        let exists = company_posting_accounts::Entity::find_by_id(Uuid::from(company_id))
            .one(&self.db)
            .await?
            .is_some();
        if exists {
            row.update(&self.db).await?;
        } else {
            row.insert(&self.db).await?;
        }
        Ok(())
    }

    /// Finds an invoice with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not exist.
    pub async fn find_invoice(&self, id: InvoiceId) -> Result<Invoice, RepositoryError> {
        load_invoice(&self.db, id, false).await
    }

    /// Finds a payment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the payment does not exist.
    pub async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepositoryError> {
        load_payment(&self.db, id, false).await
    }

    /// Posts an issued sales invoice.
    ///
    /// # Errors
    ///
    /// Returns `DocumentAlreadyPosted` if the invoice has a journal entry,
    /// `InvalidState` if it is not issued or partially paid, or any posting
    /// rule violation. On error nothing is written.
    pub async fn post_sales_invoice(
        &self,
        id: InvoiceId,
        ctx: &PostingContext,
    ) -> Result<PostedDocument, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut invoice = load_invoice(&txn, id, true).await?;
        let control = load_control_accounts(&txn, invoice.company_id).await?;
        let accounts = control.sales_invoice();

        let touched: Vec<AccountId> = invoice_accounts(&invoice)
            .chain([accounts.receivable])
            .chain(accounts.tax_payable)
            .collect();
        let posted = self
            .post_in(&txn, invoice.company_id, invoice.invoice_date, touched, ctx, |ledger| {
                DocumentPostingService::post_sales_invoice(&mut invoice, &accounts, ledger)
            })
            .await?;

        convert::invoice_state(&invoice, ctx.as_of.into()).update(&txn).await?;
        txn.commit().await?;

        log_posted(SourceReference::SalesInvoice(id), &posted);
        Ok(posted)
    }

    /// Posts an approved supplier invoice.
    ///
    /// # Errors
    ///
    /// Returns `DocumentAlreadyPosted` if the invoice has a journal entry,
    /// `InvalidState` if it is not approved or partially paid, or any posting
    /// rule violation. On error nothing is written.
    pub async fn post_supplier_invoice(
        &self,
        id: InvoiceId,
        ctx: &PostingContext,
    ) -> Result<PostedDocument, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut invoice = load_invoice(&txn, id, true).await?;
        let control = load_control_accounts(&txn, invoice.company_id).await?;
        let accounts = control.supplier_invoice();

        let touched: Vec<AccountId> = invoice_accounts(&invoice)
            .chain([accounts.payable])
            .chain(accounts.tax_receivable)
            .collect();
        let posted = self
            .post_in(&txn, invoice.company_id, invoice.invoice_date, touched, ctx, |ledger| {
                DocumentPostingService::post_supplier_invoice(&mut invoice, &accounts, ledger)
            })
            .await?;

        convert::invoice_state(&invoice, ctx.as_of.into()).update(&txn).await?;
        txn.commit().await?;

        log_posted(SourceReference::SupplierInvoice(id), &posted);
        Ok(posted)
    }

    /// Posts a cleared or paid receipt or voucher.
    ///
    /// # Errors
    ///
    /// Returns `DocumentAlreadyPosted` if the payment has a journal entry,
    /// `InvalidState` if it is not cleared or paid, or any posting rule
    /// violation. On error nothing is written.
    pub async fn post_payment(
        &self,
        id: PaymentId,
        ctx: &PostingContext,
    ) -> Result<PostedDocument, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut payment = load_payment(&txn, id, true).await?;
        let control = load_control_accounts(&txn, payment.company_id).await?;
        let accounts = control.payment(payment.kind);

        let posted = self
            .post_in(
                &txn,
                payment.company_id,
                payment.payment_date,
                [accounts.cash, accounts.counterparty],
                ctx,
                |ledger| DocumentPostingService::post_payment(&mut payment, &accounts, ledger),
            )
            .await?;

        convert::payment_state(&payment, ctx.as_of.into()).update(&txn).await?;
        txn.commit().await?;

        let reference = match payment.kind {
            PaymentKind::Receipt => SourceReference::PaymentReceipt(id),
            PaymentKind::Voucher => SourceReference::PaymentVoucher(id),
        };
        log_posted(reference, &posted);
        Ok(posted)
    }

    /// Posts an issued credit or debit note and credits its linked invoice.
    ///
    /// # Errors
    ///
    /// Returns `DocumentAlreadyPosted` if the note has a journal entry,
    /// `InvalidState` if it is not issued, or any posting rule violation. On
    /// error nothing is written.
    pub async fn post_note(
        &self,
        id: NoteId,
        ctx: &PostingContext,
    ) -> Result<PostedDocument, RepositoryError> {
        let txn = self.db.begin().await?;
        let model = adjustment_notes::Entity::find_by_id(Uuid::from(id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Adjustment note", id))?;
        let mut note = convert::adjustment_note(model)?;
        let mut invoice = match note.invoice_id {
            Some(invoice_id) => Some(load_invoice(&txn, invoice_id, true).await?),
            None => None,
        };
        let control = load_control_accounts(&txn, note.company_id).await?;
        let accounts = control.note(note.kind);

        let posted = self
            .post_in(
                &txn,
                note.company_id,
                note.note_date,
                [accounts.returns, accounts.counterparty],
                ctx,
                |ledger| {
                    DocumentPostingService::post_note(
                        &mut note,
                        invoice.as_mut(),
                        &accounts,
                        ledger,
                    )
                },
            )
            .await?;

        let now = ctx.as_of.into();
        convert::adjustment_note_state(&note, now).update(&txn).await?;
        if let (Some(invoice), Some(_)) = (&invoice, posted.applied_to_invoice) {
            convert::invoice_state(invoice, now).update(&txn).await?;
        }
        txn.commit().await?;

        let reference = match note.kind {
            NoteKind::Credit => SourceReference::CreditNote(id),
            NoteKind::Debit => SourceReference::DebitNote(id),
        };
        log_posted(reference, &posted);
        Ok(posted)
    }

    /// Posts every postable, unposted document of a company, one transaction
    /// each: invoices first, then notes, then payments, each in date order.
    ///
    /// A failing document is logged and reported; the others proceed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidates cannot be listed.
    pub async fn post_outstanding_documents(
        &self,
        company_id: CompanyId,
        ctx: &PostingContext,
    ) -> Result<BatchOutcome<SourceReference, PostedDocument, RepositoryError>, RepositoryError> {
        let company = Uuid::from(company_id);

        let invoice_rows = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(company))
            .filter(invoices::Column::IsPostedToGl.eq(false))
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(invoices::Column::Kind.eq(db::InvoiceKind::Sales))
                            .add(invoices::Column::Status.is_in([
                                db::InvoiceStatus::Issued,
                                db::InvoiceStatus::PartiallyPaid,
                            ])),
                    )
                    .add(
                        Condition::all()
                            .add(invoices::Column::Kind.eq(db::InvoiceKind::Supplier))
                            .add(invoices::Column::Status.is_in([
                                db::InvoiceStatus::Approved,
                                db::InvoiceStatus::PartiallyPaid,
                            ])),
                    ),
            )
            .order_by_asc(invoices::Column::InvoiceDate)
            .order_by_asc(invoices::Column::Number)
            .all(&self.db)
            .await?;

        let note_rows = adjustment_notes::Entity::find()
            .filter(adjustment_notes::Column::CompanyId.eq(company))
            .filter(adjustment_notes::Column::IsPostedToGl.eq(false))
            .filter(adjustment_notes::Column::Status.eq(db::NoteStatus::Issued))
            .order_by_asc(adjustment_notes::Column::NoteDate)
            .order_by_asc(adjustment_notes::Column::Number)
            .all(&self.db)
            .await?;

        let payment_rows = payments::Entity::find()
            .filter(payments::Column::CompanyId.eq(company))
            .filter(payments::Column::IsPostedToGl.eq(false))
            .filter(
                payments::Column::Status
                    .is_in([db::PaymentStatus::Cleared, db::PaymentStatus::Paid]),
            )
            .order_by_asc(payments::Column::PaymentDate)
            .order_by_asc(payments::Column::Number)
            .all(&self.db)
            .await?;

        let mut outcome = BatchOutcome::new();

        for row in invoice_rows {
            let id = InvoiceId::from(row.id);
            let (reference, result) = match InvoiceKind::from(row.kind) {
                InvoiceKind::Sales => (
                    SourceReference::SalesInvoice(id),
                    self.post_sales_invoice(id, ctx).await,
                ),
                InvoiceKind::Supplier => (
                    SourceReference::SupplierInvoice(id),
                    self.post_supplier_invoice(id, ctx).await,
                ),
            };
            record(&mut outcome, reference, result);
        }

        for row in note_rows {
            let id = NoteId::from(row.id);
            let reference = match NoteKind::from(row.kind) {
                NoteKind::Credit => SourceReference::CreditNote(id),
                NoteKind::Debit => SourceReference::DebitNote(id),
            };
            let result = self.post_note(id, ctx).await;
            record(&mut outcome, reference, result);
        }

        for row in payment_rows {
            let id = PaymentId::from(row.id);
            let reference = match PaymentKind::from(row.kind) {
                PaymentKind::Receipt => SourceReference::PaymentReceipt(id),
                PaymentKind::Voucher => SourceReference::PaymentVoucher(id),
            };
            let result = self.post_payment(id, ctx).await;
            record(&mut outcome, reference, result);
        }

        tracing::info!(
            %company_id,
            posted = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Document posting run finished"
        );
        Ok(outcome)
    }

    /// Runs a posting adapter against locked accounts and writes the entry
    /// and balances.
    async fn post_in<F>(
        &self,
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        document_date: NaiveDate,
        touched: impl IntoIterator<Item = AccountId>,
        ctx: &PostingContext,
        adapter: F,
    ) -> Result<PostedDocument, RepositoryError>
    where
        F: FnOnce(&mut LedgerContext<'_>) -> Result<PostedDocument, LedgerError>,
    {
        let periods = load_periods(txn, company_id).await?;
        let mut book = lock_accounts(txn, touched).await?;
        let numbering =
            seeded_numbering(txn, &self.entry_number_prefix, company_id, document_date).await?;

        let posted = {
            let mut ledger = LedgerContext {
                periods: &periods,
                accounts: &mut book,
                numbering: &numbering,
                posting: *ctx,
            };
            adapter(&mut ledger)?
        };

        let now: DateTimeWithTimeZone = ctx.as_of.into();
        insert_entry(txn, &posted.entry, now).await?;
        save_balances(txn, &book, &posted.receipt.deltas, now).await?;
        Ok(posted)
    }
}

fn invoice_accounts(invoice: &Invoice) -> impl Iterator<Item = AccountId> + '_ {
    invoice.lines.iter().filter_map(|line| line.account_id)
}

fn record(
    outcome: &mut BatchOutcome<SourceReference, PostedDocument, RepositoryError>,
    reference: SourceReference,
    result: Result<PostedDocument, RepositoryError>,
) {
    if let Err(err) = &result {
        match err {
            RepositoryError::Ledger(
                LedgerError::DocumentAlreadyPosted { .. } | LedgerError::InvalidState { .. },
            ) => tracing::warn!(%reference, error = %err, "Document skipped"),
            _ => tracing::error!(%reference, error = %err, "Document posting failed"),
        }
    }
    outcome.record(reference, result);
}

fn log_posted(reference: SourceReference, posted: &PostedDocument) {
    tracing::info!(
        %reference,
        journal_entry_id = %posted.entry.id(),
        entry_number = posted.entry.entry_number().unwrap_or_default(),
        total = %posted.receipt.total_debit,
        applied_to_invoice = ?posted.applied_to_invoice,
        "Document posted"
    );
}

// ============================================================================
// Shared loaders
// ============================================================================

/// Loads an invoice and its lines, optionally under an exclusive row lock.
pub(crate) async fn load_invoice<C>(
    conn: &C,
    id: InvoiceId,
    lock: bool,
) -> Result<Invoice, RepositoryError>
where
    C: ConnectionTrait,
{
    let mut query = invoices::Entity::find_by_id(Uuid::from(id));
    if lock {
        query = query.lock_exclusive();
    }
    let model = query
        .one(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Invoice", id))?;
    let items = invoice_items::Entity::find()
        .filter(invoice_items::Column::InvoiceId.eq(model.id))
        .order_by_asc(invoice_items::Column::SortOrder)
        .all(conn)
        .await?;
    convert::invoice(model, items)
}

/// Loads a payment, optionally under an exclusive row lock.
pub(crate) async fn load_payment<C>(
    conn: &C,
    id: PaymentId,
    lock: bool,
) -> Result<Payment, RepositoryError>
where
    C: ConnectionTrait,
{
    let mut query = payments::Entity::find_by_id(Uuid::from(id));
    if lock {
        query = query.lock_exclusive();
    }
    let model = query
        .one(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Payment", id))?;
    convert::payment(model)
}

async fn load_control_accounts<C>(
    conn: &C,
    company_id: CompanyId,
) -> Result<ControlAccounts, RepositoryError>
where
    C: ConnectionTrait,
{
    company_posting_accounts::Entity::find_by_id(Uuid::from(company_id))
        .one(conn)
        .await?
        .map(ControlAccounts::from)
        .ok_or_else(|| RepositoryError::not_found("Posting accounts", company_id))
}
