//! Posting adapters: turn source documents into posted journal entries.
//!
//! Every adapter runs the same sequence:
//! 1. the document is in its pre-posting state
//! 2. the document has no ledger link yet
//! 3. an open period covers the document date
//! 4. header with a `SourceReference` back to the document
//! 5. lines built per document type
//! 6. balance check on the built entry
//! 7. `PostingService::post`
//! 8. the document is linked to the entry
//! 9. notes settle against their invoice
//!
//! Steps 1 to 7 either succeed together or leave every input untouched.
//! Steps 8 and 9 cannot fail.

use chrono::NaiveDate;
use folio_shared::types::{AccountId, CompanyId, Currency};
use rust_decimal::Decimal;

use crate::ledger::{
    AccountBook, AccountingPeriod, Dimensions, EntryNumbering, JournalEntry, JournalEntryType,
    JournalLine, LedgerError, NewJournalEntry, PostingContext, PostingReceipt, PostingService,
    SourceReference, find_period_for_date, validate_posting_period,
};

use super::invoice::{Invoice, InvoiceKind, InvoiceLine};
use super::note::{AdjustmentNote, NoteKind, NoteStatus};
use super::payment::{Payment, PaymentKind};

/// Control accounts for a sales invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesInvoiceAccounts {
    /// Accounts receivable.
    pub receivable: AccountId,
    /// Output tax payable.
    pub tax_payable: Option<AccountId>,
}

/// Control accounts for a supplier invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplierInvoiceAccounts {
    /// Accounts payable.
    pub payable: AccountId,
    /// Input tax receivable.
    pub tax_receivable: Option<AccountId>,
}

/// Accounts for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAccounts {
    /// Cash or bank account.
    pub cash: AccountId,
    /// Receivable (receipts) or payable (vouchers).
    pub counterparty: AccountId,
}

/// Accounts for a credit or debit note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteAccounts {
    /// Sales returns (credit notes) or purchase returns (debit notes).
    pub returns: AccountId,
    /// Receivable (credit notes) or payable (debit notes).
    pub counterparty: AccountId,
}

/// Ledger state an adapter posts into.
pub struct LedgerContext<'a> {
    /// Periods of the document's company.
    pub periods: &'a [AccountingPeriod],
    /// Balances of every account the entry may touch.
    pub accounts: &'a mut AccountBook,
    /// Assigns the entry number once posting succeeds.
    pub numbering: &'a dyn EntryNumbering,
    /// Actor and instant of the posting.
    pub posting: PostingContext,
}

/// Result of posting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedDocument {
    /// The posted journal entry.
    pub entry: JournalEntry,
    /// Balance changes applied.
    pub receipt: PostingReceipt,
    /// Amount a note settled against its invoice.
    pub applied_to_invoice: Option<Decimal>,
}

/// Document fields the shared posting sequence needs.
struct Source {
    company_id: CompanyId,
    date: NaiveDate,
    reference: SourceReference,
    number: String,
    label: String,
    currency: Currency,
    exchange_rate: Decimal,
}

/// Stateless document posting logic.
pub struct DocumentPostingService;

impl DocumentPostingService {
    /// Posts a sales invoice: Dr receivable total, Cr revenue per account,
    /// Cr tax payable.
    pub fn post_sales_invoice(
        invoice: &mut Invoice,
        accounts: &SalesInvoiceAccounts,
        ledger: &mut LedgerContext<'_>,
    ) -> Result<PostedDocument, LedgerError> {
        Self::ensure_invoice_postable(invoice, InvoiceKind::Sales, "issued or partially_paid")?;
        let source = Self::invoice_source(invoice, SourceReference::SalesInvoice(invoice.id));

        let posted = Self::post(&source, ledger, |_| {
            let mut lines = vec![JournalLine::debit(accounts.receivable, invoice.total_amount)?];
            for (account_id, amount, dimensions) in consolidate(&invoice.lines) {
                lines.push(
                    JournalLine::credit(account_id, amount)?
                        .with_dimensions(dimensions)
                        .with_description(source.label.clone()),
                );
            }
            if let Some(tax) = accounts.tax_payable.filter(|_| invoice.tax_amount > Decimal::ZERO) {
                lines.push(JournalLine::credit(tax, invoice.tax_amount)?);
            }
            Ok(lines)
        })?;

        invoice.gl.link(posted.entry.id(), ledger.posting.as_of);
        Ok(posted)
    }

    /// Posts a supplier invoice: Dr expense per account, Dr input tax,
    /// Cr payable total.
    pub fn post_supplier_invoice(
        invoice: &mut Invoice,
        accounts: &SupplierInvoiceAccounts,
        ledger: &mut LedgerContext<'_>,
    ) -> Result<PostedDocument, LedgerError> {
        Self::ensure_invoice_postable(
            invoice,
            InvoiceKind::Supplier,
            "approved or partially_paid",
        )?;
        let source = Self::invoice_source(invoice, SourceReference::SupplierInvoice(invoice.id));

        let posted = Self::post(&source, ledger, |_| {
            let mut lines = Vec::with_capacity(invoice.lines.len() + 2);
            for (account_id, amount, dimensions) in consolidate(&invoice.lines) {
                lines.push(
                    JournalLine::debit(account_id, amount)?
                        .with_dimensions(dimensions)
                        .with_description(source.label.clone()),
                );
            }
            if let Some(tax) = accounts
                .tax_receivable
                .filter(|_| invoice.tax_amount > Decimal::ZERO)
            {
                lines.push(JournalLine::debit(tax, invoice.tax_amount)?);
            }
            lines.push(JournalLine::credit(accounts.payable, invoice.total_amount)?);
            Ok(lines)
        })?;

        invoice.gl.link(posted.entry.id(), ledger.posting.as_of);
        Ok(posted)
    }

    /// Posts a payment. Receipts: Dr cash, Cr receivable. Vouchers: Dr
    /// payable, Cr cash.
    pub fn post_payment(
        payment: &mut Payment,
        accounts: &PaymentAccounts,
        ledger: &mut LedgerContext<'_>,
    ) -> Result<PostedDocument, LedgerError> {
        if !payment.status.is_settled() {
            return Err(LedgerError::invalid_state(
                payment.label(),
                payment.status,
                "cleared or paid",
            ));
        }
        let label = payment.label();
        payment.gl.ensure_unposted(|| label.clone())?;

        let (reference, debit, credit) = match payment.kind {
            PaymentKind::Receipt => (
                SourceReference::PaymentReceipt(payment.id),
                accounts.cash,
                accounts.counterparty,
            ),
            PaymentKind::Voucher => (
                SourceReference::PaymentVoucher(payment.id),
                accounts.counterparty,
                accounts.cash,
            ),
        };
        let source = Source {
            company_id: payment.company_id,
            date: payment.payment_date,
            reference,
            number: payment.number.clone(),
            label,
            currency: payment.currency,
            exchange_rate: payment.exchange_rate,
        };

        let amount = payment.amount;
        let posted = Self::post(&source, ledger, |_| {
            Ok(vec![
                JournalLine::debit(debit, amount)?,
                JournalLine::credit(credit, amount)?,
            ])
        })?;

        payment.gl.link(posted.entry.id(), ledger.posting.as_of);
        Ok(posted)
    }

    /// Posts a credit or debit note and settles it against its invoice.
    ///
    /// Credit notes: Dr sales returns, Cr receivable. Debit notes: Dr payable,
    /// Cr purchase returns. When `invoice` is the note's linked invoice and is
    /// still open, `min(amount, outstanding)` is credited to it and the note
    /// becomes `applied`.
    pub fn post_note(
        note: &mut AdjustmentNote,
        invoice: Option<&mut Invoice>,
        accounts: &NoteAccounts,
        ledger: &mut LedgerContext<'_>,
    ) -> Result<PostedDocument, LedgerError> {
        if note.status != NoteStatus::Issued {
            return Err(LedgerError::invalid_state(note.label(), note.status, "issued"));
        }
        let label = note.label();
        note.gl.ensure_unposted(|| label.clone())?;

        if let Some(inv) = invoice.as_deref() {
            if note.invoice_id != Some(inv.id) || inv.kind != note.kind.applies_to() {
                return Err(LedgerError::invalid_state(
                    label,
                    "not linked to the supplied invoice",
                    format!("linked to {}", inv.label()),
                ));
            }
        }

        let (reference, debit, credit) = match note.kind {
            NoteKind::Credit => (
                SourceReference::CreditNote(note.id),
                accounts.returns,
                accounts.counterparty,
            ),
            NoteKind::Debit => (
                SourceReference::DebitNote(note.id),
                accounts.counterparty,
                accounts.returns,
            ),
        };
        let source = Source {
            company_id: note.company_id,
            date: note.note_date,
            reference,
            number: note.number.clone(),
            label,
            currency: note.currency,
            exchange_rate: note.exchange_rate,
        };

        let amount = note.amount;
        let mut posted = Self::post(&source, ledger, |_| {
            Ok(vec![
                JournalLine::debit(debit, amount)?,
                JournalLine::credit(credit, amount)?,
            ])
        })?;

        note.gl.link(posted.entry.id(), ledger.posting.as_of);
        if let Some(inv) = invoice.filter(|inv| inv.is_open_for_settlement()) {
            posted.applied_to_invoice = Some(inv.apply_credit(amount));
            note.status = NoteStatus::Applied;
        }
        Ok(posted)
    }

    fn ensure_invoice_postable(
        invoice: &Invoice,
        kind: InvoiceKind,
        required: &str,
    ) -> Result<(), LedgerError> {
        if invoice.kind != kind || !invoice.is_postable() {
            return Err(LedgerError::invalid_state(invoice.label(), invoice.status, required));
        }
        invoice.gl.ensure_unposted(|| invoice.label())
    }

    fn invoice_source(invoice: &Invoice, reference: SourceReference) -> Source {
        Source {
            company_id: invoice.company_id,
            date: invoice.invoice_date,
            reference,
            number: invoice.number.clone(),
            label: invoice.label(),
            currency: invoice.currency,
            exchange_rate: invoice.exchange_rate,
        }
    }

    /// Steps 3 to 7 of the posting sequence.
    fn post<F>(
        source: &Source,
        ledger: &mut LedgerContext<'_>,
        build_lines: F,
    ) -> Result<PostedDocument, LedgerError>
    where
        F: FnOnce(&Source) -> Result<Vec<JournalLine>, LedgerError>,
    {
        let period = validate_posting_period(
            find_period_for_date(ledger.periods, source.company_id, source.date),
            source.date,
        )?;

        let mut entry = JournalEntry::new(
            NewJournalEntry {
                company_id: source.company_id,
                fiscal_year_id: period.fiscal_year_id,
                accounting_period_id: period.id,
                entry_type: JournalEntryType::Automatic,
                entry_date: source.date,
                description: source.label.clone(),
                reference: Some(source.reference),
                reference_number: Some(source.number.clone()),
                currency: source.currency,
                exchange_rate: source.exchange_rate,
            },
            &ledger.posting,
        );
        entry.replace_lines(build_lines(source)?)?;

        if !entry.is_balanced() {
            return Err(LedgerError::InternalInconsistency {
                debit: entry.total_debit(),
                credit: entry.total_credit(),
            });
        }

        let receipt = PostingService::post(&mut entry, period, ledger.accounts, &ledger.posting)?;
        entry.assign_number(ledger.numbering);

        Ok(PostedDocument {
            entry,
            receipt,
            applied_to_invoice: None,
        })
    }
}

/// Sums line amounts per account in first-appearance order.
///
/// Lines without an account or with a zero amount are skipped. A combined line
/// keeps its dimensions only when every contributing item carries the same tags.
fn consolidate(lines: &[InvoiceLine]) -> Vec<(AccountId, Decimal, Dimensions)> {
    let mut combined: Vec<(AccountId, Decimal, Dimensions)> = Vec::new();
    for line in lines {
        let Some(account_id) = line.account_id else {
            continue;
        };
        match combined.iter_mut().find(|(id, _, _)| *id == account_id) {
            Some((_, amount, dimensions)) => {
                *amount += line.amount;
                if *dimensions != line.dimensions {
                    *dimensions = Dimensions::default();
                }
            }
            None => combined.push((account_id, line.amount, line.dimensions)),
        }
    }
    combined.retain(|(_, amount, _)| !amount.is_zero());
    combined
}
