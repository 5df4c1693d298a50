//! Mapping between stored rows and domain types.
//!
//! Reads are fallible (a stored currency code or JSON column can be
//! malformed); writes are not.

use chrono::{DateTime, Utc};
use folio_core::documents::{self, AdjustmentNote, GlLink, Invoice, InvoiceLine, Payment};
use folio_core::ledger::{
    self, Account, AccountingPeriod, Dimensions, EntryAudit, FiscalYear, ForeignAmounts,
    JournalEntry, JournalLine, NewJournalEntry, RecurringTemplate, SourceReference,
    StoredJournalEntry, TemplateLine,
};
use folio_core::matching::{self, GoodsReceiptLine, InvoiceMatching, Mismatch, PurchaseOrderLine};
use folio_core::settlement::Allocation;
use folio_shared::types::{
    AccountId, AllocationId, CompanyId, CostCenterId, Currency, DepartmentId, GoodsReceiptId,
    GoodsReceiptLineId, InvoiceId, InvoiceLineId, InvoiceMatchingId, ItemId, JournalEntryId, NoteId,
    PartyId, PaymentId, ProjectId, PurchaseOrderId, PurchaseOrderLineId, RecurringTemplateId,
    UserId,
};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use super::error::RepositoryError;
use crate::entities::sea_orm_active_enums as db;
use crate::entities::{
    accounting_periods, accounts, adjustment_notes, fiscal_years, goods_receipt_lines,
    invoice_items, invoice_matchings, invoices, journal_entries, journal_entry_lines,
    payment_allocations, payments, purchase_order_lines, recurring_journal_templates,
};

/// One-to-one mapping between a Postgres enum and its domain enum.
macro_rules! enum_mapping {
    ($dbmod:ident :: $db:ident <=> $dmod:ident :: $dom:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$dbmod::$db> for $dmod::$dom {
            fn from(value: $dbmod::$db) -> Self {
                match value {
                    $($dbmod::$db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$dmod::$dom> for $dbmod::$db {
            fn from(value: $dmod::$dom) -> Self {
                match value {
                    $($dmod::$dom::$variant => Self::$variant,)+
                }
            }
        }
    };
}

enum_mapping!(db::AccountType <=> ledger::AccountType {
    Asset, Liability, Equity, Income, Expense
});
enum_mapping!(db::NormalBalance <=> ledger::NormalBalance { Debit, Credit });
enum_mapping!(db::FiscalYearStatus <=> ledger::FiscalYearStatus { Open, Closed });
enum_mapping!(db::PeriodStatus <=> ledger::PeriodStatus { Open, Closed, Locked });
enum_mapping!(db::JournalEntryType <=> ledger::JournalEntryType {
    Manual,
    Automatic,
    Opening,
    Closing,
    Adjusting,
    Reversing,
    Reclassification,
    Intercompany,
});
enum_mapping!(db::JournalStatus <=> ledger::JournalStatus { Draft, Submitted, Posted, Cancelled });
enum_mapping!(db::RecurringFrequency <=> ledger::Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
});
enum_mapping!(db::InvoiceKind <=> documents::InvoiceKind { Sales, Supplier });
enum_mapping!(db::InvoiceStatus <=> documents::InvoiceStatus {
    Draft,
    Issued,
    Approved,
    PartiallyPaid,
    Paid,
    Cancelled,
});
enum_mapping!(db::PaymentKind <=> documents::PaymentKind { Receipt, Voucher });
enum_mapping!(db::PaymentStatus <=> documents::PaymentStatus {
    Draft, Approved, Cleared, Paid, Cancelled
});
enum_mapping!(db::NoteKind <=> documents::NoteKind { Credit, Debit });
enum_mapping!(db::NoteStatus <=> documents::NoteStatus { Draft, Issued, Applied, Cancelled });
enum_mapping!(db::MatchingStatus <=> matching::MatchingStatus {
    Matched,
    QuantityMismatch,
    PriceMismatch,
    NotMatched,
});

// ============================================================================
// Scalars
// ============================================================================

fn currency(table: &'static str, value: &str) -> Result<Currency, RepositoryError> {
    value
        .trim()
        .parse()
        .map_err(|_| RepositoryError::invalid_data(table, "currency", value))
}

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn dimensions(
    cost_center_id: Option<Uuid>,
    department_id: Option<Uuid>,
    project_id: Option<Uuid>,
) -> Dimensions {
    Dimensions {
        cost_center_id: cost_center_id.map(CostCenterId::from),
        department_id: department_id.map(DepartmentId::from),
        project_id: project_id.map(ProjectId::from),
    }
}

fn gl_link(journal_entry_id: Option<Uuid>, posted_at: Option<DateTimeWithTimeZone>) -> GlLink {
    GlLink {
        journal_entry_id: journal_entry_id.map(JournalEntryId::from),
        posted_at: posted_at.map(utc),
    }
}

fn count(table: &'static str, column: &'static str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::invalid_data(table, column, value))
}

fn stored_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ============================================================================
// Ledger
// ============================================================================

pub(crate) fn account(model: accounts::Model) -> Account {
    Account {
        id: model.id.into(),
        company_id: model.company_id.into(),
        code: model.code,
        name: model.name,
        account_type: model.account_type.into(),
        normal_balance: model.normal_balance.into(),
        opening_balance: model.opening_balance,
        current_balance: model.current_balance,
        is_active: model.is_active,
        parent_id: model.parent_id.map(AccountId::from),
    }
}

pub(crate) fn new_account(account: &Account, now: DateTimeWithTimeZone) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into()),
        company_id: Set(account.company_id.into()),
        code: Set(account.code.clone()),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.into()),
        normal_balance: Set(account.normal_balance.into()),
        opening_balance: Set(account.opening_balance),
        current_balance: Set(account.current_balance),
        is_active: Set(account.is_active),
        parent_id: Set(account.parent_id.map(Uuid::from)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub(crate) fn fiscal_year(model: fiscal_years::Model) -> FiscalYear {
    FiscalYear {
        id: model.id.into(),
        company_id: model.company_id.into(),
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        is_default: model.is_default,
        status: model.status.into(),
    }
}

pub(crate) fn accounting_period(model: accounting_periods::Model) -> AccountingPeriod {
    AccountingPeriod {
        id: model.id.into(),
        fiscal_year_id: model.fiscal_year_id.into(),
        company_id: model.company_id.into(),
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        status: model.status.into(),
    }
}

pub(crate) fn journal_line(
    model: journal_entry_lines::Model,
) -> Result<JournalLine, RepositoryError> {
    let foreign = match model.foreign_currency.as_deref() {
        Some(code) => Some(ForeignAmounts {
            currency: currency("journal_entry_lines", code)?,
            debit: model.debit_foreign.unwrap_or_default(),
            credit: model.credit_foreign.unwrap_or_default(),
        }),
        None => None,
    };

    Ok(JournalLine {
        id: model.id.into(),
        account_id: model.account_id.into(),
        debit: model.debit,
        credit: model.credit,
        description: model.description,
        dimensions: dimensions(model.cost_center_id, model.department_id, model.project_id),
        foreign,
        sort_order: count("journal_entry_lines", "sort_order", model.sort_order)?,
    })
}

pub(crate) fn journal_entry(
    model: journal_entries::Model,
    lines: Vec<journal_entry_lines::Model>,
) -> Result<JournalEntry, RepositoryError> {
    let reference = match (model.reference_type.as_deref(), model.reference_id) {
        (Some(kind), Some(id)) => Some(
            SourceReference::from_parts(kind, id).ok_or_else(|| {
                RepositoryError::invalid_data("journal_entries", "reference_type", kind)
            })?,
        ),
        _ => None,
    };

    let lines = lines
        .into_iter()
        .map(journal_line)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(JournalEntry::restore(StoredJournalEntry {
        id: model.id.into(),
        header: NewJournalEntry {
            company_id: model.company_id.into(),
            fiscal_year_id: model.fiscal_year_id.into(),
            accounting_period_id: model.accounting_period_id.into(),
            entry_type: model.entry_type.into(),
            entry_date: model.entry_date,
            description: model.description,
            reference,
            reference_number: model.reference_number,
            currency: currency("journal_entries", &model.currency)?,
            exchange_rate: model.exchange_rate,
        },
        entry_number: model.entry_number,
        status: model.status.into(),
        posting_date: model.posting_date,
        is_reversal: model.is_reversal,
        reversed_entry_id: model.reversed_entry_id.map(JournalEntryId::from),
        reversal_entry_id: model.reversal_entry_id.map(JournalEntryId::from),
        audit: EntryAudit {
            created_by: model.created_by.into(),
            created_at: utc(model.created_at),
            submitted_by: model.submitted_by.map(UserId::from),
            submitted_at: model.submitted_at.map(utc),
            posted_by: model.posted_by.map(UserId::from),
            posted_at: model.posted_at.map(utc),
            cancelled_by: model.cancelled_by.map(UserId::from),
            cancelled_at: model.cancelled_at.map(utc),
        },
        lines,
    }))
}

/// Full row for an entry; used for both insert and update.
pub(crate) fn journal_entry_row(
    entry: &JournalEntry,
    now: DateTimeWithTimeZone,
) -> journal_entries::ActiveModel {
    let audit = entry.audit();
    journal_entries::ActiveModel {
        id: Set(entry.id().into()),
        company_id: Set(entry.company_id().into()),
        fiscal_year_id: Set(entry.fiscal_year_id().into()),
        accounting_period_id: Set(entry.accounting_period_id().into()),
        entry_number: Set(entry.entry_number().map(str::to_owned)),
        entry_type: Set(entry.entry_type().into()),
        entry_date: Set(entry.entry_date()),
        posting_date: Set(entry.posting_date()),
        reference_type: Set(entry.reference().map(|r| r.reference_type().to_string())),
        reference_id: Set(entry.reference().map(|r| r.reference_id())),
        reference_number: Set(entry.reference_number().map(str::to_owned)),
        status: Set(entry.status().into()),
        is_reversal: Set(entry.is_reversal()),
        reversed_entry_id: Set(entry.reversed_entry_id().map(Uuid::from)),
        reversal_entry_id: Set(entry.reversal_entry_id().map(Uuid::from)),
        currency: Set(entry.currency().to_string()),
        exchange_rate: Set(entry.exchange_rate()),
        total_debit: Set(entry.total_debit()),
        total_credit: Set(entry.total_credit()),
        description: Set(entry.description().to_owned()),
        created_by: Set(audit.created_by.into()),
        created_at: Set(audit.created_at.into()),
        submitted_by: Set(audit.submitted_by.map(Uuid::from)),
        submitted_at: Set(audit.submitted_at.map(Into::into)),
        posted_by: Set(audit.posted_by.map(Uuid::from)),
        posted_at: Set(audit.posted_at.map(Into::into)),
        cancelled_by: Set(audit.cancelled_by.map(Uuid::from)),
        cancelled_at: Set(audit.cancelled_at.map(Into::into)),
        updated_at: Set(now),
    }
}

pub(crate) fn journal_line_rows(
    entry: &JournalEntry,
    now: DateTimeWithTimeZone,
) -> Vec<journal_entry_lines::ActiveModel> {
    entry
        .lines()
        .iter()
        .map(|line| journal_entry_lines::ActiveModel {
            id: Set(line.id.into()),
            journal_entry_id: Set(entry.id().into()),
            account_id: Set(line.account_id.into()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            description: Set(line.description.clone()),
            cost_center_id: Set(line.dimensions.cost_center_id.map(Uuid::from)),
            department_id: Set(line.dimensions.department_id.map(Uuid::from)),
            project_id: Set(line.dimensions.project_id.map(Uuid::from)),
            foreign_currency: Set(line.foreign.map(|f| f.currency.to_string())),
            debit_foreign: Set(line.foreign.map(|f| f.debit)),
            credit_foreign: Set(line.foreign.map(|f| f.credit)),
            sort_order: Set(stored_count(line.sort_order)),
            created_at: Set(now),
        })
        .collect()
}

pub(crate) fn recurring_template(
    model: recurring_journal_templates::Model,
) -> Result<RecurringTemplate, RepositoryError> {
    const TABLE: &str = "recurring_journal_templates";

    let lines: Vec<TemplateLine> = serde_json::from_value(model.template_lines)
        .map_err(|e| RepositoryError::invalid_data(TABLE, "template_lines", e))?;

    Ok(RecurringTemplate {
        id: RecurringTemplateId::from(model.id),
        company_id: CompanyId::from(model.company_id),
        name: model.name,
        description: model.description,
        frequency: model.frequency.into(),
        start_date: model.start_date,
        end_date: model.end_date,
        max_occurrences: model
            .max_occurrences
            .map(|max| count(TABLE, "max_occurrences", max))
            .transpose()?,
        occurrences_count: count(TABLE, "occurrences_count", model.occurrences_count)?,
        last_generated_date: model.last_generated_date,
        next_generation_date: model.next_generation_date,
        is_active: model.is_active,
        entry_type: model.entry_type.into(),
        currency: currency(TABLE, &model.currency)?,
        exchange_rate: model.exchange_rate,
        lines,
    })
}

pub(crate) fn recurring_template_row(
    template: &RecurringTemplate,
    now: DateTimeWithTimeZone,
) -> Result<recurring_journal_templates::ActiveModel, RepositoryError> {
    let lines = serde_json::to_value(&template.lines).map_err(|e| {
        RepositoryError::invalid_data("recurring_journal_templates", "template_lines", e)
    })?;

    Ok(recurring_journal_templates::ActiveModel {
        id: Set(template.id.into()),
        company_id: Set(template.company_id.into()),
        name: Set(template.name.clone()),
        description: Set(template.description.clone()),
        frequency: Set(template.frequency.into()),
        start_date: Set(template.start_date),
        end_date: Set(template.end_date),
        max_occurrences: Set(template.max_occurrences.map(stored_count)),
        occurrences_count: Set(stored_count(template.occurrences_count)),
        last_generated_date: Set(template.last_generated_date),
        next_generation_date: Set(template.next_generation_date),
        is_active: Set(template.is_active),
        entry_type: Set(template.entry_type.into()),
        currency: Set(template.currency.to_string()),
        exchange_rate: Set(template.exchange_rate),
        template_lines: Set(lines),
        updated_at: Set(now),
        ..Default::default()
    })
}

// ============================================================================
// Documents
// ============================================================================

pub(crate) fn invoice(
    model: invoices::Model,
    items: Vec<invoice_items::Model>,
) -> Result<Invoice, RepositoryError> {
    let lines = items
        .into_iter()
        .map(|item| InvoiceLine {
            id: InvoiceLineId::from(item.id),
            item_id: item.item_id.map(ItemId::from),
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount: item.amount,
            account_id: item.account_id.map(AccountId::from),
            dimensions: dimensions(item.cost_center_id, item.department_id, item.project_id),
            purchase_order_line_id: item.purchase_order_line_id.map(PurchaseOrderLineId::from),
            goods_receipt_line_id: item.goods_receipt_line_id.map(GoodsReceiptLineId::from),
        })
        .collect();

    Ok(Invoice {
        id: model.id.into(),
        kind: model.kind.into(),
        company_id: model.company_id.into(),
        party_id: PartyId::from(model.party_id),
        number: model.number,
        invoice_date: model.invoice_date,
        due_date: model.due_date,
        currency: currency("invoices", &model.currency)?,
        exchange_rate: model.exchange_rate,
        subtotal: model.subtotal,
        tax_amount: model.tax_amount,
        total_amount: model.total_amount,
        paid_amount: model.paid_amount,
        credited_amount: model.credited_amount,
        outstanding_amount: model.outstanding_amount,
        status: model.status.into(),
        purchase_order_id: model.purchase_order_id.map(PurchaseOrderId::from),
        lines,
        gl: gl_link(model.journal_entry_id, model.posted_to_gl_at),
    })
}

/// Columns of an invoice that settlement and posting change.
pub(crate) fn invoice_state(invoice: &Invoice, now: DateTimeWithTimeZone) -> invoices::ActiveModel {
    invoices::ActiveModel {
        id: Set(invoice.id.into()),
        paid_amount: Set(invoice.paid_amount),
        credited_amount: Set(invoice.credited_amount),
        outstanding_amount: Set(invoice.outstanding_amount),
        status: Set(invoice.status.into()),
        journal_entry_id: Set(invoice.gl.journal_entry_id.map(Uuid::from)),
        is_posted_to_gl: Set(invoice.gl.is_posted()),
        posted_to_gl_at: Set(invoice.gl.posted_at.map(Into::into)),
        updated_at: Set(now),
        ..Default::default()
    }
}

pub(crate) fn payment(model: payments::Model) -> Result<Payment, RepositoryError> {
    Ok(Payment {
        id: PaymentId::from(model.id),
        kind: model.kind.into(),
        company_id: model.company_id.into(),
        party_id: model.party_id.into(),
        number: model.number,
        payment_date: model.payment_date,
        currency: currency("payments", &model.currency)?,
        exchange_rate: model.exchange_rate,
        amount: model.amount,
        allocated_amount: model.allocated_amount,
        unallocated_amount: model.unallocated_amount,
        status: model.status.into(),
        gl: gl_link(model.journal_entry_id, model.posted_to_gl_at),
    })
}

/// Columns of a payment that settlement and posting change.
pub(crate) fn payment_state(payment: &Payment, now: DateTimeWithTimeZone) -> payments::ActiveModel {
    payments::ActiveModel {
        id: Set(payment.id.into()),
        allocated_amount: Set(payment.allocated_amount),
        unallocated_amount: Set(payment.unallocated_amount),
        status: Set(payment.status.into()),
        journal_entry_id: Set(payment.gl.journal_entry_id.map(Uuid::from)),
        is_posted_to_gl: Set(payment.gl.is_posted()),
        posted_to_gl_at: Set(payment.gl.posted_at.map(Into::into)),
        updated_at: Set(now),
        ..Default::default()
    }
}

pub(crate) fn adjustment_note(
    model: adjustment_notes::Model,
) -> Result<AdjustmentNote, RepositoryError> {
    Ok(AdjustmentNote {
        id: NoteId::from(model.id),
        kind: model.kind.into(),
        company_id: model.company_id.into(),
        party_id: model.party_id.into(),
        number: model.number,
        note_date: model.note_date,
        currency: currency("adjustment_notes", &model.currency)?,
        exchange_rate: model.exchange_rate,
        amount: model.amount,
        invoice_id: model.invoice_id.map(InvoiceId::from),
        reason: model.reason,
        status: model.status.into(),
        gl: gl_link(model.journal_entry_id, model.posted_to_gl_at),
    })
}

/// Columns of a note that posting changes.
pub(crate) fn adjustment_note_state(
    note: &AdjustmentNote,
    now: DateTimeWithTimeZone,
) -> adjustment_notes::ActiveModel {
    adjustment_notes::ActiveModel {
        id: Set(note.id.into()),
        status: Set(note.status.into()),
        journal_entry_id: Set(note.gl.journal_entry_id.map(Uuid::from)),
        is_posted_to_gl: Set(note.gl.is_posted()),
        posted_to_gl_at: Set(note.gl.posted_at.map(Into::into)),
        updated_at: Set(now),
        ..Default::default()
    }
}

// ============================================================================
// Settlement & matching
// ============================================================================

pub(crate) fn allocation(model: payment_allocations::Model) -> Result<Allocation, RepositoryError> {
    Ok(Allocation {
        id: AllocationId::from(model.id),
        payment_id: model.payment_id.into(),
        invoice_id: model.invoice_id.into(),
        amount: model.allocated_amount,
        currency: currency("payment_allocations", &model.currency)?,
        allocation_date: model.allocation_date,
        allocated_by: model.allocated_by.into(),
    })
}

pub(crate) fn allocation_row(
    allocation: &Allocation,
    now: DateTimeWithTimeZone,
) -> payment_allocations::ActiveModel {
    payment_allocations::ActiveModel {
        id: Set(allocation.id.into()),
        payment_id: Set(allocation.payment_id.into()),
        invoice_id: Set(allocation.invoice_id.into()),
        allocated_amount: Set(allocation.amount),
        currency: Set(allocation.currency.to_string()),
        allocation_date: Set(allocation.allocation_date),
        allocated_by: Set(allocation.allocated_by.into()),
        updated_at: Set(now),
        ..Default::default()
    }
}

pub(crate) fn purchase_order_line(model: purchase_order_lines::Model) -> PurchaseOrderLine {
    PurchaseOrderLine {
        id: model.id.into(),
        purchase_order_id: model.purchase_order_id.into(),
        item_id: model.item_id.map(ItemId::from),
        quantity: model.quantity,
        unit_price: model.unit_price,
    }
}

pub(crate) fn goods_receipt_line(model: goods_receipt_lines::Model) -> GoodsReceiptLine {
    GoodsReceiptLine {
        id: model.id.into(),
        goods_receipt_id: GoodsReceiptId::from(model.goods_receipt_id),
        purchase_order_line_id: model.purchase_order_line_id.into(),
        received_quantity: model.received_quantity,
    }
}

pub(crate) fn invoice_matching(
    model: invoice_matchings::Model,
) -> Result<InvoiceMatching, RepositoryError> {
    let mismatches: Vec<Mismatch> = serde_json::from_value(model.mismatches)
        .map_err(|e| RepositoryError::invalid_data("invoice_matchings", "mismatches", e))?;

    Ok(InvoiceMatching {
        id: InvoiceMatchingId::from(model.id),
        invoice_id: model.invoice_id.into(),
        purchase_order_id: model.purchase_order_id.into(),
        po_total: model.po_total,
        grn_total: model.grn_total,
        invoice_total: model.invoice_total,
        quantity_variance: model.quantity_variance,
        price_variance: model.price_variance,
        total_variance: model.total_variance,
        variance_percentage: model.variance_percentage,
        tolerance_percentage: model.tolerance_percentage,
        is_within_tolerance: model.is_within_tolerance,
        matching_status: model.matching_status.into(),
        mismatches,
        matched_at: utc(model.matched_at),
    })
}

/// Row for a match result, keyed by `id`; the caller keeps the id of an
/// existing row for the same invoice.
pub(crate) fn invoice_matching_row(
    matching: &InvoiceMatching,
    now: DateTimeWithTimeZone,
) -> Result<invoice_matchings::ActiveModel, RepositoryError> {
    let mismatches = serde_json::to_value(&matching.mismatches)
        .map_err(|e| RepositoryError::invalid_data("invoice_matchings", "mismatches", e))?;

    Ok(invoice_matchings::ActiveModel {
        id: Set(matching.id.into()),
        invoice_id: Set(matching.invoice_id.into()),
        purchase_order_id: Set(matching.purchase_order_id.into()),
        po_total: Set(matching.po_total),
        grn_total: Set(matching.grn_total),
        invoice_total: Set(matching.invoice_total),
        quantity_variance: Set(matching.quantity_variance),
        price_variance: Set(matching.price_variance),
        total_variance: Set(matching.total_variance),
        variance_percentage: Set(matching.variance_percentage),
        tolerance_percentage: Set(matching.tolerance_percentage),
        is_within_tolerance: Set(matching.is_within_tolerance),
        matching_status: Set(matching.matching_status.into()),
        mismatches: Set(mismatches),
        matched_at: Set(matching.matched_at.into()),
        updated_at: Set(now),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use folio_core::ledger::JournalStatus;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn now() -> DateTimeWithTimeZone {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap().into()
    }

    fn entry_model(currency: &str) -> journal_entries::Model {
        journal_entries::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            fiscal_year_id: Uuid::new_v4(),
            accounting_period_id: Uuid::new_v4(),
            entry_number: Some("JE-2024-000003".into()),
            entry_type: db::JournalEntryType::Automatic,
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            posting_date: Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            reference_type: Some("sales_invoice".into()),
            reference_id: Some(Uuid::new_v4()),
            reference_number: Some("INV-0001".into()),
            status: db::JournalStatus::Posted,
            is_reversal: false,
            reversed_entry_id: None,
            reversal_entry_id: None,
            currency: currency.into(),
            exchange_rate: Decimal::ONE,
            total_debit: dec!(100),
            total_credit: dec!(100),
            description: "Sales invoice INV-0001".into(),
            created_by: Uuid::new_v4(),
            created_at: now(),
            submitted_by: None,
            submitted_at: None,
            posted_by: Some(Uuid::new_v4()),
            posted_at: Some(now()),
            cancelled_by: None,
            cancelled_at: None,
            updated_at: now(),
        }
    }

    fn line_model(
        entry_id: Uuid,
        debit: Decimal,
        credit: Decimal,
        sort_order: i32,
    ) -> journal_entry_lines::Model {
        journal_entry_lines::Model {
            id: Uuid::new_v4(),
            journal_entry_id: entry_id,
            account_id: Uuid::new_v4(),
            debit,
            credit,
            description: None,
            cost_center_id: None,
            department_id: None,
            project_id: Some(Uuid::new_v4()),
            foreign_currency: None,
            debit_foreign: None,
            credit_foreign: None,
            sort_order,
            created_at: now(),
        }
    }

    #[rstest]
    #[case(db::JournalStatus::Draft, JournalStatus::Draft)]
    #[case(db::JournalStatus::Submitted, JournalStatus::Submitted)]
    #[case(db::JournalStatus::Posted, JournalStatus::Posted)]
    #[case(db::JournalStatus::Cancelled, JournalStatus::Cancelled)]
    fn test_journal_status_mapping(
        #[case] stored: db::JournalStatus,
        #[case] domain: JournalStatus,
    ) {
        assert_eq!(JournalStatus::from(stored), domain);
        assert_eq!(db::JournalStatus::from(domain), stored);
    }

    #[test]
    fn test_entry_restored_in_line_order_with_totals() {
        let model = entry_model("USD");
        let lines = vec![
            line_model(model.id, Decimal::ZERO, dec!(100), 1),
            line_model(model.id, dec!(100), Decimal::ZERO, 0),
        ];

        let entry = journal_entry(model.clone(), lines).unwrap();

        assert_eq!(entry.status(), JournalStatus::Posted);
        assert_eq!(entry.total_debit(), dec!(100));
        assert!(entry.is_balanced());
        assert_eq!(entry.lines()[0].debit, dec!(100));
        assert!(entry.lines()[0].dimensions.project_id.is_some());
        assert!(matches!(entry.reference(), Some(SourceReference::SalesInvoice(_))));

        let row = journal_entry_row(&entry, now());
        assert_eq!(row.reference_type, Set(model.reference_type));
        assert_eq!(row.entry_number, Set(model.entry_number));
        assert_eq!(row.total_credit, Set(dec!(100)));
    }

    #[test]
    fn test_malformed_currency_is_reported() {
        let err = journal_entry(entry_model("DOLLARS"), Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InvalidData { table: "journal_entries", column: "currency", .. }
        ));
    }

    #[test]
    fn test_unknown_reference_type_is_reported() {
        let mut model = entry_model("USD");
        model.reference_type = Some("purchase_order".into());
        let err = journal_entry(model, Vec::new()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STORED_DATA");
    }

    #[test]
    fn test_template_lines_read_from_json() {
        let account_id = Uuid::new_v4();
        let model = recurring_journal_templates::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Monthly rent".into(),
            description: None,
            frequency: db::RecurringFrequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            end_date: None,
            max_occurrences: Some(12),
            occurrences_count: 2,
            last_generated_date: None,
            next_generation_date: None,
            is_active: true,
            entry_type: db::JournalEntryType::Automatic,
            currency: "USD".into(),
            exchange_rate: Decimal::ONE,
            template_lines: serde_json::json!([
                { "account_id": account_id, "debit": "1500.00" },
                { "account_id": Uuid::new_v4(), "credit": "1500.00", "description": "Rent" }
            ]),
            created_at: now(),
            updated_at: now(),
        };

        let template = recurring_template(model).unwrap();
        assert_eq!(template.frequency, ledger::Frequency::Monthly);
        assert_eq!(template.max_occurrences, Some(12));
        assert_eq!(template.lines.len(), 2);
        assert_eq!(template.lines[0].account_id, AccountId::from(account_id));
        assert_eq!(template.lines[0].debit, dec!(1500));
        assert_eq!(template.lines[1].description.as_deref(), Some("Rent"));

        let row = recurring_template_row(&template, now()).unwrap();
        assert_eq!(row.occurrences_count, Set(2));
    }
}
