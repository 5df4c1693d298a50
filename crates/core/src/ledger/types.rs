//! Ledger domain types shared by journal entries, posting and reversal.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    CostCenterId, DepartmentId, InvoiceId, NoteId, PaymentId, ProjectId, RecurringTemplateId,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Side of a journal line.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/income accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/income accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

impl EntrySide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Journal entry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEntryType {
    /// Entered by hand.
    Manual,
    /// Generated from a source document or template.
    Automatic,
    /// Opening balances.
    Opening,
    /// Year-end closing entry.
    Closing,
    /// Period-end adjustment.
    Adjusting,
    /// Mirror of a posted entry.
    Reversing,
    /// Moves amounts between accounts.
    Reclassification,
    /// Between companies of a group.
    Intercompany,
}

impl JournalEntryType {
    /// Returns the string representation of the entry type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Adjusting => "adjusting",
            Self::Reversing => "reversing",
            Self::Reclassification => "reclassification",
            Self::Intercompany => "intercompany",
        }
    }

    /// Parses an entry type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "automatic" => Some(Self::Automatic),
            "opening" => Some(Self::Opening),
            "closing" => Some(Self::Closing),
            "adjusting" => Some(Self::Adjusting),
            "reversing" => Some(Self::Reversing),
            "reclassification" => Some(Self::Reclassification),
            "intercompany" => Some(Self::Intercompany),
            _ => None,
        }
    }
}

/// Journal entry status.
///
/// The valid transitions are:
/// - Draft → Submitted (submit)
/// - Draft | Submitted → Posted (post)
/// - Draft | Submitted → Cancelled (cancel)
/// - Posted → Cancelled (cancel, only once a reversal exists)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    /// Entry is being drafted and its lines can be modified.
    Draft,
    /// Entry has been submitted for posting.
    Submitted,
    /// Entry has been applied to account balances (immutable).
    Posted,
    /// Entry has been cancelled (immutable).
    Cancelled,
}

impl JournalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Posted => "posted",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "posted" => Some(Self::Posted),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if lines may still be added, removed or replaced.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry is waiting to be posted.
    #[must_use]
    pub const fn is_postable(&self) -> bool {
        matches!(self, Self::Draft | Self::Submitted)
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The business document a journal entry was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SourceReference {
    /// Customer invoice.
    SalesInvoice(InvoiceId),
    /// Vendor bill.
    SupplierInvoice(InvoiceId),
    /// Incoming payment.
    PaymentReceipt(PaymentId),
    /// Outgoing payment.
    PaymentVoucher(PaymentId),
    /// Customer credit note.
    CreditNote(NoteId),
    /// Supplier debit note.
    DebitNote(NoteId),
    /// Recurring journal template.
    RecurringTemplate(RecurringTemplateId),
}

impl SourceReference {
    /// Returns the persisted reference type discriminator.
    #[must_use]
    pub const fn reference_type(&self) -> &'static str {
        match self {
            Self::SalesInvoice(_) => "sales_invoice",
            Self::SupplierInvoice(_) => "supplier_invoice",
            Self::PaymentReceipt(_) => "payment_receipt",
            Self::PaymentVoucher(_) => "payment_voucher",
            Self::CreditNote(_) => "credit_note",
            Self::DebitNote(_) => "debit_note",
            Self::RecurringTemplate(_) => "recurring_template",
        }
    }

    /// Returns the referenced document's UUID.
    #[must_use]
    pub const fn reference_id(&self) -> Uuid {
        match self {
            Self::SalesInvoice(id) | Self::SupplierInvoice(id) => id.0,
            Self::PaymentReceipt(id) | Self::PaymentVoucher(id) => id.0,
            Self::CreditNote(id) | Self::DebitNote(id) => id.0,
            Self::RecurringTemplate(id) => id.0,
        }
    }

    /// Rebuilds a reference from its persisted discriminator and id.
    pub fn from_parts(reference_type: &str, id: Uuid) -> Option<Self> {
        match reference_type {
            "sales_invoice" => Some(Self::SalesInvoice(InvoiceId::from_uuid(id))),
            "supplier_invoice" => Some(Self::SupplierInvoice(InvoiceId::from_uuid(id))),
            "payment_receipt" => Some(Self::PaymentReceipt(PaymentId::from_uuid(id))),
            "payment_voucher" => Some(Self::PaymentVoucher(PaymentId::from_uuid(id))),
            "credit_note" => Some(Self::CreditNote(NoteId::from_uuid(id))),
            "debit_note" => Some(Self::DebitNote(NoteId::from_uuid(id))),
            "recurring_template" => {
                Some(Self::RecurringTemplate(RecurringTemplateId::from_uuid(id)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference_type(), self.reference_id())
    }
}

/// Optional analytic tags carried by a journal line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Cost center tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center_id: Option<CostCenterId>,
    /// Department tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<DepartmentId>,
    /// Project tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl Dimensions {
    /// Returns true if no dimension is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cost_center_id.is_none() && self.department_id.is_none() && self.project_id.is_none()
    }
}

/// Who is acting and at which instant.
///
/// Every state-changing operation takes this explicitly instead of reading a
/// clock or a session, so the engine stays deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingContext {
    /// The acting user, recorded in audit fields.
    pub actor: UserId,
    /// The instant the operation is considered to happen at.
    pub as_of: DateTime<Utc>,
}

impl PostingContext {
    /// Creates a new context.
    #[must_use]
    pub const fn new(actor: UserId, as_of: DateTime<Utc>) -> Self {
        Self { actor, as_of }
    }

    /// Returns the calendar date of `as_of` (UTC).
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.as_of.date_naive()
    }
}
