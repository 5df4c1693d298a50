//! Sales and supplier invoices.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, CompanyId, Currency, GoodsReceiptLineId, InvoiceId, InvoiceLineId, ItemId,
    JournalEntryId, PartyId, PurchaseOrderId, PurchaseOrderLineId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{Dimensions, LedgerError};

/// Link from a source document to its journal entry. Set exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlLink {
    /// The journal entry created for the document.
    pub journal_entry_id: Option<JournalEntryId>,
    /// When the document was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl GlLink {
    /// Returns true once the document has been posted to the ledger.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.journal_entry_id.is_some()
    }

    /// Fails with `DocumentAlreadyPosted` if a link exists.
    pub fn ensure_unposted(&self, document: impl FnOnce() -> String) -> Result<(), LedgerError> {
        match self.journal_entry_id {
            Some(journal_entry_id) => Err(LedgerError::DocumentAlreadyPosted {
                document: document(),
                journal_entry_id,
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn link(&mut self, journal_entry_id: JournalEntryId, at: DateTime<Utc>) {
        self.journal_entry_id = Some(journal_entry_id);
        self.posted_at = Some(at);
    }
}

/// Which side of the business an invoice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    /// Customer invoice (receivable).
    Sales,
    /// Vendor bill (payable).
    Supplier,
}

impl InvoiceKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Supplier => "supplier",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sales" => Some(Self::Sales),
            "supplier" => Some(Self::Supplier),
            _ => None,
        }
    }

    /// The status an invoice of this kind has once it is open for settlement
    /// and nothing has been paid or credited.
    #[must_use]
    pub const fn open_status(self) -> InvoiceStatus {
        match self {
            Self::Sales => InvoiceStatus::Issued,
            Self::Supplier => InvoiceStatus::Approved,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Sales => "Sales invoice",
            Self::Supplier => "Supplier invoice",
        }
    }
}

/// Invoice status.
///
/// `Issued` applies to sales invoices and `Approved` to supplier invoices;
/// settlement moves either to `PartiallyPaid` and `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared.
    Draft,
    /// Sales invoice sent to the customer.
    Issued,
    /// Supplier invoice approved for payment.
    Approved,
    /// Some amount settled.
    PartiallyPaid,
    /// Fully settled.
    Paid,
    /// Voided.
    Cancelled,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Approved => "approved",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "approved" => Some(Self::Approved),
            "partially_paid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Unique identifier.
    pub id: InvoiceLineId,
    /// Item sold or purchased.
    pub item_id: Option<ItemId>,
    /// Line narrative.
    pub description: Option<String>,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
    /// Line amount (normally quantity × unit price).
    pub amount: Decimal,
    /// Revenue (sales) or expense (supplier) account.
    pub account_id: Option<AccountId>,
    /// Analytic tags.
    #[serde(default)]
    pub dimensions: Dimensions,
    /// Purchase order line this bill line refers to.
    pub purchase_order_line_id: Option<PurchaseOrderLineId>,
    /// Goods receipt line this bill line refers to.
    pub goods_receipt_line_id: Option<GoodsReceiptLineId>,
}

/// A sales or supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier.
    pub id: InvoiceId,
    /// Sales or supplier.
    pub kind: InvoiceKind,
    /// Owning company.
    pub company_id: CompanyId,
    /// Customer or supplier.
    pub party_id: PartyId,
    /// Document number.
    pub number: String,
    /// Document date.
    pub invoice_date: NaiveDate,
    /// Payment due date.
    pub due_date: NaiveDate,
    /// Invoice currency.
    pub currency: Currency,
    /// Exchange rate snapshot.
    pub exchange_rate: Decimal,
    /// Sum of line amounts.
    pub subtotal: Decimal,
    /// Tax on the subtotal.
    pub tax_amount: Decimal,
    /// Subtotal plus tax.
    pub total_amount: Decimal,
    /// Settled by payments.
    pub paid_amount: Decimal,
    /// Settled by credit/debit notes.
    pub credited_amount: Decimal,
    /// total − paid − credited, never negative.
    pub outstanding_amount: Decimal,
    /// Current status.
    pub status: InvoiceStatus,
    /// Purchase order (supplier invoices only).
    pub purchase_order_id: Option<PurchaseOrderId>,
    /// Lines in order.
    pub lines: Vec<InvoiceLine>,
    /// Ledger link.
    #[serde(default)]
    pub gl: GlLink,
}

impl Invoice {
    /// Short human label, e.g. "Sales invoice INV-001".
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.kind.label(), self.number)
    }

    /// Returns true if payments and notes may be settled against the invoice.
    #[must_use]
    pub fn is_open_for_settlement(&self) -> bool {
        matches!(
            self.status,
            InvoiceStatus::Issued | InvoiceStatus::Approved | InvoiceStatus::PartiallyPaid
        )
    }

    /// Returns true if the invoice can be posted to the ledger.
    #[must_use]
    pub fn is_postable(&self) -> bool {
        self.status == self.kind.open_status() || self.status == InvoiceStatus::PartiallyPaid
    }

    /// Returns true if something is still owed after the due date.
    #[must_use]
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.is_open_for_settlement()
            && self.outstanding_amount > Decimal::ZERO
            && as_of > self.due_date
    }

    /// Sets the amount settled by payments and re-derives outstanding and status.
    pub fn apply_paid_amount(&mut self, paid_amount: Decimal) {
        self.paid_amount = paid_amount;
        self.refresh();
    }

    /// Credits up to `amount` against the outstanding balance.
    ///
    /// Returns the amount actually applied, `min(amount, outstanding)`.
    pub fn apply_credit(&mut self, amount: Decimal) -> Decimal {
        let applied = amount.min(self.outstanding_amount).max(Decimal::ZERO);
        self.credited_amount += applied;
        self.refresh();
        applied
    }

    /// Recomputes outstanding from total, paid and credited, then the status.
    ///
    /// Draft and cancelled invoices keep their status.
    pub fn refresh(&mut self) {
        self.outstanding_amount =
            (self.total_amount - self.paid_amount - self.credited_amount).max(Decimal::ZERO);

        if matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled) {
            return;
        }
        self.status = if self.outstanding_amount <= Decimal::ZERO {
            InvoiceStatus::Paid
        } else if self.paid_amount + self.credited_amount > Decimal::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            self.kind.open_status()
        };
    }
}
