//! Payment receipts and vouchers.

use chrono::NaiveDate;
use folio_shared::types::{CompanyId, Currency, PartyId, PaymentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::invoice::{GlLink, InvoiceKind};

/// Direction of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// Money received from a customer.
    Receipt,
    /// Money paid to a supplier.
    Voucher,
}

impl PaymentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Voucher => "voucher",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "receipt" => Some(Self::Receipt),
            "voucher" => Some(Self::Voucher),
            _ => None,
        }
    }

    /// The invoice kind this payment settles.
    #[must_use]
    pub const fn settles(self) -> InvoiceKind {
        match self {
            Self::Receipt => InvoiceKind::Sales,
            Self::Voucher => InvoiceKind::Supplier,
        }
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Being prepared.
    Draft,
    /// Approved, funds not yet moved.
    Approved,
    /// Cleared by the bank.
    Cleared,
    /// Paid out or received.
    Paid,
    /// Voided.
    Cancelled,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Cleared => "cleared",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "approved" => Some(Self::Approved),
            "cleared" => Some(Self::Cleared),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Settled payments are the only ones that can be allocated or posted, and
    /// the only ones counted toward an invoice's paid amount.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Cleared | Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment receipt or voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier.
    pub id: PaymentId,
    /// Receipt or voucher.
    pub kind: PaymentKind,
    /// Owning company.
    pub company_id: CompanyId,
    /// Customer or supplier.
    pub party_id: PartyId,
    /// Document number.
    pub number: String,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Payment currency.
    pub currency: Currency,
    /// Exchange rate snapshot.
    pub exchange_rate: Decimal,
    /// Amount paid.
    pub amount: Decimal,
    /// Sum of allocations.
    pub allocated_amount: Decimal,
    /// amount − allocated, never negative.
    pub unallocated_amount: Decimal,
    /// Current status.
    pub status: PaymentStatus,
    /// Ledger link.
    #[serde(default)]
    pub gl: GlLink,
}

impl Payment {
    /// Short human label, e.g. "Payment receipt RCP-001".
    #[must_use]
    pub fn label(&self) -> String {
        match self.kind {
            PaymentKind::Receipt => format!("Payment receipt {}", self.number),
            PaymentKind::Voucher => format!("Payment voucher {}", self.number),
        }
    }

    /// Sets the allocated sum and re-derives the unallocated amount.
    pub fn apply_allocated_amount(&mut self, allocated_amount: Decimal) {
        self.allocated_amount = allocated_amount;
        self.unallocated_amount = (self.amount - allocated_amount).max(Decimal::ZERO);
    }
}
