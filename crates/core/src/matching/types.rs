//! Three-way matching inputs and results.

use chrono::{DateTime, Utc};
use folio_shared::types::{
    GoodsReceiptId, GoodsReceiptLineId, InvoiceId, InvoiceLineId, InvoiceMatchingId, ItemId,
    PurchaseOrderId, PurchaseOrderLineId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered line of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    /// Unique identifier.
    pub id: PurchaseOrderLineId,
    /// Owning purchase order.
    pub purchase_order_id: PurchaseOrderId,
    /// Ordered item.
    pub item_id: Option<ItemId>,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Agreed unit price.
    pub unit_price: Decimal,
}

/// A received line of a goods received note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiptLine {
    /// Unique identifier.
    pub id: GoodsReceiptLineId,
    /// Owning goods received note.
    pub goods_receipt_id: GoodsReceiptId,
    /// Purchase order line received against.
    pub purchase_order_line_id: PurchaseOrderLineId,
    /// Quantity received.
    pub received_quantity: Decimal,
}

/// Kind of discrepancy found on an invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchType {
    /// The invoiced item is not on the purchase order.
    ItemNotInPo,
    /// Invoiced quantity differs from the received quantity.
    QuantityMismatch,
    /// Invoiced quantity is more than was ordered (nothing received yet).
    QuantityExceedsPo,
    /// Unit price differs from the ordered price.
    PriceMismatch,
}

impl MismatchType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ItemNotInPo => "item_not_in_po",
            Self::QuantityMismatch => "quantity_mismatch",
            Self::QuantityExceedsPo => "quantity_exceeds_po",
            Self::PriceMismatch => "price_mismatch",
        }
    }

    /// Returns true for the quantity kinds.
    #[must_use]
    pub const fn is_quantity(&self) -> bool {
        matches!(self, Self::QuantityMismatch | Self::QuantityExceedsPo)
    }
}

impl fmt::Display for MismatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrepancy on one invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Kind of discrepancy.
    #[serde(rename = "type")]
    pub mismatch_type: MismatchType,
    /// Invoice line concerned.
    pub invoice_line_id: InvoiceLineId,
    /// Item concerned.
    pub item_id: Option<ItemId>,
    /// Ordered or received value.
    pub expected: Decimal,
    /// Invoiced value.
    pub actual: Decimal,
    /// actual − expected.
    pub variance: Decimal,
    /// |variance| / expected × 100, or 0 when expected is 0.
    pub variance_percentage: Decimal,
}

/// Overall result of matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStatus {
    /// No discrepancy, or within tolerance.
    Matched,
    /// Quantity discrepancies dominate.
    QuantityMismatch,
    /// Price discrepancies dominate.
    PriceMismatch,
    /// Discrepancies of another kind.
    NotMatched,
}

impl MatchingStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::QuantityMismatch => "quantity_mismatch",
            Self::PriceMismatch => "price_mismatch",
            Self::NotMatched => "not_matched",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "matched" => Some(Self::Matched),
            "quantity_mismatch" => Some(Self::QuantityMismatch),
            "price_mismatch" => Some(Self::PriceMismatch),
            "not_matched" => Some(Self::NotMatched),
            _ => None,
        }
    }
}

impl fmt::Display for MatchingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-way match result for one supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMatching {
    /// Unique identifier.
    pub id: InvoiceMatchingId,
    /// Matched supplier invoice.
    pub invoice_id: InvoiceId,
    /// Purchase order matched against.
    pub purchase_order_id: PurchaseOrderId,
    /// Σ ordered quantity × price of the invoiced PO lines.
    pub po_total: Decimal,
    /// Σ received quantity × PO price.
    pub grn_total: Decimal,
    /// Σ invoice line amounts.
    pub invoice_total: Decimal,
    /// Σ |quantity difference| × PO price over quantity mismatches.
    pub quantity_variance: Decimal,
    /// Σ |price difference| × invoiced quantity over price mismatches.
    pub price_variance: Decimal,
    /// |invoice_total − po_total|.
    pub total_variance: Decimal,
    /// total_variance / po_total × 100, or 0 when po_total is 0.
    pub variance_percentage: Decimal,
    /// Tolerance the result was judged against.
    pub tolerance_percentage: Decimal,
    /// variance_percentage ≤ tolerance_percentage.
    pub is_within_tolerance: bool,
    /// Final classification.
    pub matching_status: MatchingStatus,
    /// Discrepancies in invoice line order.
    pub mismatches: Vec<Mismatch>,
    /// When matching ran.
    pub matched_at: DateTime<Utc>,
}

impl InvoiceMatching {
    /// Whether the invoice may proceed to approval.
    #[must_use]
    pub fn allows_approval(&self) -> bool {
        self.matching_status == MatchingStatus::Matched || self.is_within_tolerance
    }
}
