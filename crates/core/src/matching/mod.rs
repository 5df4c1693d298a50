//! Three-way matching of supplier invoices.
//!
//! A supplier invoice is compared line by line with its purchase order and
//! the goods received against it. The resulting [`InvoiceMatching`] gates
//! invoice approval.

pub mod error;
pub mod three_way;
pub mod types;

#[cfg(test)]
mod three_way_props;

pub use error::MatchingError;
pub use three_way::{
    DEFAULT_PRICE_TOLERANCE, DEFAULT_TOLERANCE_PERCENTAGE, ThreeWayMatcher, classify,
};
pub use types::{
    GoodsReceiptLine, InvoiceMatching, MatchingStatus, Mismatch, MismatchType, PurchaseOrderLine,
};
