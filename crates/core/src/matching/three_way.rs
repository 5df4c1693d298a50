//! Three-way matching of supplier invoices against purchase orders and
//! goods received notes.

use chrono::{DateTime, Utc};
use folio_shared::types::{InvoiceMatchingId, PurchaseOrderId, PurchaseOrderLineId};
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::documents::{Invoice, InvoiceKind, InvoiceLine};

use super::error::MatchingError;
use super::types::{
    GoodsReceiptLine, InvoiceMatching, MatchingStatus, Mismatch, MismatchType, PurchaseOrderLine,
};

/// Invoice-level variance accepted when the caller does not specify one.
pub const DEFAULT_TOLERANCE_PERCENTAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Unit-price difference ignored when comparing prices.
pub const DEFAULT_PRICE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const PERCENT_SCALE: u32 = 4;

/// Compares supplier invoices with their purchase order and receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreeWayMatcher {
    price_tolerance: Decimal,
}

impl Default for ThreeWayMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_TOLERANCE)
    }
}

#[derive(Default)]
struct Totals {
    po_total: Decimal,
    grn_total: Decimal,
    quantity_variance: Decimal,
    price_variance: Decimal,
}

impl ThreeWayMatcher {
    /// Creates a matcher with an absolute unit-price tolerance.
    #[must_use]
    pub const fn new(price_tolerance: Decimal) -> Self {
        Self { price_tolerance }
    }

    /// Matches `invoice` against its purchase order lines and receipts.
    ///
    /// `po_lines` and `grn_lines` may contain lines of other orders; only the
    /// invoice's purchase order is considered.
    pub fn validate(
        &self,
        invoice: &Invoice,
        po_lines: &[PurchaseOrderLine],
        grn_lines: &[GoodsReceiptLine],
        tolerance_percentage: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<InvoiceMatching, MatchingError> {
        if invoice.kind != InvoiceKind::Supplier {
            return Err(MatchingError::NotSupplierInvoice(invoice.id));
        }
        let purchase_order_id = invoice
            .purchase_order_id
            .ok_or(MatchingError::MissingPurchaseOrder(invoice.id))?;
        if tolerance_percentage < Decimal::ZERO {
            return Err(MatchingError::InvalidTolerance(tolerance_percentage));
        }

        let mut totals = Totals::default();
        let mut mismatches = Vec::new();
        let mut counted: HashSet<PurchaseOrderLineId> = HashSet::new();

        for line in &invoice.lines {
            let Some(po_line) = find_po_line(line, purchase_order_id, po_lines) else {
                mismatches.push(Mismatch {
                    mismatch_type: MismatchType::ItemNotInPo,
                    invoice_line_id: line.id,
                    item_id: line.item_id,
                    expected: Decimal::ZERO,
                    actual: line.quantity,
                    variance: line.quantity,
                    variance_percentage: Decimal::ZERO,
                });
                continue;
            };

            let received = received_quantity(line, po_line, grn_lines);
            if counted.insert(po_line.id) {
                totals.po_total += po_line.quantity * po_line.unit_price;
                totals.grn_total += received.unwrap_or(Decimal::ZERO) * po_line.unit_price;
            }

            let quantity = match received {
                Some(received) if line.quantity != received => {
                    Some((MismatchType::QuantityMismatch, received))
                }
                None if line.quantity > po_line.quantity => {
                    Some((MismatchType::QuantityExceedsPo, po_line.quantity))
                }
                _ => None,
            };
            if let Some((mismatch_type, expected)) = quantity {
                let variance = line.quantity - expected;
                totals.quantity_variance += variance.abs() * po_line.unit_price;
                mismatches.push(Mismatch {
                    mismatch_type,
                    invoice_line_id: line.id,
                    item_id: line.item_id,
                    expected,
                    actual: line.quantity,
                    variance,
                    variance_percentage: percentage(variance.abs(), expected),
                });
            }

            let price_variance = line.unit_price - po_line.unit_price;
            if price_variance.abs() > self.price_tolerance {
                totals.price_variance += price_variance.abs() * line.quantity;
                mismatches.push(Mismatch {
                    mismatch_type: MismatchType::PriceMismatch,
                    invoice_line_id: line.id,
                    item_id: line.item_id,
                    expected: po_line.unit_price,
                    actual: line.unit_price,
                    variance: price_variance,
                    variance_percentage: percentage(price_variance.abs(), po_line.unit_price),
                });
            }
        }

        let invoice_total: Decimal = invoice.lines.iter().map(|l| l.amount).sum();
        let total_variance = (invoice_total - totals.po_total).abs();
        let variance_percentage = percentage(total_variance, totals.po_total);
        let is_within_tolerance = variance_percentage <= tolerance_percentage;

        let matching_status = if is_within_tolerance {
            MatchingStatus::Matched
        } else {
            classify(&mismatches, totals.quantity_variance, totals.price_variance)
        };

        Ok(InvoiceMatching {
            id: InvoiceMatchingId::new(),
            invoice_id: invoice.id,
            purchase_order_id,
            po_total: totals.po_total,
            grn_total: totals.grn_total,
            invoice_total,
            quantity_variance: totals.quantity_variance,
            price_variance: totals.price_variance,
            total_variance,
            variance_percentage,
            tolerance_percentage,
            is_within_tolerance,
            matching_status,
            mismatches,
            matched_at: as_of,
        })
    }
}

/// Classifies mismatches without the tolerance override.
///
/// Both quantity and price kinds: the larger variance wins, quantity on a tie.
#[must_use]
pub fn classify(
    mismatches: &[Mismatch],
    quantity_variance: Decimal,
    price_variance: Decimal,
) -> MatchingStatus {
    if mismatches.is_empty() {
        return MatchingStatus::Matched;
    }
    let has_quantity = mismatches.iter().any(|m| m.mismatch_type.is_quantity());
    let has_price = mismatches
        .iter()
        .any(|m| m.mismatch_type == MismatchType::PriceMismatch);

    match (has_quantity, has_price) {
        (true, true) if price_variance > quantity_variance => MatchingStatus::PriceMismatch,
        (true, _) => MatchingStatus::QuantityMismatch,
        (false, true) => MatchingStatus::PriceMismatch,
        (false, false) => MatchingStatus::NotMatched,
    }
}

/// PO line by explicit link, else by item.
fn find_po_line<'a>(
    line: &InvoiceLine,
    purchase_order_id: PurchaseOrderId,
    po_lines: &'a [PurchaseOrderLine],
) -> Option<&'a PurchaseOrderLine> {
    let mut lines = po_lines
        .iter()
        .filter(|p| p.purchase_order_id == purchase_order_id);
    match (line.purchase_order_line_id, line.item_id) {
        (Some(id), _) => lines.find(|p| p.id == id),
        (None, Some(item_id)) => lines.find(|p| p.item_id == Some(item_id)),
        (None, None) => None,
    }
}

/// Received quantity by explicit GRN link, else the sum over the PO line's
/// receipts. `None` when nothing was received against the line.
fn received_quantity(
    line: &InvoiceLine,
    po_line: &PurchaseOrderLine,
    grn_lines: &[GoodsReceiptLine],
) -> Option<Decimal> {
    if let Some(id) = line.goods_receipt_line_id {
        return grn_lines
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.received_quantity);
    }
    grn_lines
        .iter()
        .filter(|g| g.purchase_order_line_id == po_line.id)
        .map(|g| g.received_quantity)
        .reduce(|a, b| a + b)
}

fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * HUNDRED).round_dp(PERCENT_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::invoice::tests::invoice;
    use chrono::TimeZone;
    use folio_shared::types::{
        GoodsReceiptId, GoodsReceiptLineId, InvoiceLineId, ItemId, PurchaseOrderLineId,
    };
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::ledger::Dimensions;

    struct Order {
        id: PurchaseOrderId,
        lines: Vec<PurchaseOrderLine>,
    }

    fn order(lines: &[(Decimal, Decimal)]) -> Order {
        let id = PurchaseOrderId::new();
        Order {
            id,
            lines: lines
                .iter()
                .map(|(quantity, unit_price)| PurchaseOrderLine {
                    id: PurchaseOrderLineId::new(),
                    purchase_order_id: id,
                    item_id: Some(ItemId::new()),
                    quantity: *quantity,
                    unit_price: *unit_price,
                })
                .collect(),
        }
    }

    fn receipt(po_line: &PurchaseOrderLine, received: Decimal) -> GoodsReceiptLine {
        GoodsReceiptLine {
            id: GoodsReceiptLineId::new(),
            goods_receipt_id: GoodsReceiptId::new(),
            purchase_order_line_id: po_line.id,
            received_quantity: received,
        }
    }

    fn bill_line(
        po_line: &PurchaseOrderLine,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> InvoiceLine {
        InvoiceLine {
            id: InvoiceLineId::new(),
            item_id: po_line.item_id,
            description: None,
            quantity,
            unit_price,
            amount: quantity * unit_price,
            account_id: None,
            dimensions: Dimensions::default(),
            purchase_order_line_id: None,
            goods_receipt_line_id: None,
        }
    }

    fn bill(order: &Order, lines: Vec<InvoiceLine>) -> Invoice {
        let total = lines.iter().map(|l| l.amount).sum();
        let mut inv = invoice(InvoiceKind::Supplier, total);
        inv.purchase_order_id = Some(order.id);
        inv.lines = lines;
        inv
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let po = order(&[(dec!(10), dec!(100))]);
        let grn = vec![receipt(&po.lines[0], dec!(10))];
        let inv = bill(&po, vec![bill_line(&po.lines[0], dec!(10), dec!(100))]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();

        assert_eq!(result.matching_status, MatchingStatus::Matched);
        assert!(result.mismatches.is_empty());
        assert!(result.is_within_tolerance);
        assert_eq!(result.po_total, dec!(1000));
        assert_eq!(result.grn_total, dec!(1000));
        assert_eq!(result.invoice_total, dec!(1000));
        assert!(result.allows_approval());
    }

    #[test]
    fn test_price_mismatch_beyond_tolerance() {
        let po = order(&[(dec!(10), dec!(100))]);
        let grn = vec![receipt(&po.lines[0], dec!(10))];
        let inv = bill(&po, vec![bill_line(&po.lines[0], dec!(10), dec!(150))]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();

        assert_eq!(result.matching_status, MatchingStatus::PriceMismatch);
        assert!(!result.is_within_tolerance);
        assert_eq!(result.variance_percentage, dec!(50));
        assert_eq!(result.price_variance, dec!(500));
        assert_eq!(result.mismatches.len(), 1);
        let mismatch = &result.mismatches[0];
        assert_eq!(mismatch.mismatch_type, MismatchType::PriceMismatch);
        assert_eq!(mismatch.variance, dec!(50));
        assert_eq!(mismatch.variance_percentage, dec!(50));
        assert!(!result.allows_approval());
    }

    #[test]
    fn test_price_within_absolute_tolerance_is_not_flagged() {
        let po = order(&[(dec!(10), dec!(100))]);
        let grn = vec![receipt(&po.lines[0], dec!(10))];
        let inv = bill(&po, vec![bill_line(&po.lines[0], dec!(10), dec!(100.01))]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, Decimal::ZERO, now())
            .unwrap();
        assert!(result.mismatches.is_empty());
        // Invoice total 1000.10 is 0.01% over the PO with a zero tolerance.
        assert!(!result.is_within_tolerance);
        assert_eq!(result.matching_status, MatchingStatus::Matched);
    }

    #[test]
    fn test_tolerance_overrides_recorded_mismatches() {
        let po = order(&[(dec!(100), dec!(10))]);
        let grn = vec![receipt(&po.lines[0], dec!(100))];
        let inv = bill(&po, vec![bill_line(&po.lines[0], dec!(100), dec!(10.3))]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();
        assert_eq!(result.mismatches.len(), 1);
        assert_eq!(result.variance_percentage, dec!(3));
        assert!(result.is_within_tolerance);
        assert_eq!(result.matching_status, MatchingStatus::Matched);
    }

    #[test]
    fn test_quantity_against_receipt_and_order() {
        let po = order(&[(dec!(10), dec!(50)), (dec!(5), dec!(20))]);
        let grn = vec![receipt(&po.lines[0], dec!(8))];
        let inv = bill(
            &po,
            vec![
                bill_line(&po.lines[0], dec!(10), dec!(50)),
                bill_line(&po.lines[1], dec!(7), dec!(20)),
            ],
        );

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();

        let kinds: Vec<_> = result.mismatches.iter().map(|m| m.mismatch_type).collect();
        assert_eq!(kinds, vec![MismatchType::QuantityMismatch, MismatchType::QuantityExceedsPo]);
        assert_eq!(result.mismatches[0].expected, dec!(8));
        assert_eq!(result.mismatches[1].expected, dec!(5));
        // 2 × 50 + 2 × 20
        assert_eq!(result.quantity_variance, dec!(140));
        assert_eq!(result.grn_total, dec!(400));
        assert_eq!(result.matching_status, MatchingStatus::QuantityMismatch);
    }

    #[test]
    fn test_item_not_in_po() {
        let po = order(&[(dec!(10), dec!(100))]);
        let mut stray = bill_line(&po.lines[0], dec!(1), dec!(999));
        stray.item_id = Some(ItemId::new());
        let inv = bill(&po, vec![stray]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &[], DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();
        assert_eq!(result.mismatches[0].mismatch_type, MismatchType::ItemNotInPo);
        assert_eq!(result.po_total, Decimal::ZERO);
        assert_eq!(result.variance_percentage, Decimal::ZERO);
        // A zero PO total yields a zero percentage, which is within tolerance.
        assert_eq!(result.matching_status, MatchingStatus::Matched);
    }

    #[test]
    fn test_explicit_links_take_precedence() {
        let po = order(&[(dec!(10), dec!(100)), (dec!(10), dec!(100))]);
        let grn = vec![receipt(&po.lines[1], dec!(4)), receipt(&po.lines[1], dec!(6))];
        let mut line = bill_line(&po.lines[0], dec!(10), dec!(100));
        line.item_id = None;
        line.purchase_order_line_id = Some(po.lines[1].id);
        let inv = bill(&po, vec![line.clone()]);

        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();
        assert!(result.mismatches.is_empty());
        assert_eq!(result.grn_total, dec!(1000));

        line.goods_receipt_line_id = Some(grn[0].id);
        let inv = bill(&po, vec![line]);
        let result = ThreeWayMatcher::default()
            .validate(&inv, &po.lines, &grn, DEFAULT_TOLERANCE_PERCENTAGE, now())
            .unwrap();
        assert_eq!(result.mismatches[0].mismatch_type, MismatchType::QuantityMismatch);
        assert_eq!(result.mismatches[0].expected, dec!(4));
    }

    #[test]
    fn test_errors() {
        let po = order(&[(dec!(1), dec!(1))]);
        let mut inv = bill(&po, Vec::new());
        let matcher = ThreeWayMatcher::default();

        assert_eq!(
            matcher.validate(&inv, &po.lines, &[], dec!(-1), now()),
            Err(MatchingError::InvalidTolerance(dec!(-1)))
        );

        inv.purchase_order_id = None;
        assert_eq!(
            matcher.validate(&inv, &po.lines, &[], DEFAULT_TOLERANCE_PERCENTAGE, now()),
            Err(MatchingError::MissingPurchaseOrder(inv.id))
        );

        inv.kind = InvoiceKind::Sales;
        assert_eq!(
            matcher.validate(&inv, &po.lines, &[], DEFAULT_TOLERANCE_PERCENTAGE, now()),
            Err(MatchingError::NotSupplierInvoice(inv.id))
        );
    }

    fn mismatch(mismatch_type: MismatchType) -> Mismatch {
        Mismatch {
            mismatch_type,
            invoice_line_id: InvoiceLineId::new(),
            item_id: None,
            expected: Decimal::ZERO,
            actual: Decimal::ZERO,
            variance: Decimal::ZERO,
            variance_percentage: Decimal::ZERO,
        }
    }

    #[rstest]
    #[case(&[], dec!(0), dec!(0), MatchingStatus::Matched)]
    #[case(&[MismatchType::PriceMismatch], dec!(0), dec!(10), MatchingStatus::PriceMismatch)]
    #[case(&[MismatchType::QuantityExceedsPo], dec!(10), dec!(0), MatchingStatus::QuantityMismatch)]
    #[case(
        &[MismatchType::QuantityMismatch, MismatchType::PriceMismatch],
        dec!(10),
        dec!(20),
        MatchingStatus::PriceMismatch
    )]
    #[case(
        &[MismatchType::QuantityMismatch, MismatchType::PriceMismatch],
        dec!(30),
        dec!(20),
        MatchingStatus::QuantityMismatch
    )]
    #[case(
        &[MismatchType::QuantityMismatch, MismatchType::PriceMismatch],
        dec!(20),
        dec!(20),
        MatchingStatus::QuantityMismatch
    )]
    #[case(&[MismatchType::ItemNotInPo], dec!(0), dec!(0), MatchingStatus::NotMatched)]
    #[case(
        &[MismatchType::ItemNotInPo, MismatchType::PriceMismatch],
        dec!(0),
        dec!(5),
        MatchingStatus::PriceMismatch
    )]
    fn test_classify(
        #[case] kinds: &[MismatchType],
        #[case] quantity_variance: Decimal,
        #[case] price_variance: Decimal,
        #[case] expected: MatchingStatus,
    ) {
        let mismatches: Vec<_> = kinds.iter().copied().map(mismatch).collect();
        assert_eq!(classify(&mismatches, quantity_variance, price_variance), expected);
    }
}
