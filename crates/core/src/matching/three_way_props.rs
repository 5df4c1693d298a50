//! Property-based tests for three-way matching.

use chrono::{TimeZone, Utc};
use folio_shared::types::{
    GoodsReceiptId, GoodsReceiptLineId, InvoiceLineId, ItemId, PurchaseOrderId, PurchaseOrderLineId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::three_way::ThreeWayMatcher;
use super::types::{GoodsReceiptLine, MatchingStatus, PurchaseOrderLine};
use crate::documents::invoice::tests::invoice;
use crate::documents::{InvoiceKind, InvoiceLine};
use crate::ledger::Dimensions;

fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..500i64).prop_map(Decimal::from)
}

fn price() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|v| Decimal::new(v, 2))
}

/// (ordered qty, PO price, received qty or none, invoiced qty, invoiced price)
fn line_shape() -> impl Strategy<Value = (Decimal, Decimal, Option<Decimal>, Decimal, Decimal)> {
    (quantity(), price(), prop::option::of(quantity()), quantity(), price())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Within tolerance always means matched, whatever mismatches were recorded.
    #[test]
    fn prop_tolerance_override(
        shapes in prop::collection::vec(line_shape(), 1..6),
        tolerance in (0i64..10_000i64).prop_map(|v| Decimal::new(v, 2)),
    ) {
        let purchase_order_id = PurchaseOrderId::new();
        let mut po_lines = Vec::new();
        let mut grn_lines = Vec::new();
        let mut lines = Vec::new();

        for (ordered, po_price, received, invoiced, invoiced_price) in shapes {
            let po_line = PurchaseOrderLine {
                id: PurchaseOrderLineId::new(),
                purchase_order_id,
                item_id: Some(ItemId::new()),
                quantity: ordered,
                unit_price: po_price,
            };
            if let Some(received) = received {
                grn_lines.push(GoodsReceiptLine {
                    id: GoodsReceiptLineId::new(),
                    goods_receipt_id: GoodsReceiptId::new(),
                    purchase_order_line_id: po_line.id,
                    received_quantity: received,
                });
            }
            lines.push(InvoiceLine {
                id: InvoiceLineId::new(),
                item_id: po_line.item_id,
                description: None,
                quantity: invoiced,
                unit_price: invoiced_price,
                amount: invoiced * invoiced_price,
                account_id: None,
                dimensions: Dimensions::default(),
                purchase_order_line_id: None,
                goods_receipt_line_id: None,
            });
            po_lines.push(po_line);
        }

        let total = lines.iter().map(|l| l.amount).sum();
        let mut inv = invoice(InvoiceKind::Supplier, total);
        inv.purchase_order_id = Some(purchase_order_id);
        inv.lines = lines;

        let as_of = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let result = ThreeWayMatcher::default()
            .validate(&inv, &po_lines, &grn_lines, tolerance, as_of)
            .unwrap();

        prop_assert_eq!(result.is_within_tolerance, result.variance_percentage <= tolerance);
        if result.is_within_tolerance {
            prop_assert_eq!(result.matching_status, MatchingStatus::Matched);
        }
        if result.mismatches.is_empty() {
            prop_assert_eq!(result.matching_status, MatchingStatus::Matched);
        }
        prop_assert_eq!(result.invoice_total, total);
    }
}
