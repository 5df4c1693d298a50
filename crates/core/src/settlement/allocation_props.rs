//! Property-based tests for allocation.
//!
//! - Σ allocations per payment ≤ payment amount, and unallocated = amount − Σ
//! - Σ allocations per invoice ≤ invoice total
//! - Recalculation twice gives identical amounts

use folio_shared::types::{CompanyId, PartyId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::allocation::{AllocationBook, SettlementService};
use crate::documents::invoice::tests::invoice;
use crate::documents::payment::tests::payment;
use crate::documents::{Invoice, InvoiceKind, Payment, PaymentKind};
use crate::ledger::journal::tests::ctx;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..2_000_000i64).prop_map(|v| Decimal::new(v, 2))
}

/// (payment index, invoice index, amount) attempts.
fn attempts() -> impl Strategy<Value = Vec<(usize, usize, Decimal)>> {
    prop::collection::vec((0usize..3, 0usize..4, amount()), 1..30)
}

fn documents(payments: &[Decimal], totals: &[Decimal]) -> (Vec<Payment>, Vec<Invoice>) {
    let (company_id, party_id) = (CompanyId::new(), PartyId::new());
    let payments = payments
        .iter()
        .map(|a| {
            let mut p = payment(PaymentKind::Receipt, *a);
            p.company_id = company_id;
            p.party_id = party_id;
            p
        })
        .collect();
    let invoices = totals
        .iter()
        .map(|t| {
            let mut inv = invoice(InvoiceKind::Sales, *t);
            inv.company_id = company_id;
            inv.party_id = party_id;
            inv
        })
        .collect();
    (payments, invoices)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever mix of allocations succeeds or fails, the ceilings hold.
    #[test]
    fn prop_allocation_conservation(
        payment_amounts in prop::collection::vec(amount(), 3..4),
        invoice_totals in prop::collection::vec(amount(), 4..5),
        tries in attempts(),
    ) {
        let (mut payments, mut invoices) = documents(&payment_amounts, &invoice_totals);
        let mut book = AllocationBook::new();

        for (p, i, amount) in tries {
            let _ = SettlementService::allocate(
                &mut payments[p],
                &mut invoices[i],
                amount,
                &mut book,
                &ctx(),
            );
        }

        for p in &payments {
            let allocated = book.allocated_total(p.id);
            prop_assert!(allocated <= p.amount);
            prop_assert_eq!(p.allocated_amount, allocated);
            prop_assert_eq!(p.unallocated_amount, p.amount - allocated);
        }
        for inv in &invoices {
            let allocated: Decimal = book.for_invoice(inv.id).map(|a| a.amount).sum();
            prop_assert!(allocated <= inv.total_amount);
            prop_assert_eq!(inv.outstanding_amount, inv.total_amount - allocated);
        }
    }

    /// Recalculating twice in a row yields the same amounts.
    #[test]
    fn prop_recalculation_idempotent(
        payment_amounts in prop::collection::vec(amount(), 3..4),
        invoice_totals in prop::collection::vec(amount(), 4..5),
        tries in attempts(),
    ) {
        let (mut payments, mut invoices) = documents(&payment_amounts, &invoice_totals);
        let mut book = AllocationBook::new();
        for (p, i, amount) in tries {
            let _ = SettlementService::allocate(
                &mut payments[p],
                &mut invoices[i],
                amount,
                &mut book,
                &ctx(),
            );
        }

        for p in &mut payments {
            SettlementService::recalculate_payment(p, &book);
        }
        for inv in &mut invoices {
            SettlementService::recalculate_invoice(inv, &book);
        }
        let once = (payments.clone(), invoices.clone());

        for p in &mut payments {
            SettlementService::recalculate_payment(p, &book);
        }
        for inv in &mut invoices {
            SettlementService::recalculate_invoice(inv, &book);
        }
        prop_assert_eq!((payments, invoices), once);
    }
}
