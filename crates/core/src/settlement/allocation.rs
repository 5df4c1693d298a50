//! Payment allocation against invoices.
//!
//! Allocation rows are the source of truth. Payment allocated/unallocated and
//! invoice paid/outstanding amounts are always recomputed from the rows, never
//! adjusted incrementally, so recalculation is idempotent.

use chrono::NaiveDate;
use folio_shared::types::{AllocationId, Currency, InvoiceId, PaymentId, UserId, normalize_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::documents::{Invoice, Payment, PaymentStatus};
use crate::ledger::PostingContext;

use super::error::SettlementError;

/// Part of a payment applied to one invoice. Unique per (payment, invoice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique identifier.
    pub id: AllocationId,
    /// Paying document.
    pub payment_id: PaymentId,
    /// Settled invoice.
    pub invoice_id: InvoiceId,
    /// Allocated amount.
    pub amount: Decimal,
    /// Currency shared by payment and invoice.
    pub currency: Currency,
    /// Date of the latest allocation to this pair.
    pub allocation_date: NaiveDate,
    /// User who allocated.
    pub allocated_by: UserId,
}

/// Allocation rows plus the status of every payment they reference.
///
/// An invoice's paid amount only counts allocations whose payment is settled.
/// Callers load the statuses of all payments allocated to the invoices they
/// touch; untracked payments count as unsettled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationBook {
    allocations: BTreeMap<(PaymentId, InvoiceId), Allocation>,
    payment_status: HashMap<PaymentId, PaymentStatus>,
}

impl AllocationBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the row for its (payment, invoice) pair.
    pub fn insert(&mut self, allocation: Allocation) {
        self.allocations
            .insert((allocation.payment_id, allocation.invoice_id), allocation);
    }

    /// Records the status of a payment.
    pub fn track_payment(&mut self, payment_id: PaymentId, status: PaymentStatus) {
        self.payment_status.insert(payment_id, status);
    }

    /// The row for a pair.
    #[must_use]
    pub fn get(&self, payment_id: PaymentId, invoice_id: InvoiceId) -> Option<&Allocation> {
        self.allocations.get(&(payment_id, invoice_id))
    }

    /// All rows.
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.values()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Rows of one payment.
    pub fn for_payment(&self, payment_id: PaymentId) -> impl Iterator<Item = &Allocation> {
        self.allocations
            .values()
            .filter(move |a| a.payment_id == payment_id)
    }

    /// Rows of one invoice.
    pub fn for_invoice(&self, invoice_id: InvoiceId) -> impl Iterator<Item = &Allocation> {
        self.allocations
            .values()
            .filter(move |a| a.invoice_id == invoice_id)
    }

    /// Sum of a payment's allocations.
    #[must_use]
    pub fn allocated_total(&self, payment_id: PaymentId) -> Decimal {
        self.for_payment(payment_id).map(|a| a.amount).sum()
    }

    /// Sum of an invoice's allocations from settled payments.
    #[must_use]
    pub fn settled_total(&self, invoice_id: InvoiceId) -> Decimal {
        self.for_invoice(invoice_id)
            .filter(|a| {
                self.payment_status
                    .get(&a.payment_id)
                    .is_some_and(PaymentStatus::is_settled)
            })
            .map(|a| a.amount)
            .sum()
    }

    fn remove(&mut self, payment_id: PaymentId, invoice_id: InvoiceId) -> Option<Allocation> {
        self.allocations.remove(&(payment_id, invoice_id))
    }
}

/// Stateless settlement logic.
pub struct SettlementService;

impl SettlementService {
    /// Checks an allocation request and returns the normalized amount.
    ///
    /// Order of checks:
    /// 1. amount > 0 (`InvalidAmount`)
    /// 2. payment is cleared or paid (`InvalidState`)
    /// 3. receipt settles a sales invoice and voucher a supplier invoice, of
    ///    the same party (`CounterpartyMismatch`)
    /// 4. invoice is open for settlement (`InvalidState`)
    /// 5. same currency (`CurrencyMismatch`)
    /// 6. amount ≤ payment unallocated (`ExceedsUnallocated`)
    /// 7. amount ≤ invoice outstanding (`ExceedsOutstanding`)
    pub fn validate(
        payment: &Payment,
        invoice: &Invoice,
        amount: Decimal,
    ) -> Result<Decimal, SettlementError> {
        let amount = normalize_amount(amount);
        if amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(amount));
        }
        if !payment.status.is_settled() {
            return Err(SettlementError::invalid_state(
                payment.label(),
                payment.status,
                "cleared or paid",
            ));
        }
        if payment.kind.settles() != invoice.kind
            || payment.party_id != invoice.party_id
            || payment.company_id != invoice.company_id
        {
            return Err(SettlementError::CounterpartyMismatch {
                payment: payment.label(),
                invoice: invoice.label(),
                payment_party: payment.party_id,
                invoice_party: invoice.party_id,
            });
        }
        if !invoice.is_open_for_settlement() {
            return Err(SettlementError::invalid_state(
                invoice.label(),
                invoice.status,
                "open for settlement",
            ));
        }
        if payment.currency != invoice.currency {
            return Err(SettlementError::CurrencyMismatch {
                payment: payment.currency,
                invoice: invoice.currency,
            });
        }
        if amount > payment.unallocated_amount {
            return Err(SettlementError::ExceedsUnallocated {
                amount,
                unallocated: payment.unallocated_amount,
            });
        }
        if amount > invoice.outstanding_amount {
            return Err(SettlementError::ExceedsOutstanding {
                amount,
                outstanding: invoice.outstanding_amount,
            });
        }
        Ok(amount)
    }

    /// Allocates `amount` of `payment` to `invoice`.
    ///
    /// Creates the pair's row or increases it, then recomputes both sides from
    /// the book. On error nothing is changed.
    pub fn allocate(
        payment: &mut Payment,
        invoice: &mut Invoice,
        amount: Decimal,
        book: &mut AllocationBook,
        ctx: &PostingContext,
    ) -> Result<Allocation, SettlementError> {
        let amount = Self::validate(payment, invoice, amount)?;

        let allocation = match book.get(payment.id, invoice.id) {
            Some(existing) => Allocation {
                amount: existing.amount + amount,
                allocation_date: ctx.today(),
                allocated_by: ctx.actor,
                ..existing.clone()
            },
            None => Allocation {
                id: AllocationId::new(),
                payment_id: payment.id,
                invoice_id: invoice.id,
                amount,
                currency: invoice.currency,
                allocation_date: ctx.today(),
                allocated_by: ctx.actor,
            },
        };
        book.insert(allocation.clone());
        book.track_payment(payment.id, payment.status);

        Self::recalculate_payment(payment, book);
        Self::recalculate_invoice(invoice, book);
        Ok(allocation)
    }

    /// Allocates the payment's unallocated amount to the party's open invoices,
    /// oldest first (invoice date, then number).
    ///
    /// Invoices of another party, direction or currency are ignored. Each
    /// invoice receives `min(remaining, outstanding)`. All-or-nothing.
    pub fn allocate_automatic(
        payment: &mut Payment,
        invoices: &mut [Invoice],
        book: &mut AllocationBook,
        ctx: &PostingContext,
    ) -> Result<Vec<Allocation>, SettlementError> {
        if !payment.status.is_settled() {
            return Err(SettlementError::invalid_state(
                payment.label(),
                payment.status,
                "cleared or paid",
            ));
        }

        let mut candidates: Vec<usize> = invoices
            .iter()
            .enumerate()
            .filter(|(_, inv)| {
                inv.kind == payment.kind.settles()
                    && inv.party_id == payment.party_id
                    && inv.company_id == payment.company_id
                    && inv.currency == payment.currency
                    && inv.is_open_for_settlement()
                    && inv.outstanding_amount > Decimal::ZERO
            })
            .map(|(index, _)| index)
            .collect();
        candidates.sort_by(|a, b| {
            let (a, b) = (&invoices[*a], &invoices[*b]);
            (a.invoice_date, &a.number).cmp(&(b.invoice_date, &b.number))
        });

        let mut working_payment = payment.clone();
        let mut working_book = book.clone();
        let mut touched = Vec::new();
        let mut allocations = Vec::new();

        for index in candidates {
            let remaining = working_payment.unallocated_amount;
            if remaining <= Decimal::ZERO {
                break;
            }
            let mut invoice = invoices[index].clone();
            let amount = remaining.min(invoice.outstanding_amount);
            let allocation = Self::allocate(
                &mut working_payment,
                &mut invoice,
                amount,
                &mut working_book,
                ctx,
            )?;
            allocations.push(allocation);
            touched.push((index, invoice));
        }

        *payment = working_payment;
        *book = working_book;
        for (index, invoice) in touched {
            invoices[index] = invoice;
        }
        Ok(allocations)
    }

    /// Removes the pair's allocation and resyncs both sides.
    pub fn deallocate(
        payment: &mut Payment,
        invoice: &mut Invoice,
        book: &mut AllocationBook,
    ) -> Result<Allocation, SettlementError> {
        let removed = book
            .remove(payment.id, invoice.id)
            .ok_or(SettlementError::AllocationNotFound {
                payment_id: payment.id,
                invoice_id: invoice.id,
            })?;
        Self::recalculate_payment(payment, book);
        Self::recalculate_invoice(invoice, book);
        Ok(removed)
    }

    /// Recomputes allocated and unallocated amounts from the book.
    pub fn recalculate_payment(payment: &mut Payment, book: &AllocationBook) {
        payment.apply_allocated_amount(book.allocated_total(payment.id));
    }

    /// Recomputes paid, outstanding and status from the book.
    pub fn recalculate_invoice(invoice: &mut Invoice, book: &AllocationBook) {
        invoice.apply_paid_amount(book.settled_total(invoice.id));
    }
}
