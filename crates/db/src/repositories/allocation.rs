//! Allocation repository: settles payments against invoices.
//!
//! Locks are taken payment first, then invoices in ascending id order, so two
//! allocations touching the same rows queue up instead of deadlocking. The
//! allocation book handed to the settlement service holds every allocation of
//! the locked payment and invoices, with the status of each contributing
//! payment, so recomputed totals match the stored rows exactly.

use std::collections::HashSet;

use folio_core::documents::{Invoice, Payment};
use folio_core::ledger::PostingContext;
use folio_core::settlement::{Allocation, AllocationBook, SettlementService};
use folio_shared::types::{InvoiceId, PaymentId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::documents::{load_invoice, load_payment};
use super::error::RepositoryError;
use crate::entities::sea_orm_active_enums as db;
use crate::entities::{invoices, payment_allocations, payments};

/// Payment allocation repository.
#[derive(Debug, Clone)]
pub struct AllocationRepository {
    db: DatabaseConnection,
}

impl AllocationRepository {
    /// Creates a new allocation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the allocations of a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn for_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        payment_allocations::Entity::find()
            .filter(payment_allocations::Column::PaymentId.eq(Uuid::from(payment_id)))
            .order_by_asc(payment_allocations::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::allocation)
            .collect()
    }

    /// Allocates `amount` of a payment to an invoice.
    ///
    /// A second allocation of the same pair increases the existing row.
    ///
    /// # Errors
    ///
    /// Returns the settlement rule violated (amount, status, counterparty,
    /// currency, unallocated or outstanding ceiling). On error nothing is
    /// written.
    pub async fn allocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
        ctx: &PostingContext,
    ) -> Result<Allocation, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut payment = load_payment(&txn, payment_id, true).await?;
        let mut invoice = load_invoice(&txn, invoice_id, true).await?;
        let mut book = load_book(&txn, &[payment_id], &[invoice_id]).await?;
        let existed = book.get(payment_id, invoice_id).is_some();

        let allocation =
            SettlementService::allocate(&mut payment, &mut invoice, amount, &mut book, ctx)?;

        let now = ctx.as_of.into();
        let row = convert::allocation_row(&allocation, now);
        if existed {
            row.update(&txn).await?;
        } else {
            row.insert(&txn).await?;
        }
        convert::payment_state(&payment, now).update(&txn).await?;
        convert::invoice_state(&invoice, now).update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            allocation_id = %allocation.id,
            %payment_id,
            %invoice_id,
            amount = %amount,
            unallocated = %payment.unallocated_amount,
            outstanding = %invoice.outstanding_amount,
            "Payment allocated"
        );
        Ok(allocation)
    }

    /// Allocates a payment's unallocated amount to the party's open invoices,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the payment is not cleared or paid. On error
    /// nothing is written.
    pub async fn allocate_automatic(
        &self,
        payment_id: PaymentId,
        ctx: &PostingContext,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut payment = load_payment(&txn, payment_id, true).await?;

        // Settlement only reads and writes invoice amounts, so lines are not loaded.
        let mut open_invoices = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(Uuid::from(payment.company_id)))
            .filter(invoices::Column::PartyId.eq(Uuid::from(payment.party_id)))
            .filter(invoices::Column::Kind.eq(db::InvoiceKind::from(payment.kind.settles())))
            .filter(invoices::Column::Currency.eq(payment.currency.to_string()))
            .filter(invoices::Column::OutstandingAmount.gt(Decimal::ZERO))
            .filter(invoices::Column::Status.is_in([
                db::InvoiceStatus::Issued,
                db::InvoiceStatus::Approved,
                db::InvoiceStatus::PartiallyPaid,
            ]))
            .order_by_asc(invoices::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await?
            .into_iter()
            .map(|model| convert::invoice(model, Vec::new()))
            .collect::<Result<Vec<Invoice>, _>>()?;

        let invoice_ids: Vec<InvoiceId> = open_invoices.iter().map(|i| i.id).collect();
        let mut book = load_book(&txn, &[payment_id], &invoice_ids).await?;
        let existing: HashSet<InvoiceId> =
            book.for_payment(payment_id).map(|a| a.invoice_id).collect();

        let allocations = SettlementService::allocate_automatic(
            &mut payment,
            &mut open_invoices,
            &mut book,
            ctx,
        )?;

        let now = ctx.as_of.into();
        let touched: HashSet<InvoiceId> = allocations.iter().map(|a| a.invoice_id).collect();
        for allocation in &allocations {
            let row = convert::allocation_row(allocation, now);
            if existing.contains(&allocation.invoice_id) {
                row.update(&txn).await?;
            } else {
                row.insert(&txn).await?;
            }
        }
        for invoice in open_invoices.iter().filter(|i| touched.contains(&i.id)) {
            convert::invoice_state(invoice, now).update(&txn).await?;
        }
        convert::payment_state(&payment, now).update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            %payment_id,
            invoices = allocations.len(),
            unallocated = %payment.unallocated_amount,
            "Payment allocated automatically"
        );
        Ok(allocations)
    }

    /// Removes the allocation of a payment to an invoice.
    ///
    /// # Errors
    ///
    /// Returns `AllocationNotFound` if the pair has no allocation.
    pub async fn deallocate(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        ctx: &PostingContext,
    ) -> Result<Allocation, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut payment = load_payment(&txn, payment_id, true).await?;
        let mut invoice = load_invoice(&txn, invoice_id, true).await?;
        let mut book = load_book(&txn, &[payment_id], &[invoice_id]).await?;

        let removed = SettlementService::deallocate(&mut payment, &mut invoice, &mut book)?;

        let now = ctx.as_of.into();
        payment_allocations::Entity::delete_by_id(Uuid::from(removed.id))
            .exec(&txn)
            .await?;
        convert::payment_state(&payment, now).update(&txn).await?;
        convert::invoice_state(&invoice, now).update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            allocation_id = %removed.id,
            %payment_id,
            %invoice_id,
            amount = %removed.amount,
            actor = %ctx.actor,
            "Payment deallocated"
        );
        Ok(removed)
    }

    /// Recomputes a payment's allocated and unallocated amounts from its rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the payment does not exist.
    pub async fn recalculate_payment(
        &self,
        payment_id: PaymentId,
        ctx: &PostingContext,
    ) -> Result<Payment, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut payment = load_payment(&txn, payment_id, true).await?;
        let book = load_book(&txn, &[payment_id], &[]).await?;

        SettlementService::recalculate_payment(&mut payment, &book);

        convert::payment_state(&payment, ctx.as_of.into()).update(&txn).await?;
        txn.commit().await?;
        Ok(payment)
    }

    /// Recomputes an invoice's paid and outstanding amounts and status from
    /// the allocations of settled payments.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not exist.
    pub async fn recalculate_invoice(
        &self,
        invoice_id: InvoiceId,
        ctx: &PostingContext,
    ) -> Result<Invoice, RepositoryError> {
        let txn = self.db.begin().await?;
        let mut invoice = load_invoice(&txn, invoice_id, true).await?;
        let book = load_book(&txn, &[], &[invoice_id]).await?;

        SettlementService::recalculate_invoice(&mut invoice, &book);

        convert::invoice_state(&invoice, ctx.as_of.into()).update(&txn).await?;
        txn.commit().await?;
        Ok(invoice)
    }
}

/// Loads every allocation of the given payments and invoices, plus the status
/// of each payment involved.
async fn load_book<C>(
    conn: &C,
    payment_ids: &[PaymentId],
    invoice_ids: &[InvoiceId],
) -> Result<AllocationBook, RepositoryError>
where
    C: ConnectionTrait,
{
    let rows = payment_allocations::Entity::find()
        .filter(
            Condition::any()
                .add(
                    payment_allocations::Column::PaymentId
                        .is_in(payment_ids.iter().copied().map(Uuid::from)),
                )
                .add(
                    payment_allocations::Column::InvoiceId
                        .is_in(invoice_ids.iter().copied().map(Uuid::from)),
                ),
        )
        .all(conn)
        .await?;

    let mut book = AllocationBook::new();
    let mut contributing: HashSet<Uuid> = payment_ids.iter().copied().map(Uuid::from).collect();
    for row in rows {
        contributing.insert(row.payment_id);
        book.insert(convert::allocation(row)?);
    }

    if !contributing.is_empty() {
        let statuses = payments::Entity::find()
            .select_only()
            .column(payments::Column::Id)
            .column(payments::Column::Status)
            .filter(payments::Column::Id.is_in(contributing))
            .into_tuple::<(Uuid, db::PaymentStatus)>()
            .all(conn)
            .await?;
        for (id, status) in statuses {
            book.track_payment(PaymentId::from(id), status.into());
        }
    }
    Ok(book)
}
