//! Three-way match repository.

use chrono::{DateTime, Utc};
use folio_core::matching::{InvoiceMatching, ThreeWayMatcher};
use folio_shared::types::InvoiceId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::documents::load_invoice;
use super::error::RepositoryError;
use crate::entities::{goods_receipt_lines, invoice_matchings, purchase_order_lines};

/// Invoice matching repository.
#[derive(Debug, Clone)]
pub struct MatchingRepository {
    db: DatabaseConnection,
}

impl MatchingRepository {
    /// Creates a new matching repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Matches a supplier invoice against its purchase order and goods
    /// receipts and stores the result.
    ///
    /// Re-matching an invoice replaces its previous result.
    ///
    /// # Errors
    ///
    /// Returns `NotSupplierInvoice`, `MissingPurchaseOrder` or
    /// `InvalidTolerance` from the matcher, or `NotFound` if the invoice does
    /// not exist.
    pub async fn match_invoice(
        &self,
        invoice_id: InvoiceId,
        tolerance_percentage: Decimal,
        matcher: &ThreeWayMatcher,
        as_of: DateTime<Utc>,
    ) -> Result<InvoiceMatching, RepositoryError> {
        let txn = self.db.begin().await?;
        let invoice = load_invoice(&txn, invoice_id, true).await?;

        let (po_lines, grn_lines) = match invoice.purchase_order_id {
            Some(purchase_order_id) => {
                let po_rows = purchase_order_lines::Entity::find()
                    .filter(
                        purchase_order_lines::Column::PurchaseOrderId
                            .eq(Uuid::from(purchase_order_id)),
                    )
                    .order_by_asc(purchase_order_lines::Column::Id)
                    .all(&txn)
                    .await?;
                let grn_lines = goods_receipt_lines::Entity::find()
                    .filter(
                        goods_receipt_lines::Column::PurchaseOrderLineId
                            .is_in(po_rows.iter().map(|row| row.id)),
                    )
                    .order_by_asc(goods_receipt_lines::Column::Id)
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(convert::goods_receipt_line)
                    .collect::<Vec<_>>();
                let po_lines = po_rows
                    .into_iter()
                    .map(convert::purchase_order_line)
                    .collect::<Vec<_>>();
                (po_lines, grn_lines)
            }
            None => (Vec::new(), Vec::new()),
        };

        let mut matching =
            matcher.validate(&invoice, &po_lines, &grn_lines, tolerance_percentage, as_of)?;

        let previous = invoice_matchings::Entity::find()
            .filter(invoice_matchings::Column::InvoiceId.eq(Uuid::from(invoice_id)))
            .one(&txn)
            .await?;
        let now = as_of.into();
        if let Some(previous) = previous {
            matching.id = previous.id.into();
            convert::invoice_matching_row(&matching, now)?.update(&txn).await?;
        } else {
            convert::invoice_matching_row(&matching, now)?.insert(&txn).await?;
        }
        txn.commit().await?;

        tracing::info!(
            %invoice_id,
            matching_id = %matching.id,
            status = ?matching.matching_status,
            mismatches = matching.mismatches.len(),
            variance_percentage = %matching.variance_percentage,
            "Invoice matched"
        );
        Ok(matching)
    }

    /// Returns the stored match result of an invoice, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored mismatches
    /// are unreadable.
    pub async fn find_by_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceMatching>, RepositoryError> {
        invoice_matchings::Entity::find()
            .filter(invoice_matchings::Column::InvoiceId.eq(Uuid::from(invoice_id)))
            .one(&self.db)
            .await?
            .map(convert::invoice_matching)
            .transpose()
    }
}
