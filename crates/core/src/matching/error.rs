//! Three-way matching errors.

use folio_shared::types::InvoiceId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while matching a supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchingError {
    /// The invoice has no purchase order to match against.
    #[error("Invoice {0} has no purchase order")]
    MissingPurchaseOrder(InvoiceId),

    /// Only supplier invoices are matched.
    #[error("Invoice {0} is not a supplier invoice")]
    NotSupplierInvoice(InvoiceId),

    /// Tolerance percentage must not be negative.
    #[error("Tolerance percentage must not be negative, got {0}")]
    InvalidTolerance(Decimal),

    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl MatchingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPurchaseOrder(_) => "MISSING_PURCHASE_ORDER",
            Self::NotSupplierInvoice(_) => "NOT_SUPPLIER_INVOICE",
            Self::InvalidTolerance(_) => "INVALID_TOLERANCE",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidTolerance(_) => 400,
            Self::InvoiceNotFound(_) => 404,
            Self::MissingPurchaseOrder(_) | Self::NotSupplierInvoice(_) => 422,
            Self::Database(_) => 500,
        }
    }
}
