//! Settlement error types.

use folio_shared::types::{Currency, InvoiceId, PartyId, PaymentId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while allocating payments to invoices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Allocation amount must be strictly positive.
    #[error("Allocation amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Payment or invoice is not in a state that allows settlement.
    #[error("{entity} is {current}, expected {required}")]
    InvalidState {
        /// Entity description.
        entity: String,
        /// Current state.
        current: String,
        /// Required state(s).
        required: String,
    },

    /// Payment and invoice belong to different parties or directions.
    #[error("{payment} cannot settle {invoice}: party {payment_party} vs {invoice_party}")]
    CounterpartyMismatch {
        /// Payment description.
        payment: String,
        /// Invoice description.
        invoice: String,
        /// Party on the payment.
        payment_party: PartyId,
        /// Party on the invoice.
        invoice_party: PartyId,
    },

    /// Payment and invoice currencies differ.
    #[error("Currency mismatch: payment in {payment}, invoice in {invoice}")]
    CurrencyMismatch {
        /// Payment currency.
        payment: Currency,
        /// Invoice currency.
        invoice: Currency,
    },

    /// Amount is more than the payment has left to allocate.
    #[error("Allocation of {amount} exceeds unallocated payment amount {unallocated}")]
    ExceedsUnallocated {
        /// Requested amount.
        amount: Decimal,
        /// Payment's unallocated amount.
        unallocated: Decimal,
    },

    /// Amount is more than the invoice still owes.
    #[error("Allocation of {amount} exceeds invoice outstanding amount {outstanding}")]
    ExceedsOutstanding {
        /// Requested amount.
        amount: Decimal,
        /// Invoice's outstanding amount.
        outstanding: Decimal,
    },

    /// No allocation exists for the pair.
    #[error("No allocation of payment {payment_id} to invoice {invoice_id}")]
    AllocationNotFound {
        /// Payment side.
        payment_id: PaymentId,
        /// Invoice side.
        invoice_id: InvoiceId,
    },

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl SettlementError {
    /// Builds a [`SettlementError::InvalidState`].
    pub fn invalid_state(
        entity: impl Into<String>,
        current: impl ToString,
        required: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity: entity.into(),
            current: current.to_string(),
            required: required.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::CounterpartyMismatch { .. } => "COUNTERPARTY_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::ExceedsUnallocated { .. } => "EXCEEDS_UNALLOCATED",
            Self::ExceedsOutstanding { .. } => "EXCEEDS_OUTSTANDING",
            Self::AllocationNotFound { .. } => "ALLOCATION_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::CurrencyMismatch { .. } => 400,
            Self::AllocationNotFound { .. }
            | Self::PaymentNotFound(_)
            | Self::InvoiceNotFound(_) => 404,
            Self::InvalidState { .. }
            | Self::CounterpartyMismatch { .. }
            | Self::ExceedsUnallocated { .. }
            | Self::ExceedsOutstanding { .. } => 422,
            Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ceiling_errors_report_both_values() {
        let err = SettlementError::ExceedsUnallocated {
            amount: dec!(600),
            unallocated: dec!(500),
        };
        assert_eq!(err.error_code(), "EXCEEDS_UNALLOCATED");
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(
            err.to_string(),
            "Allocation of 600 exceeds unallocated payment amount 500"
        );
    }

    #[test]
    fn test_currency_mismatch_message() {
        let err = SettlementError::CurrencyMismatch {
            payment: Currency::USD,
            invoice: Currency::EUR,
        };
        assert_eq!(err.to_string(), "Currency mismatch: payment in USD, invoice in EUR");
        assert_eq!(err.http_status_code(), 400);
    }
}
