//! Repository error type.
//!
//! Wraps the engine errors raised while a unit of work runs the core logic,
//! plus the failures that only exist at the storage boundary.

use folio_core::ledger::LedgerError;
use folio_core::matching::MatchingError;
use folio_core::settlement::SettlementError;
use folio_shared::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Posting, reversal or recurring rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Allocation rule violation.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Three-way matching rule violation.
    #[error(transparent)]
    Matching(#[from] MatchingError),

    /// Row not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row looked up.
        entity: &'static str,
        /// Id looked up.
        id: Uuid,
    },

    /// A stored value cannot be mapped onto the domain type.
    #[error("Invalid value in {table}.{column}: {value}")]
    InvalidData {
        /// Table the value came from.
        table: &'static str,
        /// Column the value came from.
        column: &'static str,
        /// Offending value.
        value: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Builds a [`RepositoryError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Builds a [`RepositoryError::InvalidData`].
    pub fn invalid_data(table: &'static str, column: &'static str, value: impl ToString) -> Self {
        Self::InvalidData {
            table,
            column,
            value: value.to_string(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Settlement(e) => e.error_code(),
            Self::Matching(e) => e.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidData { .. } => "INVALID_STORED_DATA",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Ledger(e) => e.http_status_code(),
            Self::Settlement(e) => e.http_status_code(),
            Self::Matching(e) => e.http_status_code(),
            Self::NotFound { .. } => 404,
            Self::InvalidData { .. } | Self::Database(_) => 500,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Database(e.to_string()),
            other => Self::from_status(other.http_status_code(), other.to_string()),
        }
    }
}
