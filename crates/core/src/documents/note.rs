//! Customer credit notes and supplier debit notes.

use chrono::NaiveDate;
use folio_shared::types::{CompanyId, Currency, InvoiceId, NoteId, PartyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::invoice::{GlLink, InvoiceKind};

/// Kind of adjustment note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// Customer credit note, reduces a receivable.
    Credit,
    /// Supplier debit note, reduces a payable.
    Debit,
}

impl NoteKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }

    /// The invoice kind a note of this kind settles against.
    #[must_use]
    pub const fn applies_to(self) -> InvoiceKind {
        match self {
            Self::Credit => InvoiceKind::Sales,
            Self::Debit => InvoiceKind::Supplier,
        }
    }
}

/// Note status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    /// Being prepared.
    Draft,
    /// Issued, ready to post.
    Issued,
    /// Posted and applied to its invoice.
    Applied,
    /// Voided.
    Cancelled,
}

impl NoteStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Applied => "applied",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "applied" => Some(Self::Applied),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credit or debit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentNote {
    /// Unique identifier.
    pub id: NoteId,
    /// Credit or debit.
    pub kind: NoteKind,
    /// Owning company.
    pub company_id: CompanyId,
    /// Customer or supplier.
    pub party_id: PartyId,
    /// Document number.
    pub number: String,
    /// Document date.
    pub note_date: NaiveDate,
    /// Note currency.
    pub currency: Currency,
    /// Exchange rate snapshot.
    pub exchange_rate: Decimal,
    /// Note amount.
    pub amount: Decimal,
    /// Invoice the note settles against.
    pub invoice_id: Option<InvoiceId>,
    /// Reason given for the note.
    pub reason: Option<String>,
    /// Current status.
    pub status: NoteStatus,
    /// Ledger link.
    #[serde(default)]
    pub gl: GlLink,
}

impl AdjustmentNote {
    /// Short human label, e.g. "Credit note CN-001".
    #[must_use]
    pub fn label(&self) -> String {
        match self.kind {
            NoteKind::Credit => format!("Credit note {}", self.number),
            NoteKind::Debit => format!("Debit note {}", self.number),
        }
    }
}
