//! Source documents and their ledger postings.
//!
//! - Sales and supplier invoices
//! - Payment receipts and vouchers
//! - Customer credit notes and supplier debit notes
//! - Posting adapters that turn each document into a posted journal entry

pub mod invoice;
pub mod note;
pub mod payment;
pub mod posting;

pub use invoice::{GlLink, Invoice, InvoiceKind, InvoiceLine, InvoiceStatus};
pub use note::{AdjustmentNote, NoteKind, NoteStatus};
pub use payment::{Payment, PaymentKind, PaymentStatus};
pub use posting::{
    DocumentPostingService, LedgerContext, NoteAccounts, PaymentAccounts, PostedDocument,
    SalesInvoiceAccounts, SupplierInvoiceAccounts,
};
