//! Repository abstractions for data access.
//!
//! Each mutating operation runs as one unit of work: a transaction that locks
//! the rows it reads, applies the ledger rules from `folio-core`, writes the
//! results and commits. Nothing is written when a rule rejects the operation.

pub mod account;
pub mod allocation;
mod convert;
pub mod documents;
pub mod error;
pub mod fiscal;
pub mod journal;
pub mod matching;
pub mod recurring;

pub use account::AccountRepository;
pub use allocation::AllocationRepository;
pub use documents::{ControlAccounts, DocumentRepository};
pub use error::RepositoryError;
pub use fiscal::FiscalRepository;
pub use journal::{DEFAULT_ENTRY_NUMBER_PREFIX, JournalRepository};
pub use matching::MatchingRepository;
pub use recurring::RecurringRepository;
