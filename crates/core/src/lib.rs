//! Core business logic for Folio.
//!
//! This crate contains pure posting and settlement logic with ZERO database
//! dependencies. Every operation takes its collaborators (account balances,
//! periods, numbering, actor and clock) explicitly and either succeeds as a
//! whole or leaves its inputs untouched.
//!
//! # Modules
//!
//! - `ledger` - Journal entries, posting, reversal and recurring generation
//! - `documents` - Invoices, payments, notes and their posting adapters
//! - `settlement` - Payment allocation against invoices
//! - `matching` - Three-way matching of supplier invoices
//! - `batch` - Per-unit outcome of batch runs

pub mod batch;
pub mod documents;
pub mod ledger;
pub mod matching;
pub mod settlement;

pub use batch::BatchOutcome;
