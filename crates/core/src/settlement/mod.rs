//! Payment settlement: allocating receipts and vouchers to invoices.

pub mod allocation;
pub mod error;

#[cfg(test)]
mod allocation_props;

pub use allocation::{Allocation, AllocationBook, SettlementService};
pub use error::SettlementError;
