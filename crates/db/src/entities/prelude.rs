//! Entity re-exports under their table names.

pub use super::accounting_periods::Entity as AccountingPeriods;
pub use super::accounts::Entity as Accounts;
pub use super::adjustment_notes::Entity as AdjustmentNotes;
pub use super::company_posting_accounts::Entity as CompanyPostingAccounts;
pub use super::fiscal_years::Entity as FiscalYears;
pub use super::goods_receipt_lines::Entity as GoodsReceiptLines;
pub use super::invoice_items::Entity as InvoiceItems;
pub use super::invoice_matchings::Entity as InvoiceMatchings;
pub use super::invoices::Entity as Invoices;
pub use super::journal_entries::Entity as JournalEntries;
pub use super::journal_entry_lines::Entity as JournalEntryLines;
pub use super::payment_allocations::Entity as PaymentAllocations;
pub use super::payments::Entity as Payments;
pub use super::purchase_order_lines::Entity as PurchaseOrderLines;
pub use super::recurring_journal_templates::Entity as RecurringJournalTemplates;
