//! `SeaORM` entity definitions.
//!
//! One module per table; Postgres enum types live in `sea_orm_active_enums`.

pub mod prelude;

pub mod accounting_periods;
pub mod accounts;
pub mod adjustment_notes;
pub mod company_posting_accounts;
pub mod fiscal_years;
pub mod goods_receipt_lines;
pub mod invoice_items;
pub mod invoice_matchings;
pub mod invoices;
pub mod journal_entries;
pub mod journal_entry_lines;
pub mod payment_allocations;
pub mod payments;
pub mod purchase_order_lines;
pub mod recurring_journal_templates;
pub mod sea_orm_active_enums;
