//! Initial database migration.
//!
//! Creates the enums, ledger tables, source document tables, settlement and
//! matching tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS & FISCAL CALENDAR
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(FISCAL_YEARS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;
        db.execute_unprepared(COMPANY_POSTING_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRY_LINES_SQL).await?;
        db.execute_unprepared(RECURRING_TEMPLATES_SQL).await?;

        // ============================================================
        // PART 4: SOURCE DOCUMENTS
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(INVOICE_ITEMS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(ADJUSTMENT_NOTES_SQL).await?;

        // ============================================================
        // PART 5: SETTLEMENT & MATCHING
        // ============================================================
        db.execute_unprepared(PAYMENT_ALLOCATIONS_SQL).await?;
        db.execute_unprepared(PURCHASE_ORDER_LINES_SQL).await?;
        db.execute_unprepared(GOODS_RECEIPT_LINES_SQL).await?;
        db.execute_unprepared(INVOICE_MATCHINGS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM ('asset', 'liability', 'equity', 'income', 'expense');

CREATE TYPE normal_balance AS ENUM ('debit', 'credit');

CREATE TYPE fiscal_year_status AS ENUM ('open', 'closed');

CREATE TYPE period_status AS ENUM ('open', 'closed', 'locked');

CREATE TYPE journal_entry_type AS ENUM (
    'manual',
    'automatic',
    'opening',
    'closing',
    'adjusting',
    'reversing',
    'reclassification',
    'intercompany'
);

CREATE TYPE journal_status AS ENUM ('draft', 'submitted', 'posted', 'cancelled');

CREATE TYPE recurring_frequency AS ENUM (
    'daily',
    'weekly',
    'biweekly',
    'monthly',
    'quarterly',
    'half_yearly',
    'yearly'
);

CREATE TYPE invoice_kind AS ENUM ('sales', 'supplier');

CREATE TYPE invoice_status AS ENUM (
    'draft',
    'issued',
    'approved',
    'partially_paid',
    'paid',
    'cancelled'
);

CREATE TYPE payment_kind AS ENUM ('receipt', 'voucher');

CREATE TYPE payment_status AS ENUM ('draft', 'approved', 'cleared', 'paid', 'cancelled');

CREATE TYPE note_kind AS ENUM ('credit', 'debit');

CREATE TYPE note_status AS ENUM ('draft', 'issued', 'applied', 'cancelled');

CREATE TYPE matching_status AS ENUM (
    'matched',
    'quantity_mismatch',
    'price_mismatch',
    'not_matched'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    normal_balance normal_balance NOT NULL,
    opening_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    parent_id UUID REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (company_id, code)
);

CREATE INDEX idx_accounts_company ON accounts(company_id) WHERE is_active = true;
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const FISCAL_YEARS_SQL: &str = r"
CREATE TABLE fiscal_years (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_default BOOLEAN NOT NULL DEFAULT false,
    status fiscal_year_status NOT NULL DEFAULT 'open',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_fiscal_year_dates CHECK (end_date > start_date),
    UNIQUE (company_id, name)
);

CREATE UNIQUE INDEX idx_fiscal_years_default ON fiscal_years(company_id) WHERE is_default = true;
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    fiscal_year_id UUID NOT NULL REFERENCES fiscal_years(id) ON DELETE CASCADE,
    company_id UUID NOT NULL,
    name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    status period_status NOT NULL DEFAULT 'open',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_period_dates CHECK (end_date >= start_date),
    UNIQUE (company_id, start_date)
);

CREATE INDEX idx_accounting_periods_company_date
    ON accounting_periods(company_id, start_date, end_date);
";

const COMPANY_POSTING_ACCOUNTS_SQL: &str = r"
CREATE TABLE company_posting_accounts (
    company_id UUID PRIMARY KEY,
    receivable_account_id UUID NOT NULL REFERENCES accounts(id),
    payable_account_id UUID NOT NULL REFERENCES accounts(id),
    cash_account_id UUID NOT NULL REFERENCES accounts(id),
    sales_tax_account_id UUID REFERENCES accounts(id),
    purchase_tax_account_id UUID REFERENCES accounts(id),
    sales_returns_account_id UUID NOT NULL REFERENCES accounts(id),
    purchase_returns_account_id UUID NOT NULL REFERENCES accounts(id),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    fiscal_year_id UUID NOT NULL REFERENCES fiscal_years(id),
    accounting_period_id UUID NOT NULL REFERENCES accounting_periods(id),
    entry_number VARCHAR(50),
    entry_type journal_entry_type NOT NULL,
    entry_date DATE NOT NULL,
    posting_date DATE,
    reference_type VARCHAR(50),
    reference_id UUID,
    reference_number VARCHAR(100),
    status journal_status NOT NULL DEFAULT 'draft',
    is_reversal BOOLEAN NOT NULL DEFAULT false,
    reversed_entry_id UUID REFERENCES journal_entries(id),
    reversal_entry_id UUID REFERENCES journal_entries(id),
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(19, 10) NOT NULL DEFAULT 1,
    total_debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description TEXT NOT NULL,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    submitted_by UUID,
    submitted_at TIMESTAMPTZ,
    posted_by UUID,
    posted_at TIMESTAMPTZ,
    cancelled_by UUID,
    cancelled_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_posted_balanced CHECK (status <> 'posted' OR total_debit = total_credit),
    CONSTRAINT chk_single_reversal_link CHECK (
        reversed_entry_id IS NULL OR reversal_entry_id IS NULL
    ),
    CONSTRAINT chk_exchange_rate_positive CHECK (exchange_rate > 0),
    UNIQUE (company_id, entry_number)
);

CREATE INDEX idx_journal_entries_company_date ON journal_entries(company_id, entry_date);
CREATE INDEX idx_journal_entries_status ON journal_entries(company_id, status);
CREATE INDEX idx_journal_entries_reference ON journal_entries(reference_type, reference_id)
    WHERE reference_id IS NOT NULL;
";

const JOURNAL_ENTRY_LINES_SQL: &str = r"
CREATE TABLE journal_entry_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description VARCHAR(500),
    cost_center_id UUID,
    department_id UUID,
    project_id UUID,
    foreign_currency CHAR(3),
    debit_foreign NUMERIC(19, 4),
    credit_foreign NUMERIC(19, 4),
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_debit_or_credit CHECK (
        (debit > 0 AND credit = 0) OR (debit = 0 AND credit > 0)
    )
);

CREATE INDEX idx_journal_entry_lines_entry ON journal_entry_lines(journal_entry_id, sort_order);
CREATE INDEX idx_journal_entry_lines_account ON journal_entry_lines(account_id);
";

const RECURRING_TEMPLATES_SQL: &str = r"
CREATE TABLE recurring_journal_templates (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    frequency recurring_frequency NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE,
    max_occurrences INTEGER,
    occurrences_count INTEGER NOT NULL DEFAULT 0,
    last_generated_date DATE,
    next_generation_date DATE,
    is_active BOOLEAN NOT NULL DEFAULT true,
    entry_type journal_entry_type NOT NULL DEFAULT 'automatic',
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(19, 10) NOT NULL DEFAULT 1,
    template_lines JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_occurrences CHECK (occurrences_count >= 0),
    UNIQUE (company_id, name)
);

CREATE INDEX idx_recurring_due ON recurring_journal_templates(next_generation_date)
    WHERE is_active = true;
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    kind invoice_kind NOT NULL,
    company_id UUID NOT NULL,
    party_id UUID NOT NULL,
    number VARCHAR(50) NOT NULL,
    invoice_date DATE NOT NULL,
    due_date DATE NOT NULL,
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(19, 10) NOT NULL DEFAULT 1,
    subtotal NUMERIC(19, 4) NOT NULL DEFAULT 0,
    tax_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    paid_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credited_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    outstanding_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status invoice_status NOT NULL DEFAULT 'draft',
    purchase_order_id UUID,
    journal_entry_id UUID REFERENCES journal_entries(id),
    is_posted_to_gl BOOLEAN NOT NULL DEFAULT false,
    posted_to_gl_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_outstanding_non_negative CHECK (outstanding_amount >= 0),
    UNIQUE (company_id, kind, number)
);

CREATE INDEX idx_invoices_party_open ON invoices(company_id, party_id, invoice_date)
    WHERE status IN ('issued', 'approved', 'partially_paid');
CREATE INDEX idx_invoices_unposted ON invoices(company_id) WHERE is_posted_to_gl = false;
";

const INVOICE_ITEMS_SQL: &str = r"
CREATE TABLE invoice_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    item_id UUID,
    description TEXT,
    quantity NUMERIC(19, 4) NOT NULL,
    unit_price NUMERIC(19, 4) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    account_id UUID REFERENCES accounts(id),
    cost_center_id UUID,
    department_id UUID,
    project_id UUID,
    purchase_order_line_id UUID,
    goods_receipt_line_id UUID,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX idx_invoice_items_invoice ON invoice_items(invoice_id, sort_order);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    kind payment_kind NOT NULL,
    company_id UUID NOT NULL,
    party_id UUID NOT NULL,
    number VARCHAR(50) NOT NULL,
    payment_date DATE NOT NULL,
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(19, 10) NOT NULL DEFAULT 1,
    amount NUMERIC(19, 4) NOT NULL,
    allocated_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    unallocated_amount NUMERIC(19, 4) NOT NULL,
    status payment_status NOT NULL DEFAULT 'draft',
    journal_entry_id UUID REFERENCES journal_entries(id),
    is_posted_to_gl BOOLEAN NOT NULL DEFAULT false,
    posted_to_gl_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_unallocated_non_negative CHECK (unallocated_amount >= 0),
    UNIQUE (company_id, kind, number)
);

CREATE INDEX idx_payments_unposted ON payments(company_id) WHERE is_posted_to_gl = false;
";

const ADJUSTMENT_NOTES_SQL: &str = r"
CREATE TABLE adjustment_notes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    kind note_kind NOT NULL,
    company_id UUID NOT NULL,
    party_id UUID NOT NULL,
    number VARCHAR(50) NOT NULL,
    note_date DATE NOT NULL,
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(19, 10) NOT NULL DEFAULT 1,
    amount NUMERIC(19, 4) NOT NULL,
    invoice_id UUID REFERENCES invoices(id),
    reason TEXT,
    status note_status NOT NULL DEFAULT 'draft',
    journal_entry_id UUID REFERENCES journal_entries(id),
    is_posted_to_gl BOOLEAN NOT NULL DEFAULT false,
    posted_to_gl_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_note_amount_positive CHECK (amount > 0),
    UNIQUE (company_id, kind, number)
);

CREATE INDEX idx_adjustment_notes_unposted ON adjustment_notes(company_id)
    WHERE is_posted_to_gl = false;
";

const PAYMENT_ALLOCATIONS_SQL: &str = r"
CREATE TABLE payment_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id UUID NOT NULL REFERENCES payments(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    allocated_amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    allocation_date DATE NOT NULL,
    allocated_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_allocation_positive CHECK (allocated_amount > 0),
    UNIQUE (payment_id, invoice_id)
);

CREATE INDEX idx_payment_allocations_invoice ON payment_allocations(invoice_id);
";

const PURCHASE_ORDER_LINES_SQL: &str = r"
CREATE TABLE purchase_order_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_order_id UUID NOT NULL,
    item_id UUID,
    quantity NUMERIC(19, 4) NOT NULL,
    unit_price NUMERIC(19, 4) NOT NULL
);

CREATE INDEX idx_purchase_order_lines_order ON purchase_order_lines(purchase_order_id);
";

const GOODS_RECEIPT_LINES_SQL: &str = r"
CREATE TABLE goods_receipt_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    goods_receipt_id UUID NOT NULL,
    purchase_order_line_id UUID NOT NULL REFERENCES purchase_order_lines(id),
    received_quantity NUMERIC(19, 4) NOT NULL
);

CREATE INDEX idx_goods_receipt_lines_po_line ON goods_receipt_lines(purchase_order_line_id);
";

const INVOICE_MATCHINGS_SQL: &str = r"
CREATE TABLE invoice_matchings (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL UNIQUE REFERENCES invoices(id) ON DELETE CASCADE,
    purchase_order_id UUID NOT NULL,
    po_total NUMERIC(19, 4) NOT NULL,
    grn_total NUMERIC(19, 4) NOT NULL,
    invoice_total NUMERIC(19, 4) NOT NULL,
    quantity_variance NUMERIC(19, 4) NOT NULL,
    price_variance NUMERIC(19, 4) NOT NULL,
    total_variance NUMERIC(19, 4) NOT NULL,
    variance_percentage NUMERIC(9, 4) NOT NULL,
    tolerance_percentage NUMERIC(9, 4) NOT NULL,
    is_within_tolerance BOOLEAN NOT NULL,
    matching_status matching_status NOT NULL,
    mismatches JSONB NOT NULL DEFAULT '[]'::jsonb,
    matched_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const DROP_ALL_SQL: &str = r"
-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS invoice_matchings CASCADE;
DROP TABLE IF EXISTS goods_receipt_lines CASCADE;
DROP TABLE IF EXISTS purchase_order_lines CASCADE;
DROP TABLE IF EXISTS payment_allocations CASCADE;
DROP TABLE IF EXISTS adjustment_notes CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoice_items CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS recurring_journal_templates CASCADE;
DROP TABLE IF EXISTS journal_entry_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS company_posting_accounts CASCADE;
DROP TABLE IF EXISTS accounting_periods CASCADE;
DROP TABLE IF EXISTS fiscal_years CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

-- Drop enums
DROP TYPE IF EXISTS matching_status;
DROP TYPE IF EXISTS note_status;
DROP TYPE IF EXISTS note_kind;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS payment_kind;
DROP TYPE IF EXISTS invoice_status;
DROP TYPE IF EXISTS invoice_kind;
DROP TYPE IF EXISTS recurring_frequency;
DROP TYPE IF EXISTS journal_status;
DROP TYPE IF EXISTS journal_entry_type;
DROP TYPE IF EXISTS period_status;
DROP TYPE IF EXISTS fiscal_year_status;
DROP TYPE IF EXISTS normal_balance;
DROP TYPE IF EXISTS account_type;
";
