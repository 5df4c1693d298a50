//! `SeaORM` Entity for company_posting_accounts table.
//!
//! Control accounts used when source documents are posted to the ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "company_posting_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub company_id: Uuid,
    pub receivable_account_id: Uuid,
    pub payable_account_id: Uuid,
    pub cash_account_id: Uuid,
    pub sales_tax_account_id: Option<Uuid>,
    pub purchase_tax_account_id: Option<Uuid>,
    pub sales_returns_account_id: Uuid,
    pub purchase_returns_account_id: Uuid,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
