//! `SeaORM` Entity for invoice_matchings table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::MatchingStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_matchings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_id: Uuid,
    pub purchase_order_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub po_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub grn_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub invoice_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity_variance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price_variance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_variance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub variance_percentage: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub tolerance_percentage: Decimal,
    pub is_within_tolerance: bool,
    pub matching_status: MatchingStatus,
    #[sea_orm(column_type = "JsonBinary")]
    pub mismatches: Json,
    pub matched_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_delete = "Cascade"
    )]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
