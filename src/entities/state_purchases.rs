//! SeaORM Entity for the state_purchases table
//!
//! One row per purchase number, as it was seen in the most recent export.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "state_purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Link to the purchase card in EIS
    #[sea_orm(column_type = "Text", nullable)]
    pub eis_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub winner_name: Option<String>,
    /// Winner's taxpayer number
    #[sea_orm(column_type = "Text", nullable)]
    pub inn: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub time_zone: Option<String>,
    pub result_date: Option<Date>,
    #[sea_orm(column_type = "Text", nullable)]
    pub customer_name: Option<String>,
    /// Initial maximum contract price
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub nmck: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub contract_securing: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub warranty_obligations_securing: Option<Decimal>,
    pub contract_end_date: Option<Date>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub winner_price: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone_1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub fio_1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub email_1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone_2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub fio_2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub email_2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone_3: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub fio_3: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub email_3: Option<String>,
    /// Small/medium business preferences declared in the purchase
    #[sea_orm(column_type = "Text", nullable)]
    pub smp_advantages: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub smp_status: Option<String>,
    /// When the record was extracted from the source export
    pub extraction_dt: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Text", unique)]
    pub purchase_number: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
