//! DDL for the `state_purchases` table.
//!
//! Every statement here is safe to re-apply: the table and the index are
//! guarded with `IF NOT EXISTS` and `COMMENT ON` simply overwrites.

use sea_orm_migration::prelude::*;

pub const TABLE_NAME: &str = "state_purchases";
pub const PURCHASE_NUMBER_INDEX: &str = "idx_state_purchase_purchase_number";

pub const TABLE_COMMENT: &str =
    "Winners of state purchases extracted from EIS export files";
pub const EXTRACTION_DT_COMMENT: &str =
    "Moment the record was extracted, taken from the export file name";
pub const PURCHASE_NUMBER_COMMENT: &str =
    "Purchase number in EIS, unique business key of the record";

/// Monetary columns are `numeric(15, 2)`.
pub const MONEY_PRECISION: u32 = 15;
pub const MONEY_SCALE: u32 = 2;

pub fn create_table() -> TableCreateStatement {
    let mut table = Table::create();
    table
        .table(StatePurchases::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(StatePurchases::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(StatePurchases::EisUrl).text().null())
        .col(ColumnDef::new(StatePurchases::WinnerName).text().null())
        .col(ColumnDef::new(StatePurchases::Inn).text().null())
        .col(ColumnDef::new(StatePurchases::TimeZone).text().null())
        .col(ColumnDef::new(StatePurchases::ResultDate).date().null())
        .col(ColumnDef::new(StatePurchases::CustomerName).text().null())
        .col(money(StatePurchases::Nmck))
        .col(money(StatePurchases::ContractSecuring))
        .col(money(StatePurchases::WarrantyObligationsSecuring))
        .col(ColumnDef::new(StatePurchases::ContractEndDate).date().null())
        .col(money(StatePurchases::WinnerPrice));

    for (phone, fio, email) in CONTACT_COLUMNS {
        table
            .col(ColumnDef::new(phone).text().null())
            .col(ColumnDef::new(fio).text().null())
            .col(ColumnDef::new(email).text().null());
    }

    table
        .col(ColumnDef::new(StatePurchases::SmpAdvantages).text().null())
        .col(ColumnDef::new(StatePurchases::SmpStatus).text().null())
        .col(
            ColumnDef::new(StatePurchases::ExtractionDt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(StatePurchases::PurchaseNumber)
                .text()
                .not_null()
                .unique_key(),
        )
        .to_owned()
}

pub fn create_purchase_number_index() -> IndexCreateStatement {
    Index::create()
        .name(PURCHASE_NUMBER_INDEX)
        .table(StatePurchases::Table)
        .col(StatePurchases::PurchaseNumber)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// `COMMENT ON` has no query-builder form, so these are raw statements.
pub fn comment_statements() -> Vec<String> {
    vec![
        format!("COMMENT ON TABLE {TABLE_NAME} IS {}", quote_literal(TABLE_COMMENT)),
        format!(
            "COMMENT ON COLUMN {TABLE_NAME}.extraction_dt IS {}",
            quote_literal(EXTRACTION_DT_COMMENT)
        ),
        format!(
            "COMMENT ON COLUMN {TABLE_NAME}.purchase_number IS {}",
            quote_literal(PURCHASE_NUMBER_COMMENT)
        ),
    ]
}

pub fn drop_table() -> TableDropStatement {
    Table::drop()
        .table(StatePurchases::Table)
        .if_exists()
        .to_owned()
}

fn money(column: StatePurchases) -> ColumnDef {
    ColumnDef::new(column)
        .decimal_len(MONEY_PRECISION, MONEY_SCALE)
        .null()
        .to_owned()
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

const CONTACT_COLUMNS: [(StatePurchases, StatePurchases, StatePurchases); 3] = [
    (StatePurchases::Phone1, StatePurchases::Fio1, StatePurchases::Email1),
    (StatePurchases::Phone2, StatePurchases::Fio2, StatePurchases::Email2),
    (StatePurchases::Phone3, StatePurchases::Fio3, StatePurchases::Email3),
];

#[derive(Iden, Clone, Copy)]
pub enum StatePurchases {
    Table,
    Id,
    EisUrl,
    WinnerName,
    Inn,
    TimeZone,
    ResultDate,
    CustomerName,
    Nmck,
    ContractSecuring,
    WarrantyObligationsSecuring,
    ContractEndDate,
    WinnerPrice,
    #[iden = "phone_1"]
    Phone1,
    #[iden = "fio_1"]
    Fio1,
    #[iden = "email_1"]
    Email1,
    #[iden = "phone_2"]
    Phone2,
    #[iden = "fio_2"]
    Fio2,
    #[iden = "email_2"]
    Email2,
    #[iden = "phone_3"]
    Phone3,
    #[iden = "fio_3"]
    Fio3,
    #[iden = "email_3"]
    Email3,
    SmpAdvantages,
    SmpStatus,
    ExtractionDt,
    PurchaseNumber,
}
