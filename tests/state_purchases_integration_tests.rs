mod common;

use chrono::{DateTime, FixedOffset, TimeZone};
use migration::schema;
use rust_decimal_macros::dec;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use state_purchases::entities::state_purchases as purchase;
use state_purchases::models::state_purchase::NewStatePurchase;
use state_purchases::services::{purchase_store, schema as provisioning};

use crate::common::{schema_lock, setup_test_db};

macro_rules! db_or_skip {
    () => {
        match setup_test_db().await.expect("Failed to connect to test DB") {
            Some(db) => db,
            None => return,
        }
    };
}

fn new_year_utc() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .unwrap()
}

async fn exec_sql(db: &DatabaseConnection, sql: &str) -> Result<(), sea_orm::DbErr> {
    db.execute_unprepared(sql).await.map(|_| ())
}

#[tokio::test]
async fn test_schema_is_provisioned() {
    let db = db_or_skip!();
    assert!(provisioning::is_provisioned(&db).await.unwrap());
}

#[tokio::test]
async fn test_schema_statements_can_be_reapplied() {
    let db = db_or_skip!();
    let _guard = schema_lock().await;
    let backend = db.get_database_backend();

    // Table, index and comments all exist already
    db.execute(backend.build(&schema::create_table())).await.unwrap();
    db.execute(backend.build(&schema::create_purchase_number_index()))
        .await
        .unwrap();
    for stmt in schema::comment_statements() {
        exec_sql(&db, &stmt).await.unwrap();
    }

    provisioning::provision(&db).await.unwrap();
    assert!(provisioning::is_provisioned(&db).await.unwrap());
}

#[tokio::test]
async fn test_unguarded_index_creation_fails_when_index_exists() {
    let db = db_or_skip!();
    let _guard = schema_lock().await;

    let err = exec_sql(
        &db,
        "CREATE UNIQUE INDEX idx_state_purchase_purchase_number ON state_purchases (purchase_number)",
    )
    .await;

    assert!(err.is_err(), "index name is already taken");
}

#[tokio::test]
async fn test_insert_and_read_back() {
    let db = db_or_skip!();
    let txn = db.begin().await.unwrap();

    let stored = purchase_store::insert(
        &txn,
        NewStatePurchase::new("PN-0001").with_extraction_dt(new_year_utc()),
    )
    .await
    .unwrap();

    let found = purchase_store::find_by_purchase_number(&txn, "PN-0001")
        .await
        .unwrap()
        .expect("row should be readable");

    assert_eq!(found, stored);
    assert_eq!(found.extraction_dt, new_year_utc());
    assert_eq!(found.eis_url, None);
    assert_eq!(found.nmck, None);
    assert_eq!(found.email_3, None);

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_purchase_number_is_rejected() {
    let db = db_or_skip!();
    let txn = db.begin().await.unwrap();

    purchase_store::insert(
        &txn,
        NewStatePurchase::new("PN-0001").with_extraction_dt(new_year_utc()),
    )
    .await
    .unwrap();

    // The failed insert aborts its savepoint only
    let nested = txn.begin().await.unwrap();
    let err = purchase_store::insert(
        &nested,
        NewStatePurchase::new("PN-0001")
            .with_extraction_dt(new_year_utc() + chrono::Duration::days(1)),
    )
    .await
    .unwrap_err();
    nested.rollback().await.unwrap();

    assert!(err.is_unique_violation(), "unexpected error: {}", err);
    let rows = purchase::Entity::find().all(&txn).await.unwrap();
    assert_eq!(
        rows.iter().filter(|r| r.purchase_number == "PN-0001").count(),
        1
    );

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_database_reports_missing_extraction_dt() {
    let db = db_or_skip!();
    let txn = db.begin().await.unwrap();

    // Bypass validation so the constraint itself is exercised
    let active = NewStatePurchase::new("PN-0002").into_active_model();
    let err = purchase::Entity::insert(active).exec(&txn).await.unwrap_err();
    let err = purchase_store::StoreError::from(err);

    assert!(err.is_not_null_violation(), "unexpected error: {}", err);
    assert_eq!(err.to_string(), "Null value in column extraction_dt violates not-null constraint");

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_money_round_trips_and_overflows() {
    let db = db_or_skip!();
    let txn = db.begin().await.unwrap();

    let mut record = NewStatePurchase::new("PN-0004").with_extraction_dt(new_year_utc());
    record.nmck = Some(dec!(1234567890123.45));
    let stored = purchase_store::insert(&txn, record).await.unwrap();
    assert_eq!(stored.nmck, Some(dec!(1234567890123.45)));

    // Engine-side check, bypassing validation
    let nested = txn.begin().await.unwrap();
    let mut record = NewStatePurchase::new("PN-0005").with_extraction_dt(new_year_utc());
    record.nmck = Some(dec!(12345678901234.5));
    let err = purchase::Entity::insert(record.into_active_model())
        .exec(&nested)
        .await
        .unwrap_err();
    nested.rollback().await.unwrap();

    let err = purchase_store::StoreError::from(err);
    assert!(err.is_numeric_overflow(), "unexpected error: {}", err);

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_upsert_many_replaces_existing_rows() {
    let db = db_or_skip!();
    let txn = db.begin().await.unwrap();

    let mut first = NewStatePurchase::new("PN-UPSERT-1").with_extraction_dt(new_year_utc());
    first.winner_name = Some("ООО Первый".to_string());
    let written = purchase_store::upsert_many(
        &txn,
        vec![
            first.clone(),
            NewStatePurchase::new("PN-UPSERT-2").with_extraction_dt(new_year_utc()),
        ],
    )
    .await
    .unwrap();
    assert_eq!(written, 2);

    let later = new_year_utc() + chrono::Duration::days(30);
    let mut updated = first.with_extraction_dt(later);
    updated.winner_name = Some("ООО Второй".to_string());
    let written = purchase_store::upsert_many(&txn, vec![updated]).await.unwrap();
    assert_eq!(written, 1);

    let row = purchase_store::find_by_purchase_number(&txn, "PN-UPSERT-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.winner_name.as_deref(), Some("ООО Второй"));
    assert_eq!(row.extraction_dt, later);

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_inserts_of_same_purchase_number() {
    let db = db_or_skip!();
    let purchase_number = format!(
        "PN-RACE-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );

    // Separate pool connections, so both statements really race
    let (a, b) = tokio::join!(
        purchase_store::insert(
            &db,
            NewStatePurchase::new(purchase_number.clone()).with_extraction_dt(new_year_utc()),
        ),
        purchase_store::insert(
            &db,
            NewStatePurchase::new(purchase_number.clone()).with_extraction_dt(new_year_utc()),
        ),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    let failure = a.err().or(b.err());

    purchase::Entity::delete_many()
        .filter(purchase::Column::PurchaseNumber.eq(purchase_number.as_str()))
        .exec(&db)
        .await
        .unwrap();

    assert_eq!(successes, 1);
    let failure = failure.expect("one insert should fail");
    assert!(failure.is_unique_violation(), "unexpected error: {}", failure);
}
