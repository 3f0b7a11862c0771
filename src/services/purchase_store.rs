//! Reads and writes of purchase records.
//!
//! Constraint violations reported by Postgres are turned into [`StoreError`]
//! variants, so callers can tell a duplicate purchase number from a broken
//! connection. The same variants are produced when a record is rejected
//! before it reaches the database.

use std::collections::HashMap;

use sea_orm::sea_query::OnConflict;
use sea_orm::sqlx::error::{DatabaseError, ErrorKind};
use sea_orm::sqlx::postgres::PgDatabaseError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Insert, PaginatorTrait,
    QueryFilter, RuntimeErr, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::entities::{prelude::StatePurchases, state_purchases};
use crate::models::state_purchase::{NewStatePurchase, ValidationError};

/// Rows per INSERT. 24 bound columns keeps this well under the 65535 parameter limit.
const UPSERT_CHUNK_SIZE: usize = 500;

const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Columns rewritten when an incoming record hits an existing purchase number.
const UPSERT_COLUMNS: [state_purchases::Column; 23] = [
    state_purchases::Column::EisUrl,
    state_purchases::Column::WinnerName,
    state_purchases::Column::Inn,
    state_purchases::Column::TimeZone,
    state_purchases::Column::ResultDate,
    state_purchases::Column::CustomerName,
    state_purchases::Column::Nmck,
    state_purchases::Column::ContractSecuring,
    state_purchases::Column::WarrantyObligationsSecuring,
    state_purchases::Column::ContractEndDate,
    state_purchases::Column::WinnerPrice,
    state_purchases::Column::Phone1,
    state_purchases::Column::Fio1,
    state_purchases::Column::Email1,
    state_purchases::Column::Phone2,
    state_purchases::Column::Fio2,
    state_purchases::Column::Email2,
    state_purchases::Column::Phone3,
    state_purchases::Column::Fio3,
    state_purchases::Column::Email3,
    state_purchases::Column::SmpAdvantages,
    state_purchases::Column::SmpStatus,
    state_purchases::Column::ExtractionDt,
];

#[derive(Debug)]
pub enum StoreError {
    /// A row with the same purchase number already exists
    UniqueViolation { constraint: Option<String> },
    NotNullViolation { column: String },
    NumericOverflow { column: Option<String> },
    Database(DbErr),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UniqueViolation { constraint } => match constraint {
                Some(name) => write!(f, "Unique constraint violated: {}", name),
                None => write!(f, "Unique constraint violated"),
            },
            StoreError::NotNullViolation { column } => {
                write!(f, "Null value in column {} violates not-null constraint", column)
            }
            StoreError::NumericOverflow { column } => match column {
                Some(name) => write!(f, "Numeric field overflow in column {}", name),
                None => write!(f, "Numeric field overflow"),
            },
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    pub fn is_not_null_violation(&self) -> bool {
        matches!(self, StoreError::NotNullViolation { .. })
    }

    pub fn is_numeric_overflow(&self) -> bool {
        matches!(self, StoreError::NumericOverflow { .. })
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingField(column) => StoreError::NotNullViolation {
                column: column.to_string(),
            },
            ValidationError::NumericOverflow { column, .. } => StoreError::NumericOverflow {
                column: Some(column.to_string()),
            },
        }
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        database_error(&err)
            .and_then(classify)
            .unwrap_or(StoreError::Database(err))
    }
}

fn database_error(err: &DbErr) -> Option<&(dyn DatabaseError + 'static)> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(e))) => {
            Some(e.as_ref())
        }
        _ => None,
    }
}

fn classify(db_err: &(dyn DatabaseError + 'static)) -> Option<StoreError> {
    let column = || {
        db_err
            .try_downcast_ref::<PgDatabaseError>()
            .and_then(|e| e.column())
            .map(str::to_string)
    };

    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(StoreError::UniqueViolation {
            constraint: db_err.constraint().map(str::to_string),
        }),
        ErrorKind::NotNullViolation => Some(StoreError::NotNullViolation {
            column: column().unwrap_or_else(|| "unknown".to_string()),
        }),
        _ if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
            Some(StoreError::NumericOverflow { column: column() })
        }
        _ => None,
    }
}

/// Insert a single record. Fails if the purchase number is already stored.
pub async fn insert<C: ConnectionTrait>(
    db: &C,
    purchase: NewStatePurchase,
) -> Result<state_purchases::Model, StoreError> {
    if let Err(e) = purchase.validate() {
        warn!(purchase_number = %purchase.purchase_number, error = %e, "Rejected purchase");
        return Err(e.into());
    }

    let purchase_number = purchase.purchase_number.clone();
    match purchase.into_active_model().insert(db).await {
        Ok(model) => {
            debug!(id = model.id, purchase_number = %model.purchase_number, "Inserted purchase");
            Ok(model)
        }
        Err(e) => {
            let err = StoreError::from(e);
            warn!(purchase_number = %purchase_number, error = %err, "Failed to insert purchase");
            Err(err)
        }
    }
}

/// Write a batch of records, replacing rows whose purchase number is already
/// stored. Returns the number of rows written.
///
/// Every record is validated before anything is sent. When the batch holds
/// the same purchase number more than once, the last occurrence wins. A batch
/// spanning several INSERT statements is written in one transaction, so
/// either every chunk lands or none does.
pub async fn upsert_many<C>(db: &C, purchases: Vec<NewStatePurchase>) -> Result<u64, StoreError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if purchases.is_empty() {
        return Ok(0);
    }

    for purchase in &purchases {
        purchase.validate()?;
    }

    let total = purchases.len();
    let batch = last_occurrence_wins(purchases);
    if batch.len() < total {
        debug!(
            received = total,
            unique = batch.len(),
            "Collapsed duplicate purchase numbers in batch"
        );
    }

    let chunks = into_chunks(batch, UPSERT_CHUNK_SIZE);
    let written = if chunks.len() == 1 {
        write_chunks(db, chunks).await?
    } else {
        let txn = db.begin().await?;
        let written = write_chunks(&txn, chunks).await?;
        txn.commit().await?;
        written
    };

    info!(rows = written, "Wrote purchases");
    Ok(written)
}

async fn write_chunks<C: ConnectionTrait>(
    db: &C,
    chunks: Vec<Vec<NewStatePurchase>>,
) -> Result<u64, StoreError> {
    let mut written = 0;
    for chunk in chunks {
        written += upsert_query(chunk).exec_without_returning(db).await?;
    }
    Ok(written)
}

fn into_chunks(mut rest: Vec<NewStatePurchase>, size: usize) -> Vec<Vec<NewStatePurchase>> {
    let mut chunks = Vec::new();
    while !rest.is_empty() {
        let tail = rest.split_off(rest.len().min(size));
        chunks.push(rest);
        rest = tail;
    }
    chunks
}

fn upsert_query(batch: Vec<NewStatePurchase>) -> Insert<state_purchases::ActiveModel> {
    StatePurchases::insert_many(batch.into_iter().map(NewStatePurchase::into_active_model))
        .on_conflict(
            OnConflict::column(state_purchases::Column::PurchaseNumber)
                .update_columns(UPSERT_COLUMNS)
                .to_owned(),
        )
}

/// Postgres refuses to update the same row twice in one statement.
fn last_occurrence_wins(purchases: Vec<NewStatePurchase>) -> Vec<NewStatePurchase> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<NewStatePurchase> = Vec::with_capacity(purchases.len());

    for purchase in purchases {
        match position.get(&purchase.purchase_number) {
            Some(&i) => unique[i] = purchase,
            None => {
                position.insert(purchase.purchase_number.clone(), unique.len());
                unique.push(purchase);
            }
        }
    }

    unique
}

pub async fn find_by_purchase_number<C: ConnectionTrait>(
    db: &C,
    purchase_number: &str,
) -> Result<Option<state_purchases::Model>, StoreError> {
    Ok(StatePurchases::find()
        .filter(state_purchases::Column::PurchaseNumber.eq(purchase_number))
        .one(db)
        .await?)
}

pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64, StoreError> {
    Ok(StatePurchases::find().count(db).await?)
}
