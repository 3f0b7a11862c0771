use sea_orm::{Database, DatabaseConnection, DbErr};
use state_purchases::services::schema;
use std::env;
use tokio::sync::Mutex;

/// Serialises schema changes between tests running in parallel.
static SCHEMA_LOCK: Mutex<()> = Mutex::const_new(());

/// Connect to the test database and make sure the schema is in place.
///
/// Returns `None` when TEST_DATABASE_URL is not set, so database tests are
/// skipped on machines without Postgres.
pub async fn setup_test_db() -> Result<Option<DatabaseConnection>, DbErr> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return Ok(None);
    };

    let db = Database::connect(&database_url).await?;
    {
        let _guard = SCHEMA_LOCK.lock().await;
        schema::provision(&db).await?;
    }
    Ok(Some(db))
}

/// Take the schema lock for tests that run DDL themselves.
pub async fn schema_lock() -> tokio::sync::MutexGuard<'static, ()> {
    SCHEMA_LOCK.lock().await
}
