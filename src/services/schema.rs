//! Schema provisioning for the state_purchases table.

use migration::schema::{PURCHASE_NUMBER_INDEX, TABLE_NAME};
use migration::Migrator;
use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::prelude::SchemaManager;
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Apply pending migrations. Running it against an up-to-date database is a no-op.
pub async fn provision(db: &DatabaseConnection) -> Result<(), DbErr> {
    let pending = Migrator::get_pending_migrations(db).await?.len();
    if pending == 0 {
        info!("Schema is up to date");
        return Ok(());
    }

    info!(pending = pending, "Applying migrations");
    Migrator::up(db, None).await?;
    info!(table = TABLE_NAME, "Schema provisioned");
    Ok(())
}

/// Whether both the table and its purchase number index exist.
pub async fn is_provisioned(db: &DatabaseConnection) -> Result<bool, DbErr> {
    let manager = SchemaManager::new(db);
    if !manager.has_table(TABLE_NAME).await? {
        return Ok(false);
    }
    manager.has_index(TABLE_NAME, PURCHASE_NUMBER_INDEX).await
}
