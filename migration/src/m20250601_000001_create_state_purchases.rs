use sea_orm_migration::prelude::*;

use crate::schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(schema::create_table()).await?;

        // The UNIQUE column constraint already backs purchase_number with an
        // index; the named one is kept so lookups can rely on a stable name.
        manager
            .create_index(schema::create_purchase_number_index())
            .await?;

        let db = manager.get_connection();
        for stmt in schema::comment_statements() {
            db.execute_unprepared(&stmt).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(schema::drop_table()).await
    }
}
