use sea_orm::Database;
use state_purchases::config::Settings;
use state_purchases::services::{purchase_store, schema};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        mode = ?settings.mode,
        source_utc_offset = %settings.source_utc_offset,
        "Connecting to database..."
    );
    let db = Database::connect(&settings.database_url).await?;

    schema::provision(&db).await?;

    if !schema::is_provisioned(&db).await? {
        tracing::error!("state_purchases table or its purchase number index is missing");
        return Err("schema is incomplete after provisioning".into());
    }

    let rows = purchase_store::count(&db).await?;
    tracing::info!(rows = rows, "state_purchases is ready");

    db.close().await?;
    Ok(())
}
