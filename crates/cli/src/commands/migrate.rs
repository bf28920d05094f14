//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cs-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CHANNEL_SYNC_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/connector/migrations/`

use channel_sync_connector::config::get_database_url;
use channel_sync_connector::db::create_pool;

/// Run the connector's database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let database_url = get_database_url("CHANNEL_SYNC_DATABASE_URL")?;

    tracing::info!("Connecting to channel sync database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../connector/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
