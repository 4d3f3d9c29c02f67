//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time.

use sqlx::PgPool;

use super::CommandError;

/// Run all pending migrations.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
