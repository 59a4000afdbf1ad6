//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! signifyd-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SIGNIFYD_DATABASE_URL` - `PostgreSQL` connection string for case records
//!   (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/connect/migrations/` and are embedded in the
//! `signifyd-connect` library.

use secrecy::SecretString;
use signifyd_connect::MIGRATOR;
use signifyd_connect::store::create_pool;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the case table migrations.
///
/// # Errors
///
/// Returns error if no database URL is set, the database cannot be reached,
/// or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("SIGNIFYD_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("SIGNIFYD_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&SecretString::from(database_url)).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
