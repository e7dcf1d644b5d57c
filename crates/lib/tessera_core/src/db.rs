//! PostgreSQL connection bootstrap.
//!
//! The only automatically retried operation in the service: the initial pool
//! connection backs off exponentially and gives up after a bounded number of
//! attempts.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Connection attempts before giving up.
pub const CONNECT_ATTEMPTS: u32 = 5;

/// Delay after the first failed attempt; doubled after each further failure.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Errors that can occur while bootstrapping the database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not connect to PostgreSQL after {attempts} attempts: {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Backoff before attempt `attempt + 1`: 500 ms, 1 s, 2 s, 4 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    INITIAL_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Open a pool, retrying with exponential backoff.
pub async fn connect_with_backoff(url: &str, max_connections: u32) -> Result<PgPool> {
    let mut attempt = 1;
    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!(attempt, "connected to PostgreSQL");
                return Ok(pool);
            }
            Err(source) if attempt >= CONNECT_ATTEMPTS => {
                return Err(DbError::Unreachable {
                    attempts: attempt,
                    source,
                });
            }
            Err(e) => {
                let delay = backoff_delay(attempt);
                warn!(attempt, ?delay, error = %e, "PostgreSQL connection failed, retrying");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Connect and apply the embedded migrations.
pub async fn bootstrap(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = connect_with_backoff(url, max_connections).await?;
    crate::migrate::migrate(&pool).await?;
    info!("database migrations applied");
    Ok(pool)
}
