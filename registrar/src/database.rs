//! Database connection pool management

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{sanitize_url, DatabaseError, Result};

/// Create a PostgreSQL connection pool with retry logic
///
/// Transient failures are retried up to `max_retries` times with
/// exponential backoff starting at `retry_delay_secs`. Configuration
/// errors fail immediately.
pub(crate) async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if !e.is_retriable() || attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to database at '{}' after {} attempt(s): {}",
                        sanitize_url(&config.url),
                        attempt,
                        e
                    );
                    return Err(e.into());
                }

                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// `base * 2^(attempt-1)`
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, DatabaseError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| {
            let hint = categorize_db_error(&e);
            DatabaseError::from(e).add_context(format!(
                "{} (url: {})",
                hint,
                sanitize_url(&config.url)
            ))
        })
}

/// Categorize database error for better operator guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error - check the connection URL format",
        Error::Database(_) => "Database rejected the connection - check credentials",
        Error::Io(_) => "Network I/O error - check connectivity",
        Error::Tls(_) => "TLS/SSL error - check certificate configuration",
        Error::PoolTimedOut => "Connection pool timeout - database may be overloaded",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseErrorKind, Error};

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_malformed_url_fails_without_retrying() {
        let config = DatabaseConfig {
            url: "not-a-database-url".to_string(),
            max_retries: 3,
            retry_delay_secs: 60,
            ..DatabaseConfig::default()
        };

        // a retry would sleep for a minute
        let result = tokio::time::timeout(Duration::from_secs(10), create_pool(&config)).await;
        match result {
            Ok(Err(Error::Database(e))) => {
                assert_eq!(e.kind, DatabaseErrorKind::Configuration);
                assert!(e.context.is_some());
            }
            other => panic!("expected configuration error, got {:?}", other.map(|r| r.is_ok())),
        }
    }
}
