/// PostgreSQL connection pool for the task board
///
/// A thin layer over `PgPoolOptions` that applies the board's defaults,
/// verifies connectivity on startup and exposes pool statistics for the
/// health endpoint.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let pool = create_pool(DatabaseConfig::with_url("postgresql://localhost/taskboard")).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pool configuration. Timeouts are in seconds so they map directly to env vars.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Upper bound on open connections
    pub max_connections: u32,

    /// Connections kept warm while idle
    pub min_connections: u32,

    /// How long a request waits for a free connection
    pub acquire_timeout_seconds: u64,

    /// Idle connections older than this are closed (None = never)
    pub idle_timeout_seconds: Option<u64>,

    /// Connections are recycled after this lifetime (None = never)
    pub max_lifetime_seconds: Option<u64>,
}

impl DatabaseConfig {
    /// Default settings pointing at `url`
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

/// Creates the pool and runs a `SELECT 1` before handing it out
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` when the URL is invalid or the
/// database does not answer the health probe.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle) = config.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle));
        debug!(idle_timeout_seconds = idle, "Set idle timeout");
    }

    if let Some(lifetime) = config.max_lifetime_seconds {
        options = options.max_lifetime(Duration::from_secs(lifetime));
        debug!(max_lifetime_seconds = lifetime, "Set max lifetime");
    }

    let pool = options.connect(&config.url).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Round-trips `SELECT 1` through the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (value,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if value == 1 {
        Ok(())
    } else {
        warn!(value, "Database health probe returned unexpected value");
        Err(sqlx::Error::Protocol(
            "health probe returned unexpected value".into(),
        ))
    }
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
}

/// Reads the current pool counters
pub fn pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle() as u32;

    PoolStats {
        active_connections: size.saturating_sub(idle),
        idle_connections: idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_seconds, 30);
        assert_eq!(config.idle_timeout_seconds, Some(600));
        assert!(config.url.is_empty());
    }

    #[test]
    fn test_with_url_keeps_defaults() {
        let config = DatabaseConfig::with_url("postgresql://localhost/taskboard");
        assert_eq!(config.url, "postgresql://localhost/taskboard");
        assert_eq!(config.max_lifetime_seconds, Some(1800));
    }
}
