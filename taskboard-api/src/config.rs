/// Configuration management for the API server
///
/// Configuration is read from environment variables (and a `.env` file in
/// development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `JWT_SECRET`: Secret key for session signing, at least 32 characters (required)
/// - `DUE_DATE_UTC_OFFSET`: offset for due dates entered without one (default: `+00:00`)
/// - `PRIORITY_POLICY`: `lenient` or `strict` (default: `lenient`)
/// - `NOTIFY_WEBHOOK_URL`: where credential notifications are posted (default: log only)
/// - `NOTIFY_TIMEOUT_MS`: how long account creation waits for a notification (default: 10000)
/// - `RUST_LOG`: Log filter (default: `taskboard_api=debug,tower_http=debug`)
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::time::Duration;
use taskboard_shared::tasks::{canonical::PriorityPolicy, due_date::parse_offset, TaskRules};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub tasks: TaskConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing key
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Deployment-wide task input rules
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    pub due_date_offset: FixedOffset,
    pub priority_policy: PriorityPolicy,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Webhook receiving credential notifications; `None` logs them instead
    pub webhook_url: Option<String>,

    pub timeout: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_port = var_or("API_PORT", "8080").parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let due_date_offset = parse_offset(&var_or("DUE_DATE_UTC_OFFSET", "+00:00"))?;
        let priority_policy = var_or("PRIORITY_POLICY", "lenient")
            .parse::<PriorityPolicy>()
            .map_err(anyhow::Error::msg)?;

        let webhook_url = env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        let timeout_ms = var_or("NOTIFY_TIMEOUT_MS", "10000").parse::<u64>()?;

        let config = Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: api_port,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "*")),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            tasks: TaskConfig {
                due_date_offset,
                priority_policy,
            },
            notify: NotifyConfig {
                webhook_url,
                timeout: Duration::from_millis(timeout_ms),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        if self.notify.timeout.is_zero() {
            anyhow::bail!("NOTIFY_TIMEOUT_MS must be greater than zero");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn task_rules(&self) -> TaskRules {
        TaskRules {
            priority_policy: self.tasks.priority_policy,
            due_date_offset: self.tasks.due_date_offset,
        }
    }

    /// Configuration for tests and local tooling
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            tasks: TaskConfig {
                due_date_offset: Utc.fix(),
                priority_policy: PriorityPolicy::Lenient,
            },
            notify: NotifyConfig {
                webhook_url: None,
                timeout: Duration::from_millis(500),
            },
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_tests("postgresql://localhost/test");
        config.api.port = 8080;

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.test, https://b.test,,"),
            vec!["https://a.test", "https://b.test"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = Config::for_tests("postgresql://localhost/test");
        config.jwt.secret = "short".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_task_rules_follow_config() {
        let mut config = Config::for_tests("postgresql://localhost/test");
        config.tasks.priority_policy = PriorityPolicy::Strict;
        config.tasks.due_date_offset = FixedOffset::west_opt(3 * 3600).unwrap();

        let rules = config.task_rules();
        assert_eq!(rules.priority_policy, PriorityPolicy::Strict);
        assert_eq!(rules.due_date_offset.local_minus_utc(), -3 * 3600);
    }
}
