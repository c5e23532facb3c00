use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for background tasks after the server stops (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// JWT validation and lookup-token settings.
    pub jwt: JwtConfig,
    /// Identity service client settings.
    pub identity: IdentityConfig,
    /// Orphan reconciler schedule.
    pub sweep: SweepConfig,
}

/// Where and how to reach the identity service.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL; `/fetchuserbyid` is appended.
    pub base_url: String,
    /// Per-lookup timeout in seconds (default: `10`).
    pub request_timeout_secs: u64,
}

impl IdentityConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Orphan reconciler schedule.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Seconds between cycles (default: 6 hours).
    pub interval_secs: u64,
    /// Upper bound on one cycle in seconds (default: `30`).
    pub timeout_secs: u64,
}

impl SweepConfig {
    /// Never zero; `tokio::time::interval` rejects a zero period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 6 * 60 * 60,
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                          |
    /// |---------------------------------|----------------------------------|
    /// | `HOST`                          | `0.0.0.0`                        |
    /// | `PORT`                          | `3000`                           |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `5`                              |
    /// | `IDENTITY_SERVICE_URL`          | `http://localhost:4000/api/v1`   |
    /// | `IDENTITY_REQUEST_TIMEOUT_SECS` | `10`                             |
    /// | `ORPHAN_SWEEP_INTERVAL_SECS`    | `21600`                          |
    /// | `ORPHAN_SWEEP_TIMEOUT_SECS`     | `30`                             |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparsable numeric values or a missing `JWT_SECRET`; startup
    /// should fail fast on misconfiguration.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_parse("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_parse("SHUTDOWN_TIMEOUT_SECS", 5);

        let identity = IdentityConfig {
            base_url: std::env::var("IDENTITY_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/api/v1".into())
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: env_parse("IDENTITY_REQUEST_TIMEOUT_SECS", 10),
        };

        let defaults = SweepConfig::default();
        let sweep = SweepConfig {
            interval_secs: env_parse("ORPHAN_SWEEP_INTERVAL_SECS", defaults.interval_secs),
            timeout_secs: env_parse("ORPHAN_SWEEP_TIMEOUT_SECS", defaults.timeout_secs),
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            identity,
            sweep,
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number: {e}")),
        Err(_) => default,
    }
}
