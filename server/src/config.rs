//! Layered configuration: built-in defaults (`config/default.toml`) -> optional
//! `--config <file>` -> process environment (highest precedence), mirroring the
//! teacher's `mcp-server::config::Config` layering but with the spec-named
//! environment variables (§6.3) applied as explicit overrides instead of a
//! `MCP_`-prefixed `Environment` source, since this system's env vars
//! (`SERVICE_PORT`, `DB_CONNECTION`, ...) don't share a common prefix.

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub dispatcher: DispatcherConfig,
    pub liveness: LivenessConfig,
    pub rate_limit: RateLimitConfig,
    /// `API_KEY`; absent disables the `X-API-Key` check (local/dev only).
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbConnection {
    Sqlite,
    Mysql,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub connection: DbConnection,
    /// `DATABASE_URL`, used when `connection = sqlite`.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatcherConfig {
    pub wait_seconds: u64,
    pub waiter_cap_per_project: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LivenessConfig {
    pub agent_online_window_seconds: i64,
    pub agent_recent_window_seconds: i64,
    pub service_stale_seconds: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub period_seconds: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let builder = ConfigBuilder::builder().add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));
        let config = builder.build().context("failed to build configuration")?;
        let mut result: Config = config
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        Self::apply_standard_env_vars(&mut result);
        Ok(result)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                FileFormat::Toml,
            ))
            .add_source(File::with_name(path).required(false).format(FileFormat::Toml));
        let config = builder
            .build()
            .context("failed to build configuration from file")?;
        let mut result: Config = config
            .try_deserialize()
            .context("failed to deserialize configuration from file")?;
        Self::apply_standard_env_vars(&mut result);
        Ok(result)
    }

    /// Apply the spec-named environment variables (§6.3) as overrides over
    /// whatever the file-based layers produced, exactly the way the
    /// teacher's `apply_standard_env_vars` applies `DATABASE_URL`/
    /// `LISTEN_ADDR`/`LOG_LEVEL`.
    fn apply_standard_env_vars(config: &mut Config) {
        if let Ok(port) = env::var("SERVICE_PORT") {
            if let Ok(parsed) = port.parse() {
                config.server.port = parsed;
            }
        }
        if let Ok(conn) = env::var("DB_CONNECTION") {
            config.database.connection = match conn.to_lowercase().as_str() {
                "mysql" => DbConnection::Mysql,
                _ => DbConnection::Sqlite,
            };
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = Some(url);
        }
        if let Ok(host) = env::var("DB_HOST") {
            config.database.host = Some(host);
        }
        if let Ok(port) = env::var("DB_PORT") {
            config.database.port = port.parse().ok();
        }
        if let Ok(name) = env::var("DB_NAME") {
            config.database.name = Some(name);
        }
        if let Ok(user) = env::var("DB_USER") {
            config.database.user = Some(user);
        }
        if let Ok(password) = env::var("DB_PASSWORD") {
            config.database.password = Some(password);
        }
        if let Ok(key) = env::var("API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(limit) = env::var("API_RATE_LIMIT") {
            if let Ok(parsed) = limit.parse() {
                config.rate_limit.limit = parsed;
            }
        }
        if let Ok(period) = env::var("API_RATE_LIMIT_PERIOD") {
            if let Ok(parsed) = period.parse() {
                config.rate_limit.period_seconds = parsed;
            }
        }
        if let Ok(wait) = env::var("DISPATCHER_WAIT_SECONDS") {
            if let Ok(parsed) = wait.parse() {
                config.dispatcher.wait_seconds = parsed;
            }
        }
        if let Ok(window) = env::var("AGENT_ONLINE_WINDOW_SECONDS") {
            if let Ok(parsed) = window.parse() {
                config.liveness.agent_online_window_seconds = parsed;
            }
        }
        if let Ok(window) = env::var("AGENT_RECENT_WINDOW_SECONDS") {
            if let Ok(parsed) = window.parse() {
                config.liveness.agent_recent_window_seconds = parsed;
            }
        }
        if let Ok(stale) = env::var("SERVICE_STALE_SECONDS") {
            if let Ok(parsed) = stale.parse() {
                config.liveness.service_stale_seconds = parsed;
            }
        }
        if let Ok(cap) = env::var("WAITER_CAP_PER_PROJECT") {
            if let Ok(parsed) = cap.parse() {
                config.dispatcher.waiter_cap_per_project = parsed;
            }
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            config.logging.level = level;
        } else if let Ok(level) = env::var("RUST_LOG") {
            config.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            config.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
    }

    /// Resolved SQLite database URL, falling back to a per-project default
    /// under the current directory when none is configured.
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => "sqlite://./coordinator.sqlite".to_string(),
        }
    }

    pub fn server_address(&self) -> String {
        format!("0.0.0.0:{}", self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(anyhow::anyhow!(
                    "invalid log level: {other}. must be one of: trace, debug, info, warn, error"
                ));
            }
        }
        if self.database.connection == DbConnection::Mysql {
            return Err(anyhow::anyhow!(
                "DB_CONNECTION=mysql is declared but not implemented in this build; only sqlite ships"
            ));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port cannot be 0"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("database max_connections must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_and_validate() {
        let config = Config::from_env().expect("default config loads");
        assert_eq!(config.server.port, 6969);
        assert_eq!(config.dispatcher.wait_seconds, 180);
        assert_eq!(config.liveness.service_stale_seconds, 90);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn database_url_falls_back_to_default() {
        let config = Config::from_env().unwrap();
        assert!(config.database_url().starts_with("sqlite://"));
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let mut config = Config::from_env().unwrap();
        config.logging.level = "noisy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn mysql_connection_is_declared_but_unimplemented() {
        let mut config = Config::from_env().unwrap();
        config.database.connection = DbConnection::Mysql;
        assert!(config.validate().is_err());
    }
}
