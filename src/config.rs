use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Whether quote sources and the swap adapter run against simulated venues
/// or the live integrations. Selected once at startup, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Simulated,
    Live,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Simulated
    }
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Live => "live",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(Self::Simulated),
            "live" => Ok(Self::Live),
            _ => Err("invalid execution mode; expected simulated|live"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Simulated vs live venue integrations
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Maximum delivery attempts per order job
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Per-source quote timeout in milliseconds
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    /// Swap submission timeout in milliseconds
    #[serde(default = "default_swap_timeout_ms")]
    pub swap_timeout_ms: u64,
    /// Delay between swap submission and confirmation in milliseconds
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_quote_timeout_ms() -> u64 {
    2_000
}

fn default_swap_timeout_ms() -> u64 {
    10_000
}

fn default_settlement_delay_ms() -> u64 {
    1_000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Simulated,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            quote_timeout_ms: default_quote_timeout_ms(),
            swap_timeout_ms: default_swap_timeout_ms(),
            settlement_delay_ms: default_settlement_delay_ms(),
        }
    }
}

impl ExecutionConfig {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }

    pub fn swap_timeout(&self) -> Duration {
        Duration::from_millis(self.swap_timeout_ms)
    }

    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent worker tasks
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Idle polling interval for due jobs in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_concurrency() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Target admission rate for order executions
    #[serde(default = "default_orders_per_minute")]
    pub orders_per_minute: u32,
}

fn default_orders_per_minute() -> u32 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            orders_per_minute: default_orders_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Bind address for the WebSocket relay and health endpoint
    #[serde(default = "default_relay_bind")]
    pub bind: String,
}

fn default_relay_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_relay_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log filter directive (overridden by RUST_LOG)
    #[serde(default)]
    pub level: Option<String>,
    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

/// Default slippage tolerance applied when intake does not provide one
pub fn default_slippage_tolerance() -> Decimal {
    rust_decimal_macros::dec!(0.01)
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("DEXFLOW_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (DEXFLOW_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("DEXFLOW")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_mode_parses_aliases() {
        assert_eq!(
            "simulated".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Simulated
        );
        assert_eq!("sim".parse::<ExecutionMode>().unwrap(), ExecutionMode::Simulated);
        assert_eq!("LIVE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert!("paper".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn execution_defaults_match_documented_values() {
        let config = ExecutionConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base_ms, 500);
        assert_eq!(config.settlement_delay_ms, 1_000);
        assert_eq!(config.mode, ExecutionMode::Simulated);
    }
}
