//! # Ledger Configuration
//!
//! Configuration management for the storage layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults          LedgerConfig::default()                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  2. ledger.toml       explicit path, or the platform config directory   │
//! │         │             (e.g. ~/.config/ledger/ledger.toml)               │
//! │         ▼                                                               │
//! │  3. Environment       INVENTORY_DB_PATH, INVENTORY_STOCK_POLICY,        │
//! │         │             INVENTORY_MAX_CONNECTIONS,                        │
//! │         │             INVENTORY_BUSY_TIMEOUT_SECS                       │
//! │         ▼                                                               │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/shop/inventory.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//! run_migrations = true
//!
//! [stock]
//! policy = "strict"   # strict | permissive
//!
//! [identifiers]
//! customer_prefix = "CUS"
//! customer_width = 6
//! invoice_prefix = "INV"
//! invoice_width = 10
//!
//! [reports]
//! default_window_days = 30
//! ```

use inventory_core::{IdentifierFormat, StockPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available on this platform")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the file lock before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "inventory", "ledger")
        .map(|dirs| dirs.data_dir().join("inventory.db"))
        .unwrap_or_else(|| PathBuf::from("inventory.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: true,
        }
    }
}

/// `[stock]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockSettings {
    #[serde(default)]
    pub policy: StockPolicy,
}

/// `[identifiers]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierSettings {
    #[serde(default = "default_customer_prefix")]
    pub customer_prefix: String,
    #[serde(default = "default_customer_width")]
    pub customer_width: usize,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    #[serde(default = "default_invoice_width")]
    pub invoice_width: usize,
}

fn default_customer_prefix() -> String {
    IdentifierFormat::customer().prefix
}
fn default_customer_width() -> usize {
    IdentifierFormat::customer().width
}
fn default_invoice_prefix() -> String {
    IdentifierFormat::invoice().prefix
}
fn default_invoice_width() -> usize {
    IdentifierFormat::invoice().width
}

impl Default for IdentifierSettings {
    fn default() -> Self {
        IdentifierSettings {
            customer_prefix: default_customer_prefix(),
            customer_width: default_customer_width(),
            invoice_prefix: default_invoice_prefix(),
            invoice_width: default_invoice_width(),
        }
    }
}

impl IdentifierSettings {
    pub fn customer_format(&self) -> IdentifierFormat {
        IdentifierFormat::new(self.customer_prefix.clone(), self.customer_width)
    }

    pub fn invoice_format(&self) -> IdentifierFormat {
        IdentifierFormat::new(self.invoice_prefix.clone(), self.invoice_width)
    }
}

/// `[reports]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Trailing window for the stats queries when the caller passes none.
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

fn default_window_days() -> i64 {
    30
}

/// Longest configurable default window, one hundred years.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            default_window_days: default_window_days(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// The subset of configuration the ledger logic itself consults.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub stock_policy: StockPolicy,
    pub customer_format: IdentifierFormat,
    pub invoice_format: IdentifierFormat,
    pub default_window_days: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            stock_policy: StockPolicy::default(),
            customer_format: IdentifierFormat::customer(),
            invoice_format: IdentifierFormat::invoice(),
            default_window_days: default_window_days(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub stock: StockSettings,

    #[serde(default)]
    pub identifiers: IdentifierSettings,

    #[serde(default)]
    pub reports: ReportSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if !(1..=MAX_WINDOW_DAYS).contains(&self.reports.default_window_days) {
            return Err(ConfigError::Invalid(format!(
                "reports.default_window_days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }

        let customer = self.identifiers.customer_format();
        let invoice = self.identifiers.invoice_format();
        customer
            .validate("identifiers.customer")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        invoice
            .validate("identifiers.invoice")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("INVENTORY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(policy) = lookup("INVENTORY_STOCK_POLICY") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding stock policy from environment");
                    self.stock.policy = parsed;
                }
                Err(_) => warn!(policy = %policy, "Unknown stock policy in environment"),
            }
        }

        if let Some(max) = lookup("INVENTORY_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse::<u32>() {
                self.database.max_connections = n;
            }
        }

        if let Some(timeout) = lookup("INVENTORY_BUSY_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.database.busy_timeout_secs = secs;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "inventory", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
            .run_migrations(self.database.run_migrations)
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            stock_policy: self.stock.policy,
            customer_format: self.identifiers.customer_format(),
            invoice_format: self.identifiers.invoice_format(),
            default_window_days: self.reports.default_window_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.stock.policy, StockPolicy::Strict);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.identifiers.customer_format(), IdentifierFormat::customer());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [stock]
            policy = "permissive"

            [identifiers]
            invoice_prefix = "SAL"
            "#,
        )
        .unwrap();

        assert_eq!(config.stock.policy, StockPolicy::Permissive);
        assert_eq!(config.identifiers.invoice_format().format(3), "SAL0000000003");
        assert_eq!(config.identifiers.customer_width, 6);
        assert_eq!(config.reports.default_window_days, 30);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("INVENTORY_DB_PATH", "/tmp/shop.db"),
            ("INVENTORY_STOCK_POLICY", "permissive"),
            ("INVENTORY_MAX_CONNECTIONS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.stock.policy, StockPolicy::Permissive);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.identifiers.customer_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.reports.default_window_days = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.reports.default_window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
        config.reports.default_window_days = 100_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.toml");

        let mut config = LedgerConfig::default();
        config.database.path = dir.path().join("shop.db");
        config.stock.policy = StockPolicy::Permissive;
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("[stock]"));

        let loaded: LedgerConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
    }
}
