//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Database ─────────────┬──► products() / customers() / sales() ...    │
//! │   ├── pool: SqlitePool  │      read-side repositories                   │
//! │   └── settings          ├──► stock()        StockLedger                 │
//! │                         ├──► identifiers()  IdentifierGenerator         │
//! │                         ├──► ledger()       multi-table transactions    │
//! │                         └──► store()        db:query / db:run / db:get  │
//! │                                                                         │
//! │   All handles are cheap clones sharing one pool.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers keep working
//! while a ledger transaction holds the write lock. Writers queue on the
//! busy timeout instead of failing immediately.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::bridge::Store;
use crate::config::{LedgerConfig, LedgerSettings};
use crate::error::{DbError, DbResult};
use crate::identifiers::IdentifierGenerator;
use crate::ledger::Ledger;
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::purchase::PurchaseRepository;
use crate::repository::returns::ReturnRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::supplier::SupplierRepository;
use crate::repository::user::UserRepository;
use crate::stock::StockLedger;

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger file lives and how the pool around it behaves.
///
/// Usually built from `[database]` in `ledger.toml` via
/// [`LedgerConfig::db_config`]; tests use [`DbConfig::in_memory`].
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/shop/inventory.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Pool size. Default 5.
    pub max_connections: u32,

    /// Connections kept open while idle. Default 1.
    pub min_connections: u32,

    /// Upper bound on waiting for a free pooled connection. Default 30 s.
    pub connect_timeout: Duration,

    /// Default 10 min.
    pub idle_timeout: Duration,

    /// How long a writer queues on the file lock before `SQLITE_BUSY`.
    /// Default 5 s.
    pub busy_timeout: Duration,

    /// Apply pending migrations when the pool opens. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private, empty database per call, on a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(":memory:")
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let base = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&self.database_path)
        };

        Ok(base
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and ledger access.
///
/// ## Usage in an IPC handler
/// ```rust,ignore
/// async fn create_sale(db: &Database, request: NewSale) -> Result<SaleReceipt, BridgeError> {
///     Ok(db.ledger().create_sale(&request).await?)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl Database {
    /// Creates a new database connection pool with default ledger settings.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL, NORMAL synchronous, foreign keys, busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        Self::with_settings(config, LedgerSettings::default()).await
    }

    /// Opens the database described by a loaded [`LedgerConfig`].
    pub async fn open(config: &LedgerConfig) -> DbResult<Self> {
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
            }
        }
        Self::with_settings(config.db_config(), config.ledger_settings()).await
    }

    /// Creates the pool with explicit ledger settings.
    pub async fn with_settings(config: DbConfig, settings: LedgerSettings) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            stock_policy = %settings.stock_policy,
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool, settings };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the ledger settings in effect.
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // =========================================================================
    // Handles
    // =========================================================================

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone(), self.settings.default_window_days)
    }

    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new(self.pool.clone(), self.settings.default_window_days)
    }

    pub fn returns(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone(), self.settings.default_window_days)
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Stand-alone stock adjustments under the configured policy.
    pub fn stock(&self) -> StockLedger {
        StockLedger::new(self.pool.clone(), self.settings.stock_policy)
    }

    /// Stand-alone business number generation.
    pub fn identifiers(&self) -> IdentifierGenerator {
        IdentifierGenerator::new(
            self.pool.clone(),
            self.settings.customer_format.clone(),
            self.settings.invoice_format.clone(),
        )
    }

    /// Sale, purchase, return and customer registration transactions.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.pool.clone(), self.settings.clone())
    }

    /// Raw storage primitives for the IPC bridge.
    pub fn store(&self) -> Store {
        Store::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::new(DbConfig::in_memory()).await.unwrap();
        let b = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO suppliers (name, created_at, updated_at) VALUES ('x', '', '')")
            .execute(a.pool())
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(b.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_open_from_ledger_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LedgerConfig::default();
        config.database.path = dir.path().join("data").join("shop.db");

        let db = Database::open(&config).await.unwrap();
        assert!(db.health_check().await);
        assert!(config.database.path.exists());
        db.close().await;
    }
}
