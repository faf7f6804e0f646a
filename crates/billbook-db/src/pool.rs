//! # Database Handle
//!
//! Opens the SQLite file that holds the catalog and the invoice ledger, and
//! hands out repositories that share one pool and one stock write lock.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::new("billbook.db").pool_size(4)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config) ──► SqlitePool (WAL, foreign keys, busy wait)   │
//! │       │                        + embedded migrations                    │
//! │       │                                                                 │
//! │       ├── products()    catalog reads, add, restock ─┐                  │
//! │       ├── invoices()    ledger reads                  ├─ share WriteLock │
//! │       └── reconciler()  the invoice commit ──────────┘                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers run in parallel on the pool. Anything that changes stock takes
//! the write lock first, so two commits (or a commit and a restock) never
//! read the same stale quantity.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::reconcile::{ReconcileOptions, StockReconciler};
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;

/// In-process lock serialising every stock mutation.
///
/// Stock is decimal TEXT, so each change is a read-modify-write in Rust.
pub type WriteLock = Arc<Mutex<()>>;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new("/srv/billbook/billbook.db")
///     .pool_size(4)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub path: PathBuf,

    /// Pool connections. Default: 5
    pub pool_size: u32,

    /// How long a statement waits on another process's lock before the
    /// write fails as busy. Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long to wait for a free pool connection. Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Apply embedded migrations on open. Default: true
    pub migrate: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            pool_size: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            migrate: true,
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Opens without touching the schema.
    pub fn skip_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    /// A private in-memory database, used by tests.
    ///
    /// One connection only: every connection to `:memory:` is a separate
    /// database.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(MEMORY_PATH),
            pool_size: 1,
            busy_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the catalog and ledger.
///
/// Clones share the pool and the write lock.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.path.display(),
            pool_size = config.pool_size,
            "Opening database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout);

        // The in-memory database lives only as long as its one connection
        if config.is_in_memory() {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", config.path.display(), e)))?;

        let db = Database {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };

        if config.migrate {
            db.run_migrations().await?;
        } else {
            debug!("Skipping migrations");
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Raw pool access for diagnostics and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The catalog.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.write_lock.clone())
    }

    /// The invoice ledger.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// The invoice commit, under this database's write lock.
    pub fn reconciler(&self, options: ReconcileOptions) -> StockReconciler {
        StockReconciler::new(self.pool.clone(), self.write_lock.clone(), options)
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        debug!("Closing database pool");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert!(db.products().list().await.unwrap().is_empty());
        assert!(db.migration_status().await.unwrap().is_current());
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billbook.db");

        let db = Database::new(DbConfig::new(&path).pool_size(2)).await.unwrap();

        assert!(db.health_check().await);
        assert!(path.exists());
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_skip_migrations_leaves_schema_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.db");

        let db = Database::new(DbConfig::new(&path).skip_migrations()).await.unwrap();

        assert!(db.products().list().await.is_err());
        db.run_migrations().await.unwrap();
        assert!(db.products().list().await.unwrap().is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/billbook.db")
            .pool_size(0)
            .busy_timeout(Duration::from_secs(9))
            .skip_migrations();

        assert_eq!(config.pool_size, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(9));
        assert!(!config.migrate);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
