//! # billbook-db
//!
//! SQLite persistence for the product catalog and the invoice ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apps/billbook: InvoiceService                                          │
//! │       │ evaluated lines + totals                                        │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────── billbook-db ─────────────────────────┐  │
//! │  │                                                                   │  │
//! │  │  Database (pool.rs) ── SqlitePool + WriteLock                     │  │
//! │  │     │                                                             │  │
//! │  │     ├── ProductRepository   catalog, add product, restock         │  │
//! │  │     ├── InvoiceRepository   ledger lookups                        │  │
//! │  │     └── StockReconciler     one transaction:                      │  │
//! │  │                               check stock, decrement, append the  │  │
//! │  │                               invoice record                      │  │
//! │  │                                                                   │  │
//! │  │  migrations/sqlite/*.sql embedded at compile time                 │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  billbook.db (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money and quantities are stored as decimal TEXT and parsed back through
//! `billbook-core`, so nothing passes through a float on the way to disk.
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("billbook.db")).await?;
//! let catalog = db.products().list().await?;
//! let receipt = db
//!     .reconciler(ReconcileOptions::default())
//!     .commit(&lines, &meta, &totals, "INV-001.txt")
//!     .await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod reconcile;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig, WriteLock};
pub use reconcile::{CommitReceipt, ReconcileOptions, StockReconciler};
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
