//! # Schema Migrations
//!
//! The schema ships inside the binary. `migrations/sqlite/` at the workspace
//! root holds numbered SQL files that sqlx embeds at compile time and applies
//! in order, recording each in `_sqlx_migrations`.
//!
//! ```text
//!   001_initial_schema.sql   products, invoices
//!   002_...                  (next change goes here, never edit 001)
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Embedded versus applied migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    /// Every migration shipped with this build has been applied.
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }

    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Counts applied migrations. A database that was never migrated has no
/// bookkeeping table and reports zero.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
    })
}
