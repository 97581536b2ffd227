//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied in version order when a [`Database`](crate::Database) connects.
//!
//! ```text
//! migrations/sqlite/
//!   001_initial_schema.sql   accounts, products, version columns,
//!                            products.seller_id → accounts ON DELETE RESTRICT
//! ```
//!
//! Applied versions are recorded by sqlx in `_sqlx_migrations`. Released
//! files are never edited; schema changes go in a new numbered file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration that has not run yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let pending = pending_migrations(pool).await?;
    if pending.is_empty() {
        debug!("Schema up to date");
        return Ok(());
    }

    info!(versions = ?pending, "Applying migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Versions of embedded migrations not yet applied to `pool`.
pub async fn pending_migrations(pool: &SqlitePool) -> DbResult<Vec<i64>> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if tracked == 0 {
        Vec::new()
    } else {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?
    };

    Ok(MIGRATOR
        .iter()
        .map(|m| m.version)
        .filter(|version| !applied.contains(version))
        .collect())
}
