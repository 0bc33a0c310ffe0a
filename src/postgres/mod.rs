//! PostgreSQL/PostGIS implementations of the collaborator ports.
//!
//! `PgStore` wraps a pool and implements every repository trait; each sibling
//! module holds the queries for one port (EMBP: siblings stay private).

use anyhow::{Context, Result};
use sqlx::PgPool;

mod bulk_actions;
mod clustering;
mod reports;
mod settings;

// ---

/// All repositories over one connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    // ---
    pool: PgPool,
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Round-trip a trivial query to prove the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        // ---
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
