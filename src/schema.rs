//! Database schema management for the event clustering service.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `reports`, `events`, `event_reports`, `system_settings` and
/// `bulk_actions`, plus the PostGIS extension used for distance checks. Safe to
/// call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis;")
        .execute(&mut *tx)
        .await?;

    // Reports; `location` is filled separately by `update_locations`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id             UUID PRIMARY KEY,
            animal_type    TEXT             NOT NULL,
            latitude       DOUBLE PRECISION NOT NULL,
            longitude      DOUBLE PRECISION NOT NULL,
            location       geometry(Point, 4326),
            address        TEXT             NOT NULL,
            phone_number   TEXT,
            description    TEXT,
            image_url      TEXT,
            has_only_date  BOOLEAN          NOT NULL DEFAULT FALSE,
            created_at     TIMESTAMPTZ      NOT NULL,
            deleted_at     TIMESTAMPTZ
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id                        UUID PRIMARY KEY,
            representative_report_id  UUID             NOT NULL REFERENCES reports (id),
            center_latitude           DOUBLE PRECISION NOT NULL,
            center_longitude          DOUBLE PRECISION NOT NULL,
            center_location           geometry(Point, 4326),
            created_at                TIMESTAMPTZ      NOT NULL,
            updated_at                TIMESTAMPTZ      NOT NULL,
            deleted_at                TIMESTAMPTZ
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event_reports (
            event_id   UUID NOT NULL REFERENCES events (id),
            report_id  UUID NOT NULL REFERENCES reports (id),
            PRIMARY KEY (event_id, report_id)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            id                              SERIAL PRIMARY KEY,
            event_clustering_radius_meters  DOUBLE PRECISION NOT NULL,
            event_clustering_time_minutes   INTEGER          NOT NULL,
            created_at                      TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bulk_actions (
            id             UUID PRIMARY KEY,
            action_key     TEXT        NOT NULL,
            status         TEXT        NOT NULL,
            file_url       TEXT        NOT NULL,
            total_count    BIGINT      NOT NULL DEFAULT 0,
            success_count  BIGINT      NOT NULL DEFAULT 0,
            error_count    BIGINT      NOT NULL DEFAULT 0,
            result         JSONB,
            error_message  TEXT,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Indexes for the clustering queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reports_created_at
            ON reports (created_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reports_location
            ON reports USING GIST (location);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_event_reports_report_id
            ON event_reports (report_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
