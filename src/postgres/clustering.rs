use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::{
    AnimalType, ClusteringConfig, EventClusteringRepository, EventId, ReportId, SpatialOracle,
};

// ---

#[derive(sqlx::FromRow)]
struct ReportForEvent {
    // ---
    id: Uuid,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl SpatialOracle for PgStore {
    async fn is_within_distance(
        &self,
        report_id: ReportId,
        center_lng: f64,
        center_lat: f64,
        meters: f64,
    ) -> Result<bool> {
        // ---
        let within: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT ST_DWithin(
                r.location::geography,
                ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography,
                $4
            )
            FROM reports r
            WHERE r.id = $1
              AND r.location IS NOT NULL
            "#,
        )
        .bind(report_id)
        .bind(center_lng)
        .bind(center_lat)
        .bind(meters)
        .fetch_optional(&self.pool)
        .await
        .context("Distance check failed")?;

        Ok(within.unwrap_or(false))
    }
}

#[async_trait]
impl EventClusteringRepository for PgStore {
    /// Nearest live event whose center is within distance, whose latest
    /// member is inside the time window and which holds a report of the same
    /// animal type.
    async fn find_matching_event(
        &self,
        report_id: ReportId,
        animal_type: AnimalType,
        created_at: DateTime<Utc>,
        config: &ClusteringConfig,
    ) -> Result<Option<EventId>> {
        // ---
        let threshold = created_at - config.time_window()?;

        let event_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            WITH report_location AS (
                SELECT location FROM reports WHERE id = $1
            ),
            event_latest_time AS (
                SELECT
                    e.id AS event_id,
                    e.center_location,
                    MAX(r.created_at) AS latest_report_time
                FROM events e
                JOIN event_reports er ON er.event_id = e.id
                JOIN reports r ON r.id = er.report_id
                WHERE e.deleted_at IS NULL
                  AND r.deleted_at IS NULL
                GROUP BY e.id, e.center_location
            )
            SELECT elt.event_id
            FROM event_latest_time elt, report_location rl
            WHERE elt.center_location IS NOT NULL
              AND rl.location IS NOT NULL
              AND ST_DWithin(elt.center_location::geography, rl.location::geography, $2)
              AND elt.latest_report_time >= $3
              AND EXISTS (
                  SELECT 1 FROM event_reports er2
                  JOIN reports r2 ON r2.id = er2.report_id
                  WHERE er2.event_id = elt.event_id
                    AND r2.animal_type = $4
                    AND r2.deleted_at IS NULL
              )
            ORDER BY ST_Distance(elt.center_location::geography, rl.location::geography)
            LIMIT 1
            "#,
        )
        .bind(report_id)
        .bind(config.distance_meters)
        .bind(threshold)
        .bind(animal_type.code())
        .fetch_optional(&self.pool)
        .await
        .context("Matching event lookup failed")?;

        Ok(event_id)
    }

    async fn get_pending_report_ids(
        &self,
        created_at: DateTime<Utc>,
        config: &ClusteringConfig,
    ) -> Result<Vec<ReportId>> {
        // ---
        let cutoff = created_at - config.time_window()?;

        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT r.id
            FROM reports r
            WHERE r.deleted_at IS NULL
              AND r.has_only_date = FALSE
              AND r.created_at >= $1
              AND r.created_at < $2
              AND NOT EXISTS (
                  SELECT 1 FROM event_reports er WHERE er.report_id = r.id
              )
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(cutoff)
        .bind(created_at)
        .fetch_all(&self.pool)
        .await
        .context("Pending report lookup failed")?;

        Ok(ids)
    }

    async fn find_matching_pending_report(
        &self,
        report_id: ReportId,
        animal_type: AnimalType,
        created_at: DateTime<Utc>,
        pending_ids: &[ReportId],
        config: &ClusteringConfig,
    ) -> Result<Option<ReportId>> {
        // ---
        if pending_ids.is_empty() {
            return Ok(None);
        }

        let threshold = created_at - config.time_window()?;

        let matched: Option<Uuid> = sqlx::query_scalar(
            r#"
            WITH current_report AS (
                SELECT location FROM reports WHERE id = $1
            )
            SELECT r.id
            FROM reports r, current_report cr
            WHERE r.id = ANY($2)
              AND r.animal_type = $3
              AND r.deleted_at IS NULL
              AND r.location IS NOT NULL
              AND cr.location IS NOT NULL
              AND ST_DWithin(r.location::geography, cr.location::geography, $4)
              AND r.created_at >= $5
            ORDER BY ST_Distance(r.location::geography, cr.location::geography)
            LIMIT 1
            "#,
        )
        .bind(report_id)
        .bind(pending_ids)
        .bind(animal_type.code())
        .bind(config.distance_meters)
        .bind(threshold)
        .fetch_optional(&self.pool)
        .await
        .context("Matching pending report lookup failed")?;

        Ok(matched)
    }

    /// The older report becomes the event's representative and fixes its
    /// center; the newer one sets `updated_at`.
    async fn create_event_with_reports(
        &self,
        first: ReportId,
        second: ReportId,
    ) -> Result<EventId> {
        // ---
        let mut tx = self.pool.begin().await?;

        let reports: Vec<ReportForEvent> = sqlx::query_as(
            r#"
            SELECT id, latitude, longitude, created_at
            FROM reports
            WHERE id IN ($1, $2) AND location IS NOT NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(first)
        .bind(second)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load reports for new event")?;

        let (Some(oldest), Some(newest)) = (reports.first(), reports.last()) else {
            return Err(anyhow!("Reports {} and {} have no location", first, second));
        };

        let event_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO events (
                id, representative_report_id, center_latitude, center_longitude,
                center_location, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4,
                ST_SetSRID(ST_MakePoint($4, $3), 4326), $5, $6
            )
            "#,
        )
        .bind(event_id)
        .bind(oldest.id)
        .bind(oldest.latitude)
        .bind(oldest.longitude)
        .bind(oldest.created_at)
        .bind(newest.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert event")?;

        sqlx::query("INSERT INTO event_reports (event_id, report_id) VALUES ($1, $2), ($1, $3)")
            .bind(event_id)
            .bind(first)
            .bind(second)
            .execute(&mut *tx)
            .await
            .context("Failed to insert event members")?;

        tx.commit().await?;
        Ok(event_id)
    }

    async fn add_report_to_event(&self, event_id: EventId, report_id: ReportId) -> Result<()> {
        // ---
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO event_reports (event_id, report_id) VALUES ($1, $2)")
            .bind(event_id)
            .bind(report_id)
            .execute(&mut *tx)
            .await
            .context("Failed to add report to event")?;

        sqlx::query(
            r#"
            UPDATE events e
            SET updated_at = r.created_at
            FROM reports r
            WHERE e.id = $1 AND r.id = $2
            "#,
        )
        .bind(event_id)
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .context("Failed to touch event")?;

        tx.commit().await?;
        Ok(())
    }
}
