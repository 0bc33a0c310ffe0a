use anyhow::{Context, Result};
use async_trait::async_trait;

use super::PgStore;
use crate::{ClusteringConfig, SystemSettingRepository};

// ---

#[async_trait]
impl SystemSettingRepository for PgStore {
    async fn find_latest(&self) -> Result<Option<ClusteringConfig>> {
        // ---
        let row: Option<(f64, i32)> = sqlx::query_as(
            r#"
            SELECT event_clustering_radius_meters, event_clustering_time_minutes
            FROM system_settings
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("System setting lookup failed")?;

        Ok(row.map(|(distance_meters, time_minutes)| ClusteringConfig {
            distance_meters,
            time_window_minutes: i64::from(time_minutes),
        }))
    }
}
