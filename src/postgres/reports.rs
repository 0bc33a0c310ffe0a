use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::{AnimalType, InsertedReport, NewReport, ReportId, ReportRepository};

// ---

#[derive(sqlx::FromRow)]
struct InsertedRow {
    // ---
    id: Uuid,
    animal_type: String,
    latitude: f64,
    longitude: f64,
    has_only_date: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<InsertedRow> for InsertedReport {
    type Error = anyhow::Error;

    fn try_from(row: InsertedRow) -> Result<Self> {
        // ---
        let animal_type = AnimalType::from_code(&row.animal_type).ok_or_else(|| {
            anyhow!("Unknown animal type '{}' on report {}", row.animal_type, row.id)
        })?;

        Ok(InsertedReport {
            id: row.id,
            animal_type,
            latitude: row.latitude,
            longitude: row.longitude,
            has_only_date: row.has_only_date,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ReportRepository for PgStore {
    async fn create_many(&self, reports: &[NewReport]) -> Result<Vec<InsertedReport>> {
        // ---
        if reports.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = reports.iter().map(|_| Uuid::new_v4()).collect();
        let animal_types: Vec<String> = reports
            .iter()
            .map(|r| r.animal_type.code().to_string())
            .collect();
        let latitudes: Vec<f64> = reports.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<f64> = reports.iter().map(|r| r.longitude).collect();
        let addresses: Vec<String> = reports.iter().map(|r| r.address.clone()).collect();
        let phone_numbers: Vec<Option<String>> =
            reports.iter().map(|r| r.phone_number.clone()).collect();
        let descriptions: Vec<Option<String>> =
            reports.iter().map(|r| r.description.clone()).collect();
        let image_urls: Vec<Option<String>> =
            reports.iter().map(|r| r.image_url.clone()).collect();
        let has_only_date: Vec<bool> = reports.iter().map(|r| r.has_only_date).collect();
        let created_at: Vec<DateTime<Utc>> = reports.iter().map(|r| r.created_at).collect();

        let rows: Vec<InsertedRow> = sqlx::query_as(
            r#"
            INSERT INTO reports (
                id, animal_type, latitude, longitude, address,
                phone_number, description, image_url, has_only_date, created_at
            )
            SELECT * FROM UNNEST(
                $1::uuid[], $2::text[], $3::float8[], $4::float8[], $5::text[],
                $6::text[], $7::text[], $8::text[], $9::bool[], $10::timestamptz[]
            )
            RETURNING id, animal_type, latitude, longitude, has_only_date, created_at
            "#,
        )
        .bind(&ids)
        .bind(&animal_types)
        .bind(&latitudes)
        .bind(&longitudes)
        .bind(&addresses)
        .bind(&phone_numbers)
        .bind(&descriptions)
        .bind(&image_urls)
        .bind(&has_only_date)
        .bind(&created_at)
        .fetch_all(&self.pool)
        .await
        .context("Bulk report insert failed")?;

        tracing::debug!("Inserted {} reports", rows.len());
        rows.into_iter().map(InsertedReport::try_from).collect()
    }

    async fn update_locations(&self, ids: &[ReportId]) -> Result<()> {
        // ---
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE reports
            SET location = ST_SetSRID(ST_MakePoint(longitude, latitude), 4326)
            WHERE id = ANY($1)
              AND location IS NULL
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .context("Failed to set report locations")?;

        Ok(())
    }
}
