use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::{BulkAction, BulkActionId, BulkActionRepository, BulkActionStatus, BulkActionUpdate};

// ---

const COLUMNS: &str = "id, action_key, status, file_url, total_count, success_count, \
                       error_count, result, error_message, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BulkActionRow {
    // ---
    id: Uuid,
    action_key: String,
    status: String,
    file_url: String,
    total_count: i64,
    success_count: i64,
    error_count: i64,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BulkActionRow> for BulkAction {
    type Error = anyhow::Error;

    fn try_from(row: BulkActionRow) -> Result<Self> {
        // ---
        let status = BulkActionStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("Unknown bulk action status '{}' on {}", row.status, row.id))?;

        Ok(BulkAction {
            id: row.id,
            action_key: row.action_key,
            status,
            file_url: row.file_url,
            total_count: row.total_count,
            success_count: row.success_count,
            error_count: row.error_count,
            result: row.result,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BulkActionRepository for PgStore {
    async fn create(&self, action_key: &str, file_url: &str) -> Result<BulkAction> {
        // ---
        let sql = format!(
            "INSERT INTO bulk_actions (id, action_key, status, file_url) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        let row: BulkActionRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(action_key)
            .bind(BulkActionStatus::Pending.as_str())
            .bind(file_url)
            .fetch_one(&self.pool)
            .await
            .context("Failed to create bulk action")?;

        row.try_into()
    }

    async fn find_by_id(&self, id: BulkActionId) -> Result<Option<BulkAction>> {
        // ---
        let sql = format!("SELECT {COLUMNS} FROM bulk_actions WHERE id = $1");
        let row: Option<BulkActionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Bulk action lookup failed")?;

        row.map(BulkAction::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: BulkActionId,
        update: BulkActionUpdate,
    ) -> Result<BulkAction> {
        // ---
        let sql = format!(
            r#"
            UPDATE bulk_actions SET
                status        = COALESCE($2, status),
                total_count   = COALESCE($3, total_count),
                success_count = COALESCE($4, success_count),
                error_count   = COALESCE($5, error_count),
                result        = COALESCE($6, result),
                error_message = COALESCE($7, error_message),
                updated_at    = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        let row: Option<BulkActionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.status.map(BulkActionStatus::as_str))
            .bind(update.total_count)
            .bind(update.success_count)
            .bind(update.error_count)
            .bind(update.result)
            .bind(update.error_message)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update bulk action")?;

        row.ok_or_else(|| anyhow!("Bulk action not found: {}", id))?
            .try_into()
    }
}
