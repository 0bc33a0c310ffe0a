//! Background bulk import tracked through a bulk action record.
//!
//! The job fetches the already-split rows from the action's file URL, runs
//! the bulk pipeline and mirrors every progress checkpoint into the action.
//! An operator cancels by moving the action out of `processing`; the job
//! notices at its next checkpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use anyhow::{anyhow, Context, Result};

use crate::{
    BulkAction, BulkActionId, BulkActionRepository, BulkActionStatus, BulkActionUpdate,
    BulkImportPipeline, BulkImportProgress, BulkImportResult, ProgressReporter, RawReportRow,
};

// ---

/// Where a job gets its rows from.
#[async_trait]
pub trait RowSource: Send + Sync {
    // ---
    async fn fetch_rows(&self, file_url: &str) -> Result<Vec<RawReportRow>>;
}

/// Downloads a JSON array of rows over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRowSource {
    // ---
    client: reqwest::Client,
}

impl HttpRowSource {
    // ---
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpRowSource { client })
    }
}

#[async_trait]
impl RowSource for HttpRowSource {
    async fn fetch_rows(&self, file_url: &str) -> Result<Vec<RawReportRow>> {
        // ---
        tracing::debug!("Fetching import rows from: {}", file_url);

        let response = self
            .client
            .get(file_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch import file '{}'", file_url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch import file '{}': {}",
                file_url,
                response.status()
            ));
        }

        let rows: Vec<RawReportRow> = response
            .json()
            .await
            .with_context(|| format!("Import file '{}' is not a JSON row array", file_url))?;

        tracing::debug!("Fetched {} rows from {}", rows.len(), file_url);
        Ok(rows)
    }
}

/// Writes each snapshot into the bulk action and keeps going only while the
/// action is still `processing`.
struct BulkActionProgress<'a> {
    // ---
    actions: &'a dyn BulkActionRepository,
    id: BulkActionId,
}

#[async_trait]
impl ProgressReporter for BulkActionProgress<'_> {
    async fn report(&mut self, progress: &BulkImportProgress) -> Result<bool> {
        // ---
        let updated = self
            .actions
            .update_status(self.id, BulkActionUpdate::progress(progress)?)
            .await?;
        Ok(updated.status == BulkActionStatus::Processing)
    }
}

pub struct ImportJob<'a> {
    // ---
    actions: &'a dyn BulkActionRepository,
    source: &'a dyn RowSource,
    pipeline: BulkImportPipeline<'a>,
}

impl<'a> ImportJob<'a> {
    // ---
    pub fn new(
        actions: &'a dyn BulkActionRepository,
        source: &'a dyn RowSource,
        pipeline: BulkImportPipeline<'a>,
    ) -> Self {
        ImportJob {
            actions,
            source,
            pipeline,
        }
    }

    /// Run the import for bulk action `id` to completion.
    ///
    /// Never returns an error: failures end up in the action as `failed`,
    /// unless it was already cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, id: BulkActionId) {
        // ---
        let completed = self.execute(id).await.and_then(|result| {
            info!(
                events_created = result.events_created,
                import_error = result.import_error,
                "bulk import job finished"
            );
            BulkActionUpdate::completed(&result)
        });

        let update = completed.unwrap_or_else(|e| {
            error!("Bulk import job failed: {:#}", e);
            BulkActionUpdate::failed(format!("{e:#}"))
        });

        if let Err(e) = self.finish(id, update).await {
            error!("Failed to record bulk import outcome: {:#}", e);
        }
    }

    async fn execute(&self, id: BulkActionId) -> Result<BulkImportResult> {
        // ---
        self.actions
            .update_status(id, BulkActionUpdate::status(BulkActionStatus::Processing))
            .await?;

        let action = self
            .actions
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("Bulk action not found: {}", id))?;

        let rows = self.source.fetch_rows(&action.file_url).await?;

        let mut progress = BulkActionProgress {
            actions: self.actions,
            id,
        };
        self.pipeline.execute(&rows, &mut progress).await
    }

    /// Apply a terminal update only if nobody cancelled the action meanwhile.
    async fn finish(&self, id: BulkActionId, update: BulkActionUpdate) -> Result<()> {
        // ---
        match self.actions.find_by_id(id).await? {
            Some(current) if current.status == BulkActionStatus::Processing => {
                self.actions.update_status(id, update).await?;
            }
            Some(current) => {
                warn!(
                    status = current.status.as_str(),
                    "bulk action no longer processing, leaving as is"
                );
            }
            None => warn!("bulk action disappeared before completion"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(BulkAction),
    NotFound,
    /// The action already finished; carries its status.
    NotActive(BulkActionStatus),
}

/// Cancel a pending or processing bulk action by marking it failed.
pub async fn cancel_bulk_action(
    actions: &dyn BulkActionRepository,
    id: BulkActionId,
) -> Result<CancelOutcome> {
    // ---
    let Some(action) = actions.find_by_id(id).await? else {
        return Ok(CancelOutcome::NotFound);
    };

    if !action.status.is_active() {
        return Ok(CancelOutcome::NotActive(action.status));
    }

    let cancelled = actions
        .update_status(id, BulkActionUpdate::failed("cancelled by user"))
        .await?;
    info!(%id, "bulk action cancelled");
    Ok(CancelOutcome::Cancelled(cancelled))
}
