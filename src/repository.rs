//! Collaborator ports consumed by the clustering engine.
//!
//! The engine only talks to persistence and to the geospatial backend through
//! these traits. `postgres` provides the production implementations; tests
//! provide in-memory ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use anyhow::Result;

use crate::{
    AnimalType, BulkAction, BulkActionId, BulkActionUpdate, BulkImportProgress, ClusteringConfig,
    EventId, InsertedReport, NewReport, ReportId,
};

// ---

/// Answers "is this report within `meters` of that point?".
#[async_trait]
pub trait SpatialOracle: Send + Sync {
    // ---
    async fn is_within_distance(
        &self,
        report_id: ReportId,
        center_lng: f64,
        center_lat: f64,
        meters: f64,
    ) -> Result<bool>;
}

/// Event membership reads and writes used by both clustering modes.
#[async_trait]
pub trait EventClusteringRepository: SpatialOracle {
    // ---
    /// Find an existing event the report should join: same animal type, a
    /// member within the time window and within distance.
    async fn find_matching_event(
        &self,
        report_id: ReportId,
        animal_type: AnimalType,
        created_at: DateTime<Utc>,
        config: &ClusteringConfig,
    ) -> Result<Option<EventId>>;

    /// Reports created within the time window before `created_at` that do not
    /// belong to any event yet.
    async fn get_pending_report_ids(
        &self,
        created_at: DateTime<Utc>,
        config: &ClusteringConfig,
    ) -> Result<Vec<ReportId>>;

    /// Among `pending_ids`, find one matching by animal type and distance.
    async fn find_matching_pending_report(
        &self,
        report_id: ReportId,
        animal_type: AnimalType,
        created_at: DateTime<Utc>,
        pending_ids: &[ReportId],
        config: &ClusteringConfig,
    ) -> Result<Option<ReportId>>;

    /// Atomically create an event seeded with exactly these two reports.
    async fn create_event_with_reports(&self, first: ReportId, second: ReportId)
        -> Result<EventId>;

    async fn add_report_to_event(&self, event_id: EventId, report_id: ReportId) -> Result<()>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    // ---
    /// Insert all reports in one call. Output order is not guaranteed.
    async fn create_many(&self, reports: &[NewReport]) -> Result<Vec<InsertedReport>>;

    /// Materialize spatial index entries so the oracle can answer for `ids`.
    async fn update_locations(&self, ids: &[ReportId]) -> Result<()>;
}

#[async_trait]
pub trait SystemSettingRepository: Send + Sync {
    // ---
    /// Latest clustering thresholds, if any setting has been saved.
    async fn find_latest(&self) -> Result<Option<ClusteringConfig>>;
}

#[async_trait]
pub trait BulkActionRepository: Send + Sync {
    // ---
    async fn create(&self, action_key: &str, file_url: &str) -> Result<BulkAction>;

    async fn find_by_id(&self, id: BulkActionId) -> Result<Option<BulkAction>>;

    /// Apply `update` and return the action as stored afterwards.
    async fn update_status(&self, id: BulkActionId, update: BulkActionUpdate)
        -> Result<BulkAction>;
}

/// Receives progress snapshots during a bulk run.
///
/// Returning `Ok(false)` stops the run at this checkpoint; work already
/// committed stays committed.
#[async_trait]
pub trait ProgressReporter: Send {
    // ---
    async fn report(&mut self, progress: &BulkImportProgress) -> Result<bool>;
}

/// Reporter for callers that do not track progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ProgressReporter for NoProgress {
    async fn report(&mut self, _progress: &BulkImportProgress) -> Result<bool> {
        Ok(true)
    }
}
