//! Data models shared by the clustering engine, its adapters and the routes.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AnimalType;

// ---

pub type ReportId = Uuid;
pub type EventId = Uuid;
pub type BulkActionId = Uuid;

/// Thresholds deciding whether two reports describe the same incident.
///
/// Loaded once per clustering run and never changed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringConfig {
    // ---
    /// Maximum separation in meters.
    pub distance_meters: f64,

    /// Maximum separation in time, in minutes.
    pub time_window_minutes: i64,
}

impl ClusteringConfig {
    // ---
    /// Longest configurable time window: one leap year.
    pub const MAX_TIME_WINDOW_MINUTES: i64 = 366 * 24 * 60;

    /// Fails when the window does not fit a `Duration`.
    pub fn time_window(&self) -> Result<Duration> {
        Duration::try_minutes(self.time_window_minutes).ok_or_else(|| {
            anyhow!(
                "Clustering time window of {} minutes is out of range",
                self.time_window_minutes
            )
        })
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            distance_meters: 500.0,
            time_window_minutes: 60,
        }
    }
}

/// One already-split import row, before any validation.
///
/// Every field is kept as text exactly as it arrived; empty means missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawReportRow {
    // ---
    pub animal_type: String,
    pub sighting_date: String,
    pub sighting_time: String,
    pub latitude: String,
    pub longitude: String,
    pub address: String,
    pub image_url: String,
    pub description: String,
    pub phone_number: String,
}

/// A validated report ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    // ---
    pub animal_type: AnimalType,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// True when the sighting carried a date but no time of day.
    pub has_only_date: bool,
    pub created_at: DateTime<Utc>,
}

/// What the bulk insert hands back for each stored report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedReport {
    // ---
    pub id: ReportId,
    pub animal_type: AnimalType,
    pub latitude: f64,
    pub longitude: f64,
    pub has_only_date: bool,
    pub created_at: DateTime<Utc>,
}

/// A rejected import row. `row` counts the header as row 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    // ---
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Importing,
    Clustering,
    Done,
}

/// Cumulative counters handed to the progress reporter at each checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportProgress {
    // ---
    pub phase: ImportPhase,
    pub import_total: usize,
    pub import_success: usize,
    pub import_error: usize,
    pub cluster_total: usize,
    pub cluster_done: usize,
}

/// Final outcome of one bulk run, cancelled or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    // ---
    pub phase: ImportPhase,
    pub import_total: usize,
    pub import_success: usize,
    pub import_error: usize,
    pub cluster_total: usize,
    pub cluster_done: usize,
    pub events_created: usize,
    pub errors: Vec<RowError>,
}

impl BulkImportResult {
    // ---
    pub fn from_progress(
        progress: &BulkImportProgress,
        errors: Vec<RowError>,
        events_created: usize,
    ) -> Self {
        // ---
        BulkImportResult {
            phase: ImportPhase::Done,
            import_total: progress.import_total,
            import_success: progress.import_success,
            import_error: progress.import_error,
            cluster_total: progress.cluster_total,
            cluster_done: progress.cluster_done,
            events_created,
            errors,
        }
    }
}

/// Outcome of clustering one newly created report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClusteringResult {
    AddedToEvent {
        event_id: EventId,
    },
    CreatedEvent {
        event_id: EventId,
        matched_report_id: ReportId,
    },
    Pending,
}

/// Lifecycle of a tracked background import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkActionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BulkActionStatus {
    // ---
    pub fn as_str(self) -> &'static str {
        match self {
            BulkActionStatus::Pending => "pending",
            BulkActionStatus::Processing => "processing",
            BulkActionStatus::Completed => "completed",
            BulkActionStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        // ---
        match raw {
            "pending" => Some(BulkActionStatus::Pending),
            "processing" => Some(BulkActionStatus::Processing),
            "completed" => Some(BulkActionStatus::Completed),
            "failed" => Some(BulkActionStatus::Failed),
            _ => None,
        }
    }

    /// Whether an operator may still cancel the action.
    pub fn is_active(self) -> bool {
        matches!(self, BulkActionStatus::Pending | BulkActionStatus::Processing)
    }
}

/// A tracked background import and its latest progress or final result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAction {
    // ---
    pub id: BulkActionId,
    pub action_key: String,
    pub status: BulkActionStatus,
    pub file_url: String,
    pub total_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// Latest `BulkImportProgress` while running, `BulkImportResult` once done.
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a bulk action; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkActionUpdate {
    // ---
    pub status: Option<BulkActionStatus>,
    pub total_count: Option<i64>,
    pub success_count: Option<i64>,
    pub error_count: Option<i64>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl BulkActionUpdate {
    // ---
    pub fn status(status: BulkActionStatus) -> Self {
        BulkActionUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Counters and snapshot for an in-flight progress checkpoint.
    pub fn progress(progress: &BulkImportProgress) -> Result<Self> {
        // ---
        Ok(BulkActionUpdate {
            total_count: Some(progress.import_total as i64),
            success_count: Some(progress.import_success as i64),
            error_count: Some(progress.import_error as i64),
            result: Some(serde_json::to_value(progress)?),
            ..Default::default()
        })
    }

    pub fn completed(result: &BulkImportResult) -> Result<Self> {
        // ---
        Ok(BulkActionUpdate {
            status: Some(BulkActionStatus::Completed),
            total_count: Some(result.import_total as i64),
            success_count: Some(result.import_success as i64),
            error_count: Some(result.import_error as i64),
            result: Some(serde_json::to_value(result)?),
            error_message: None,
        })
    }

    pub fn failed(message: impl Into<String>) -> Self {
        BulkActionUpdate {
            status: Some(BulkActionStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}
