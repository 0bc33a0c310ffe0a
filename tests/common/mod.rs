//! In-memory implementation of every port, shared by the integration tests.
//!
//! The default oracle answers with a real great-circle distance between the
//! stored report and the given center, so scenarios read like real batches.
//! Every port call is recorded for assertions on ordering and laziness.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use event_clustering::{
    AnimalType, BulkAction, BulkActionId, BulkActionRepository, BulkActionStatus,
    BulkActionUpdate, BulkImportProgress, ClusteringConfig, EventClusteringRepository, EventId,
    InsertedReport, NewReport, ProgressReporter, RawReportRow, ReportId, ReportRepository,
    RowSource, SpatialOracle, SystemSettingRepository,
};

// ---

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateMany(usize),
    UpdateLocations(Vec<ReportId>),
    IsWithinDistance(ReportId),
    FindMatchingEvent(ReportId),
    GetPendingReportIds,
    FindMatchingPendingReport(Vec<ReportId>),
    CreateEvent(ReportId, ReportId),
    AddToEvent(EventId, ReportId),
    FindLatestSetting,
}

type Oracle = Box<dyn Fn(&InsertedReport, f64, f64, f64) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    reports: Vec<InsertedReport>,
    events: Vec<(EventId, Vec<ReportId>)>,
    calls: Vec<Call>,
    matching_event: Option<EventId>,
    pending_ids: Vec<ReportId>,
    matching_pending: Option<ReportId>,
    actions: HashMap<BulkActionId, BulkAction>,
    progress_updates: usize,
}

pub struct FakeStore {
    // ---
    state: Mutex<State>,
    oracle: Oracle,
    setting: Option<ClusteringConfig>,
    /// Return inserted rows in reverse input order.
    reverse_inserts: bool,
    /// Name of the port method that should fail.
    fail_on: Option<&'static str>,
    /// Mark the bulk action cancelled on this progress update (1-based).
    cancel_on_progress_update: Option<usize>,
}

impl Default for FakeStore {
    fn default() -> Self {
        FakeStore {
            state: Mutex::new(State::default()),
            oracle: Box::new(|report, lng, lat, meters| {
                haversine_meters(report.latitude, report.longitude, lat, lng) <= meters
            }),
            setting: Some(ClusteringConfig {
                distance_meters: 500.0,
                time_window_minutes: 60,
            }),
            reverse_inserts: false,
            fail_on: None,
            cancel_on_progress_update: None,
        }
    }
}

impl FakeStore {
    // ---
    pub fn with_oracle<F>(mut self, oracle: F) -> Self
    where
        F: Fn(&InsertedReport, f64, f64, f64) -> bool + Send + Sync + 'static,
    {
        self.oracle = Box::new(oracle);
        self
    }

    pub fn with_setting(mut self, setting: Option<ClusteringConfig>) -> Self {
        self.setting = setting;
        self
    }

    pub fn reversing_inserts(mut self) -> Self {
        self.reverse_inserts = true;
        self
    }

    pub fn failing_on(mut self, method: &'static str) -> Self {
        self.fail_on = Some(method);
        self
    }

    pub fn cancelling_on_progress_update(mut self, n: usize) -> Self {
        self.cancel_on_progress_update = Some(n);
        self
    }

    /// Script the online matching primitives.
    pub fn script_online(
        &self,
        matching_event: Option<EventId>,
        pending_ids: Vec<ReportId>,
        matching_pending: Option<ReportId>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.matching_event = matching_event;
        state.pending_ids = pending_ids;
        state.matching_pending = matching_pending;
    }

    pub fn insert_action(&self, file_url: &str) -> BulkActionId {
        // ---
        let now = Utc::now();
        let action = BulkAction {
            id: Uuid::new_v4(),
            action_key: "report_import".to_string(),
            status: BulkActionStatus::Pending,
            file_url: file_url.to_string(),
            total_count: 0,
            success_count: 0,
            error_count: 0,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        let id = action.id;
        self.state.lock().unwrap().actions.insert(id, action);
        id
    }

    pub fn action(&self, id: BulkActionId) -> BulkAction {
        self.state.lock().unwrap().actions[&id].clone()
    }

    pub fn set_action_status(&self, id: BulkActionId, status: BulkActionStatus) {
        if let Some(action) = self.state.lock().unwrap().actions.get_mut(&id) {
            action.status = status;
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn reports(&self) -> Vec<InsertedReport> {
        self.state.lock().unwrap().reports.clone()
    }

    /// Event memberships, members in the order they were added.
    pub fn events(&self) -> Vec<Vec<ReportId>> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .map(|(_, members)| members.clone())
            .collect()
    }

    pub fn oracle_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::IsWithinDistance(_)))
            .count()
    }

    /// Id of the stored report created at `created_at`.
    pub fn id_at(&self, created_at: DateTime<Utc>) -> ReportId {
        self.reports()
            .iter()
            .find(|r| r.created_at == created_at)
            .map(|r| r.id)
            .expect("no report at that time")
    }

    fn record(&self, call: Call, method: &'static str) -> Result<()> {
        self.state.lock().unwrap().calls.push(call);
        if self.fail_on == Some(method) {
            return Err(anyhow!("{method} failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportRepository for FakeStore {
    async fn create_many(&self, reports: &[NewReport]) -> Result<Vec<InsertedReport>> {
        // ---
        self.record(Call::CreateMany(reports.len()), "create_many")?;

        let mut inserted: Vec<InsertedReport> = reports
            .iter()
            .map(|r| InsertedReport {
                id: Uuid::new_v4(),
                animal_type: r.animal_type,
                latitude: r.latitude,
                longitude: r.longitude,
                has_only_date: r.has_only_date,
                created_at: r.created_at,
            })
            .collect();
        if self.reverse_inserts {
            inserted.reverse();
        }
        self.state
            .lock()
            .unwrap()
            .reports
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update_locations(&self, ids: &[ReportId]) -> Result<()> {
        self.record(Call::UpdateLocations(ids.to_vec()), "update_locations")
    }
}

#[async_trait]
impl SpatialOracle for FakeStore {
    async fn is_within_distance(
        &self,
        report_id: ReportId,
        center_lng: f64,
        center_lat: f64,
        meters: f64,
    ) -> Result<bool> {
        // ---
        self.record(Call::IsWithinDistance(report_id), "is_within_distance")?;
        let report = self
            .reports()
            .into_iter()
            .find(|r| r.id == report_id)
            .ok_or_else(|| anyhow!("unknown report {report_id}"))?;
        Ok((self.oracle)(&report, center_lng, center_lat, meters))
    }
}

#[async_trait]
impl EventClusteringRepository for FakeStore {
    async fn find_matching_event(
        &self,
        report_id: ReportId,
        _animal_type: AnimalType,
        _created_at: DateTime<Utc>,
        _config: &ClusteringConfig,
    ) -> Result<Option<EventId>> {
        self.record(Call::FindMatchingEvent(report_id), "find_matching_event")?;
        Ok(self.state.lock().unwrap().matching_event)
    }

    async fn get_pending_report_ids(
        &self,
        _created_at: DateTime<Utc>,
        _config: &ClusteringConfig,
    ) -> Result<Vec<ReportId>> {
        self.record(Call::GetPendingReportIds, "get_pending_report_ids")?;
        Ok(self.state.lock().unwrap().pending_ids.clone())
    }

    async fn find_matching_pending_report(
        &self,
        _report_id: ReportId,
        _animal_type: AnimalType,
        _created_at: DateTime<Utc>,
        pending_ids: &[ReportId],
        _config: &ClusteringConfig,
    ) -> Result<Option<ReportId>> {
        self.record(
            Call::FindMatchingPendingReport(pending_ids.to_vec()),
            "find_matching_pending_report",
        )?;
        Ok(self.state.lock().unwrap().matching_pending)
    }

    async fn create_event_with_reports(
        &self,
        first: ReportId,
        second: ReportId,
    ) -> Result<EventId> {
        // ---
        self.record(Call::CreateEvent(first, second), "create_event_with_reports")?;
        let event_id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .events
            .push((event_id, vec![first, second]));
        Ok(event_id)
    }

    async fn add_report_to_event(&self, event_id: EventId, report_id: ReportId) -> Result<()> {
        // ---
        self.record(Call::AddToEvent(event_id, report_id), "add_report_to_event")?;
        let mut state = self.state.lock().unwrap();
        if let Some((_, members)) = state.events.iter_mut().find(|(id, _)| *id == event_id) {
            members.push(report_id);
        }
        Ok(())
    }
}

#[async_trait]
impl SystemSettingRepository for FakeStore {
    async fn find_latest(&self) -> Result<Option<ClusteringConfig>> {
        self.record(Call::FindLatestSetting, "find_latest")?;
        Ok(self.setting)
    }
}

#[async_trait]
impl BulkActionRepository for FakeStore {
    async fn create(&self, _action_key: &str, file_url: &str) -> Result<BulkAction> {
        let id = self.insert_action(file_url);
        Ok(self.action(id))
    }

    async fn find_by_id(&self, id: BulkActionId) -> Result<Option<BulkAction>> {
        Ok(self.state.lock().unwrap().actions.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: BulkActionId,
        update: BulkActionUpdate,
    ) -> Result<BulkAction> {
        // ---
        let mut state = self.state.lock().unwrap();
        let is_progress = update.status.is_none();
        if is_progress {
            state.progress_updates += 1;
        }
        let cancel_now =
            is_progress && self.cancel_on_progress_update == Some(state.progress_updates);

        let action = state
            .actions
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Bulk action not found: {id}"))?;
        if let Some(status) = update.status {
            action.status = status;
        }
        if let Some(v) = update.total_count {
            action.total_count = v;
        }
        if let Some(v) = update.success_count {
            action.success_count = v;
        }
        if let Some(v) = update.error_count {
            action.error_count = v;
        }
        if update.result.is_some() {
            action.result = update.result;
        }
        if update.error_message.is_some() {
            action.error_message = update.error_message;
        }
        if cancel_now {
            action.status = BulkActionStatus::Failed;
            action.error_message = Some("cancelled by user".to_string());
        }
        Ok(action.clone())
    }
}

/// Row source serving a fixed batch, or failing.
pub struct StaticRows(pub Option<Vec<RawReportRow>>);

#[async_trait]
impl RowSource for StaticRows {
    async fn fetch_rows(&self, file_url: &str) -> Result<Vec<RawReportRow>> {
        self.0
            .clone()
            .ok_or_else(|| anyhow!("Failed to fetch import file '{file_url}'"))
    }
}

/// Progress reporter recording snapshots and answering from a script.
///
/// Answers `true` once the script runs out.
#[derive(Default)]
pub struct RecordingProgress {
    pub seen: Vec<BulkImportProgress>,
    pub answers: Vec<bool>,
}

impl RecordingProgress {
    pub fn stopping_at(call: usize) -> Self {
        let mut answers = vec![true; call];
        answers[call - 1] = false;
        RecordingProgress {
            seen: Vec::new(),
            answers,
        }
    }
}

#[async_trait]
impl ProgressReporter for RecordingProgress {
    async fn report(&mut self, progress: &BulkImportProgress) -> Result<bool> {
        let answer = self.answers.get(self.seen.len()).copied().unwrap_or(true);
        self.seen.push(*progress);
        Ok(answer)
    }
}

/// 2024-01-15 at the given local (JST) time, as UTC.
pub fn jst(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap() - chrono::Duration::hours(9)
}

pub fn row(animal: &str, time: &str, lat: f64, lng: f64) -> RawReportRow {
    // ---
    RawReportRow {
        animal_type: animal.to_string(),
        sighting_date: "2024-01-15".to_string(),
        sighting_time: time.to_string(),
        latitude: lat.to_string(),
        longitude: lng.to_string(),
        address: "長野県長野市".to_string(),
        ..Default::default()
    }
}

pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    // ---
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lng2 - lng1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
