use chrono::FixedOffset;
use uuid::Uuid;

use event_clustering::{
    cancel_bulk_action, BulkActionStatus, BulkImportPipeline, CancelOutcome, ClusteringConfig,
    ImportJob, RowValidator,
};

mod common;
use common::{row, FakeStore, StaticRows};

// ---

async fn run_job(store: &FakeStore, source: &StaticRows, id: Uuid) {
    // ---
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    let pipeline = BulkImportPipeline::new(
        store,
        store,
        store,
        RowValidator::new(offset),
        ClusteringConfig::default(),
    );
    ImportJob::new(store, source, pipeline).run(id).await;
}

fn batch() -> Vec<event_clustering::RawReportRow> {
    vec![
        row("サル", "10:00", 36.0, 138.0),
        row("サル", "10:20", 36.0, 138.0),
        row("クマ", "25:00", 36.0, 138.0),
    ]
}

#[tokio::test]
async fn completed_job_records_counts_and_result() {
    // ---
    let store = FakeStore::default();
    let id = store.insert_action("https://files.example.com/reports.json");

    run_job(&store, &StaticRows(Some(batch())), id).await;

    let action = store.action(id);
    assert_eq!(action.status, BulkActionStatus::Completed);
    assert_eq!(
        (action.total_count, action.success_count, action.error_count),
        (3, 2, 1)
    );
    assert_eq!(action.error_message, None);

    let result = action.result.expect("result stored");
    assert_eq!(result["phase"], "done");
    assert_eq!(result["eventsCreated"], 1);
    assert_eq!(result["errors"][0]["row"], 4);
    assert_eq!(store.events().len(), 1);
}

#[tokio::test]
async fn fetch_failure_marks_job_failed() {
    // ---
    let store = FakeStore::default();
    let id = store.insert_action("https://files.example.com/missing.json");

    run_job(&store, &StaticRows(None), id).await;

    let action = store.action(id);
    assert_eq!(action.status, BulkActionStatus::Failed);
    assert!(action
        .error_message
        .unwrap_or_default()
        .contains("Failed to fetch import file"));
    assert!(store.reports().is_empty());
}

#[tokio::test]
async fn pipeline_failure_marks_job_failed() {
    // ---
    let store = FakeStore::default().failing_on("create_event_with_reports");
    let id = store.insert_action("https://files.example.com/reports.json");

    run_job(&store, &StaticRows(Some(batch())), id).await;

    let action = store.action(id);
    assert_eq!(action.status, BulkActionStatus::Failed);
    assert!(action
        .error_message
        .unwrap_or_default()
        .contains("create_event_with_reports"));
}

#[tokio::test]
async fn cancelled_job_stops_and_stays_cancelled() {
    // ---
    let store = FakeStore::default().cancelling_on_progress_update(1);
    let id = store.insert_action("https://files.example.com/reports.json");

    run_job(&store, &StaticRows(Some(batch())), id).await;

    let action = store.action(id);
    assert_eq!(action.status, BulkActionStatus::Failed);
    assert_eq!(action.error_message.as_deref(), Some("cancelled by user"));
    // Import happened, clustering did not.
    assert_eq!(store.reports().len(), 2);
    assert!(store.events().is_empty());
    assert_eq!(store.oracle_calls(), 0);
}

#[tokio::test]
async fn cancel_marks_active_action_failed() {
    // ---
    let store = FakeStore::default();
    let id = store.insert_action("https://files.example.com/reports.json");
    store.set_action_status(id, BulkActionStatus::Processing);

    let outcome = cancel_bulk_action(&store, id).await.unwrap();

    let CancelOutcome::Cancelled(action) = outcome else {
        panic!("expected cancellation, got {outcome:?}");
    };
    assert_eq!(action.status, BulkActionStatus::Failed);
    assert_eq!(action.error_message.as_deref(), Some("cancelled by user"));
}

#[tokio::test]
async fn cancel_rejects_finished_or_unknown_actions() {
    // ---
    let store = FakeStore::default();
    let id = store.insert_action("https://files.example.com/reports.json");
    store.set_action_status(id, BulkActionStatus::Completed);

    assert_eq!(
        cancel_bulk_action(&store, id).await.unwrap(),
        CancelOutcome::NotActive(BulkActionStatus::Completed)
    );
    assert_eq!(
        cancel_bulk_action(&store, Uuid::new_v4()).await.unwrap(),
        CancelOutcome::NotFound
    );
    assert_eq!(store.action(id).status, BulkActionStatus::Completed);
}

#[tokio::test]
async fn oversized_time_window_fails_the_job() {
    // ---
    let store = FakeStore::default().with_setting(Some(ClusteringConfig {
        distance_meters: 500.0,
        time_window_minutes: 200_000_000_000_000,
    }));
    let id = store.insert_action("https://files.example.com/reports.json");

    run_job(&store, &StaticRows(Some(batch())), id).await;

    let action = store.action(id);
    assert_eq!(action.status, BulkActionStatus::Failed);
    assert!(action
        .error_message
        .unwrap_or_default()
        .contains("out of range"));
}
