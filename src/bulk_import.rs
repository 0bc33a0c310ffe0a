//! Two-phase bulk import: validate and insert a batch, then cluster it.
//!
//! Phase 1 validates every row independently, bulk-inserts the valid ones in
//! a single call and materializes their spatial index entries. Phase 2 runs
//! the greedy clustering over the inserted reports and turns every cluster of
//! two or more into an event.
//!
//! Progress is reported at fixed checkpoints. A reporter answering "stop"
//! ends the run with a normal `done` result; nothing committed so far is
//! rolled back.

use tracing::{debug, info, warn};

use anyhow::Result;

use crate::clustering::{build_clusters, Cluster};
use crate::{
    BulkImportProgress, BulkImportResult, ClusteringConfig, EventClusteringRepository,
    ImportPhase, ProgressReporter, RawReportRow, ReportId, ReportRepository, RowValidator,
    SystemSettingRepository,
};

// ---

pub struct BulkImportPipeline<'a> {
    // ---
    reports: &'a dyn ReportRepository,
    clustering: &'a dyn EventClusteringRepository,
    settings: &'a dyn SystemSettingRepository,
    validator: RowValidator,
    /// Used when no clustering setting has been saved yet.
    fallback_config: ClusteringConfig,
}

impl<'a> BulkImportPipeline<'a> {
    // ---
    pub fn new(
        reports: &'a dyn ReportRepository,
        clustering: &'a dyn EventClusteringRepository,
        settings: &'a dyn SystemSettingRepository,
        validator: RowValidator,
        fallback_config: ClusteringConfig,
    ) -> Self {
        // ---
        BulkImportPipeline {
            reports,
            clustering,
            settings,
            validator,
            fallback_config,
        }
    }

    /// Run both phases over `rows`.
    ///
    /// Collaborator failures abort the run and are returned; whatever was
    /// inserted or clustered before the failure stays committed.
    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    pub async fn execute(
        &self,
        rows: &[RawReportRow],
        progress: &mut dyn ProgressReporter,
    ) -> Result<BulkImportResult> {
        // ---
        // Phase 1: validate, bulk insert, spatial index
        let (valid, errors) = self.validator.validate_rows(rows);
        info!(valid = valid.len(), invalid = errors.len(), "rows validated");

        let inserted = self.reports.create_many(&valid).await?;
        if !inserted.is_empty() {
            let ids: Vec<ReportId> = inserted.iter().map(|r| r.id).collect();
            self.reports.update_locations(&ids).await?;
        }
        info!(inserted = inserted.len(), "reports inserted");

        let (import_total, import_success, import_error) =
            (rows.len(), inserted.len(), errors.len());
        let snapshot = move |phase: ImportPhase, cluster_total: usize, cluster_done: usize| {
            BulkImportProgress {
                phase,
                import_total,
                import_success,
                import_error,
                cluster_total,
                cluster_done,
            }
        };

        let imported = snapshot(ImportPhase::Importing, inserted.len(), 0);
        if !progress.report(&imported).await? {
            warn!("bulk import cancelled after import phase");
            return Ok(BulkImportResult::from_progress(&imported, errors, 0));
        }

        // Phase 2: cluster, then materialize qualifying clusters
        let config = self.load_config().await?;
        let clusters = build_clusters(&inserted, &config, self.clustering).await?;
        let event_clusters: Vec<&Cluster> = clusters.iter().filter(|c| c.is_event()).collect();
        let cluster_total = event_clusters.len();
        info!(
            clusters = clusters.len(),
            events = cluster_total,
            "clusters built"
        );

        if cluster_total > 0 {
            let started = snapshot(ImportPhase::Clustering, cluster_total, 0);
            if !progress.report(&started).await? {
                warn!("bulk import cancelled before event creation");
                return Ok(BulkImportResult::from_progress(&started, errors, 0));
            }
        }

        let mut events_created = 0;
        for cluster in event_clusters {
            self.materialize(cluster).await?;
            events_created += 1;

            let step = snapshot(ImportPhase::Clustering, cluster_total, events_created);
            if !progress.report(&step).await? {
                warn!(
                    events_created,
                    cluster_total, "bulk import cancelled during event creation"
                );
                return Ok(BulkImportResult::from_progress(&step, errors, events_created));
            }
        }

        // Never report 0/0 as the final ratio.
        let final_total = cluster_total.max(1);
        let finished = snapshot(ImportPhase::Clustering, final_total, final_total);
        progress.report(&finished).await?;

        info!(events_created, "bulk import finished");
        Ok(BulkImportResult::from_progress(&finished, errors, events_created))
    }

    async fn load_config(&self) -> Result<ClusteringConfig> {
        // ---
        let config = self
            .settings
            .find_latest()
            .await?
            .unwrap_or(self.fallback_config);
        debug!(?config, "clustering config loaded");
        Ok(config)
    }

    /// Seed an event with the first two members, then add the rest in order.
    async fn materialize(&self, cluster: &Cluster) -> Result<()> {
        // ---
        let (seed, rest) = cluster.report_ids.split_at(2);
        let event_id = self
            .clustering
            .create_event_with_reports(seed[0], seed[1])
            .await?;
        for report_id in rest {
            self.clustering.add_report_to_event(event_id, *report_id).await?;
        }
        debug!(%event_id, members = cluster.report_ids.len(), "event created");
        Ok(())
    }
}
