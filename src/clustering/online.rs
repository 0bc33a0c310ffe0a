use chrono::{DateTime, Utc};
use tracing::debug;

use anyhow::Result;

use crate::{AnimalType, ClusteringConfig, ClusteringResult, EventClusteringRepository, ReportId};

// ---

/// Clusters one newly created report against persisted state.
///
/// Each call ends in exactly one of three outcomes and performs at most one
/// mutation:
/// 1. an existing event matches: the report is added to it
/// 2. a pending report matches: both seed a new event
/// 3. nothing matches: the report stays pending
///
/// Repository failures are returned as-is; nothing is retried.
pub struct OnlineClusteringService<'a> {
    // ---
    repository: &'a dyn EventClusteringRepository,
    config: ClusteringConfig,
}

impl<'a> OnlineClusteringService<'a> {
    // ---
    pub fn new(repository: &'a dyn EventClusteringRepository, config: ClusteringConfig) -> Self {
        OnlineClusteringService { repository, config }
    }

    /// `animal_type` and `created_at` must be the persisted values of `report_id`.
    pub async fn process_new_report(
        &self,
        report_id: ReportId,
        animal_type: AnimalType,
        created_at: DateTime<Utc>,
    ) -> Result<ClusteringResult> {
        // ---
        let matching_event = self
            .repository
            .find_matching_event(report_id, animal_type, created_at, &self.config)
            .await?;

        if let Some(event_id) = matching_event {
            self.repository.add_report_to_event(event_id, report_id).await?;
            debug!(%report_id, %event_id, "report added to existing event");
            return Ok(ClusteringResult::AddedToEvent { event_id });
        }

        let pending_ids = self
            .repository
            .get_pending_report_ids(created_at, &self.config)
            .await?;

        let matching_pending = self
            .repository
            .find_matching_pending_report(
                report_id,
                animal_type,
                created_at,
                &pending_ids,
                &self.config,
            )
            .await?;

        if let Some(matched_report_id) = matching_pending {
            let event_id = self
                .repository
                .create_event_with_reports(matched_report_id, report_id)
                .await?;
            debug!(%report_id, %matched_report_id, %event_id, "new event created");
            return Ok(ClusteringResult::CreatedEvent {
                event_id,
                matched_report_id,
            });
        }

        debug!(%report_id, pending = pending_ids.len(), "no match, report left pending");
        Ok(ClusteringResult::Pending)
    }
}
