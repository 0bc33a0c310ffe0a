//! Single-report registration with best-effort online clustering.

use tracing::{error, info};

use anyhow::{anyhow, Result};

use crate::clustering::OnlineClusteringService;
use crate::{
    ClusteringConfig, ClusteringResult, EventClusteringRepository, InsertedReport, NewReport,
    ReportRepository, SystemSettingRepository,
};

// ---

/// Outcome of registering one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    // ---
    pub report: InsertedReport,
    /// `None` when clustering failed; the report itself is stored regardless.
    pub clustering: Option<ClusteringResult>,
}

pub struct ReportRegistration<'a> {
    // ---
    reports: &'a dyn ReportRepository,
    clustering: &'a dyn EventClusteringRepository,
    settings: &'a dyn SystemSettingRepository,
    fallback_config: ClusteringConfig,
}

impl<'a> ReportRegistration<'a> {
    // ---
    pub fn new(
        reports: &'a dyn ReportRepository,
        clustering: &'a dyn EventClusteringRepository,
        settings: &'a dyn SystemSettingRepository,
        fallback_config: ClusteringConfig,
    ) -> Self {
        // ---
        ReportRegistration {
            reports,
            clustering,
            settings,
            fallback_config,
        }
    }

    /// Store `report`, then try to cluster it.
    ///
    /// Insert failures are returned. Clustering failures are logged and leave
    /// `clustering` empty. Date-only reports are never clustered.
    pub async fn register(&self, report: NewReport) -> Result<Registration> {
        // ---
        let inserted = self
            .reports
            .create_many(std::slice::from_ref(&report))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("report insert returned no row"))?;
        self.reports.update_locations(&[inserted.id]).await?;
        info!(report_id = %inserted.id, animal_type = %inserted.animal_type, "report registered");

        if inserted.has_only_date {
            return Ok(Registration {
                report: inserted,
                clustering: Some(ClusteringResult::Pending),
            });
        }

        let clustering = match self.cluster(&inserted).await {
            Ok(result) => Some(result),
            Err(e) => {
                error!(report_id = %inserted.id, "Event clustering failed: {:#}", e);
                None
            }
        };

        Ok(Registration {
            report: inserted,
            clustering,
        })
    }

    async fn cluster(&self, report: &InsertedReport) -> Result<ClusteringResult> {
        // ---
        let config = self
            .settings
            .find_latest()
            .await?
            .unwrap_or(self.fallback_config);

        OnlineClusteringService::new(self.clustering, config)
            .process_new_report(report.id, report.animal_type, report.created_at)
            .await
    }
}
