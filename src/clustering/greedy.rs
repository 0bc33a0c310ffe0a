use chrono::{DateTime, Utc};
use tracing::debug;

use anyhow::Result;

use crate::{AnimalType, ClusteringConfig, InsertedReport, ReportId, SpatialOracle};

// ---

/// An in-memory candidate group built during a bulk run.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    // ---
    /// Members in the order they were absorbed, which is time order.
    pub report_ids: Vec<ReportId>,
    pub animal_type: AnimalType,
    /// Fixed at the first member's coordinates; never recomputed.
    pub center_lat: f64,
    pub center_lng: f64,
    /// Time of the most recently absorbed member.
    pub latest_time: DateTime<Utc>,
}

impl Cluster {
    // ---
    fn seeded_by(report: &InsertedReport) -> Self {
        Cluster {
            report_ids: vec![report.id],
            animal_type: report.animal_type,
            center_lat: report.latitude,
            center_lng: report.longitude,
            latest_time: report.created_at,
        }
    }

    /// Clusters with two or more members become events.
    pub fn is_event(&self) -> bool {
        self.report_ids.len() >= 2
    }
}

/// Single-pass greedy clustering of a freshly imported batch.
///
/// Date-only reports are dropped, the rest are visited in ascending
/// `created_at` order (ties keep input order). Each report joins the first
/// open cluster, oldest first, that has the same animal type, whose latest
/// member is within the time window, and whose fixed center the oracle
/// confirms is within distance. Otherwise it seeds a new cluster.
///
/// The oracle is only consulted for clusters passing both in-memory filters,
/// one call at a time in scan order.
pub async fn build_clusters<O>(
    reports: &[InsertedReport],
    config: &ClusteringConfig,
    oracle: &O,
) -> Result<Vec<Cluster>>
where
    O: SpatialOracle + ?Sized,
{
    // ---
    let mut candidates: Vec<&InsertedReport> =
        reports.iter().filter(|r| !r.has_only_date).collect();
    candidates.sort_by_key(|r| r.created_at);

    let window = config.time_window()?;
    let mut clusters: Vec<Cluster> = Vec::new();

    for report in candidates {
        let mut absorbed_by = None;

        for (index, cluster) in clusters.iter().enumerate() {
            if cluster.animal_type != report.animal_type {
                continue;
            }
            if (report.created_at - cluster.latest_time).abs() > window {
                continue;
            }
            let nearby = oracle
                .is_within_distance(
                    report.id,
                    cluster.center_lng,
                    cluster.center_lat,
                    config.distance_meters,
                )
                .await?;
            if nearby {
                absorbed_by = Some(index);
                break;
            }
        }

        match absorbed_by {
            Some(index) => {
                let cluster = &mut clusters[index];
                cluster.report_ids.push(report.id);
                cluster.latest_time = report.created_at;
            }
            None => clusters.push(Cluster::seeded_by(report)),
        }
    }

    debug!(
        clusters = clusters.len(),
        events = clusters.iter().filter(|c| c.is_event()).count(),
        "greedy clustering finished"
    );
    Ok(clusters)
}
