//! Report clustering engine.
//!
//! Two modes share the same grouping rules (animal type, then time window,
//! then distance):
//! - `online`: one newly created report against persisted events
//! - `greedy`: a whole imported batch, clustered in one time-ordered pass
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): siblings are private
//! and only their public surface is re-exported here.

mod greedy;
mod online;

pub use greedy::{build_clusters, Cluster};
pub use online::OnlineClusteringService;
