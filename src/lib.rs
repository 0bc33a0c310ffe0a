//! Report clustering engine for wildlife damage reports.
//!
//! Decides whether incoming sighting reports belong to an existing "event"
//! (a group of reports describing the same animal incident) based on animal
//! type, time proximity and geographic proximity. Two modes share the rules:
//! - online: one newly registered report, see [`OnlineClusteringService`]
//! - bulk: a whole imported batch, see [`BulkImportPipeline`]
//!
//! Persistence and the geospatial distance check are reached only through the
//! ports in `repository`; `postgres` implements them with sqlx and PostGIS.
//!
//! This crate follows the Explicit Module Boundary Pattern (EMBP): modules are
//! private and everything callers need is re-exported from here.

mod animal_type;
mod bulk_import;
mod clustering;
mod config;
mod import_job;
mod models;
mod postgres;
mod registration;
mod repository;
mod schema;
mod validation;

pub mod routes;

pub use animal_type::AnimalType;
pub use bulk_import::BulkImportPipeline;
pub use clustering::{build_clusters, Cluster, OnlineClusteringService};
pub use config::{load_from_env, Config};
pub use import_job::{cancel_bulk_action, CancelOutcome, HttpRowSource, ImportJob, RowSource};
pub use models::{
    BulkAction, BulkActionId, BulkActionStatus, BulkActionUpdate, BulkImportProgress,
    BulkImportResult, ClusteringConfig, ClusteringResult, EventId, ImportPhase, InsertedReport,
    NewReport, RawReportRow, ReportId, RowError,
};
pub use postgres::PgStore;
pub use registration::{Registration, ReportRegistration};
pub use repository::{
    BulkActionRepository, EventClusteringRepository, NoProgress, ProgressReporter,
    ReportRepository, SpatialOracle, SystemSettingRepository,
};
pub use schema::create_schema;
pub use validation::{row_number, RowValidator};
