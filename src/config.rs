//! Configuration loader for the event clustering service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::{env, time::Duration};

use anyhow::{anyhow, Result};
use chrono::FixedOffset;

use crate::ClusteringConfig;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the HTTP server binds to.
    pub listen_port: u16,

    /// Clustering thresholds used until a system setting is saved.
    pub default_clustering: ClusteringConfig,

    /// Offset applied to imported sighting dates and times.
    pub import_utc_offset: FixedOffset,

    /// Timeout for downloading import files.
    pub import_fetch_timeout: Duration,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `CLUSTER_DISTANCE_METERS` – fallback distance threshold (default: 500)
/// - `CLUSTER_TIME_MINUTES` – fallback time window (default: 60, at most one year)
/// - `IMPORT_UTC_OFFSET` – offset for imported sightings (default: `+09:00`)
/// - `IMPORT_FETCH_TIMEOUT_SECS` – import download timeout (default: 30)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let listen_port = parse_env!("LISTEN_PORT", u16, 8080);
    let distance_meters = parse_env!("CLUSTER_DISTANCE_METERS", f64, 500.0);
    let time_window_minutes = parse_env!("CLUSTER_TIME_MINUTES", i64, 60);
    let import_utc_offset = parse_env!("IMPORT_UTC_OFFSET", FixedOffset, jst()?);
    let fetch_timeout_secs = parse_env!("IMPORT_FETCH_TIMEOUT_SECS", u64, 30);

    Ok(Config {
        db_url,
        db_pool_max,
        listen_port,
        default_clustering: clustering_defaults(distance_meters, time_window_minutes)?,
        import_utc_offset,
        import_fetch_timeout: Duration::from_secs(fetch_timeout_secs),
    })
}

/// Check the fallback clustering thresholds.
fn clustering_defaults(distance_meters: f64, time_window_minutes: i64) -> Result<ClusteringConfig> {
    // ---
    if !(distance_meters.is_finite() && distance_meters > 0.0) {
        return Err(anyhow!("CLUSTER_DISTANCE_METERS must be a positive number"));
    }
    let max_minutes = ClusteringConfig::MAX_TIME_WINDOW_MINUTES;
    if !(1..=max_minutes).contains(&time_window_minutes) {
        return Err(anyhow!(
            "CLUSTER_TIME_MINUTES must be between 1 and {}, got {}",
            max_minutes,
            time_window_minutes
        ));
    }

    Ok(ClusteringConfig {
        distance_meters,
        time_window_minutes,
    })
}

fn jst() -> Result<FixedOffset> {
    FixedOffset::east_opt(9 * 3600).ok_or_else(|| anyhow!("invalid default offset"))
}

/// Mask the password portion of a connection URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL              : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX               : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT               : {}", self.listen_port);
        tracing::info!(
            "  CLUSTER_DISTANCE_METERS   : {}",
            self.default_clustering.distance_meters
        );
        tracing::info!(
            "  CLUSTER_TIME_MINUTES      : {}",
            self.default_clustering.time_window_minutes
        );
        tracing::info!("  IMPORT_UTC_OFFSET         : {}", self.import_utc_offset);
        tracing::info!(
            "  IMPORT_FETCH_TIMEOUT_SECS : {}",
            self.import_fetch_timeout.as_secs()
        );
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_mask_db_url_hides_password() {
        // ---
        assert_eq!(
            mask_db_url("postgres://app:secret@db:5432/reports"),
            "postgres://app:****@db:5432/reports"
        );
    }

    #[test]
    fn test_mask_db_url_without_credentials() {
        // ---
        assert_eq!(mask_db_url("postgres://db/reports"), "postgres://db/reports");
    }

    #[test]
    fn test_default_offset_is_jst() {
        // ---
        assert_eq!(jst().unwrap().to_string(), "+09:00");
        assert_eq!("+09:00".parse::<FixedOffset>().unwrap(), jst().unwrap());
    }

    #[test]
    fn test_clustering_defaults_bounds() {
        // ---
        let config = clustering_defaults(500.0, 60).unwrap();
        assert_eq!(config, ClusteringConfig::default());

        let max = ClusteringConfig::MAX_TIME_WINDOW_MINUTES;
        assert!(clustering_defaults(500.0, max).is_ok());
        assert!(clustering_defaults(500.0, max + 1).is_err());
        assert!(clustering_defaults(500.0, 200_000_000_000_000).is_err());
        assert!(clustering_defaults(500.0, 0).is_err());
        assert!(clustering_defaults(f64::NAN, 60).is_err());
        assert!(clustering_defaults(-1.0, 60).is_err());
    }
}
