//! Per-row validation for bulk imports.
//!
//! Each row is checked on its own, so a bad row never prevents the rest of a
//! batch from being imported. Checks run in a fixed order and the first
//! failure is the one reported.

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Url;

use crate::{AnimalType, NewReport, RawReportRow, RowError};

// ---

/// Row numbers are reported as spreadsheet rows: the header is row 1.
const HEADER_ROWS: usize = 1;

/// Turns raw import rows into creation-ready reports.
#[derive(Debug, Clone, Copy)]
pub struct RowValidator {
    // ---
    /// Offset applied to sighting dates and times, which carry none.
    offset: FixedOffset,
}

impl RowValidator {
    // ---
    pub fn new(offset: FixedOffset) -> Self {
        RowValidator { offset }
    }

    /// Validate a whole batch, keeping input order for both outputs.
    pub fn validate_rows(&self, rows: &[RawReportRow]) -> (Vec<NewReport>, Vec<RowError>) {
        // ---
        let mut valid = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match self.validate_row(row) {
                Ok(report) => valid.push(report),
                Err(message) => errors.push(RowError {
                    row: row_number(index),
                    message,
                }),
            }
        }

        (valid, errors)
    }

    /// Validate one row. The error is the user-facing message.
    pub fn validate_row(&self, row: &RawReportRow) -> Result<NewReport, String> {
        // ---
        if row.animal_type.trim().is_empty() {
            return Err("animal type is required".to_string());
        }
        let animal_type = AnimalType::resolve(&row.animal_type)
            .ok_or_else(|| format!("unknown animal type: {}", row.animal_type))?;

        if row.sighting_date.trim().is_empty() {
            return Err("sighting date is required".to_string());
        }
        let created_at = self
            .parse_sighting(&row.sighting_date, &row.sighting_time)
            .ok_or_else(|| {
                format!(
                    "invalid sighting date/time: {} {}",
                    row.sighting_date, row.sighting_time
                )
            })?;

        let latitude = parse_coordinate(&row.latitude)
            .ok_or_else(|| "latitude is required and must be a number".to_string())?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude out of range: {}", row.latitude));
        }

        let longitude = parse_coordinate(&row.longitude)
            .ok_or_else(|| "longitude is required and must be a number".to_string())?;
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude out of range: {}", row.longitude));
        }

        let address = row.address.trim();
        if address.is_empty() {
            return Err("address is required".to_string());
        }

        let image_url = non_empty(&row.image_url);
        if let Some(url) = &image_url {
            match Url::parse(url) {
                Ok(parsed) if parsed.scheme() == "https" => {}
                Ok(_) => return Err(format!("image URL must use https: {}", row.image_url)),
                Err(_) => return Err(format!("invalid image URL: {}", row.image_url)),
            }
        }

        Ok(NewReport {
            animal_type,
            latitude,
            longitude,
            address: address.to_string(),
            phone_number: non_empty(&row.phone_number),
            description: non_empty(&row.description),
            image_url,
            has_only_date: row.sighting_time.trim().is_empty(),
            created_at,
        })
    }

    /// Combine date and optional time into an instant in the configured offset.
    ///
    /// A time of `HH` or `HH:MM` is padded to `HH:MM:SS`; no time means
    /// midnight.
    fn parse_sighting(&self, date: &str, time: &str) -> Option<DateTime<Utc>> {
        // ---
        let time = time.trim();
        let time = match time.matches(':').count() {
            _ if time.is_empty() => "00:00:00".to_string(),
            0 => format!("{time}:00:00"),
            1 => format!("{time}:00"),
            _ => time.to_string(),
        };
        let stamp = format!("{}T{}{}", date.trim(), time, self.offset);

        DateTime::parse_from_rfc3339(&stamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Spreadsheet row number for the data row at `index`.
pub fn row_number(index: usize) -> usize {
    index + 1 + HEADER_ROWS
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    // ---
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
