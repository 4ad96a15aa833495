//! Raw trip records
//!
//! One row of the trip export: coordinates as `"(lat, lon)"` strings, the mode
//! as a label → probability blob and free-form timestamps.

use crate::config::TourConfig;
use crate::distance::haversine;
use crate::error::TourError;
use crate::types::{ModeStandard, TripLeg};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Raw label used when the mode blob cannot be read
pub const UNKNOWN_RAW_MODE: &str = "unknown";

/// Trip record as exported by the tracking app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrip {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    /// `"(lat, lon)"`
    #[serde(default)]
    pub start_coord: String,
    /// `"(lat, lon)"`
    #[serde(default)]
    pub last_coord: String,
    /// Mode probabilities, e.g. `{'walking': 0.8, 'in_vehicle': 0.2}`
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<String>,
}

impl RawTrip {
    /// Convert to a [`TripLeg`]. Unparseable timestamps become `None`; bad
    /// coordinates and empty user ids are errors.
    pub fn to_leg(&self, index: usize, config: &TourConfig) -> Result<TripLeg, TourError> {
        if self.user_id.trim().is_empty() {
            return Err(TourError::MissingUserId { index });
        }

        let (start_lat, start_lon) = parse_coord(&self.start_coord).ok_or_else(|| {
            TourError::ParseError(format!(
                "record {index}: invalid start_coord {:?}",
                self.start_coord
            ))
        })?;
        let (end_lat, end_lon) = parse_coord(&self.last_coord).ok_or_else(|| {
            TourError::ParseError(format!(
                "record {index}: invalid last_coord {:?}",
                self.last_coord
            ))
        })?;

        let raw_mode = dominant_mode(&self.mode).unwrap_or_else(|| {
            warn!("record {index}: unreadable mode {:?}", self.mode);
            UNKNOWN_RAW_MODE.to_string()
        });
        let mode_standard = config.standardize_mode(&raw_mode);
        if mode_standard == ModeStandard::Unknown {
            warn!("record {index}: no standard mode for {raw_mode:?}");
        }

        Ok(TripLeg {
            user_id: self.user_id.trim().to_string(),
            start_time: self.start_time.as_deref().and_then(parse_timestamp),
            end_time: self.end_time.as_deref().and_then(parse_timestamp),
            start_lat,
            start_lon,
            end_lat,
            end_lon,
            mode_standard,
            distance_km: haversine(start_lat, start_lon, end_lat, end_lon),
        })
    }

    /// Check the record for problems without converting it
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingUserId);
        }
        for (field, value) in [("start_coord", &self.start_coord), ("last_coord", &self.last_coord)] {
            if parse_coord(value).is_none() {
                return Err(ValidationError::InvalidCoordinate {
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        }
        if dominant_mode(&self.mode).is_none() {
            return Err(ValidationError::InvalidMode(self.mode.clone()));
        }

        let start = self.start_time.as_deref().map(|s| (s, parse_timestamp(s)));
        let end = self.end_time.as_deref().map(|s| (s, parse_timestamp(s)));
        for (field, parsed) in [("startTime", start), ("endTime", end)] {
            match parsed {
                None => return Err(ValidationError::MissingTimestamp(field.to_string())),
                Some((raw, None)) => {
                    return Err(ValidationError::InvalidTimestamp {
                        field: field.to_string(),
                        value: raw.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        if let (Some((_, Some(start))), Some((_, Some(end)))) = (start, end) {
            if end < start {
                return Err(ValidationError::EndBeforeStart);
            }
        }

        Ok(())
    }
}

/// Problems found in a single raw trip record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing userId")]
    MissingUserId,

    #[error("Invalid coordinate in {field}: {value:?}")]
    InvalidCoordinate { field: String, value: String },

    #[error("Unreadable mode probabilities: {0:?}")]
    InvalidMode(String),

    #[error("Missing {0}")]
    MissingTimestamp(String),

    #[error("Invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp { field: String, value: String },

    #[error("endTime is before startTime")]
    EndBeforeStart,
}

/// Parse `"(lat, lon)"` (parentheses optional)
pub fn parse_coord(raw: &str) -> Option<(f64, f64)> {
    let trimmed = raw.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = trimmed.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat, lon))
}

/// Label with the highest probability in a mode blob.
///
/// The blob is a JSON object that may use single quotes. Ties keep the label
/// that sorts first.
pub fn dominant_mode(blob: &str) -> Option<String> {
    let normalized = blob.replace('\'', "\"");
    let modes: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(normalized.trim()).ok()?;

    let mut best: Option<(&String, f64)> = None;
    for (label, value) in &modes {
        let Some(probability) = value.as_f64() else {
            continue;
        };
        match best {
            Some((_, top)) if probability <= top => {}
            _ => best = Some((label, probability)),
        }
    }

    best.map(|(label, _)| label.clone())
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> RawTrip {
        RawTrip {
            user_id: "user_1".to_string(),
            start_coord: "(38.015, 23.785)".to_string(),
            last_coord: "(38.03, 23.83)".to_string(),
            mode: "{'walking': 0.1, 'on_bicycle': 0.85, 'in_vehicle': 0.05}".to_string(),
            start_time: Some("2024-01-15 07:30:00".to_string()),
            end_time: Some("2024-01-15T07:55:00Z".to_string()),
        }
    }

    #[test]
    fn test_parse_coord() {
        assert_eq!(parse_coord("(38.015, 23.785)"), Some((38.015, 23.785)));
        assert_eq!(parse_coord("38.015,23.785"), Some((38.015, 23.785)));
        assert_eq!(parse_coord("(38.015)"), None);
        assert_eq!(parse_coord("(a, b)"), None);
        assert_eq!(parse_coord("(1, 2, 3)"), None);
    }

    #[test]
    fn test_dominant_mode() {
        assert_eq!(
            dominant_mode("{'walking': 0.2, 'on_bicycle': 0.7}"),
            Some("on_bicycle".to_string())
        );
        assert_eq!(
            dominant_mode(r#"{"in_vehicle": 0.9}"#),
            Some("in_vehicle".to_string())
        );
        assert_eq!(dominant_mode("not a blob"), None);
        assert_eq!(dominant_mode("{}"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15 07:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T07:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T09:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 07:30"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_to_leg() {
        let config = TourConfig::default();
        let leg = sample().to_leg(0, &config).unwrap();

        assert_eq!(leg.user_id, "user_1");
        assert_eq!(leg.mode_standard, ModeStandard::Cycling);
        assert_eq!(
            leg.start_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap())
        );
        let expected = haversine(38.015, 23.785, 38.03, 23.83);
        assert!((leg.distance_km - expected).abs() < 1e-12);
    }

    #[test]
    fn test_to_leg_keeps_unknown_modes_and_bad_times() {
        let config = TourConfig::default();
        let mut trip = sample();
        trip.mode = "{'hoverboard': 1.0}".to_string();
        trip.start_time = Some("garbage".to_string());

        let leg = trip.to_leg(3, &config).unwrap();
        assert_eq!(leg.mode_standard, ModeStandard::Unknown);
        assert_eq!(leg.start_time, None);
    }

    #[test]
    fn test_to_leg_rejects_missing_user() {
        let config = TourConfig::default();
        let mut trip = sample();
        trip.user_id = "  ".to_string();

        assert!(matches!(
            trip.to_leg(7, &config),
            Err(TourError::MissingUserId { index: 7 })
        ));
    }

    #[test]
    fn test_validate() {
        assert_eq!(sample().validate(), Ok(()));

        let mut trip = sample();
        trip.last_coord = "(38.03)".to_string();
        assert!(matches!(
            trip.validate(),
            Err(ValidationError::InvalidCoordinate { .. })
        ));

        let mut trip = sample();
        trip.end_time = Some("2024-01-15 07:00:00".to_string());
        assert_eq!(trip.validate(), Err(ValidationError::EndBeforeStart));

        let mut trip = sample();
        trip.start_time = None;
        assert_eq!(
            trip.validate(),
            Err(ValidationError::MissingTimestamp("startTime".to_string()))
        );
    }
}
