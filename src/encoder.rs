//! Report encoding
//!
//! This module wraps a batch outcome into a [`TourReport`] envelope with
//! producer metadata and batch totals.

use crate::error::TourError;
use crate::pipeline::BatchOutcome;
use crate::types::{BonusPoints, ReportProducer, ReportSummary, TourReport};
use crate::{PRODUCER_NAME, TOURS_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for tour reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the report for a processed batch
    pub fn encode(&self, outcome: &BatchOutcome, bonus_points: Vec<BonusPoints>) -> TourReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: TOURS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let summary = ReportSummary {
            users: outcome.users,
            tours: outcome.tours.len(),
            work_tours: outcome.tours.iter().filter(|t| t.is_work_tour).count(),
            total_points: outcome.tours.iter().map(|t| t.points).sum(),
            rejected_users: outcome.rejected.len(),
            invalid_records: outcome.invalid_records.len(),
        };

        TourReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            computed_at_utc: Utc::now().to_rfc3339(),
            summary,
            tours: outcome.tours.clone(),
            bonus_points,
            rejected: outcome.rejected.clone(),
            invalid_records: outcome.invalid_records.clone(),
        }
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json(
        &self,
        outcome: &BatchOutcome,
        bonus_points: Vec<BonusPoints>,
    ) -> Result<String, TourError> {
        let report = self.encode(outcome, bonus_points);
        serde_json::to_string_pretty(&report).map_err(TourError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvalidRecord, RejectedUser, Tour, TourType};
    use pretty_assertions::assert_eq;

    fn tour(user_id: &str, tour_type: TourType, points: f64) -> Tour {
        Tour {
            user_id: user_id.to_string(),
            tour_id: 1,
            tour_type,
            total_distance_km: 3.0,
            modes_used: vec![],
            stop_types: vec![],
            leg_count: 1,
            started_at: None,
            ended_at: None,
            is_work_tour: tour_type.is_work_tour(),
            points,
            legs: vec![],
        }
    }

    #[test]
    fn test_encode_summary() {
        let outcome = BatchOutcome {
            tours: vec![
                tour("a", TourType::HomeWork, 1.25),
                tour("a", TourType::Other, 0.0),
                tour("b", TourType::WorkHome, 0.5),
            ],
            rejected: vec![RejectedUser {
                user_id: "c".to_string(),
                error: "No home/work profile for user c".to_string(),
            }],
            users: 3,
            invalid_records: vec![InvalidRecord {
                index: 7,
                error: "Leg 7 has no user id".to_string(),
            }],
        };

        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&outcome, vec![]);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(
            report.summary,
            ReportSummary {
                users: 3,
                tours: 3,
                work_tours: 2,
                total_points: 1.75,
                rejected_users: 1,
                invalid_records: 1,
            }
        );
    }

    #[test]
    fn test_encode_to_json_contains_fields() {
        let outcome = BatchOutcome {
            tours: vec![tour("a", TourType::HomeWork, 1.0)],
            users: 1,
            ..Default::default()
        };

        let json = ReportEncoder::new().encode_to_json(&outcome, vec![]).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["producer"]["name"], PRODUCER_NAME);
        assert_eq!(payload["tours"][0]["tour_type"], "Home-Work");
        assert_eq!(payload["tours"][0]["is_work_tour"], true);
        assert!(payload["bonus_points"].as_array().unwrap().is_empty());
        assert!(payload["producer"]["instance_id"].as_str().unwrap().len() > 10);
    }
}
