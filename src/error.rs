//! Error types for tour segmentation and scoring

use thiserror::Error;

/// Errors that can occur while turning trips into scored tours
#[derive(Debug, Error)]
pub enum TourError {
    #[error("Failed to parse trip record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Leg {index} has no user id")]
    MissingUserId { index: usize },

    #[error("No home/work profile for user {0}")]
    MissingProfile(String),

    #[error("Legs for user {user_id} are not sorted by start time (leg {index})")]
    UnsortedLegs { user_id: String, index: usize },

    #[error("Leg {index} belongs to user {found}, expected {expected}")]
    ForeignLeg {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
