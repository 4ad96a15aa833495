//! JSON and NDJSON trip adapters

use crate::error::TourError;

use super::{RawTrip, TripRecordAdapter};

/// Adapter for a JSON array of trip records
pub struct JsonTripAdapter;

impl TripRecordAdapter for JsonTripAdapter {
    fn parse(&self, input: &str) -> Result<Vec<RawTrip>, TourError> {
        let trips: Vec<RawTrip> = serde_json::from_str(input)?;
        Ok(trips)
    }
}

/// Adapter for newline-delimited JSON, one trip record per line
pub struct NdjsonTripAdapter;

impl TripRecordAdapter for NdjsonTripAdapter {
    fn parse(&self, input: &str) -> Result<Vec<RawTrip>, TourError> {
        let mut trips = Vec::new();
        for (line_num, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawTrip>(trimmed) {
                Ok(trip) => trips.push(trip),
                Err(e) => {
                    return Err(TourError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(trips)
    }
}
