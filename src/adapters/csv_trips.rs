//! CSV trip adapter
//!
//! Expects a header row naming at least `userId`, `start_coord`, `last_coord`,
//! `mode`, `startTime` and `endTime`. Other columns are ignored.

use crate::error::TourError;
use csv::{ReaderBuilder, Trim};

use super::{RawTrip, TripRecordAdapter};

/// Adapter for CSV trip exports
pub struct CsvTripAdapter;

impl TripRecordAdapter for CsvTripAdapter {
    fn parse(&self, input: &str) -> Result<Vec<RawTrip>, TourError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(input.as_bytes());

        let mut trips = Vec::new();
        for record in reader.deserialize::<RawTrip>() {
            trips.push(record?);
        }
        Ok(trips)
    }
}
