//! Trip record adapters
//!
//! This module provides adapters that parse raw trip exports (JSON, NDJSON,
//! CSV) and map them to [`TripLeg`]s grouped per user.

mod csv_trips;
mod json_trips;
mod raw_trip;

pub use csv_trips::CsvTripAdapter;
pub use json_trips::{JsonTripAdapter, NdjsonTripAdapter};
pub use raw_trip::{
    dominant_mode, parse_coord, parse_timestamp, RawTrip, ValidationError, UNKNOWN_RAW_MODE,
};

use crate::config::TourConfig;
use crate::error::TourError;
use crate::types::{InvalidRecord, TripLeg, UserProfile};
use log::warn;
use std::collections::{HashMap, HashSet};

/// Trait for trip record adapters
pub trait TripRecordAdapter {
    /// Parse raw input into trip records, in input order
    fn parse(&self, input: &str) -> Result<Vec<RawTrip>, TourError>;
}

/// One user's legs in timeline order
pub type UserLegs = (String, Vec<TripLeg>);

/// Result of validating one record
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub user_id: Option<String>,
    pub result: Option<ValidationError>,
}

/// Raw records converted to legs, with conversion failures kept apart
#[derive(Debug, Default)]
pub struct ConvertedTrips {
    /// Legs of every user whose records all converted, in input order
    pub legs: Vec<TripLeg>,
    /// First conversion error of each user with a malformed record, in input
    /// order. None of these users' legs are in `legs`.
    pub failed_users: Vec<(String, TourError)>,
    /// Records that name no user
    pub invalid_records: Vec<InvalidRecord>,
}

/// Convert raw trips to legs one record at a time. A malformed record fails
/// only its own user.
pub fn to_legs(trips: &[RawTrip], config: &TourConfig) -> ConvertedTrips {
    let mut converted = ConvertedTrips::default();

    for (index, trip) in trips.iter().enumerate() {
        match trip.to_leg(index, config) {
            Ok(leg) => converted.legs.push(leg),
            Err(e) => {
                let user_id = trip.user_id.trim();
                if user_id.is_empty() {
                    warn!("skipping record {index}: {e}");
                    converted.invalid_records.push(InvalidRecord {
                        index,
                        error: e.to_string(),
                    });
                } else if !converted.failed_users.iter().any(|(u, _)| u == user_id) {
                    converted.failed_users.push((user_id.to_string(), e));
                }
            }
        }
    }

    let failed: HashSet<&str> = converted
        .failed_users
        .iter()
        .map(|(user_id, _)| user_id.as_str())
        .collect();
    converted
        .legs
        .retain(|leg| !failed.contains(leg.user_id.as_str()));

    converted
}

/// Validate a batch of records, returning only the failures
pub fn validate_records(trips: &[RawTrip]) -> Vec<ValidationResult> {
    trips
        .iter()
        .enumerate()
        .map(|(idx, trip)| ValidationResult {
            index: idx,
            user_id: Some(trip.user_id.clone()).filter(|id| !id.trim().is_empty()),
            result: trip.validate().err(),
        })
        .filter(|r| r.result.is_some())
        .collect()
}

/// Group legs per user in order of first appearance, then sort each user's
/// legs by start time. The sort is stable so ties keep input order; legs
/// without a start time go last.
pub fn group_by_user(legs: Vec<TripLeg>) -> Vec<UserLegs> {
    let mut order: Vec<String> = Vec::new();
    let mut by_user: HashMap<String, Vec<TripLeg>> = HashMap::new();

    for leg in legs {
        if !by_user.contains_key(&leg.user_id) {
            order.push(leg.user_id.clone());
        }
        by_user.entry(leg.user_id.clone()).or_default().push(leg);
    }

    order
        .into_iter()
        .filter_map(|user_id| {
            let mut user_legs = by_user.remove(&user_id)?;
            user_legs.sort_by_key(|leg| (leg.start_time.is_none(), leg.start_time));
            Some((user_id, user_legs))
        })
        .collect()
}

/// Parse a JSON object of `user_id → {home_lat, home_lon, work_lat, work_lon}`
pub fn parse_profiles(json: &str) -> Result<HashMap<String, UserProfile>, TourError> {
    let profiles: HashMap<String, UserProfile> = serde_json::from_str(json)?;
    Ok(profiles)
}
