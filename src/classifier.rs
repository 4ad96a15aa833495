//! Stop classification
//!
//! Labels the end point of each leg as Home, Work or Intermediate by its
//! distance to the user's fixed home and work locations.

use crate::distance::haversine;
use crate::types::{ClassifiedLeg, StopType, TripLeg, UserProfile};

/// Classifier for leg end points
pub struct StopClassifier {
    home_threshold_km: f64,
    work_threshold_km: f64,
}

impl StopClassifier {
    pub fn new(home_threshold_km: f64, work_threshold_km: f64) -> Self {
        Self {
            home_threshold_km,
            work_threshold_km,
        }
    }

    /// Home wins over Work when the end point is within both radii
    pub fn stop_type(&self, distance_from_home_end: f64, distance_from_work_end: f64) -> StopType {
        if distance_from_home_end < self.home_threshold_km {
            StopType::Home
        } else if distance_from_work_end < self.work_threshold_km {
            StopType::Work
        } else {
            StopType::Intermediate
        }
    }

    /// Compute home/work distances for both ends and classify the end point
    pub fn classify(&self, leg: TripLeg, profile: &UserProfile) -> ClassifiedLeg {
        let distance_from_home_start =
            haversine(leg.start_lat, leg.start_lon, profile.home_lat, profile.home_lon);
        let distance_from_home_end =
            haversine(leg.end_lat, leg.end_lon, profile.home_lat, profile.home_lon);
        let distance_from_work_start =
            haversine(leg.start_lat, leg.start_lon, profile.work_lat, profile.work_lon);
        let distance_from_work_end =
            haversine(leg.end_lat, leg.end_lon, profile.work_lat, profile.work_lon);

        let stop_type = self.stop_type(distance_from_home_end, distance_from_work_end);

        ClassifiedLeg {
            leg,
            distance_from_home_start,
            distance_from_home_end,
            distance_from_work_start,
            distance_from_work_end,
            stop_type,
        }
    }

    pub fn classify_all(&self, legs: Vec<TripLeg>, profile: &UserProfile) -> Vec<ClassifiedLeg> {
        legs.into_iter()
            .map(|leg| self.classify(leg, profile))
            .collect()
    }
}
