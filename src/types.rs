//! Core types for the tour pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: trip legs, classified legs, segmented legs, tours and the report
//! envelope produced at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized transport mode
///
/// Raw detector labels are mapped onto this closed set by the trip adapters.
/// Labels without a mapping become [`ModeStandard::Unknown`]. Deserialization
/// is strict so a misspelled label in a config file is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModeStandard {
    Car,
    PublicTransport,
    Cycling,
    Walking,
    ElectricScooter,
    ElectricBike,
    Airplane,
    Unknown,
}

impl ModeStandard {
    pub const ALL: [ModeStandard; 8] = [
        ModeStandard::Car,
        ModeStandard::PublicTransport,
        ModeStandard::Cycling,
        ModeStandard::Walking,
        ModeStandard::ElectricScooter,
        ModeStandard::ElectricBike,
        ModeStandard::Airplane,
        ModeStandard::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeStandard::Car => "Car",
            ModeStandard::PublicTransport => "Public Transport",
            ModeStandard::Cycling => "Cycling",
            ModeStandard::Walking => "Walking",
            ModeStandard::ElectricScooter => "Electric Scooter",
            ModeStandard::ElectricBike => "Electric Bike",
            ModeStandard::Airplane => "Airplane",
            ModeStandard::Unknown => "Unknown",
        }
    }

    /// Parse a standardized label
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|mode| mode.as_str() == label)
    }
}

impl TryFrom<String> for ModeStandard {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        ModeStandard::from_label(&label).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|mode| mode.as_str()).collect();
            format!("unrecognized mode {label:?}, expected one of {}", known.join(", "))
        })
    }
}

impl From<ModeStandard> for String {
    fn from(mode: ModeStandard) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ModeStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a leg's end point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopType {
    Home,
    Work,
    Intermediate,
}

impl StopType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopType::Home => "Home",
            StopType::Work => "Work",
            StopType::Intermediate => "Intermediate",
        }
    }
}

/// Tour label derived from the first and last stop of a tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TourType {
    #[serde(rename = "Home-Work")]
    HomeWork,
    #[serde(rename = "Work-Home")]
    WorkHome,
    Other,
}

impl TourType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourType::HomeWork => "Home-Work",
            TourType::WorkHome => "Work-Home",
            TourType::Other => "Other",
        }
    }

    /// Home-Work and Work-Home tours are commutes
    pub fn is_work_tour(&self) -> bool {
        matches!(self, TourType::HomeWork | TourType::WorkHome)
    }
}

/// Fixed home and work coordinates for one user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub home_lat: f64,
    pub home_lon: f64,
    pub work_lat: f64,
    pub work_lon: f64,
}

/// One recorded movement segment, already geocoded and mode-standardized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    /// Owning user
    pub user_id: String,
    /// Leg start (UTC); `None` when the source timestamp was missing or unparseable
    pub start_time: Option<DateTime<Utc>>,
    /// Leg end (UTC); `None` when the source timestamp was missing or unparseable
    pub end_time: Option<DateTime<Utc>>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    /// Standardized transport mode
    pub mode_standard: ModeStandard,
    /// Distance travelled on this leg (km)
    pub distance_km: f64,
}

/// A leg with its end point classified against the user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLeg {
    #[serde(flatten)]
    pub leg: TripLeg,
    pub distance_from_home_start: f64,
    pub distance_from_home_end: f64,
    pub distance_from_work_start: f64,
    pub distance_from_work_end: f64,
    pub stop_type: StopType,
}

/// A classified leg with its tour assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedLeg {
    #[serde(flatten)]
    pub classified: ClassifiedLeg,
    /// 1-based tour id, non-decreasing along the user's timeline
    pub tour_id: u32,
}

impl SegmentedLeg {
    pub fn leg(&self) -> &TripLeg {
        &self.classified.leg
    }

    pub fn stop_type(&self) -> StopType {
        self.classified.stop_type
    }
}

/// Summary of one (user, tour) group of legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub user_id: String,
    pub tour_id: u32,
    pub tour_type: TourType,
    /// Sum of leg distances (km)
    pub total_distance_km: f64,
    /// Distinct modes in first-seen order
    pub modes_used: Vec<ModeStandard>,
    /// Stop type of each leg, in order
    pub stop_types: Vec<StopType>,
    pub leg_count: usize,
    /// Start of the first leg
    pub started_at: Option<DateTime<Utc>>,
    /// End of the last leg
    pub ended_at: Option<DateTime<Utc>>,
    pub is_work_tour: bool,
    /// Sustainability points; 0 for non-work tours
    pub points: f64,
    /// Member legs, in timeline order
    #[serde(skip)]
    pub legs: Vec<SegmentedLeg>,
}

/// Weekly commuting bonus for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPoints {
    pub user_id: String,
    /// ISO week-numbering year
    pub year: i32,
    /// ISO week number
    pub week: u32,
    /// Days in the week with both a scoring Home-Work and Work-Home tour
    pub commuting_days: u32,
    pub bonus_points: u32,
}

/// A user whose batch was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedUser {
    pub user_id: String,
    pub error: String,
}

/// A raw record dropped before grouping because it names no user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRecord {
    /// Position of the record in the input
    pub index: usize,
    pub error: String,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Batch-level totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub users: usize,
    pub tours: usize,
    pub work_tours: usize,
    pub total_points: f64,
    pub rejected_users: usize,
    pub invalid_records: usize,
}

/// Complete scoring report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub summary: ReportSummary,
    pub tours: Vec<Tour>,
    pub bonus_points: Vec<BonusPoints>,
    pub rejected: Vec<RejectedUser>,
    pub invalid_records: Vec<InvalidRecord>,
}
