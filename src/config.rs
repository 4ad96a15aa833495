//! Pipeline configuration
//!
//! All thresholds and tables have defaults; a JSON config file only needs to
//! name the values it overrides.

use crate::error::TourError;
use crate::scoring::SustainableModes;
use crate::types::ModeStandard;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default proximity radius for Home and Work stops (km)
pub const DEFAULT_STOP_THRESHOLD_KM: f64 = 0.5;

/// Default inactivity gap that always ends a tour (minutes)
pub const DEFAULT_INACTIVITY_GAP_MINUTES: i64 = 60;

/// Weekly commuting bonus tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusRule {
    /// Commuting days needed for the high tier
    pub high_tier_days: u32,
    pub high_tier_points: u32,
    /// Commuting days needed for the low tier
    pub low_tier_days: u32,
    pub low_tier_points: u32,
}

impl Default for BonusRule {
    fn default() -> Self {
        Self {
            high_tier_days: 5,
            high_tier_points: 3,
            low_tier_days: 3,
            low_tier_points: 2,
        }
    }
}

impl BonusRule {
    /// Bonus for a week with `commuting_days` commuting days
    pub fn points_for(&self, commuting_days: u32) -> u32 {
        if commuting_days >= self.high_tier_days {
            self.high_tier_points
        } else if commuting_days >= self.low_tier_days {
            self.low_tier_points
        } else {
            0
        }
    }
}

/// Configuration for classification, segmentation and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// A leg ending closer than this to home is a Home stop (km)
    pub home_threshold_km: f64,
    /// A leg ending closer than this to work is a Work stop (km)
    pub work_threshold_km: f64,
    /// A gap longer than this between legs always starts a new tour
    pub inactivity_gap_minutes: i64,
    /// Points for a fully sustainable tour with weighting factor 1
    pub base_point: f64,
    /// Weighting factors per sustainable mode and distance bucket
    pub sustainable_modes: SustainableModes,
    /// Raw detector label to standardized mode
    pub mode_mapping: BTreeMap<String, ModeStandard>,
    pub bonus: BonusRule,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            home_threshold_km: DEFAULT_STOP_THRESHOLD_KM,
            work_threshold_km: DEFAULT_STOP_THRESHOLD_KM,
            inactivity_gap_minutes: DEFAULT_INACTIVITY_GAP_MINUTES,
            base_point: 1.0,
            sustainable_modes: SustainableModes::default(),
            mode_mapping: default_mode_mapping(),
            bonus: BonusRule::default(),
        }
    }
}

impl TourConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, TourError> {
        let config: TourConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TourError> {
        serde_json::to_string_pretty(self).map_err(TourError::JsonError)
    }

    /// Inactivity gap as a duration. Values past chrono's range saturate.
    pub fn inactivity_gap(&self) -> Duration {
        Duration::try_minutes(self.inactivity_gap_minutes).unwrap_or(Duration::MAX)
    }

    /// Standardize a raw detector label
    pub fn standardize_mode(&self, raw_label: &str) -> ModeStandard {
        self.mode_mapping
            .get(raw_label.trim())
            .copied()
            .unwrap_or(ModeStandard::Unknown)
    }

    pub fn validate(&self) -> Result<(), TourError> {
        if !(self.home_threshold_km.is_finite() && self.home_threshold_km >= 0.0) {
            return Err(TourError::ConfigError(
                "home_threshold_km must be a non-negative number".to_string(),
            ));
        }
        if !(self.work_threshold_km.is_finite() && self.work_threshold_km >= 0.0) {
            return Err(TourError::ConfigError(
                "work_threshold_km must be a non-negative number".to_string(),
            ));
        }
        if self.inactivity_gap_minutes < 0 {
            return Err(TourError::ConfigError(
                "inactivity_gap_minutes must not be negative".to_string(),
            ));
        }
        if Duration::try_minutes(self.inactivity_gap_minutes).is_none() {
            return Err(TourError::ConfigError(
                "inactivity_gap_minutes is out of range".to_string(),
            ));
        }
        if !(self.base_point.is_finite() && self.base_point >= 0.0) {
            return Err(TourError::ConfigError(
                "base_point must be a non-negative number".to_string(),
            ));
        }
        if self.bonus.high_tier_days < self.bonus.low_tier_days {
            return Err(TourError::ConfigError(
                "bonus.high_tier_days must be at least bonus.low_tier_days".to_string(),
            ));
        }
        self.sustainable_modes
            .validate()
            .map_err(TourError::ConfigError)
    }
}

fn default_mode_mapping() -> BTreeMap<String, ModeStandard> {
    [
        ("in_vehicle", ModeStandard::PublicTransport),
        ("bus", ModeStandard::PublicTransport),
        ("intercity_rail", ModeStandard::PublicTransport),
        ("metro", ModeStandard::PublicTransport),
        ("on_bicycle", ModeStandard::Cycling),
        ("walking", ModeStandard::Walking),
        ("running", ModeStandard::Walking),
        ("scooter", ModeStandard::ElectricScooter),
        ("electric_bike", ModeStandard::ElectricBike),
        ("car", ModeStandard::Car),
        ("taxi", ModeStandard::Car),
        ("airplane", ModeStandard::Airplane),
    ]
    .into_iter()
    .map(|(raw, mode)| (raw.to_string(), mode))
    .collect()
}
