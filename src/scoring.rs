//! Sustainability scoring
//!
//! Work tours earn points from the share of their distance covered on
//! sustainable modes, weighted per mode by the tour's distance bucket:
//!
//! `points = base_point × Σ(mode_share × weight(mode, bucket)) × sustainable_proportion`

use crate::types::{ModeStandard, Tour};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tour-length bucket used to select a mode's weighting factor.
///
/// Upper bounds are inclusive: exactly 5 km is `0-5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceBucket {
    #[serde(rename = "0-5")]
    UpTo5,
    #[serde(rename = "5-10")]
    UpTo10,
    #[serde(rename = "10-20")]
    UpTo20,
    #[serde(rename = "20+")]
    Over20,
}

impl DistanceBucket {
    pub fn from_distance(distance_km: f64) -> Self {
        if distance_km <= 5.0 {
            DistanceBucket::UpTo5
        } else if distance_km <= 10.0 {
            DistanceBucket::UpTo10
        } else if distance_km <= 20.0 {
            DistanceBucket::UpTo20
        } else {
            DistanceBucket::Over20
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceBucket::UpTo5 => "0-5",
            DistanceBucket::UpTo10 => "5-10",
            DistanceBucket::UpTo20 => "10-20",
            DistanceBucket::Over20 => "20+",
        }
    }
}

/// Weighting factor of one mode for each distance bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketWeights {
    #[serde(rename = "0-5")]
    pub up_to_5: f64,
    #[serde(rename = "5-10")]
    pub up_to_10: f64,
    #[serde(rename = "10-20")]
    pub up_to_20: f64,
    #[serde(rename = "20+")]
    pub over_20: f64,
}

impl BucketWeights {
    pub const fn new(up_to_5: f64, up_to_10: f64, up_to_20: f64, over_20: f64) -> Self {
        Self {
            up_to_5,
            up_to_10,
            up_to_20,
            over_20,
        }
    }

    pub fn factor(&self, bucket: DistanceBucket) -> f64 {
        match bucket {
            DistanceBucket::UpTo5 => self.up_to_5,
            DistanceBucket::UpTo10 => self.up_to_10,
            DistanceBucket::UpTo20 => self.up_to_20,
            DistanceBucket::Over20 => self.over_20,
        }
    }

    fn values(&self) -> [f64; 4] {
        [self.up_to_5, self.up_to_10, self.up_to_20, self.over_20]
    }
}

/// Table of sustainable modes. A mode absent from the table is not sustainable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SustainableModes(BTreeMap<ModeStandard, BucketWeights>);

impl Default for SustainableModes {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            ModeStandard::PublicTransport,
            BucketWeights::new(1.0, 1.2, 1.3, 1.4),
        );
        table.insert(ModeStandard::Cycling, BucketWeights::new(1.0, 1.5, 2.0, 2.5));
        table.insert(ModeStandard::Walking, BucketWeights::new(1.0, 1.5, 2.0, 2.5));
        table.insert(
            ModeStandard::ElectricScooter,
            BucketWeights::new(1.0, 1.2, 1.3, 1.4),
        );
        table.insert(
            ModeStandard::ElectricBike,
            BucketWeights::new(1.0, 1.2, 1.3, 1.4),
        );
        Self(table)
    }
}

impl SustainableModes {
    pub fn new(table: BTreeMap<ModeStandard, BucketWeights>) -> Self {
        Self(table)
    }

    pub fn is_sustainable(&self, mode: ModeStandard) -> bool {
        mode != ModeStandard::Unknown && self.0.contains_key(&mode)
    }

    pub fn weights(&self, mode: ModeStandard) -> Option<&BucketWeights> {
        if mode == ModeStandard::Unknown {
            return None;
        }
        self.0.get(&mode)
    }

    pub fn modes(&self) -> impl Iterator<Item = &ModeStandard> {
        self.0.keys()
    }

    /// Every factor must be a finite, non-negative number
    pub fn validate(&self) -> Result<(), String> {
        if self.0.contains_key(&ModeStandard::Unknown) {
            return Err("Unknown cannot be a sustainable mode".to_string());
        }
        for (mode, weights) in &self.0 {
            if weights.values().iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("weights for {mode} must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

/// Intermediate values of a tour score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub distance_bucket: DistanceBucket,
    pub sustainable_distance_km: f64,
    pub proportion_sustainable: f64,
    pub total_weighted_factor: f64,
    pub points: f64,
}

/// Scores work tours against a sustainable-mode table
pub struct SustainabilityScorer<'a> {
    modes: &'a SustainableModes,
    base_point: f64,
}

impl<'a> SustainabilityScorer<'a> {
    pub fn new(modes: &'a SustainableModes, base_point: f64) -> Self {
        Self { modes, base_point }
    }

    /// Points for a tour; 0 for non-work tours
    pub fn score(&self, tour: &Tour) -> f64 {
        self.breakdown(tour).map(|b| b.points).unwrap_or(0.0)
    }

    /// Set `points` on every tour
    pub fn apply(&self, tours: &mut [Tour]) {
        for tour in tours.iter_mut() {
            tour.points = self.score(tour);
        }
    }

    /// Full score computation. `None` for non-work tours.
    pub fn breakdown(&self, tour: &Tour) -> Option<ScoreBreakdown> {
        if !tour.is_work_tour {
            return None;
        }

        let distance_bucket = DistanceBucket::from_distance(tour.total_distance_km);

        // Per-mode sustainable distance, in first-seen order
        let mut mode_distances: Vec<(ModeStandard, f64)> = Vec::new();
        for segmented in &tour.legs {
            let leg = segmented.leg();
            if !self.modes.is_sustainable(leg.mode_standard) {
                continue;
            }
            match mode_distances
                .iter_mut()
                .find(|(mode, _)| *mode == leg.mode_standard)
            {
                Some((_, distance)) => *distance += leg.distance_km,
                None => mode_distances.push((leg.mode_standard, leg.distance_km)),
            }
        }

        let sustainable_distance_km: f64 = mode_distances.iter().map(|(_, d)| d).sum();

        if sustainable_distance_km <= 0.0 || tour.total_distance_km <= 0.0 {
            return Some(ScoreBreakdown {
                distance_bucket,
                sustainable_distance_km,
                proportion_sustainable: 0.0,
                total_weighted_factor: 0.0,
                points: 0.0,
            });
        }

        let proportion_sustainable = sustainable_distance_km / tour.total_distance_km;

        let total_weighted_factor: f64 = mode_distances
            .iter()
            .filter_map(|(mode, distance)| {
                self.modes
                    .weights(*mode)
                    .map(|w| w.factor(distance_bucket) * (distance / sustainable_distance_km))
            })
            .sum();

        let points = self.base_point * total_weighted_factor * proportion_sustainable;

        Some(ScoreBreakdown {
            distance_bucket,
            sustainable_distance_km,
            proportion_sustainable,
            total_weighted_factor,
            points,
        })
    }
}
