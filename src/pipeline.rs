//! Pipeline orchestration
//!
//! This module provides the public API for tour scoring. It runs each user's
//! legs through the stages in order:
//!
//! 1. StopClassifier - Home/Work/Intermediate end points
//! 2. TourSegmenter - Tour ids
//! 3. TourAggregator - Tour summaries
//! 4. SustainabilityScorer - Points for work tours
//!
//! Users are independent and run in parallel; a failing user is rejected
//! without affecting the others.

use crate::adapters::{self, TripRecordAdapter, UserLegs};
use crate::aggregator::TourAggregator;
use crate::bonus::CommuteBonus;
use crate::classifier::StopClassifier;
use crate::config::TourConfig;
use crate::encoder::ReportEncoder;
use crate::error::TourError;
use crate::scoring::SustainabilityScorer;
use crate::segmenter::TourSegmenter;
use crate::types::{BonusPoints, InvalidRecord, RejectedUser, Tour, TripLeg, UserProfile};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;

/// Tours for every accepted user plus the users that were rejected
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Tours in input user order, then tour id
    pub tours: Vec<Tour>,
    pub rejected: Vec<RejectedUser>,
    /// Number of users in the batch, accepted or not
    pub users: usize,
    /// Raw records dropped because they name no user
    pub invalid_records: Vec<InvalidRecord>,
}

/// Tour scoring pipeline with a fixed configuration
pub struct TourPipeline {
    config: TourConfig,
}

impl Default for TourPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TourPipeline {
    /// Create a pipeline with default thresholds and tables
    pub fn new() -> Self {
        Self {
            config: TourConfig::default(),
        }
    }

    /// Create a pipeline with a validated configuration
    pub fn with_config(config: TourConfig) -> Result<Self, TourError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    /// Classify, segment, aggregate and score one user's time-sorted legs
    pub fn process_user(
        &self,
        user_id: &str,
        legs: Vec<TripLeg>,
        profile: Option<&UserProfile>,
    ) -> Result<Vec<Tour>, TourError> {
        if user_id.trim().is_empty() {
            return Err(TourError::MissingUserId { index: 0 });
        }
        for (index, leg) in legs.iter().enumerate() {
            if leg.user_id.trim().is_empty() {
                return Err(TourError::MissingUserId { index });
            }
            if leg.user_id != user_id {
                return Err(TourError::ForeignLeg {
                    index,
                    expected: user_id.to_string(),
                    found: leg.user_id.clone(),
                });
            }
        }
        let profile = profile.ok_or_else(|| TourError::MissingProfile(user_id.to_string()))?;

        // Stage 1: Classify end points
        let classifier =
            StopClassifier::new(self.config.home_threshold_km, self.config.work_threshold_km);
        let classified = classifier.classify_all(legs, profile);

        // Stage 2: Assign tour ids
        let segmenter = TourSegmenter::new(self.config.inactivity_gap());
        let segmented = segmenter.segment(user_id, classified)?;

        // Stage 3: Summarize tours
        let mut tours = TourAggregator::aggregate(segmented);

        // Stage 4: Score work tours
        let scorer =
            SustainabilityScorer::new(&self.config.sustainable_modes, self.config.base_point);
        scorer.apply(&mut tours);

        debug!(
            "user {user_id}: {} tours, {} work tours",
            tours.len(),
            tours.iter().filter(|t| t.is_work_tour).count()
        );

        Ok(tours)
    }

    /// Process every user in parallel. Output keeps the input user order.
    pub fn process_batch(
        &self,
        batch: Vec<UserLegs>,
        profiles: &HashMap<String, UserProfile>,
    ) -> BatchOutcome {
        let users = batch.len();

        let results: Vec<(String, Result<Vec<Tour>, TourError>)> = batch
            .into_par_iter()
            .map(|(user_id, legs)| {
                let result = self.process_user(&user_id, legs, profiles.get(&user_id));
                (user_id, result)
            })
            .collect();

        let mut outcome = BatchOutcome {
            users,
            ..Default::default()
        };

        for (user_id, result) in results {
            match result {
                Ok(tours) => outcome.tours.extend(tours),
                Err(e) => {
                    warn!("rejecting user {user_id}: {e}");
                    outcome.rejected.push(RejectedUser {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "processed {} users into {} tours ({} rejected)",
            users,
            outcome.tours.len(),
            outcome.rejected.len()
        );

        outcome
    }

    /// Parse raw trip input with `adapter`, group it per user and process it.
    ///
    /// A malformed record rejects its user; records without a user id are
    /// reported in `invalid_records`. Only unreadable input fails the call.
    pub fn process_trips(
        &self,
        adapter: &dyn TripRecordAdapter,
        input: &str,
        profiles: &HashMap<String, UserProfile>,
    ) -> Result<BatchOutcome, TourError> {
        let trips = adapter.parse(input)?;
        let converted = adapters::to_legs(&trips, &self.config);
        let batch = adapters::group_by_user(converted.legs);

        let mut outcome = self.process_batch(batch, profiles);
        for (user_id, e) in converted.failed_users {
            warn!("rejecting user {user_id}: {e}");
            outcome.rejected.push(RejectedUser {
                user_id,
                error: e.to_string(),
            });
            outcome.users += 1;
        }
        outcome.invalid_records = converted.invalid_records;

        Ok(outcome)
    }

    /// Weekly commuting bonus for a set of scored tours
    pub fn bonus_points(&self, tours: &[Tour]) -> Vec<BonusPoints> {
        CommuteBonus::new(&self.config.bonus).compute(tours)
    }
}

/// Convert a JSON array of raw trips and a JSON profile map into a JSON tour
/// report, using default configuration.
///
/// # Example
/// ```ignore
/// let report_json = trips_to_tour_report(trips_json, profiles_json)?;
/// ```
pub fn trips_to_tour_report(trips_json: String, profiles_json: String) -> Result<String, TourError> {
    let pipeline = TourPipeline::new();
    let profiles = adapters::parse_profiles(&profiles_json)?;
    let outcome = pipeline.process_trips(&adapters::JsonTripAdapter, &trips_json, &profiles)?;
    let bonus = pipeline.bonus_points(&outcome.tours);

    ReportEncoder::new().encode_to_json(&outcome, bonus)
}
