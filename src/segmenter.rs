//! Tour segmentation
//!
//! A per-user state machine over the time-sorted leg sequence. Each leg either
//! continues the current tour or opens the next one, based on the gap since the
//! previous leg ended and the pair of stop types on either side of the boundary.
//!
//! | previous → current          | gap ≤ threshold | gap > threshold |
//! |-----------------------------|-----------------|-----------------|
//! | Home → Intermediate         | continue        | new tour        |
//! | Intermediate → Work         | continue        | new tour        |
//! | Work → Intermediate         | continue        | new tour        |
//! | Intermediate → Home         | continue        | new tour        |
//! | anything else               | new tour        | new tour        |

use crate::error::TourError;
use crate::types::{ClassifiedLeg, SegmentedLeg, StopType};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

/// Stop-type pairs that keep consecutive legs in the same tour
pub const CONTINUATION_PAIRS: [(StopType, StopType); 4] = [
    (StopType::Home, StopType::Intermediate),
    (StopType::Intermediate, StopType::Work),
    (StopType::Work, StopType::Intermediate),
    (StopType::Intermediate, StopType::Home),
];

pub fn is_continuation(previous: StopType, current: StopType) -> bool {
    CONTINUATION_PAIRS.contains(&(previous, current))
}

/// Why a leg opened a new tour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The gap since the previous leg exceeded the inactivity threshold
    InactivityGap,
    /// The stop-type pair is not a continuation pair
    StopSequence,
}

/// Outcome of feeding one leg to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue,
    NewTour(Boundary),
}

/// State carried from one leg to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentState {
    pub current_tour_id: u32,
    pub previous_end_time: Option<DateTime<Utc>>,
    pub previous_stop_type: StopType,
}

impl SegmentState {
    fn after(leg: &ClassifiedLeg, tour_id: u32) -> Self {
        Self {
            current_tour_id: tour_id,
            previous_end_time: leg.leg.end_time,
            previous_stop_type: leg.stop_type,
        }
    }
}

/// Assigns tour ids to one user's legs
pub struct TourSegmenter {
    inactivity_gap: Duration,
}

impl Default for TourSegmenter {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

impl TourSegmenter {
    pub fn new(inactivity_gap: Duration) -> Self {
        Self { inactivity_gap }
    }

    /// Decide whether `leg` continues the tour described by `state`.
    ///
    /// When either timestamp is unknown the gap rule is skipped and only the
    /// stop-type rule applies.
    pub fn transition(&self, state: &SegmentState, leg: &ClassifiedLeg) -> Transition {
        if let (Some(start), Some(previous_end)) = (leg.leg.start_time, state.previous_end_time) {
            if start - previous_end > self.inactivity_gap {
                return Transition::NewTour(Boundary::InactivityGap);
            }
        }

        if is_continuation(state.previous_stop_type, leg.stop_type) {
            Transition::Continue
        } else {
            Transition::NewTour(Boundary::StopSequence)
        }
    }

    /// Segment one user's legs, which must already be in timeline order.
    pub fn segment(
        &self,
        user_id: &str,
        mut legs: Vec<ClassifiedLeg>,
    ) -> Result<Vec<SegmentedLeg>, TourError> {
        let carried = forward_carry_timestamps(&mut legs);
        if carried > 0 {
            warn!("user {user_id}: filled {carried} missing timestamp(s) from preceding legs");
        }

        check_sorted(user_id, &legs)?;

        let leg_count = legs.len();
        let (_, segmented) = legs.into_iter().fold(
            (None::<SegmentState>, Vec::with_capacity(leg_count)),
            |(state, mut segmented), classified| {
                let tour_id = match &state {
                    None => 1,
                    Some(state) => match self.transition(state, &classified) {
                        Transition::Continue => state.current_tour_id,
                        Transition::NewTour(_) => state.current_tour_id + 1,
                    },
                };

                let next = SegmentState::after(&classified, tour_id);
                segmented.push(SegmentedLeg {
                    classified,
                    tour_id,
                });
                (Some(next), segmented)
            },
        );

        debug!(
            "user {user_id}: {} legs in {} tours",
            segmented.len(),
            segmented.last().map(|leg| leg.tour_id).unwrap_or(0)
        );

        Ok(segmented)
    }
}

/// Fill missing start/end timestamps from the nearest preceding leg that has
/// one. Leading legs without a predecessor stay empty. Returns the number of
/// timestamps filled.
pub fn forward_carry_timestamps(legs: &mut [ClassifiedLeg]) -> usize {
    let mut last_start: Option<DateTime<Utc>> = None;
    let mut last_end: Option<DateTime<Utc>> = None;
    let mut filled = 0;

    for classified in legs.iter_mut() {
        let leg = &mut classified.leg;

        match leg.start_time {
            Some(start) => last_start = Some(start),
            None if last_start.is_some() => {
                leg.start_time = last_start;
                filled += 1;
            }
            None => {}
        }

        match leg.end_time {
            Some(end) => last_end = Some(end),
            None if last_end.is_some() => {
                leg.end_time = last_end;
                filled += 1;
            }
            None => {}
        }
    }

    filled
}

fn check_sorted(user_id: &str, legs: &[ClassifiedLeg]) -> Result<(), TourError> {
    for (index, pair) in legs.windows(2).enumerate() {
        if let (Some(previous), Some(current)) = (pair[0].leg.start_time, pair[1].leg.start_time) {
            if current < previous {
                return Err(TourError::UnsortedLegs {
                    user_id: user_id.to_string(),
                    index: index + 1,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModeStandard, TripLeg};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn leg(start: (u32, u32), end: (u32, u32), stop_type: StopType) -> ClassifiedLeg {
        timed_leg(Some(at(start.0, start.1)), Some(at(end.0, end.1)), stop_type)
    }

    fn timed_leg(
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        stop_type: StopType,
    ) -> ClassifiedLeg {
        ClassifiedLeg {
            leg: TripLeg {
                user_id: "user_1".to_string(),
                start_time,
                end_time,
                start_lat: 0.0,
                start_lon: 0.0,
                end_lat: 0.0,
                end_lon: 0.0,
                mode_standard: ModeStandard::Walking,
                distance_km: 1.0,
            },
            distance_from_home_start: 0.0,
            distance_from_home_end: 0.0,
            distance_from_work_start: 0.0,
            distance_from_work_end: 0.0,
            stop_type,
        }
    }

    fn tour_ids(segmented: &[SegmentedLeg]) -> Vec<u32> {
        segmented.iter().map(|leg| leg.tour_id).collect()
    }

    #[test]
    fn test_home_intermediate_work_is_one_tour() {
        let legs = vec![
            leg((7, 0), (7, 20), StopType::Home),
            leg((7, 30), (7, 50), StopType::Intermediate),
            leg((8, 0), (8, 30), StopType::Work),
        ];

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        // The first leg ends at home, so Home → Intermediate → Work continues it
        assert_eq!(tour_ids(&segmented), vec![1, 1, 1]);
    }

    #[test]
    fn test_gap_over_an_hour_always_splits() {
        let legs = vec![
            leg((7, 0), (7, 20), StopType::Home),
            // Home → Intermediate would continue, but 61 minutes have passed
            leg((8, 21), (8, 40), StopType::Intermediate),
            // exactly one hour is not more than the threshold
            leg((9, 40), (10, 0), StopType::Work),
        ];

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        assert_eq!(tour_ids(&segmented), vec![1, 2, 2]);
    }

    #[test]
    fn test_gap_splits_every_continuation_pair() {
        for (previous, current) in CONTINUATION_PAIRS {
            let within = vec![
                leg((7, 0), (7, 20), previous),
                leg((8, 20), (8, 40), current),
            ];
            let segmented = TourSegmenter::default().segment("user_1", within).unwrap();
            assert_eq!(tour_ids(&segmented), vec![1, 1], "{previous:?} -> {current:?}");

            let beyond = vec![
                leg((7, 0), (7, 20), previous),
                leg((8, 21), (8, 40), current),
            ];
            let segmented = TourSegmenter::default().segment("user_1", beyond).unwrap();
            assert_eq!(tour_ids(&segmented), vec![1, 2], "{previous:?} -> {current:?}");
        }
    }

    #[test]
    fn test_carried_end_time_drives_gap_split() {
        let legs = vec![
            leg((7, 0), (7, 20), StopType::Home),
            // Takes 7:00 / 7:20 from the leg before
            timed_leg(None, None, StopType::Intermediate),
            // 70 minutes after the carried end time
            leg((8, 30), (8, 50), StopType::Work),
        ];

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        assert_eq!(segmented[1].leg().end_time, Some(at(7, 20)));
        assert_eq!(tour_ids(&segmented), vec![1, 1, 2]);
    }

    #[test]
    fn test_disallowed_pairs_split() {
        let legs = vec![
            leg((7, 0), (7, 20), StopType::Home),
            leg((7, 25), (7, 40), StopType::Home),
            leg((7, 45), (8, 0), StopType::Work),
            leg((8, 5), (8, 10), StopType::Work),
            leg((8, 15), (8, 30), StopType::Intermediate),
            leg((8, 35), (8, 50), StopType::Intermediate),
        ];

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        // Home→Home, Home→Work, Work→Work and Intermediate→Intermediate all split
        assert_eq!(tour_ids(&segmented), vec![1, 2, 3, 4, 4, 5]);
    }

    #[test]
    fn test_tour_ids_increase_by_one() {
        let stops = [
            StopType::Home,
            StopType::Intermediate,
            StopType::Work,
            StopType::Work,
            StopType::Intermediate,
            StopType::Home,
            StopType::Home,
        ];
        let legs = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| leg((6 + i as u32, 0), (6 + i as u32, 10), *stop))
            .collect();

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        assert_eq!(segmented[0].tour_id, 1);
        for pair in segmented.windows(2) {
            let step = pair[1].tour_id - pair[0].tour_id;
            assert!(step == 0 || step == 1);
        }
        assert_eq!(segmented.len(), stops.len());
    }

    #[test]
    fn test_forward_carry_fills_from_previous_leg() {
        let mut legs = vec![
            timed_leg(None, None, StopType::Home),
            timed_leg(Some(at(7, 0)), Some(at(7, 30)), StopType::Home),
            timed_leg(None, Some(at(7, 50)), StopType::Intermediate),
            timed_leg(Some(at(8, 0)), None, StopType::Work),
        ];

        let filled = forward_carry_timestamps(&mut legs);
        assert_eq!(filled, 2);
        assert_eq!(legs[0].leg.start_time, None);
        assert_eq!(legs[2].leg.start_time, Some(at(7, 0)));
        assert_eq!(legs[3].leg.end_time, Some(at(7, 50)));
    }

    #[test]
    fn test_missing_gap_falls_back_to_stop_rule() {
        let legs = vec![
            timed_leg(None, None, StopType::Home),
            timed_leg(None, None, StopType::Intermediate),
            timed_leg(None, None, StopType::Intermediate),
        ];

        let segmented = TourSegmenter::default().segment("user_1", legs).unwrap();
        assert_eq!(tour_ids(&segmented), vec![1, 1, 2]);
    }

    #[test]
    fn test_unsorted_legs_rejected() {
        let legs = vec![
            leg((9, 0), (9, 20), StopType::Home),
            leg((8, 0), (8, 20), StopType::Intermediate),
        ];

        let result = TourSegmenter::default().segment("user_1", legs);
        assert!(matches!(
            result,
            Err(TourError::UnsortedLegs { ref user_id, index: 1 }) if user_id == "user_1"
        ));
    }

    #[test]
    fn test_custom_inactivity_gap() {
        let legs = vec![
            leg((7, 0), (7, 20), StopType::Home),
            leg((7, 50), (8, 0), StopType::Intermediate),
        ];

        let segmenter = TourSegmenter::new(Duration::minutes(15));
        let segmented = segmenter.segment("user_1", legs).unwrap();
        assert_eq!(tour_ids(&segmented), vec![1, 2]);
    }

    #[test]
    fn test_transition_reports_boundary_reason() {
        let segmenter = TourSegmenter::default();
        let state = SegmentState {
            current_tour_id: 3,
            previous_end_time: Some(at(7, 0)),
            previous_stop_type: StopType::Work,
        };

        assert_eq!(
            segmenter.transition(&state, &leg((7, 10), (7, 30), StopType::Intermediate)),
            Transition::Continue
        );
        assert_eq!(
            segmenter.transition(&state, &leg((7, 10), (7, 30), StopType::Home)),
            Transition::NewTour(Boundary::StopSequence)
        );
        assert_eq!(
            segmenter.transition(&state, &leg((9, 0), (9, 30), StopType::Intermediate)),
            Transition::NewTour(Boundary::InactivityGap)
        );
    }

    #[test]
    fn test_empty_sequence() {
        let segmented = TourSegmenter::default().segment("user_1", vec![]).unwrap();
        assert!(segmented.is_empty());
    }
}
