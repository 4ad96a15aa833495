//! Tour aggregation
//!
//! Reduces each contiguous run of legs sharing a tour id into a [`Tour`].

use crate::types::{ModeStandard, SegmentedLeg, StopType, Tour, TourType};

/// Aggregator for segmented legs
pub struct TourAggregator;

impl TourAggregator {
    /// Group one user's segmented legs by tour id, preserving leg order.
    ///
    /// Tour ids are contiguous runs by construction, so grouping is a single
    /// pass that cuts wherever the id changes.
    pub fn aggregate(legs: Vec<SegmentedLeg>) -> Vec<Tour> {
        let mut tours = Vec::new();
        let mut group: Vec<SegmentedLeg> = Vec::new();

        for leg in legs {
            if let Some(last) = group.last() {
                if last.tour_id != leg.tour_id || last.leg().user_id != leg.leg().user_id {
                    tours.push(summarize(std::mem::take(&mut group)));
                }
            }
            group.push(leg);
        }

        if !group.is_empty() {
            tours.push(summarize(group));
        }

        tours
    }
}

/// Tour type from the stop types of the first and last legs
pub fn tour_type(first: StopType, last: StopType) -> TourType {
    match (first, last) {
        (StopType::Home, StopType::Work) => TourType::HomeWork,
        (StopType::Work, StopType::Home) => TourType::WorkHome,
        _ => TourType::Other,
    }
}

fn summarize(legs: Vec<SegmentedLeg>) -> Tour {
    let first = &legs[0];
    let last = &legs[legs.len() - 1];

    let tour_type = tour_type(first.stop_type(), last.stop_type());
    let total_distance_km = legs.iter().map(|l| l.leg().distance_km).sum();

    let mut modes_used: Vec<ModeStandard> = Vec::new();
    for leg in &legs {
        if !modes_used.contains(&leg.leg().mode_standard) {
            modes_used.push(leg.leg().mode_standard);
        }
    }

    Tour {
        user_id: first.leg().user_id.clone(),
        tour_id: first.tour_id,
        tour_type,
        total_distance_km,
        modes_used,
        stop_types: legs.iter().map(|l| l.stop_type()).collect(),
        leg_count: legs.len(),
        started_at: first.leg().start_time,
        ended_at: last.leg().end_time,
        is_work_tour: tour_type.is_work_tour(),
        points: 0.0,
        legs,
    }
}
