//! Weekly commuting bonus
//!
//! A day counts as a commuting day when the user has both a scoring Home-Work
//! tour and a scoring Work-Home tour that started on that day. Commuting days
//! are counted per ISO week and converted to bonus points by [`BonusRule`].

use crate::config::BonusRule;
use crate::types::{BonusPoints, Tour, TourType};
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
struct DayCommutes {
    home_work: bool,
    work_home: bool,
}

/// Weekly bonus calculator
pub struct CommuteBonus<'a> {
    rule: &'a BonusRule,
}

impl<'a> CommuteBonus<'a> {
    pub fn new(rule: &'a BonusRule) -> Self {
        Self { rule }
    }

    /// Bonus records for every (user, ISO week) that earns a bonus, sorted by
    /// user, year and week. Tours without a start time are ignored.
    pub fn compute(&self, tours: &[Tour]) -> Vec<BonusPoints> {
        let mut weeks: BTreeMap<(String, i32, u32), BTreeMap<NaiveDate, DayCommutes>> =
            BTreeMap::new();

        for tour in tours {
            let Some(started_at) = tour.started_at else {
                continue;
            };
            let date = started_at.date_naive();
            let iso_week = date.iso_week();

            let day = weeks
                .entry((tour.user_id.clone(), iso_week.year(), iso_week.week()))
                .or_default()
                .entry(date)
                .or_default();

            if tour.points > 0.0 {
                match tour.tour_type {
                    TourType::HomeWork => day.home_work = true,
                    TourType::WorkHome => day.work_home = true,
                    TourType::Other => {}
                }
            }
        }

        weeks
            .into_iter()
            .filter_map(|((user_id, year, week), days)| {
                let commuting_days = days
                    .values()
                    .filter(|day| day.home_work && day.work_home)
                    .count() as u32;
                let bonus_points = self.rule.points_for(commuting_days);

                if bonus_points == 0 {
                    return None;
                }

                debug!("user {user_id}: {year}-W{week} earns {bonus_points} bonus points");
                Some(BonusPoints {
                    user_id,
                    year,
                    week,
                    commuting_days,
                    bonus_points,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn tour(user_id: &str, day: u32, tour_type: TourType, points: f64) -> Tour {
        // January 2024: the 1st is a Monday, ISO week 1
        Tour {
            user_id: user_id.to_string(),
            tour_id: 1,
            tour_type,
            total_distance_km: 3.0,
            modes_used: vec![],
            stop_types: vec![],
            leg_count: 1,
            started_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap()),
            ended_at: None,
            is_work_tour: tour_type.is_work_tour(),
            points,
            legs: vec![],
        }
    }

    fn commute_days(user_id: &str, days: &[u32]) -> Vec<Tour> {
        days.iter()
            .flat_map(|day| {
                [
                    tour(user_id, *day, TourType::HomeWork, 1.0),
                    tour(user_id, *day, TourType::WorkHome, 1.2),
                ]
            })
            .collect()
    }

    #[test]
    fn test_five_days_earn_high_tier() {
        let rule = BonusRule::default();
        let tours = commute_days("user_1", &[1, 2, 3, 4, 5]);

        let bonus = CommuteBonus::new(&rule).compute(&tours);
        assert_eq!(
            bonus,
            vec![BonusPoints {
                user_id: "user_1".to_string(),
                year: 2024,
                week: 1,
                commuting_days: 5,
                bonus_points: 3,
            }]
        );
    }

    #[test]
    fn test_three_days_earn_low_tier() {
        let rule = BonusRule::default();
        let tours = commute_days("user_1", &[1, 3, 5]);

        let bonus = CommuteBonus::new(&rule).compute(&tours);
        assert_eq!(bonus.len(), 1);
        assert_eq!(bonus[0].bonus_points, 2);
    }

    #[test]
    fn test_one_way_days_do_not_count() {
        let rule = BonusRule::default();
        let mut tours = commute_days("user_1", &[1, 2]);
        tours.push(tour("user_1", 3, TourType::HomeWork, 1.0));
        tours.push(tour("user_1", 4, TourType::HomeWork, 1.0));
        tours.push(tour("user_1", 4, TourType::WorkHome, 0.0));

        assert!(CommuteBonus::new(&rule).compute(&tours).is_empty());
    }

    #[test]
    fn test_weeks_and_users_are_separate() {
        let rule = BonusRule::default();
        let mut tours = commute_days("user_1", &[1, 2, 3]);
        // 8th-10th fall in ISO week 2
        tours.extend(commute_days("user_1", &[8, 9, 10]));
        tours.extend(commute_days("user_2", &[1, 2]));

        let bonus = CommuteBonus::new(&rule).compute(&tours);
        let keys: Vec<(String, u32)> = bonus.iter().map(|b| (b.user_id.clone(), b.week)).collect();
        assert_eq!(
            keys,
            vec![("user_1".to_string(), 1), ("user_1".to_string(), 2)]
        );
    }
}
