//! Score a small CSV trip export and print the tour report

use std::collections::HashMap;
use tour_points::adapters::CsvTripAdapter;
use tour_points::encoder::ReportEncoder;
use tour_points::{TourPipeline, UserProfile};

fn main() {
    let csv = "\
userId,start_coord,last_coord,mode,startTime,endTime
user_1,\"(38.022, 23.805)\",\"(38.015, 23.785)\",\"{'walking': 0.9, 'in_vehicle': 0.1}\",2024-01-15 06:30:00,2024-01-15 06:45:00
user_1,\"(38.015, 23.785)\",\"(38.022, 23.805)\",\"{'walking': 0.8, 'on_bicycle': 0.2}\",2024-01-15 07:00:00,2024-01-15 07:15:00
user_1,\"(38.022, 23.805)\",\"(38.03, 23.83)\",\"{'on_bicycle': 0.85, 'in_vehicle': 0.15}\",2024-01-15 07:30:00,2024-01-15 07:50:00
user_1,\"(38.03, 23.83)\",\"(38.022, 23.805)\",\"{'in_vehicle': 0.7, 'walking': 0.3}\",2024-01-15 17:00:00,2024-01-15 17:20:00
user_1,\"(38.022, 23.805)\",\"(38.015, 23.785)\",\"{'walking': 1.0}\",2024-01-15 17:30:00,2024-01-15 17:45:00
";

    let mut profiles = HashMap::new();
    profiles.insert(
        "user_1".to_string(),
        UserProfile {
            home_lat: 38.015,
            home_lon: 23.785,
            work_lat: 38.03,
            work_lon: 23.83,
        },
    );

    let pipeline = TourPipeline::new();
    let outcome = match pipeline.process_trips(&CsvTripAdapter, csv, &profiles) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e:?}");
            return;
        }
    };

    let bonus = pipeline.bonus_points(&outcome.tours);
    match ReportEncoder::new().encode_to_json(&outcome, bonus) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
