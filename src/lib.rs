//! Tour Points - commute tour segmentation and sustainability scoring
//!
//! Tour Points turns per-user travel legs into tours through a deterministic
//! pipeline: trip adaptation → stop classification → tour segmentation → tour
//! aggregation → sustainability scoring → weekly bonus → report encoding.
//!
//! ## Modules
//!
//! - **Core**: distance, stop classification, segmentation, aggregation, scoring
//! - **Adapters**: raw trip exports (JSON, NDJSON, CSV) into legs grouped per user

pub mod adapters;
pub mod aggregator;
pub mod bonus;
pub mod classifier;
pub mod config;
pub mod distance;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod segmenter;
pub mod types;

pub use config::TourConfig;
pub use distance::haversine;
pub use error::TourError;
pub use pipeline::{trips_to_tour_report, BatchOutcome, TourPipeline};
pub use types::{ModeStandard, StopType, Tour, TourType, TripLeg, UserProfile};

/// Version embedded in every report
pub const TOURS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "tour-points";
