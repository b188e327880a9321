//! `oa-travel` — walking, driving, and emergency-response time estimates.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                       |
//! |---------------|----------------------------------------------------------------|
//! | [`estimator`] | `TravelEstimator<R>`, result types, speed models               |
//! | [`mode`]      | `TrafficLevel`, `ServiceType`                                  |
//! | [`error`]     | `TravelError`, `TravelResult<T>`                               |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | `walking_times` routes its pairs on Rayon's thread pool. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oa_spatial::{CsvSegmentSource, RoadGraph, StaticSegmentSource};
//! use oa_travel::{TrafficLevel, TravelEstimator};
//!
//! let graph = RoadGraph::new(CsvSegmentSource::new("road_segments.csv"))
//!     .with_fallback(StaticSegmentSource::ottawa_core());
//! let travel = TravelEstimator::new(Arc::new(graph));
//! let drive = travel.driving_time(home, work, TrafficLevel::High)?;
//! ```

pub mod error;
pub mod estimator;
pub mod mode;


pub use error::{TravelError, TravelResult};
pub use estimator::{
    DrivingTime, EmergencyResponse, TravelEstimator, WalkingTime, driving_road_class, driving_secs, emergency_secs,
};
pub use mode::{ServiceType, TrafficLevel};
