//! `oa-spatial` — road graph construction, snapping, and path search.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`segment`] | `RoadClass`, `RoadSegment`, `SegmentRecord`                       |
//! | [`source`]  | `SegmentSource` trait, CSV and static (fallback) sources          |
//! | [`build`]   | `build_network`, intersection merging, priority truncation        |
//! | [`network`] | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`, `Snap`        |
//! | [`router`]  | `PathFinder` trait, `DijkstraPathFinder`, `PathResult`, `PathMethod` |
//! | [`graph`]   | `RoadGraph`: lazily built, shareable network handle               |
//! | [`config`]  | `BuildOptions`, `RoutingConfig`, `FrontierPolicy`, `GraphConfig`  |
//! | [`osm`]     | `OsmPbfSource` (feature = `"osm"` only)                           |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                                |
//!
//! # Feature flags
//!
//! | Flag  | Effect                                                 |
//! |-------|--------------------------------------------------------|
//! | `osm` | Enables OSM PBF segment loading via the `osmpbf` crate. |

pub mod build;
pub mod config;
pub mod error;
pub mod graph;
pub mod network;
pub mod router;
pub mod segment;
pub mod source;

#[cfg(feature = "osm")]
pub mod osm;

#[cfg(test)]
mod tests;

pub use build::{build_network, merge_intersections, truncate_by_priority};
pub use config::{BuildOptions, FrontierPolicy, GraphConfig, RoutingConfig};
pub use error::{SpatialError, SpatialResult};
pub use graph::RoadGraph;
pub use network::{CoordKey, RoadInfo, RoadNetwork, RoadNetworkBuilder, Snap};
pub use router::{DijkstraPathFinder, PathFinder, PathMethod, PathResult, find_path};
pub use segment::{RoadClass, RoadSegment, SegmentRecord};
pub use source::{CsvSegmentSource, SegmentSource, StaticSegmentSource, read_segments_csv};
