//! `oa-core` — foundational types for the Ottawa access routing core.
//!
//! Every other `oa-*` crate depends on this one.  It has no `oa-*`
//! dependencies and a single external one (`thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `EdgeId`, `RoadId`                               |
//! | [`geo`]    | `GeoPoint`, haversine, segment distance, bounds, grids     |
//! | [`error`]  | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public value types.  |

pub mod error;
pub mod geo;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{
    BoundingBox, GeoPoint, Grid, GridIter, bounding_circle, distance, grid,
    point_to_segment_distance, EARTH_RADIUS_M, METRES_PER_DEG_LAT,
};
pub use ids::{EdgeId, NodeId, RoadId};
