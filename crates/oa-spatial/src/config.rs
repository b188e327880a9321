//! Tunables for graph construction and path search.
//!
//! Every struct is `Default` with the production values and deserialises
//! with `#[serde(default)]`, so a JSON config only needs the keys it
//! overrides:
//!
//! ```json
//! { "routing": { "snap_max_m": 300.0, "frontier": { "kind": "exact" } } }
//! ```

use serde::{Deserialize, Serialize};

use crate::{SpatialError, SpatialResult};

// ── BuildOptions ──────────────────────────────────────────────────────────────

/// Graph-construction policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Above this many segments the input is sorted by road-class priority
    /// and truncated to this length.
    pub large_graph_threshold: usize,

    /// Segments processed per progress step.
    pub batch_size: usize,

    /// Intersection merging only runs when the input has fewer segments than
    /// this (the pass is quadratic in endpoint count).
    pub merge_max_segments: usize,

    /// Endpoints closer than this (metres) collapse into one intersection.
    pub intersection_threshold_m: f64,

    /// Master switch for the merging pass.
    pub merge_intersections: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            large_graph_threshold:    50_000,
            batch_size:               1_000,
            merge_max_segments:       1_000,
            intersection_threshold_m: 50.0,
            merge_intersections:      true,
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> SpatialResult<()> {
        if self.batch_size == 0 {
            return Err(SpatialError::Config("batch_size must be at least 1".into()));
        }
        if self.large_graph_threshold == 0 {
            return Err(SpatialError::Config("large_graph_threshold must be at least 1".into()));
        }
        positive("intersection_threshold_m", self.intersection_threshold_m)
    }
}

// ── RoutingConfig ─────────────────────────────────────────────────────────────

/// How the search picks the next node to finalise.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrontierPolicy {
    /// Binary heap: always the true minimum.
    Exact,
    /// Linear scan of the open set.  Once more than `cap` nodes remain
    /// unvisited, only the first `cap` open entries are examined, so the
    /// chosen node may not be the global minimum and the reported distance
    /// can exceed the true shortest path.
    Sampled { cap: usize },
}

impl Default for FrontierPolicy {
    fn default() -> Self {
        FrontierPolicy::Sampled { cap: 1_000 }
    }
}

/// Path-search thresholds and fallback estimates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Query pairs closer than this skip the graph entirely.
    pub direct_threshold_m: f64,

    /// Maximum distance from a query point to its snapped node.
    pub snap_max_m: f64,

    /// A finalised node this close to the destination node ends the search
    /// with a direct hop.
    pub close_enough_m: f64,

    /// Hard cap on finalised nodes per search.
    pub max_iterations: usize,

    /// After hitting the cap, the closest node reached is used if it lies
    /// within this distance of the destination node.
    pub iteration_fallback_m: f64,

    /// Walking-distance multiplier applied to the straight line when no
    /// route is available.
    pub estimate_factor: f64,

    /// Smaller multiplier for unreachable pairs closer than
    /// `short_estimate_max_m`.
    pub short_estimate_factor: f64,
    pub short_estimate_max_m:  f64,

    /// Average walking speed in m/s.
    pub walking_speed_mps: f64,

    pub frontier: FrontierPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            direct_threshold_m:    200.0,
            snap_max_m:            500.0,
            close_enough_m:        100.0,
            max_iterations:        2_000,
            iteration_fallback_m:  500.0,
            estimate_factor:       1.3,
            short_estimate_factor: 1.2,
            short_estimate_max_m:  500.0,
            walking_speed_mps:     1.4,
            frontier:              FrontierPolicy::default(),
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> SpatialResult<()> {
        for (field, value) in [
            ("direct_threshold_m", self.direct_threshold_m),
            ("snap_max_m", self.snap_max_m),
            ("close_enough_m", self.close_enough_m),
            ("iteration_fallback_m", self.iteration_fallback_m),
            ("estimate_factor", self.estimate_factor),
            ("short_estimate_factor", self.short_estimate_factor),
            ("short_estimate_max_m", self.short_estimate_max_m),
            ("walking_speed_mps", self.walking_speed_mps),
        ] {
            positive(field, value)?;
        }
        if self.max_iterations == 0 {
            return Err(SpatialError::Config("max_iterations must be at least 1".into()));
        }
        if let FrontierPolicy::Sampled { cap: 0 } = self.frontier {
            return Err(SpatialError::Config("sampled frontier cap must be at least 1".into()));
        }
        Ok(())
    }
}

// ── GraphConfig ───────────────────────────────────────────────────────────────

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub build:   BuildOptions,
    pub routing: RoutingConfig,
}

impl GraphConfig {
    pub fn validate(&self) -> SpatialResult<()> {
        self.build.validate()?;
        self.routing.validate()
    }
}

fn positive(field: &str, value: f64) -> SpatialResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SpatialError::Config(format!("{field} must be a positive finite number, got {value}")))
    }
}
