//! Travel-time estimators layered over a [`PathFinder`].
//!
//! | Query                  | Distance used          | Speed model                                  |
//! |------------------------|------------------------|----------------------------------------------|
//! | walking                | routed / estimated     | fixed walking speed (finder config)          |
//! | driving                | routed / estimated     | class speed by trip length × traffic + delay |
//! | emergency response     | routed / estimated     | primary speed × 1.2 × service factor + delay + preparation |
//!
//! Every query first makes sure the shared [`RoadGraph`] is built; the only
//! error a query can return is a graph that could not be built at all.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use oa_core::{GeoPoint, bounding_circle};
use oa_spatial::{
    DijkstraPathFinder, PathFinder, PathMethod, PathResult, RoadClass, RoadGraph, RoadNetwork, RoutingConfig,
};

use crate::{ServiceType, TrafficLevel, TravelResult};

/// Driving under this direct distance is reported as a flat one minute.
pub const MIN_DRIVE_DISTANCE_M: f64 = 300.0;

/// One assumed intersection per this many metres of route.
pub const INTERSECTION_SPACING_M: f64 = 500.0;

pub const DRIVING_INTERSECTION_DELAY_SECS: f64 = 20.0;

/// Priority routing: emergency vehicles lose less time per intersection.
pub const EMERGENCY_INTERSECTION_DELAY_SECS: f64 = 5.0;

/// Emergency vehicles travel this much faster than primary-road traffic.
pub const EMERGENCY_SPEED_BOOST: f64 = 1.2;

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WalkingTime {
    pub minutes:     f64,
    pub meters:      f64,
    pub is_estimate: bool,
    pub method:      PathMethod,
}

impl From<&PathResult> for WalkingTime {
    fn from(path: &PathResult) -> Self {
        Self {
            minutes:     path.walking_minutes(),
            meters:      path.walking_distance_m,
            is_estimate: path.is_estimate(),
            method:      path.method,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrivingTime {
    pub minutes:       f64,
    pub meters:        f64,
    pub is_estimate:   bool,
    pub method:        PathMethod,
    pub traffic_level: TrafficLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmergencyResponse {
    pub minutes:      f64,
    pub meters:       f64,
    pub service_type: ServiceType,
    pub method:       PathMethod,
    pub is_estimate:  bool,
}

// ── Speed models ──────────────────────────────────────────────────────────────

/// Road class assumed for a drive of the given straight-line length.
///
/// Longer trips are assumed to spend their time on faster roads.
pub fn driving_road_class(direct_m: f64) -> RoadClass {
    if direct_m < 1_000.0 {
        RoadClass::Residential
    } else if direct_m < 5_000.0 {
        RoadClass::Secondary
    } else if direct_m < 15_000.0 {
        RoadClass::Primary
    } else {
        RoadClass::Motorway
    }
}

#[inline]
fn intersections(meters: f64) -> f64 {
    (meters / INTERSECTION_SPACING_M).floor()
}

/// Seconds to drive `meters` on `class` roads under `traffic`.
pub fn driving_secs(meters: f64, class: RoadClass, traffic: TrafficLevel) -> f64 {
    let speed_mps = class.default_speed_kmh() / 3.6;
    meters / speed_mps * traffic.factor() + intersections(meters) * DRIVING_INTERSECTION_DELAY_SECS
}

/// Seconds from dispatch to arrival for `service` covering `meters`.
pub fn emergency_secs(meters: f64, service: ServiceType) -> f64 {
    let speed_mps = RoadClass::Primary.default_speed_kmh() * EMERGENCY_SPEED_BOOST / 3.6;
    meters / speed_mps * service.speed_factor()
        + intersections(meters) * EMERGENCY_INTERSECTION_DELAY_SECS
        + service.preparation_secs()
}

// ── TravelEstimator ───────────────────────────────────────────────────────────

/// Travel-time queries against a shared, lazily built road graph.
///
/// # Type parameter
///
/// `R` is the routing engine.  The default [`DijkstraPathFinder`] runs the
/// bounded search; swap in any other [`PathFinder`] at compile time.
pub struct TravelEstimator<R: PathFinder = DijkstraPathFinder> {
    graph:      Arc<RoadGraph>,
    pub finder: R,
}

impl TravelEstimator {
    /// Estimator using the default routing configuration.
    pub fn new(graph: Arc<RoadGraph>) -> Self {
        Self::with_finder(graph, DijkstraPathFinder::default())
    }

    pub fn with_config(graph: Arc<RoadGraph>, config: RoutingConfig) -> Self {
        Self::with_finder(graph, DijkstraPathFinder::new(config))
    }
}

impl<R: PathFinder> TravelEstimator<R> {
    pub fn with_finder(graph: Arc<RoadGraph>, finder: R) -> Self {
        Self { graph, finder }
    }

    pub fn graph(&self) -> &Arc<RoadGraph> {
        &self.graph
    }

    fn network(&self) -> TravelResult<&RoadNetwork> {
        Ok(self.graph.ensure_built()?)
    }

    /// Full path result, geometry included.
    pub fn path(&self, start: GeoPoint, end: GeoPoint) -> TravelResult<PathResult> {
        let network = self.network()?;
        Ok(self.finder.find_path(network, start, end))
    }

    pub fn walking_time(&self, start: GeoPoint, end: GeoPoint) -> TravelResult<WalkingTime> {
        Ok(WalkingTime::from(&self.path(start, end)?))
    }

    /// Driving time between two points.
    ///
    /// Trips shorter than [`MIN_DRIVE_DISTANCE_M`] are one minute flat.
    /// Otherwise the routed distance is driven at the speed of the class
    /// picked by [`driving_road_class`], scaled by traffic, plus one
    /// intersection delay per [`INTERSECTION_SPACING_M`].  Never below one
    /// minute.
    pub fn driving_time(&self, start: GeoPoint, end: GeoPoint, traffic: TrafficLevel) -> TravelResult<DrivingTime> {
        let network = self.network()?;
        let direct_m = start.distance_m(end);

        if direct_m < MIN_DRIVE_DISTANCE_M {
            return Ok(DrivingTime {
                minutes:       1.0,
                meters:        direct_m,
                is_estimate:   PathMethod::Direct.is_estimate(),
                method:        PathMethod::Direct,
                traffic_level: traffic,
            });
        }

        let path = self.finder.find_path(network, start, end);
        let class = driving_road_class(direct_m);
        let secs = driving_secs(path.walking_distance_m, class, traffic);
        debug!(
            "driving {start} → {end}: {:.0} m as {class} in {traffic} traffic ({})",
            path.walking_distance_m, path.method
        );

        Ok(DrivingTime {
            minutes:       (secs / 60.0).max(1.0),
            meters:        path.walking_distance_m,
            is_estimate:   path.is_estimate(),
            method:        path.method,
            traffic_level: traffic,
        })
    }

    /// Response time for `service` dispatched from `station` to `target`.
    pub fn emergency_response(
        &self,
        station: GeoPoint,
        target:  GeoPoint,
        service: ServiceType,
    ) -> TravelResult<EmergencyResponse> {
        let path = self.path(station, target)?;
        let secs = emergency_secs(path.walking_distance_m, service);

        Ok(EmergencyResponse {
            minutes:      secs / 60.0,
            meters:       path.walking_distance_m,
            service_type: service,
            method:       path.method,
            is_estimate:  path.is_estimate(),
        })
    }

    /// Quickest walk from `origin` to any of `candidates` within `radius_m`.
    ///
    /// Candidates outside the radius's bounding box are skipped without
    /// routing.  Returns the winning index into `candidates` with its walking
    /// time; ties go to the earlier candidate.  `None` if nothing is in range.
    pub fn nearest_by_walking(
        &self,
        origin:     GeoPoint,
        candidates: &[GeoPoint],
        radius_m:   f64,
    ) -> TravelResult<Option<(usize, WalkingTime)>> {
        let network = self.network()?;
        let bbox = bounding_circle(origin, radius_m);

        let best = candidates
            .iter()
            .enumerate()
            .filter(|(_, p)| bbox.contains(**p))
            .map(|(i, &p)| (i, WalkingTime::from(&self.finder.find_path(network, origin, p))))
            .min_by(|(_, a), (_, b)| a.minutes.total_cmp(&b.minutes));
        Ok(best)
    }

    /// Walking times for many independent pairs, in input order.
    ///
    /// With the `parallel` feature the pairs are routed on Rayon's pool.
    pub fn walking_times(&self, pairs: &[(GeoPoint, GeoPoint)]) -> TravelResult<Vec<WalkingTime>> {
        let network = self.network()?;
        let walk = |&(start, end): &(GeoPoint, GeoPoint)| WalkingTime::from(&self.finder.find_path(network, start, end));

        #[cfg(not(feature = "parallel"))]
        let times = pairs.iter().map(walk).collect();

        #[cfg(feature = "parallel")]
        let times = {
            use rayon::prelude::*;
            pairs.par_iter().map(walk).collect()
        };

        Ok(times)
    }
}
