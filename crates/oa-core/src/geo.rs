//! Geographic coordinate type and great-circle utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  Routing-graph node identity is
//! derived from coordinates rounded to 5 decimal places (≈ 1.1 m), which
//! needs more headroom than single precision offers.
//!
//! All distances are haversine great-circle metres on a sphere of radius
//! [`EARTH_RADIUS_M`].  Planar approximations (bounding boxes, grids, segment
//! projection) use [`METRES_PER_DEG_LAT`] with a `cos(latitude)` correction
//! for longitude.

use std::fmt;

use crate::{CoreError, CoreResult};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees-to-metres approximation for one degree of latitude.
pub const METRES_PER_DEG_LAT: f64 = 111_111.0;

// ── GeoPoint ──────────────────────────────────────────────────────────────────

/// A WGS-84 geographic coordinate.  Immutable value type.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Validating constructor: rejects NaN/infinite values and coordinates
    /// outside `[-90, 90] × [-180, 180]`.
    pub fn try_new(lat: f64, lon: f64) -> CoreResult<Self> {
        let p = Self { lat, lon };
        if p.is_valid() {
            Ok(p)
        } else {
            Err(CoreError::InvalidCoordinate { lat, lon })
        }
    }

    /// `true` if both components are finite and within WGS-84 range.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Haversine great-circle distance in metres.
    ///
    /// Exactly zero for identical points and symmetric in its arguments.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial great-circle bearing from `self` to `other`, in degrees
    /// clockwise from north, normalised to `[0, 360)`.
    pub fn bearing_to(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }

    /// Point reached by travelling `distance_m` along the great circle that
    /// leaves `self` at `bearing_deg`.
    pub fn destination(self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos())
                .atan2(delta.cos() - lat1.sin() * lat2.sin());

        // Normalise longitude to [-180, 180).
        let lon = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
        GeoPoint::new(lat2.to_degrees(), lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Free-function form of [`GeoPoint::distance_m`].
#[inline]
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    a.distance_m(b)
}

/// Distance in metres from `p` to the segment `seg_start → seg_end`.
///
/// The projection is computed in the lat/lon plane; the projection parameter
/// is clamped to `[0, 1]` so the foot stays on the segment, and the returned
/// value is the great-circle distance from `p` to that foot.  A zero-length
/// segment degenerates to `distance(p, seg_start)`.
pub fn point_to_segment_distance(p: GeoPoint, seg_start: GeoPoint, seg_end: GeoPoint) -> f64 {
    let dx = seg_end.lon - seg_start.lon;
    let dy = seg_end.lat - seg_start.lat;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance_m(seg_start);
    }

    let t = (((p.lon - seg_start.lon) * dx + (p.lat - seg_start.lat) * dy) / len2).clamp(0.0, 1.0);
    let foot = GeoPoint::new(seg_start.lat + t * dy, seg_start.lon + t * dx);
    p.distance_m(foot)
}

// ── Bounding box ──────────────────────────────────────────────────────────────

/// Axis-aligned lat/lon rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lon..=self.max_lon).contains(&p.lon)
    }
}

/// Rectangle containing every point within `radius_m` of `center`.
///
/// Latitude half-height is `radius / 111_111`; longitude half-width is
/// further divided by `cos(latitude)`.  The cosine is floored so the box
/// stays finite at the poles.
pub fn bounding_circle(center: GeoPoint, radius_m: f64) -> BoundingBox {
    let d_lat = radius_m / METRES_PER_DEG_LAT;
    let d_lon = radius_m / (METRES_PER_DEG_LAT * center.lat.to_radians().cos().abs().max(1e-6));
    BoundingBox {
        min_lat: center.lat - d_lat,
        max_lat: center.lat + d_lat,
        min_lon: center.lon - d_lon,
        max_lon: center.lon + d_lon,
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// A finite lattice of points around `center`, spaced ~`step_m` apart and
/// filtered to those within `radius_m` by great-circle distance.
///
/// `Grid` holds no points; every call to [`iter`](Self::iter) starts a fresh
/// lazy walk, so the sequence can be restarted any number of times.
#[derive(Clone, Debug)]
pub struct Grid {
    center:   GeoPoint,
    radius_m: f64,
    lat_step: f64,
    lon_step: f64,
    /// Steps taken either side of the center along each axis.  `None` for an
    /// empty grid.
    half_span: Option<usize>,
}

/// Build a [`Grid`].  A non-positive or non-finite `step_m`, or a negative
/// `radius_m`, produces an empty grid.
pub fn grid(center: GeoPoint, radius_m: f64, step_m: f64) -> Grid {
    let usable = step_m.is_finite() && step_m > 0.0 && radius_m.is_finite() && radius_m >= 0.0;
    let lat_step = step_m / METRES_PER_DEG_LAT;
    let lon_step = step_m / (METRES_PER_DEG_LAT * center.lat.to_radians().cos().abs().max(1e-6));
    Grid {
        center,
        radius_m,
        lat_step,
        lon_step,
        half_span: usable.then(|| (radius_m / step_m).floor() as usize),
    }
}

impl Grid {
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Lazily walk the grid row by row (south to north, west to east).
    pub fn iter(&self) -> GridIter<'_> {
        GridIter { grid: self, row: 0, col: 0 }
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = GeoPoint;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> GridIter<'a> {
        self.iter()
    }
}

/// Iterator returned by [`Grid::iter`].
#[derive(Clone, Debug)]
pub struct GridIter<'a> {
    grid: &'a Grid,
    row:  usize,
    col:  usize,
}

impl Iterator for GridIter<'_> {
    type Item = GeoPoint;

    fn next(&mut self) -> Option<GeoPoint> {
        let half = self.grid.half_span?;
        let width = 2 * half + 1;

        while self.row < width {
            let (row, col) = (self.row, self.col);
            self.col += 1;
            if self.col == width {
                self.col = 0;
                self.row += 1;
            }

            let p = GeoPoint::new(
                self.grid.center.lat + (row as f64 - half as f64) * self.grid.lat_step,
                self.grid.center.lon + (col as f64 - half as f64) * self.grid.lon_step,
            );
            if self.grid.center.distance_m(p) <= self.grid.radius_m {
                return Some(p);
            }
        }
        None
    }
}
