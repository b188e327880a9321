//! Road segments: the raw unit of ingestion.
//!
//! A [`RoadSegment`] is a straight stretch between two coordinates with a
//! name, a [`RoadClass`], a one-way flag, and a speed.  Segments only become
//! graph edges inside [`build_network`](crate::build_network).
//!
//! Ingestion layers that deliver untyped rows (CSV, JSON) go through
//! [`SegmentRecord`], whose `TryFrom` conversion is the single place where
//! coordinates are validated.

use std::fmt;

use serde::{Deserialize, Serialize};

use oa_core::GeoPoint;

use crate::SpatialError;

// ── RoadClass ─────────────────────────────────────────────────────────────────

/// Road classification, following OSM `highway=*` values.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Motorway,
    MotorwayLink,
    Trunk,
    TrunkLink,
    Primary,
    PrimaryLink,
    Secondary,
    SecondaryLink,
    Tertiary,
    TertiaryLink,
    Residential,
    LivingStreet,
    Unclassified,
    Service,
    Track,
    Cycleway,
    Pedestrian,
    Footway,
    Steps,
    Path,
    #[default]
    Unknown,
}

impl RoadClass {
    /// Parse a class tag.  Case-insensitive; `-`, `_` and spaces are
    /// interchangeable.  Municipal aliases (`arterial`, `collector`, `local`,
    /// `freeway`) map onto their OSM equivalents.  Anything unrecognised is
    /// [`RoadClass::Unknown`].
    pub fn parse(tag: &str) -> RoadClass {
        let norm: String = tag
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match norm.as_str() {
            "motorway" | "freeway" | "highway" | "expressway" => RoadClass::Motorway,
            "motorway_link" | "ramp"                          => RoadClass::MotorwayLink,
            "trunk"                                           => RoadClass::Trunk,
            "trunk_link"                                      => RoadClass::TrunkLink,
            "primary" | "arterial" | "major_arterial"         => RoadClass::Primary,
            "primary_link"                                    => RoadClass::PrimaryLink,
            "secondary" | "collector" | "minor_arterial"      => RoadClass::Secondary,
            "secondary_link"                                  => RoadClass::SecondaryLink,
            "tertiary"                                        => RoadClass::Tertiary,
            "tertiary_link"                                   => RoadClass::TertiaryLink,
            "residential" | "local"                           => RoadClass::Residential,
            "living_street"                                   => RoadClass::LivingStreet,
            "unclassified" | "road"                           => RoadClass::Unclassified,
            "service" | "lane"                                => RoadClass::Service,
            "track"                                           => RoadClass::Track,
            "cycleway"                                        => RoadClass::Cycleway,
            "pedestrian"                                      => RoadClass::Pedestrian,
            "footway" | "sidewalk"                            => RoadClass::Footway,
            "steps"                                           => RoadClass::Steps,
            "path" | "trail"                                  => RoadClass::Path,
            _                                                 => RoadClass::Unknown,
        }
    }

    /// Canonical tag, as written by [`parse`](Self::parse)'s OSM spellings.
    pub fn as_str(self) -> &'static str {
        match self {
            RoadClass::Motorway      => "motorway",
            RoadClass::MotorwayLink  => "motorway_link",
            RoadClass::Trunk         => "trunk",
            RoadClass::TrunkLink     => "trunk_link",
            RoadClass::Primary       => "primary",
            RoadClass::PrimaryLink   => "primary_link",
            RoadClass::Secondary     => "secondary",
            RoadClass::SecondaryLink => "secondary_link",
            RoadClass::Tertiary      => "tertiary",
            RoadClass::TertiaryLink  => "tertiary_link",
            RoadClass::Residential   => "residential",
            RoadClass::LivingStreet  => "living_street",
            RoadClass::Unclassified  => "unclassified",
            RoadClass::Service       => "service",
            RoadClass::Track         => "track",
            RoadClass::Cycleway      => "cycleway",
            RoadClass::Pedestrian    => "pedestrian",
            RoadClass::Footway       => "footway",
            RoadClass::Steps         => "steps",
            RoadClass::Path          => "path",
            RoadClass::Unknown       => "unknown",
        }
    }

    /// Assumed travel speed (km/h) when a segment carries no posted speed.
    pub fn default_speed_kmh(self) -> f64 {
        match self {
            RoadClass::Motorway                          => 100.0,
            RoadClass::Trunk                             => 90.0,
            RoadClass::MotorwayLink | RoadClass::Primary => 70.0,
            RoadClass::Secondary                         => 60.0,
            RoadClass::TrunkLink                         => 60.0,
            RoadClass::PrimaryLink
            | RoadClass::SecondaryLink
            | RoadClass::Tertiary                        => 50.0,
            RoadClass::TertiaryLink
            | RoadClass::Residential
            | RoadClass::Unclassified
            | RoadClass::Unknown                         => 40.0,
            RoadClass::LivingStreet | RoadClass::Service => 20.0,
            RoadClass::Track | RoadClass::Cycleway       => 15.0,
            RoadClass::Pedestrian
            | RoadClass::Footway
            | RoadClass::Steps
            | RoadClass::Path                            => 5.0,
        }
    }

    /// Retention priority when a network is truncated: lower keeps first.
    pub fn priority(self) -> u8 {
        match self {
            RoadClass::Motorway | RoadClass::MotorwayLink   => 0,
            RoadClass::Trunk | RoadClass::TrunkLink         => 1,
            RoadClass::Primary | RoadClass::PrimaryLink     => 2,
            RoadClass::Secondary | RoadClass::SecondaryLink => 3,
            RoadClass::Tertiary | RoadClass::TertiaryLink   => 4,
            RoadClass::Residential
            | RoadClass::Unclassified
            | RoadClass::LivingStreet                       => 5,
            RoadClass::Service                              => 6,
            RoadClass::Track                                => 7,
            RoadClass::Cycleway                             => 8,
            RoadClass::Pedestrian
            | RoadClass::Footway
            | RoadClass::Steps
            | RoadClass::Path                               => 9,
            RoadClass::Unknown                              => 10,
        }
    }

    /// Classes for which a one-way flag suppresses the reverse edge.
    /// One-way flags on every other class are ignored (pedestrians walk both
    /// ways down a one-way residential street).
    #[inline]
    pub fn is_oneway_restricted(self) -> bool {
        matches!(
            self,
            RoadClass::Motorway | RoadClass::MotorwayLink | RoadClass::Trunk | RoadClass::TrunkLink
        )
    }
}

impl From<&str> for RoadClass {
    fn from(tag: &str) -> Self {
        RoadClass::parse(tag)
    }
}

impl fmt::Display for RoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── RoadSegment ───────────────────────────────────────────────────────────────

/// A validated stretch of road.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub name:      String,
    pub start:     GeoPoint,
    pub end:       GeoPoint,
    pub class:     RoadClass,
    pub one_way:   bool,
    /// Posted or class-inferred speed in km/h.  Always positive.
    pub speed_kmh: f64,
}

impl RoadSegment {
    /// Two-way segment at the class default speed.
    pub fn new(name: impl Into<String>, start: GeoPoint, end: GeoPoint, class: RoadClass) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            class,
            one_way: false,
            speed_kmh: class.default_speed_kmh(),
        }
    }

    pub fn one_way(mut self, one_way: bool) -> Self {
        self.one_way = one_way;
        self
    }

    /// Override the speed.  Non-positive or non-finite values are ignored.
    pub fn with_speed_kmh(mut self, speed_kmh: f64) -> Self {
        if speed_kmh.is_finite() && speed_kmh > 0.0 {
            self.speed_kmh = speed_kmh;
        }
        self
    }

    #[inline]
    pub fn speed_mps(&self) -> f64 {
        self.speed_kmh / 3.6
    }

    /// `true` if both endpoints are usable coordinates.
    #[inline]
    pub fn has_valid_endpoints(&self) -> bool {
        self.start.is_valid() && self.end.is_valid()
    }

    /// `true` if the builder must emit only the forward edge.
    #[inline]
    pub fn is_forward_only(&self) -> bool {
        self.one_way && self.class.is_oneway_restricted()
    }
}

// ── SegmentRecord ─────────────────────────────────────────────────────────────

/// An untyped row as delivered by an ingestion layer.
///
/// Every field is optional text so that a bad cell in one row can be
/// reported and skipped instead of failing the whole file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SegmentRecord {
    #[serde(default)]
    pub name:       Option<String>,
    #[serde(default)]
    pub start_lat:  Option<String>,
    #[serde(default, alias = "start_lon")]
    pub start_lng:  Option<String>,
    #[serde(default)]
    pub end_lat:    Option<String>,
    #[serde(default, alias = "end_lon")]
    pub end_lng:    Option<String>,
    #[serde(default, alias = "highway", alias = "class")]
    pub road_class: Option<String>,
    #[serde(default, alias = "oneway")]
    pub one_way:    Option<String>,
    #[serde(default, alias = "speed")]
    pub speed_kmh:  Option<String>,
}

impl TryFrom<SegmentRecord> for RoadSegment {
    type Error = SpatialError;

    fn try_from(rec: SegmentRecord) -> Result<Self, Self::Error> {
        let name = rec
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unnamed")
            .to_owned();

        let coord = |field: &str, value: &Option<String>| -> Result<f64, SpatialError> {
            let raw = value.as_deref().map(str::trim).unwrap_or("");
            if raw.is_empty() {
                return Err(SpatialError::MalformedSegment {
                    name: name.clone(),
                    reason: format!("missing {field}"),
                });
            }
            raw.parse::<f64>().map_err(|_| SpatialError::MalformedSegment {
                name: name.clone(),
                reason: format!("{field} {raw:?} is not numeric"),
            })
        };

        let start_lat = coord("start_lat", &rec.start_lat)?;
        let start_lng = coord("start_lng", &rec.start_lng)?;
        let end_lat = coord("end_lat", &rec.end_lat)?;
        let end_lng = coord("end_lng", &rec.end_lng)?;

        let to_point = |lat: f64, lon: f64| {
            GeoPoint::try_new(lat, lon).map_err(|e| SpatialError::MalformedSegment {
                name: name.clone(),
                reason: e.to_string(),
            })
        };
        let start = to_point(start_lat, start_lng)?;
        let end = to_point(end_lat, end_lng)?;

        let class = rec.road_class.as_deref().map(RoadClass::parse).unwrap_or_default();
        let one_way = rec.one_way.as_deref().is_some_and(parse_flag);
        let speed = rec
            .speed_kmh
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(f64::NAN);

        Ok(RoadSegment::new(name, start, end, class)
            .one_way(one_way)
            .with_speed_kmh(speed))
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "y" | "true" | "1")
}
