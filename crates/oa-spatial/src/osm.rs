//! OSM PBF segment source — enabled with the `osm` Cargo feature.
//!
//! # Usage
//!
//! ```ignore
//! use oa_spatial::{RoadGraph, StaticSegmentSource};
//! use oa_spatial::osm::OsmPbfSource;
//!
//! let graph = RoadGraph::new(OsmPbfSource::new("ottawa.osm.pbf"))
//!     .with_fallback(StaticSegmentSource::ottawa_core());
//! ```
//!
//! # What is loaded
//!
//! Every `highway=*` way becomes one [`RoadSegment`] per consecutive node
//! pair, carrying the way's `name`, class, `oneway` flag, and `maxspeed`
//! (km/h, or mph when suffixed).  Non-road features are ignored.
//!
//! # Memory note
//!
//! All OSM node positions are buffered in a `HashMap<i64, GeoPoint>` for the
//! single pass, because ways reference nodes by OSM id.  For the City of
//! Ottawa extract this is a few million entries (≈ 100 MB).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use osmpbf::{Element, ElementReader};

use oa_core::GeoPoint;

use crate::segment::{RoadClass, RoadSegment};
use crate::source::SegmentSource;
use crate::{SpatialError, SpatialResult};

/// Road segments extracted from an OSM PBF file on every load.
#[derive(Clone, Debug)]
pub struct OsmPbfSource {
    label: String,
    path:  PathBuf,
}

impl OsmPbfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self { label: format!("osm:{}", path.display()), path }
    }
}

impl SegmentSource for OsmPbfSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn load(&self) -> SpatialResult<Vec<RoadSegment>> {
        load_segments_from_pbf(&self.path)
    }
}

/// Extract road segments from an OSM PBF file.
///
/// # Errors
///
/// Returns [`SpatialError::Osm`] on open or parse errors.
pub fn load_segments_from_pbf(path: &Path) -> SpatialResult<Vec<RoadSegment>> {
    let reader = ElementReader::from_path(path).map_err(|e| SpatialError::Osm(e.to_string()))?;

    let mut all_nodes: HashMap<i64, GeoPoint> = HashMap::new();
    let mut road_ways: Vec<OsmWay> = Vec::new();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::DenseNode(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::Way(w) => {
                // Collect tags eagerly so &str lifetimes don't escape the closure.
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let tag = |key: &str| tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

                if let Some(highway) = tag("highway") {
                    let class = RoadClass::parse(highway);
                    road_ways.push(OsmWay {
                        refs:      w.refs().collect(),
                        name:      tag("name").unwrap_or("unnamed").to_owned(),
                        class,
                        oneway:    is_oneway(class, tag("oneway")),
                        speed_kmh: tag("maxspeed").and_then(parse_maxspeed),
                    });
                }
            }
            _ => {}
        })
        .map_err(|e| SpatialError::Osm(e.to_string()))?;

    let mut segments = Vec::new();
    for way in &road_ways {
        for window in way.refs.windows(2) {
            if let (Some(&a), Some(&b)) = (all_nodes.get(&window[0]), all_nodes.get(&window[1])) {
                let mut seg = RoadSegment::new(way.name.clone(), a, b, way.class).one_way(way.oneway);
                if let Some(kmh) = way.speed_kmh {
                    seg = seg.with_speed_kmh(kmh);
                }
                segments.push(seg);
            }
        }
    }
    Ok(segments)
}

struct OsmWay {
    refs:      Vec<i64>,
    name:      String,
    class:     RoadClass,
    oneway:    bool,
    speed_kmh: Option<f64>,
}

/// Motorways and motorway links are implicitly one-way in OSM convention.
fn is_oneway(class: RoadClass, tag: Option<&str>) -> bool {
    let explicit = matches!(tag, Some("yes" | "1" | "true"));
    let implicit = matches!(class, RoadClass::Motorway | RoadClass::MotorwayLink);
    explicit || implicit
}

/// `"50"` → 50, `"30 mph"` → 48.3.  Anything else (`"signals"`, `"none"`)
/// is ignored.
fn parse_maxspeed(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some(mph) = raw.strip_suffix("mph") {
        return mph.trim().parse::<f64>().ok().map(|v| v * 1.609_344);
    }
    raw.trim_end_matches("km/h").trim().parse::<f64>().ok()
}
