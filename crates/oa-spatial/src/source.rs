//! Road-segment providers.
//!
//! # CSV format
//!
//! One row per segment.  Only the four coordinate columns are required;
//! `start_lon`/`end_lon`, `highway`/`class`, `oneway` and `speed` are accepted
//! as aliases.
//!
//! ```csv
//! name,start_lat,start_lng,end_lat,end_lng,road_class,one_way,speed_kmh
//! Wellington St,45.42340,-75.70370,45.42270,-75.69560,primary,false,50
//! Queensway,45.41390,-75.71700,45.41840,-75.68050,motorway,true,
//! ```
//!
//! Rows with missing or non-numeric coordinates are logged and skipped; a
//! structurally broken file (unbalanced quotes, unreadable bytes) fails the
//! whole load so the caller can fall back to another source.

use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use oa_core::GeoPoint;

use crate::segment::{RoadClass, RoadSegment, SegmentRecord};
use crate::SpatialResult;

// ── SegmentSource trait ───────────────────────────────────────────────────────

/// Anything that can deliver an ordered collection of road segments.
///
/// Implementations must be `Send + Sync` so a [`RoadGraph`](crate::RoadGraph)
/// holding them can be shared across request handlers.
pub trait SegmentSource: Send + Sync {
    /// Short label used in log lines and errors.
    fn name(&self) -> &str;

    /// Load every segment.  An `Err` means the source is unavailable; an
    /// empty `Ok` means it is available but holds no data.
    fn load(&self) -> SpatialResult<Vec<RoadSegment>>;
}

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Segments read from a CSV file on every [`load`](SegmentSource::load).
#[derive(Clone, Debug)]
pub struct CsvSegmentSource {
    label: String,
    path:  PathBuf,
}

impl CsvSegmentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self { label: format!("csv:{}", path.display()), path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SegmentSource for CsvSegmentSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn load(&self) -> SpatialResult<Vec<RoadSegment>> {
        let file = std::fs::File::open(&self.path)?;
        read_segments_csv(file)
    }
}

/// Parse segments from any CSV `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`) or for bytes already
/// fetched by the ingestion layer.
pub fn read_segments_csv<R: Read>(reader: R) -> SpatialResult<Vec<RoadSegment>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut segments = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in csv_reader.deserialize::<SegmentRecord>().enumerate() {
        let record = result?;
        match RoadSegment::try_from(record) {
            Ok(seg) => segments.push(seg),
            Err(e) => {
                skipped += 1;
                // Header is line 1, so data row `row` sits on line `row + 2`.
                warn!("skipping CSV line {}: {e}", row + 2);
            }
        }
    }

    debug!("read {} road segments from CSV ({skipped} skipped)", segments.len());
    Ok(segments)
}

// ── Static ────────────────────────────────────────────────────────────────────

/// An in-memory, pre-validated segment list.
#[derive(Clone, Debug, Default)]
pub struct StaticSegmentSource {
    label:    String,
    segments: Vec<RoadSegment>,
}

impl StaticSegmentSource {
    pub fn new(label: impl Into<String>, segments: Vec<RoadSegment>) -> Self {
        Self { label: label.into(), segments }
    }

    /// A source that is available but holds nothing.
    pub fn empty() -> Self {
        Self::new("empty", Vec::new())
    }

    /// Hand-curated arterials of central Ottawa.
    ///
    /// Used as the fallback when the bulk network dataset cannot be read.
    /// Coarse on purpose: one segment per block-scale stretch, enough to
    /// connect the downtown core, the ByWard Market, Centretown, the Glebe,
    /// and the hospital district.
    pub fn ottawa_core() -> Self {
        let seg = |name: &str, a: (f64, f64), b: (f64, f64), class: RoadClass| {
            RoadSegment::new(name, GeoPoint::new(a.0, a.1), GeoPoint::new(b.0, b.1), class)
        };

        use RoadClass::{Motorway, Primary, Secondary, Tertiary};
        let segments = vec![
            // East–west
            seg("Wellington Street", (45.42180, -75.71120), (45.42340, -75.70370), Primary),
            seg("Wellington Street", (45.42340, -75.70370), (45.42500, -75.69580), Primary),
            seg("Rideau Street",     (45.42500, -75.69580), (45.42680, -75.68800), Primary),
            seg("Rideau Street",     (45.42680, -75.68800), (45.43000, -75.67800), Primary),
            seg("Laurier Avenue",    (45.41780, -75.70620), (45.42000, -75.69560), Secondary),
            seg("Laurier Avenue",    (45.42000, -75.69560), (45.42330, -75.68390), Secondary),
            seg("Somerset Street",   (45.41350, -75.70380), (45.41600, -75.69160), Tertiary),
            seg("Gladstone Avenue",  (45.40880, -75.70090), (45.41120, -75.68940), Tertiary),
            seg("Carling Avenue",    (45.39540, -75.72980), (45.39890, -75.70590), Primary),
            seg("Queensway",         (45.40870, -75.72800), (45.41370, -75.70080), Motorway),
            seg("Queensway",         (45.41370, -75.70080), (45.41840, -75.68050), Motorway),
            seg("Smyth Road",        (45.40160, -75.67550), (45.40310, -75.65050), Secondary),
            // North–south
            seg("Bank Street",       (45.42340, -75.70370), (45.41780, -75.70620), Primary),
            seg("Bank Street",       (45.41780, -75.70620), (45.41350, -75.70380), Primary),
            seg("Bank Street",       (45.41350, -75.70380), (45.40880, -75.70090), Primary),
            seg("Bank Street",       (45.40880, -75.70090), (45.39890, -75.70590), Primary),
            seg("Elgin Street",      (45.42500, -75.69580), (45.42000, -75.69560), Secondary),
            seg("Elgin Street",      (45.42000, -75.69560), (45.41600, -75.69160), Secondary),
            seg("Elgin Street",      (45.41600, -75.69160), (45.41120, -75.68940), Secondary),
            seg("Nicholas Street",   (45.42680, -75.68800), (45.42330, -75.68390), Primary),
            seg("Nicholas Street",   (45.42330, -75.68390), (45.41840, -75.68050), Primary),
            seg("Main Street",       (45.41840, -75.68050), (45.40160, -75.67550), Secondary),
            seg("Sussex Drive",      (45.42680, -75.68800), (45.43400, -75.69300), Primary),
            seg("Bronson Avenue",    (45.41370, -75.70080), (45.40870, -75.70300), Secondary),
        ];
        Self::new("ottawa-core", segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl SegmentSource for StaticSegmentSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn load(&self) -> SpatialResult<Vec<RoadSegment>> {
        Ok(self.segments.clone())
    }
}
