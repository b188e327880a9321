//! ottawa — travel-time queries over the downtown Ottawa road graph.
//!
//! ```text
//! ottawa [road_segments.csv] [config.json]
//! ```
//!
//! Without a CSV path the hand-curated downtown arterials are used.  With
//! one, the curated set is still registered as the fallback, so a missing or
//! empty file degrades to the coarse network instead of failing.  The JSON
//! config may override any `GraphConfig` key.
//!
//! Set `RUST_LOG=debug` to watch graph batches and search outcomes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use oa_core::{GeoPoint, grid};
use oa_spatial::{CsvSegmentSource, GraphConfig, RoadGraph, StaticSegmentSource};
use oa_travel::{ServiceType, TrafficLevel, TravelEstimator};

// ── Landmarks ─────────────────────────────────────────────────────────────────

const PARLIAMENT:     GeoPoint = GeoPoint::new(45.42360, -75.70090);
const RIDEAU_CENTRE:  GeoPoint = GeoPoint::new(45.42570, -75.69190);
const LANSDOWNE:      GeoPoint = GeoPoint::new(45.39840, -75.68410);
const BYWARD_MARKET:  GeoPoint = GeoPoint::new(45.42770, -75.69210);

const GENERAL_HOSPITAL: GeoPoint = GeoPoint::new(45.40170, -75.64880);
const FIRE_STATION_11:  GeoPoint = GeoPoint::new(45.41600, -75.69000);
const POLICE_HQ:        GeoPoint = GeoPoint::new(45.41390, -75.70060);

/// Grocery stores used for the nearest-amenity sweep.
const GROCERS: [GeoPoint; 4] = [
    GeoPoint::new(45.42660, -75.69010),
    GeoPoint::new(45.41630, -75.69330),
    GeoPoint::new(45.41050, -75.70150),
    GeoPoint::new(45.42110, -75.70560),
];

const SWEEP_RADIUS_M:  f64 = 1_000.0;
const SWEEP_STEP_M:    f64 = 250.0;
const AMENITY_RADIUS_M: f64 = 1_500.0;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let csv_path = args.next().map(PathBuf::from);
    let config = match args.next() {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<GraphConfig>(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => GraphConfig::default(),
    };
    config.validate()?;

    println!("=== ottawa — road-network travel times ===");

    // 1. Graph handle.  Nothing is loaded until the first query.
    let graph = match &csv_path {
        Some(path) => RoadGraph::new(CsvSegmentSource::new(path)).with_fallback(StaticSegmentSource::ottawa_core()),
        None => RoadGraph::new(StaticSegmentSource::ottawa_core()),
    };
    let graph = Arc::new(graph.with_options(config.build.clone()));

    let t0 = Instant::now();
    let network = graph.ensure_built()?;
    println!(
        "Road network: {} nodes, {} edges, {} named roads ({:.1} ms)",
        network.node_count(),
        network.edge_count(),
        network.roads.len(),
        t0.elapsed().as_secs_f64() * 1e3
    );
    println!();

    let travel = TravelEstimator::with_config(Arc::clone(&graph), config.routing.clone());

    // 2. Point-to-point queries.
    println!("{:<32} {:>9} {:>8} {:<16}", "Walk", "metres", "minutes", "method");
    println!("{}", "-".repeat(68));
    for (label, from, to) in [
        ("Parliament → Rideau Centre", PARLIAMENT, RIDEAU_CENTRE),
        ("Parliament → Lansdowne", PARLIAMENT, LANSDOWNE),
        ("ByWard Market → Rideau Centre", BYWARD_MARKET, RIDEAU_CENTRE),
        ("Parliament → Parliament", PARLIAMENT, PARLIAMENT),
    ] {
        let w = travel.walking_time(from, to)?;
        let mark = if w.is_estimate { "~" } else { "" };
        println!("{label:<32} {:>9.0} {:>7}{mark:1} {:<16}", w.meters, format!("{:.1}", w.minutes), w.method);
    }
    println!();

    println!("Drive Parliament → Lansdowne");
    for traffic in [TrafficLevel::Low, TrafficLevel::Medium, TrafficLevel::High] {
        let d = travel.driving_time(PARLIAMENT, LANSDOWNE, traffic)?;
        println!("  {traffic:<7} {:>5.1} min over {:.0} m ({})", d.minutes, d.meters, d.method);
    }
    println!();

    println!("Emergency response to the ByWard Market");
    for (service, station) in [
        (ServiceType::Hospital, GENERAL_HOSPITAL),
        (ServiceType::Fire, FIRE_STATION_11),
        (ServiceType::Police, POLICE_HQ),
    ] {
        let r = travel.emergency_response(station, BYWARD_MARKET, service)?;
        println!("  {service:<9} {:>5.1} min over {:.0} m ({})", r.minutes, r.meters, r.method);
    }
    println!();

    // 3. Grid sweep: nearest grocer on foot from every cell around Parliament.
    let cells: Vec<GeoPoint> = grid(PARLIAMENT, SWEEP_RADIUS_M, SWEEP_STEP_M).iter().collect();
    let t0 = Instant::now();
    let mut by_method: BTreeMap<String, usize> = BTreeMap::new();
    let mut worst = 0.0_f64;
    let mut unserved = 0usize;
    for &cell in &cells {
        match travel.nearest_by_walking(cell, &GROCERS, AMENITY_RADIUS_M)? {
            Some((_, w)) => {
                *by_method.entry(w.method.to_string()).or_default() += 1;
                worst = worst.max(w.minutes);
            }
            None => unserved += 1,
        }
    }
    info!("grid sweep routed {} cells in {:.2?}", cells.len(), t0.elapsed());

    println!("Nearest grocer sweep: {} cells every {SWEEP_STEP_M} m within {SWEEP_RADIUS_M} m", cells.len());
    for (method, count) in &by_method {
        println!("  {method:<16} {count}");
    }
    println!("  no grocer within {AMENITY_RADIUS_M} m: {unserved}");
    println!("  longest walk: {worst:.1} min");
    println!();

    // 4. Batched walks back to Parliament, then one full result as JSON.
    let pairs: Vec<(GeoPoint, GeoPoint)> = GROCERS.iter().map(|&g| (g, PARLIAMENT)).collect();
    let times = travel.walking_times(&pairs)?;
    let mean = times.iter().map(|w| w.minutes).sum::<f64>() / times.len() as f64;
    println!("Mean walk from a grocer to Parliament: {mean:.1} min");

    let path = travel.path(PARLIAMENT, RIDEAU_CENTRE)?;
    println!("{}", serde_json::to_string_pretty(&path)?);

    Ok(())
}
