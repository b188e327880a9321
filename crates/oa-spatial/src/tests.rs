//! Unit tests for oa-spatial.
//!
//! All tests use hand-crafted segments or networks so they run without any
//! dataset on disk.

#[cfg(test)]
mod helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use oa_core::{GeoPoint, NodeId};

    use crate::{
        BuildOptions, RoadClass, RoadNetwork, RoadNetworkBuilder, RoadSegment, SegmentSource,
        SpatialError, SpatialResult, build_network,
    };

    pub const A: GeoPoint = GeoPoint::new(0.0, 0.0);
    pub const B: GeoPoint = GeoPoint::new(0.0, 0.001);
    pub const C: GeoPoint = GeoPoint::new(0.0, 0.002);
    pub const D: GeoPoint = GeoPoint::new(0.0, 0.003);

    pub fn residential(name: &str, a: GeoPoint, b: GeoPoint) -> RoadSegment {
        RoadSegment::new(name, a, b, RoadClass::Residential).with_speed_kmh(50.0)
    }

    /// Straight line A–B–C–D along the equator, ~111 m per hop.
    pub fn line_segments() -> Vec<RoadSegment> {
        vec![
            residential("ab", A, B),
            residential("bc", B, C),
            residential("cd", C, D),
        ]
    }

    pub fn line_network() -> RoadNetwork {
        build_network(line_segments(), &BuildOptions::default())
    }

    /// Small grid with controlled edge lengths.
    ///
    /// Nodes (lat, lon):
    ///   0:(45.40,-75.70)  1:(45.40,-75.69)  2:(45.40,-75.68)
    ///   3:(45.41,-75.70)                    4:(45.41,-75.68)
    ///
    /// Undirected edges with lengths (m): 0-1 100, 1-2 100, 2-4 100,
    /// 0-3 500, 3-4 100.  Shortest 0→4 is 0→1→2→4 = 300 m.
    pub fn grid_network() -> (RoadNetwork, [NodeId; 5]) {
        let mut b = RoadNetworkBuilder::new();
        let road = b.road_for("grid", RoadClass::Residential);

        let n0 = b.node_for(GeoPoint::new(45.40, -75.70));
        let n1 = b.node_for(GeoPoint::new(45.40, -75.69));
        let n2 = b.node_for(GeoPoint::new(45.40, -75.68));
        let n3 = b.node_for(GeoPoint::new(45.41, -75.70));
        let n4 = b.node_for(GeoPoint::new(45.41, -75.68));

        b.add_road(n0, n1, road, 100.0, 7_200);
        b.add_road(n1, n2, road, 100.0, 7_200);
        b.add_road(n2, n4, road, 100.0, 7_200);
        b.add_road(n0, n3, road, 500.0, 36_000);
        b.add_road(n3, n4, road, 100.0, 7_200);

        (b.build(), [n0, n1, n2, n3, n4])
    }

    /// Source that counts loads and fails the first `failures` of them.
    pub struct FlakySource {
        pub loads:    AtomicUsize,
        pub failures: usize,
        pub segments: Vec<RoadSegment>,
    }

    impl FlakySource {
        pub fn new(failures: usize, segments: Vec<RoadSegment>) -> Self {
            Self { loads: AtomicUsize::new(0), failures, segments }
        }
    }

    impl SegmentSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn load(&self) -> SpatialResult<Vec<RoadSegment>> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(SpatialError::SourceFailed { source_name: "flaky".into(), reason: "offline".into() })
            } else {
                Ok(self.segments.clone())
            }
        }
    }

    impl SegmentSource for std::sync::Arc<FlakySource> {
        fn name(&self) -> &str {
            self.as_ref().name()
        }

        fn load(&self) -> SpatialResult<Vec<RoadSegment>> {
            self.as_ref().load()
        }
    }
}

// ── Segments & records ────────────────────────────────────────────────────────

#[cfg(test)]
mod segments {
    use crate::{RoadClass, RoadSegment, SegmentRecord, SpatialError};

    fn record(start_lat: &str) -> SegmentRecord {
        SegmentRecord {
            name:       Some("Bank Street".into()),
            start_lat:  Some(start_lat.into()),
            start_lng:  Some("-75.70370".into()),
            end_lat:    Some("45.41780".into()),
            end_lng:    Some("-75.70620".into()),
            road_class: None,
            one_way:    None,
            speed_kmh:  None,
        }
    }

    #[test]
    fn class_parsing_is_lenient() {
        assert_eq!(RoadClass::parse("Motorway-Link"), RoadClass::MotorwayLink);
        assert_eq!(RoadClass::parse(" living street "), RoadClass::LivingStreet);
        assert_eq!(RoadClass::parse("arterial"), RoadClass::Primary);
        assert_eq!(RoadClass::parse("collector"), RoadClass::Secondary);
        assert_eq!(RoadClass::parse("local"), RoadClass::Residential);
        assert_eq!(RoadClass::parse("bridleway"), RoadClass::Unknown);
        assert_eq!(RoadClass::from("FOOTWAY"), RoadClass::Footway);
    }

    #[test]
    fn speed_table_spans_motorway_to_footway() {
        assert_eq!(RoadClass::Motorway.default_speed_kmh(), 100.0);
        assert_eq!(RoadClass::Footway.default_speed_kmh(), 5.0);
        assert!(RoadClass::Primary.default_speed_kmh() > RoadClass::Residential.default_speed_kmh());
    }

    #[test]
    fn priority_orders_major_roads_first() {
        let order = [
            RoadClass::Motorway,
            RoadClass::Trunk,
            RoadClass::Primary,
            RoadClass::Secondary,
            RoadClass::Tertiary,
            RoadClass::Residential,
            RoadClass::Service,
            RoadClass::Path,
        ];
        assert!(order.windows(2).all(|w| w[0].priority() < w[1].priority()));
    }

    #[test]
    fn oneway_restriction_only_on_highways() {
        for class in [RoadClass::Motorway, RoadClass::MotorwayLink, RoadClass::Trunk, RoadClass::TrunkLink] {
            assert!(class.is_oneway_restricted(), "{class}");
        }
        assert!(!RoadClass::Primary.is_oneway_restricted());
        assert!(!RoadClass::Residential.is_oneway_restricted());
    }

    #[test]
    fn record_defaults() {
        let seg = RoadSegment::try_from(record("45.42340")).unwrap();
        assert_eq!(seg.name, "Bank Street");
        assert_eq!(seg.class, RoadClass::Unknown);
        assert!(!seg.one_way);
        assert_eq!(seg.speed_kmh, RoadClass::Unknown.default_speed_kmh());
    }

    #[test]
    fn record_explicit_fields() {
        let mut rec = record("45.42340");
        rec.road_class = Some("motorway".into());
        rec.one_way = Some("Yes".into());
        rec.speed_kmh = Some("80".into());
        let seg = RoadSegment::try_from(rec).unwrap();
        assert_eq!(seg.class, RoadClass::Motorway);
        assert!(seg.one_way);
        assert!(seg.is_forward_only());
        assert_eq!(seg.speed_kmh, 80.0);
    }

    #[test]
    fn nonpositive_speed_falls_back_to_class() {
        let mut rec = record("45.42340");
        rec.road_class = Some("residential".into());
        rec.speed_kmh = Some("0".into());
        let seg = RoadSegment::try_from(rec).unwrap();
        assert_eq!(seg.speed_kmh, 40.0);
    }

    #[test]
    fn non_numeric_coordinate_is_malformed() {
        let err = RoadSegment::try_from(record("north-ish")).unwrap_err();
        assert!(matches!(err, SpatialError::MalformedSegment { .. }), "{err}");
    }

    #[test]
    fn missing_coordinate_is_malformed() {
        let mut rec = record("45.42340");
        rec.end_lng = None;
        assert!(matches!(RoadSegment::try_from(rec), Err(SpatialError::MalformedSegment { .. })));
    }

    #[test]
    fn out_of_range_coordinate_is_malformed() {
        assert!(RoadSegment::try_from(record("145.0")).is_err());
    }
}

// ── Sources ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod sources {
    use std::io::{Cursor, Write};

    use crate::{CsvSegmentSource, RoadClass, SegmentSource, SpatialError, StaticSegmentSource, read_segments_csv};

    const CSV: &str = "\
name,start_lat,start_lng,end_lat,end_lng,road_class,one_way,speed_kmh
Wellington Street,45.42340,-75.70370,45.42500,-75.69580,primary,false,50
Queensway,45.41370,-75.70080,45.41840,-75.68050,motorway,true,
Broken Row,not-a-number,-75.70000,45.42000,-75.69000,residential,,
Missing End,45.42000,-75.69000,,,residential,,
Bare Minimum,45.41000,-75.69000,45.41100,-75.69100,,,
";

    #[test]
    fn reads_rows_and_skips_malformed() {
        let segs = read_segments_csv(Cursor::new(CSV)).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].name, "Wellington Street");
        assert_eq!(segs[0].speed_kmh, 50.0);
        assert_eq!(segs[1].class, RoadClass::Motorway);
        assert!(segs[1].one_way);
        assert_eq!(segs[1].speed_kmh, 100.0);
        assert_eq!(segs[2].class, RoadClass::Unknown);
    }

    #[test]
    fn accepts_column_aliases() {
        let csv = "name,start_lat,start_lon,end_lat,end_lon,highway,oneway,speed\n\
                   Elgin,45.42,-75.695,45.416,-75.691,secondary,yes,40\n";
        let segs = read_segments_csv(Cursor::new(csv)).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].class, RoadClass::Secondary);
        assert!(segs[0].one_way);
        assert_eq!(segs[0].speed_kmh, 40.0);
    }

    #[test]
    fn csv_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        let source = CsvSegmentSource::new(file.path());
        assert!(source.name().starts_with("csv:"));
        assert_eq!(source.load().unwrap().len(), 3);
    }

    #[test]
    fn missing_csv_file_is_io_error() {
        let source = CsvSegmentSource::new("/definitely/not/here.csv");
        assert!(matches!(source.load(), Err(SpatialError::Io(_))));
    }

    #[test]
    fn ottawa_fallback_is_usable() {
        let source = StaticSegmentSource::ottawa_core();
        let segs = source.load().unwrap();
        assert!(!segs.is_empty());
        assert!(segs.iter().all(|s| s.has_valid_endpoints()));
        assert!(StaticSegmentSource::empty().load().unwrap().is_empty());
    }
}

// ── Graph construction ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use oa_core::GeoPoint;

    use crate::{
        BuildOptions, CoordKey, RoadClass, RoadNetworkBuilder, RoadSegment, StaticSegmentSource,
        SegmentSource, build_network, merge_intersections,
    };

    use super::helpers::{self, A, B, C, D};

    #[test]
    fn empty_build() {
        let net = build_network(Vec::new(), &BuildOptions::default());
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.edge_count(), 0);
        assert!(net.is_empty());
    }

    #[test]
    fn line_nodes_and_edges() {
        let net = helpers::line_network();
        assert_eq!(net.node_count(), 4);
        assert_eq!(net.edge_count(), 6); // 3 segments × 2 directions

        let (a, b) = (net.node_at(A).unwrap(), net.node_at(B).unwrap());
        let e = net.edge_between(a, b).unwrap();
        assert!((net.edge_length_m[e.index()] - A.distance_m(B)).abs() < 1e-6);
        assert_eq!(net.road(e).name, "ab");
        assert_eq!(net.road(e).class, RoadClass::Residential);

        // 111.19 m at 50 km/h ≈ 8.0 s.
        let ms = net.edge_travel_ms[e.index()];
        assert!((7_900..8_100).contains(&ms), "{ms} ms");
    }

    #[test]
    fn shared_endpoints_collapse_to_one_node() {
        let mut b = RoadNetworkBuilder::new();
        let first = b.node_for(GeoPoint::new(45.423400, -75.703700));
        let again = b.node_for(GeoPoint::new(45.4234004, -75.7036996));
        assert_eq!(first, again);
        assert_eq!(b.node_count(), 1);
        assert_eq!(b.node_pos(first), CoordKey::of(GeoPoint::new(45.4234, -75.7037)).point());
    }

    #[test]
    fn restricted_oneway_is_forward_only() {
        let seg = RoadSegment::new("Queensway", A, B, RoadClass::Motorway).one_way(true);
        let net = build_network(vec![seg], &BuildOptions::default());
        let (a, b) = (net.node_at(A).unwrap(), net.node_at(B).unwrap());
        assert_eq!(net.edge_count(), 1);
        assert!(net.has_edge(a, b));
        assert!(!net.has_edge(b, a));
    }

    #[test]
    fn unrestricted_oneway_keeps_both_directions() {
        let seg = RoadSegment::new("Albert Street", A, B, RoadClass::Secondary).one_way(true);
        let net = build_network(vec![seg], &BuildOptions::default());
        let (a, b) = (net.node_at(A).unwrap(), net.node_at(B).unwrap());
        assert!(net.has_edge(a, b));
        assert!(net.has_edge(b, a));
    }

    #[test]
    fn every_edge_is_mirrored_without_oneways() {
        let segs = StaticSegmentSource::ottawa_core().load().unwrap();
        let net = build_network(segs, &BuildOptions::default());
        assert!(net.edge_count() > 0);
        for e in 0..net.edge_count() {
            let (from, to) = (net.edge_from[e], net.edge_to[e]);
            assert!(net.has_edge(to, from), "edge {from} → {to} has no reverse");
        }
    }

    #[test]
    fn no_dangling_edges() {
        let segs = StaticSegmentSource::ottawa_core().load().unwrap();
        let net = build_network(segs, &BuildOptions::default());
        let n = net.node_count();
        assert_eq!(net.node_out_start.len(), n + 1);
        assert!(net.edge_from.iter().chain(&net.edge_to).all(|id| id.index() < n));
    }

    #[test]
    fn invalid_segments_are_skipped() {
        let mut segs = helpers::line_segments();
        segs.push(RoadSegment::new("nan", GeoPoint::new(f64::NAN, 0.0), A, RoadClass::Residential));
        let net = build_network(segs, &BuildOptions::default());
        assert_eq!(net.node_count(), 4);
    }

    #[test]
    fn degenerate_segment_adds_no_edge() {
        let seg = helpers::residential("dot", A, GeoPoint::new(0.000001, 0.000001));
        let net = build_network(vec![seg], &BuildOptions::default());
        assert_eq!(net.node_count(), 1);
        assert_eq!(net.edge_count(), 0);
    }

    #[test]
    fn near_coincident_endpoints_merge() {
        // Second segment starts ~11 m from where the first ends.
        let end_1 = GeoPoint::new(45.4200, -75.6950);
        let start_2 = GeoPoint::new(45.4201, -75.6950);
        let segs = vec![
            helpers::residential("west", GeoPoint::new(45.4200, -75.7000), end_1),
            helpers::residential("east", start_2, GeoPoint::new(45.4200, -75.6900)),
        ];

        let merged = build_network(segs.clone(), &BuildOptions::default());
        assert_eq!(merged.node_count(), 3);

        let off = BuildOptions { merge_intersections: false, ..BuildOptions::default() };
        assert_eq!(build_network(segs, &off).node_count(), 4);
    }

    #[test]
    fn merge_moves_pair_to_midpoint() {
        let p = GeoPoint::new(45.4200, -75.6950);
        let q = GeoPoint::new(45.4202, -75.6950);
        let mut segs = vec![
            helpers::residential("west", GeoPoint::new(45.4200, -75.7000), p),
            helpers::residential("east", q, GeoPoint::new(45.4200, -75.6900)),
        ];
        let moved = merge_intersections(&mut segs, 50.0);
        assert_eq!(moved, 2);
        assert_eq!(segs[0].end, segs[1].start);
        assert!((segs[0].end.lat - 45.4201).abs() < 1e-9);
    }

    #[test]
    fn merge_never_collapses_a_short_segment() {
        let mut segs = vec![helpers::residential("stub", A, GeoPoint::new(0.0, 0.0002))]; // ~22 m
        assert_eq!(merge_intersections(&mut segs, 50.0), 0);
        let net = build_network(segs, &BuildOptions::default());
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn merge_skipped_for_large_inputs() {
        let segs = vec![
            helpers::residential("west", GeoPoint::new(45.4200, -75.7000), GeoPoint::new(45.4200, -75.6950)),
            helpers::residential("east", GeoPoint::new(45.4201, -75.6950), GeoPoint::new(45.4200, -75.6900)),
        ];
        let opts = BuildOptions { merge_max_segments: 2, ..BuildOptions::default() };
        assert_eq!(build_network(segs, &opts).node_count(), 4);
    }

    #[test]
    fn large_inputs_keep_major_roads() {
        let segs = vec![
            RoadSegment::new("trail", A, B, RoadClass::Footway),
            RoadSegment::new("street", B, C, RoadClass::Residential),
            RoadSegment::new("highway", C, D, RoadClass::Motorway),
        ];
        let opts = BuildOptions { large_graph_threshold: 2, ..BuildOptions::default() };
        let net = build_network(segs, &opts);
        let classes: Vec<_> = net.roads.iter().map(|r| r.class).collect();
        assert!(classes.contains(&RoadClass::Motorway));
        assert!(classes.contains(&RoadClass::Residential));
        assert!(!classes.contains(&RoadClass::Footway));
        assert!(net.node_at(A).is_none());
    }

    #[test]
    fn batching_does_not_change_the_graph() {
        let segs = StaticSegmentSource::ottawa_core().load().unwrap();
        let one = build_network(segs.clone(), &BuildOptions { batch_size: 1, ..BuildOptions::default() });
        let all = build_network(segs, &BuildOptions::default());
        assert_eq!(one.node_count(), all.node_count());
        assert_eq!(one.edge_count(), all.edge_count());
        assert_eq!(one.edge_to, all.edge_to);
    }
}

// ── Snapping ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use oa_core::GeoPoint;

    use crate::RoadNetwork;

    use super::helpers;

    #[test]
    fn own_coordinate_snaps_at_zero() {
        let (net, nodes) = helpers::grid_network();
        for id in nodes {
            let s = net.snap(net.node_pos[id.index()], 500.0).unwrap();
            assert_eq!(s.node, id);
            assert_eq!(s.distance_m, 0.0);
        }
    }

    #[test]
    fn nearest_within_threshold() {
        let net = helpers::line_network();
        // 30 m north of B, still closer to B than to A or C.
        let p = GeoPoint::new(0.00027, 0.0011);
        let s = net.snap(p, 500.0).unwrap();
        assert_eq!(s.node, net.node_at(helpers::B).unwrap());
        assert!((s.distance_m - p.distance_m(helpers::B)).abs() < 1e-9);
    }

    #[test]
    fn beyond_threshold_is_none() {
        let net = helpers::line_network();
        let far = GeoPoint::new(0.01, 0.0); // ~1.1 km north of A
        assert!(net.snap(far, 500.0).is_none());
        assert!(net.snap(far, 2_000.0).is_some());
    }

    #[test]
    fn agrees_with_linear_scan() {
        let (net, _) = helpers::grid_network();
        let probes = [
            GeoPoint::new(45.4031, -75.6951),
            GeoPoint::new(45.4079, -75.6822),
            GeoPoint::new(45.4055, -75.7004),
        ];
        for p in probes {
            let brute = (0..net.node_count())
                .map(|i| (i, p.distance_m(net.node_pos[i])))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap();
            let s = net.snap(p, 5_000.0).unwrap();
            assert_eq!(s.node.index(), brute.0, "probe {p}");
        }
    }

    #[test]
    fn empty_network_returns_none() {
        let net = RoadNetwork::empty();
        assert!(net.snap(GeoPoint::new(0.0, 0.0), 500.0).is_none());
    }
}

// ── Path engine ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use oa_core::GeoPoint;

    use crate::{
        BuildOptions, FrontierPolicy, PathMethod, RoadNetwork, RoutingConfig, StaticSegmentSource,
        SegmentSource, build_network, find_path,
    };

    use super::helpers::{self, A, B, C};

    fn cfg() -> RoutingConfig {
        RoutingConfig::default()
    }

    fn close(a: f64, b: f64, rel: f64) -> bool {
        (a - b).abs() <= rel * b.abs().max(1e-9)
    }

    #[test]
    fn straight_line_route_through_middle_node() {
        let net = helpers::line_network();
        let r = find_path(&net, &cfg(), A, C);

        assert_eq!(r.method, PathMethod::Dijkstra);
        assert!(r.success);
        assert!(!r.is_estimate());
        assert!(close(r.walking_distance_m, A.distance_m(B) + B.distance_m(C), 0.01));
        assert!(r.path.contains(&B));
        assert_eq!(r.path.first(), Some(&A));
        assert_eq!(r.path.last(), Some(&C));
        assert!(close(r.walking_time_secs, r.walking_distance_m / 1.4, 1e-12));
    }

    #[test]
    fn shortest_path_on_grid() {
        let (net, [n0, n1, n2, _, n4]) = helpers::grid_network();
        for frontier in [FrontierPolicy::Exact, FrontierPolicy::default()] {
            let cfg = RoutingConfig { frontier, ..cfg() };
            let start = net.node_pos[n0.index()];
            let end = net.node_pos[n4.index()];
            let r = find_path(&net, &cfg, start, end);

            assert_eq!(r.method, PathMethod::Dijkstra, "{frontier:?}");
            assert!(close(r.walking_distance_m, 300.0, 1e-9), "{frontier:?}: {}", r.walking_distance_m);
            let expected: Vec<GeoPoint> = [n0, n0, n1, n2, n4, n4]
                .iter()
                .map(|n| net.node_pos[n.index()])
                .collect();
            assert_eq!(r.path, expected);
        }
    }

    #[test]
    fn tiny_sample_still_reaches_destination() {
        let (net, [n0, .., n4]) = helpers::grid_network();
        let cfg = RoutingConfig { frontier: FrontierPolicy::Sampled { cap: 1 }, ..cfg() };
        let r = find_path(&net, &cfg, net.node_pos[n0.index()], net.node_pos[n4.index()]);
        assert_eq!(r.method, PathMethod::Dijkstra);
        assert!(r.walking_distance_m >= 300.0 - 1e-9);
    }

    #[test]
    fn short_pairs_skip_the_graph() {
        let net = helpers::line_network();
        let r = find_path(&net, &cfg(), A, B);
        assert_eq!(r.method, PathMethod::Direct);
        assert_eq!(r.walking_distance_m, A.distance_m(B));
        assert_eq!(r.path, vec![A, B]);
    }

    #[test]
    fn identical_points_are_zero() {
        let net = helpers::line_network();
        let r = find_path(&net, &cfg(), B, B);
        assert_eq!(r.method, PathMethod::Direct);
        assert_eq!(r.walking_distance_m, 0.0);
        assert_eq!(r.walking_minutes(), 0.0);
    }

    #[test]
    fn unsnappable_endpoint_estimates() {
        let net = helpers::line_network();
        let far = GeoPoint::new(0.05, 0.0); // ~5.5 km north
        let r = find_path(&net, &cfg(), A, far);
        assert_eq!(r.method, PathMethod::Estimate);
        assert!(r.is_estimate());
        assert!(!r.success);
        assert!(close(r.walking_distance_m, 1.3 * A.distance_m(far), 1e-12));
        assert_eq!(r.path, vec![A, far]);
    }

    #[test]
    fn empty_network_always_estimates() {
        let net = RoadNetwork::empty();
        let far = GeoPoint::new(45.43, -75.68);
        let r = find_path(&net, &cfg(), GeoPoint::new(45.42, -75.70), far);
        assert_eq!(r.method, PathMethod::Estimate);
        assert!(r.is_estimate());

        let near = find_path(&net, &cfg(), far, far);
        assert!(near.is_estimate());
    }

    #[test]
    fn both_ends_on_one_node() {
        let hub = GeoPoint::new(45.0, -75.0);
        let segs = vec![helpers::residential("spur", hub, GeoPoint::new(45.05, -75.0))];
        let net = build_network(segs, &BuildOptions::default());

        let west = hub.destination(270.0, 150.0);
        let east = hub.destination(90.0, 150.0);
        let r = find_path(&net, &cfg(), west, east);

        assert_eq!(r.method, PathMethod::SameNode);
        assert!(!r.is_estimate());
        assert!(close(r.walking_distance_m, 300.0, 1e-6));
        assert_eq!(r.path.len(), 3);
    }

    #[test]
    fn close_enough_hops_the_last_gap() {
        // B'–D is ~89 m: finalising B' ends the search with a hop.
        let b = GeoPoint::new(0.0, 0.01);
        let d = GeoPoint::new(0.0, 0.0108);
        let segs = vec![helpers::residential("long", A, b), helpers::residential("short", b, d)];
        let net = build_network(segs, &BuildOptions::default());

        let r = find_path(&net, &cfg(), A, d);
        assert_eq!(r.method, PathMethod::CloseEnough);
        assert!(!r.is_estimate());
        assert!(close(r.walking_distance_m, A.distance_m(b) + b.distance_m(d), 1e-9));
        assert_eq!(r.path, vec![A, A, b, d, d]);
    }

    #[test]
    fn iteration_cap_without_nearby_node_estimates() {
        let (net, [n0, .., n4]) = helpers::grid_network();
        let cfg = RoutingConfig { max_iterations: 1, ..cfg() };
        let (start, end) = (net.node_pos[n0.index()], net.node_pos[n4.index()]);
        let r = find_path(&net, &cfg, start, end);
        assert_eq!(r.method, PathMethod::MaxIterations);
        assert!(close(r.walking_distance_m, 1.3 * start.distance_m(end), 1e-12));
    }

    #[test]
    fn iteration_cap_uses_closest_node_when_viable() {
        let (net, [n0, .., n4]) = helpers::grid_network();
        let cfg = RoutingConfig { max_iterations: 1, iteration_fallback_m: 5_000.0, ..cfg() };
        let (start, end) = (net.node_pos[n0.index()], net.node_pos[n4.index()]);
        let r = find_path(&net, &cfg, start, end);
        assert_eq!(r.method, PathMethod::IterationLimit);
        assert!(r.success);
        assert!(r.is_estimate());
        // Only n0 was finalised: straight hop from n0 to n4.
        assert!(close(r.walking_distance_m, start.distance_m(end), 1e-9));
    }

    #[test]
    fn unreachable_short_pair_uses_reduced_factor() {
        let north = GeoPoint::new(0.0027, 0.0); // ~300 m north of A
        let segs = vec![
            helpers::residential("south side", A, GeoPoint::new(0.0, -0.01)),
            helpers::residential("north side", north, GeoPoint::new(0.0107, 0.0)),
        ];
        let net = build_network(segs, &BuildOptions::default());

        let r = find_path(&net, &cfg(), A, north);
        assert_eq!(r.method, PathMethod::DirectShort);
        assert!(close(r.walking_distance_m, 1.2 * A.distance_m(north), 1e-12));
    }

    #[test]
    fn unreachable_long_pair_uses_standard_factor() {
        let west = GeoPoint::new(0.0, -0.01);
        let far_north = GeoPoint::new(0.0107, 0.0);
        let segs = vec![
            helpers::residential("south side", A, west),
            helpers::residential("north side", GeoPoint::new(0.0027, 0.0), far_north),
        ];
        let net = build_network(segs, &BuildOptions::default());

        let r = find_path(&net, &cfg(), west, far_north);
        assert_eq!(r.method, PathMethod::NoPath);
        assert!(!r.success);
        assert!(close(r.walking_distance_m, 1.3 * west.distance_m(far_north), 1e-12));
    }

    #[test]
    fn restricted_oneway_blocks_return_trip() {
        let segs = vec![
            crate::RoadSegment::new("ramp", A, GeoPoint::new(0.0, 0.005), crate::RoadClass::MotorwayLink)
                .one_way(true),
        ];
        let net = build_network(segs, &BuildOptions::default());
        let end = GeoPoint::new(0.0, 0.005);

        assert_eq!(find_path(&net, &cfg(), A, end).method, PathMethod::Dijkstra);
        assert_eq!(find_path(&net, &cfg(), end, A).method, PathMethod::NoPath);
    }

    #[test]
    fn fallback_network_routes_downtown() {
        let segs = StaticSegmentSource::ottawa_core().load().unwrap();
        let net = build_network(segs, &BuildOptions::default());

        let wellington_bank = GeoPoint::new(45.42340, -75.70370);
        let rideau_nicholas = GeoPoint::new(45.42680, -75.68800);
        let r = find_path(&net, &cfg(), wellington_bank, rideau_nicholas);

        assert_eq!(r.method, PathMethod::Dijkstra);
        assert!(r.walking_distance_m >= r.direct_distance_m);
        assert!(r.path.len() >= 4);
    }

    #[test]
    fn method_tags() {
        assert_eq!(PathMethod::Dijkstra.to_string(), "dijkstra");
        assert_eq!(PathMethod::CloseEnough.as_str(), "close-enough");
        assert_eq!(PathMethod::MaxIterations.as_str(), "max-iterations");
        assert!(PathMethod::Direct.is_estimate());
        assert!(PathMethod::Direct.is_success());
        assert!(!PathMethod::SameNode.is_estimate());
        assert!(PathMethod::NoPath.is_estimate());
        assert!(!PathMethod::NoPath.is_success());
    }
}

// ── Lazily built graph ────────────────────────────────────────────────────────

#[cfg(test)]
mod graph {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use crate::{CsvSegmentSource, RoadGraph, SpatialError, StaticSegmentSource};

    use super::helpers::{self, FlakySource};

    #[test]
    fn build_is_idempotent() {
        let source = Arc::new(FlakySource::new(0, helpers::line_segments()));
        let graph = RoadGraph::new(Arc::clone(&source));
        assert!(!graph.is_initialized());

        let first = graph.ensure_built().unwrap().node_count();
        let second = graph.ensure_built().unwrap().node_count();
        assert_eq!(first, 4);
        assert_eq!(first, second);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_warmup_builds_once() {
        let source = Arc::new(FlakySource::new(0, helpers::line_segments()));
        let graph = RoadGraph::new(Arc::clone(&source));

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert_eq!(graph.ensure_built().unwrap().node_count(), 4));
            }
        });
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_source_gives_initialized_empty_graph() {
        let graph = RoadGraph::new(StaticSegmentSource::empty());
        let net = graph.ensure_built().unwrap();
        assert_eq!(net.node_count(), 0);
        assert!(graph.is_initialized());
    }

    #[test]
    fn failing_primary_uses_fallback() {
        let graph = RoadGraph::new(CsvSegmentSource::new("/no/such/segments.csv"))
            .with_fallback(StaticSegmentSource::ottawa_core());
        assert!(graph.ensure_built().unwrap().node_count() > 10);
    }

    #[test]
    fn empty_primary_uses_fallback() {
        let graph = RoadGraph::new(StaticSegmentSource::empty())
            .with_fallback(StaticSegmentSource::new("fixture", helpers::line_segments()));
        assert_eq!(graph.ensure_built().unwrap().node_count(), 4);
    }

    #[test]
    fn failing_fallback_after_empty_primary_is_empty_graph() {
        let graph = RoadGraph::new(StaticSegmentSource::empty())
            .with_fallback(CsvSegmentSource::new("/no/such/fallback.csv"));
        assert!(graph.ensure_built().unwrap().is_empty());
    }

    #[test]
    fn total_outage_is_surfaced_and_retried() {
        let source = Arc::new(FlakySource::new(1, helpers::line_segments()));
        let graph = RoadGraph::new(Arc::clone(&source));

        assert!(matches!(graph.ensure_built(), Err(SpatialError::DataUnavailable(_))));
        assert!(!graph.is_initialized());

        assert_eq!(graph.ensure_built().unwrap().node_count(), 4);
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn both_sources_failing_is_data_unavailable() {
        let graph = RoadGraph::new(CsvSegmentSource::new("/no/a.csv"))
            .with_fallback(CsvSegmentSource::new("/no/b.csv"));
        assert!(matches!(graph.ensure_built(), Err(SpatialError::DataUnavailable(_))));
    }

    #[test]
    fn fixture_network_is_preinitialized() {
        let graph = RoadGraph::from_network(helpers::line_network());
        assert!(graph.is_initialized());
        assert_eq!(graph.network().unwrap().node_count(), 4);
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use crate::{FrontierPolicy, GraphConfig, RoutingConfig, SpatialError};

    #[test]
    fn defaults_validate() {
        assert!(GraphConfig::default().validate().is_ok());
        let r = RoutingConfig::default();
        assert_eq!(r.direct_threshold_m, 200.0);
        assert_eq!(r.max_iterations, 2_000);
        assert_eq!(r.frontier, FrontierPolicy::Sampled { cap: 1_000 });
    }

    #[test]
    fn rejects_nonsense() {
        let bad = RoutingConfig { walking_speed_mps: 0.0, ..RoutingConfig::default() };
        assert!(matches!(bad.validate(), Err(SpatialError::Config(_))));
        let bad = RoutingConfig { frontier: FrontierPolicy::Sampled { cap: 0 }, ..RoutingConfig::default() };
        assert!(bad.validate().is_err());
        let bad = RoutingConfig { snap_max_m: f64::NAN, ..RoutingConfig::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn partial_json_overrides() {
        let json = r#"{ "routing": { "snap_max_m": 300.0, "frontier": { "kind": "exact" } },
                        "build": { "merge_intersections": false } }"#;
        let cfg: GraphConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.routing.snap_max_m, 300.0);
        assert_eq!(cfg.routing.frontier, FrontierPolicy::Exact);
        assert_eq!(cfg.routing.close_enough_m, 100.0);
        assert!(!cfg.build.merge_intersections);
        assert_eq!(cfg.build.batch_size, 1_000);
    }
}
