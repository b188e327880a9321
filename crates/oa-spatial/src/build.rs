//! Road segments → [`RoadNetwork`].
//!
//! Pipeline, in order:
//!
//! 1. Drop segments with unusable endpoints (logged).
//! 2. Large inputs: stable-sort by [`RoadClass::priority`] and truncate to
//!    `large_graph_threshold`.
//! 3. Small inputs: merge near-coincident endpoints into shared
//!    intersections ([`merge_intersections`]).
//! 4. Walk the segments in batches, creating nodes by rounded coordinate and
//!    one edge per traversable direction.
//!
//! Edge length is the haversine distance between the two *node* positions,
//! not the source segment's own length, so routed distances stay consistent
//! with snapping distances.

use std::time::Instant;

use log::{debug, info, warn};

use oa_core::GeoPoint;

use crate::config::BuildOptions;
use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::segment::RoadSegment;

/// Build a routing graph from `segments`.
///
/// Never fails: bad rows are skipped and an empty input yields an empty
/// network.
pub fn build_network(mut segments: Vec<RoadSegment>, options: &BuildOptions) -> RoadNetwork {
    let started = Instant::now();
    let input_len = segments.len();

    segments.retain(|s| {
        let ok = s.has_valid_endpoints();
        if !ok {
            warn!("skipping road segment {:?}: invalid endpoint {} → {}", s.name, s.start, s.end);
        }
        ok
    });

    if segments.len() > options.large_graph_threshold {
        warn!(
            "{} segments exceed the large-graph threshold; keeping the {} highest-class segments",
            segments.len(),
            options.large_graph_threshold
        );
        truncate_by_priority(&mut segments, options.large_graph_threshold);
    }

    if options.merge_intersections && segments.len() < options.merge_max_segments {
        let moved = merge_intersections(&mut segments, options.intersection_threshold_m);
        debug!("intersection merge moved {moved} endpoints");
    }

    let mut b = RoadNetworkBuilder::with_capacity(segments.len() * 2, segments.len() * 2);
    let mut self_loops = 0usize;
    let batch_size = options.batch_size.max(1);
    let batch_count = segments.len().div_ceil(batch_size);

    for (batch_no, batch) in segments.chunks(batch_size).enumerate() {
        for seg in batch {
            let from = b.node_for(seg.start);
            let to = b.node_for(seg.end);
            if from == to {
                self_loops += 1;
                continue;
            }

            let road = b.road_for(&seg.name, seg.class);
            let length_m = b.node_pos(from).distance_m(b.node_pos(to));
            let travel_ms = (length_m / seg.speed_mps() * 1_000.0).round() as u32;

            b.add_directed_edge(from, to, road, length_m, travel_ms);
            if !seg.is_forward_only() {
                b.add_directed_edge(to, from, road, length_m, travel_ms);
            }
        }
        debug!(
            "graph batch {}/{batch_count}: {} nodes, {} edges",
            batch_no + 1,
            b.node_count(),
            b.edge_count()
        );
    }

    if self_loops > 0 {
        debug!("dropped {self_loops} segments whose endpoints share a node");
    }

    let network = b.build();
    info!(
        "road graph built from {}/{} segments: {} nodes, {} edges in {:.2?}",
        segments.len(),
        input_len,
        network.node_count(),
        network.edge_count(),
        started.elapsed()
    );
    network
}

/// Keep the `limit` most important segments (motorways first), preserving
/// input order within each class.
pub fn truncate_by_priority(segments: &mut Vec<RoadSegment>, limit: usize) {
    segments.sort_by_key(|s| s.class.priority());
    segments.truncate(limit);
}

/// Collapse endpoints closer than `threshold_m` into shared intersections.
///
/// Greedy clustering in input order: each endpoint joins the first existing
/// cluster whose anchor (first member) lies within the threshold, otherwise
/// it founds a new one.  An endpoint never joins the cluster holding the
/// other end of its own segment.  Every endpoint of a multi-member cluster is
/// then moved to the cluster centroid, which for two members is their
/// midpoint.
///
/// Quadratic in endpoint count.  Returns the number of endpoints whose
/// coordinate changed.
pub fn merge_intersections(segments: &mut [RoadSegment], threshold_m: f64) -> usize {
    struct Cluster {
        anchor:  GeoPoint,
        sum_lat: f64,
        sum_lon: f64,
        members: usize,
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    // assignment[2i] = cluster of segment i's start, [2i + 1] = its end.
    let mut assignment: Vec<usize> = Vec::with_capacity(segments.len() * 2);

    for seg in segments.iter() {
        let start_cluster = assign(&mut clusters, seg.start, None, threshold_m);
        assignment.push(start_cluster);
        assignment.push(assign(&mut clusters, seg.end, Some(start_cluster), threshold_m));
    }

    fn assign(clusters: &mut Vec<Cluster>, p: GeoPoint, exclude: Option<usize>, threshold_m: f64) -> usize {
        let found = clusters
            .iter()
            .enumerate()
            .position(|(i, c)| Some(i) != exclude && c.anchor.distance_m(p) < threshold_m);
        match found {
            Some(i) => {
                let c = &mut clusters[i];
                c.sum_lat += p.lat;
                c.sum_lon += p.lon;
                c.members += 1;
                i
            }
            None => {
                clusters.push(Cluster { anchor: p, sum_lat: p.lat, sum_lon: p.lon, members: 1 });
                clusters.len() - 1
            }
        }
    }

    let centroid = |c: &Cluster| GeoPoint::new(c.sum_lat / c.members as f64, c.sum_lon / c.members as f64);

    let mut moved = 0usize;
    for (i, seg) in segments.iter_mut().enumerate() {
        for (slot, endpoint) in [&mut seg.start, &mut seg.end].into_iter().enumerate() {
            let cluster = &clusters[assignment[2 * i + slot]];
            if cluster.members < 2 {
                continue;
            }
            let merged = centroid(cluster);
            if merged != *endpoint {
                *endpoint = merged;
                moved += 1;
            }
        }
    }
    moved
}
