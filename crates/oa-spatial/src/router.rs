//! Point-to-point path engine.
//!
//! # Query state machine
//!
//! ```text
//! direct-short-circuit ─▶ snapped ─▶ searching ─▶ found | close-enough | iteration-limit | unreachable
//! ```
//!
//! 1. Query points closer than `direct_threshold_m` return the straight line
//!    ([`PathMethod::Direct`]).
//! 2. Either point farther than `snap_max_m` from every node returns
//!    `estimate_factor × straight line` ([`PathMethod::Estimate`]).
//! 3. Both points on the same node: the two snap legs
//!    ([`PathMethod::SameNode`]).
//! 4. Otherwise a bounded Dijkstra search over edge lengths, which can end
//!    on the destination ([`PathMethod::Dijkstra`]), on a node within
//!    `close_enough_m` of it ([`PathMethod::CloseEnough`]), on the iteration
//!    cap ([`PathMethod::IterationLimit`] / [`PathMethod::MaxIterations`]),
//!    or with the frontier exhausted ([`PathMethod::DirectShort`] /
//!    [`PathMethod::NoPath`]).
//!
//! No branch returns an error: every failure mode degrades to a tagged
//! estimate, and the tag tells consumers how much to trust the number.
//!
//! # Pluggability
//!
//! Callers go through the [`PathFinder`] trait, so a contraction hierarchy
//! or A* can replace [`DijkstraPathFinder`] without touching the estimators.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use oa_core::{EdgeId, GeoPoint, NodeId};

use crate::config::{FrontierPolicy, RoutingConfig};
use crate::network::RoadNetwork;

// ── PathMethod ────────────────────────────────────────────────────────────────

/// Which branch of the engine produced a [`PathResult`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathMethod {
    /// Query points closer than the direct threshold; straight line.
    Direct,
    /// A query point could not be snapped; multiplier estimate.
    Estimate,
    /// Both query points snapped to one node.
    SameNode,
    /// The search finalised the destination node.
    Dijkstra,
    /// The search finalised a node close to the destination and hopped.
    CloseEnough,
    /// Iteration cap hit; closest node reached was near enough to hop.
    IterationLimit,
    /// Iteration cap hit with nothing near the destination; multiplier estimate.
    MaxIterations,
    /// Destination unreachable, short pair; reduced multiplier estimate.
    DirectShort,
    /// Destination unreachable; multiplier estimate.
    NoPath,
}

impl PathMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PathMethod::Direct         => "direct",
            PathMethod::Estimate       => "estimate",
            PathMethod::SameNode       => "same-node",
            PathMethod::Dijkstra       => "dijkstra",
            PathMethod::CloseEnough    => "close-enough",
            PathMethod::IterationLimit => "iteration-limit",
            PathMethod::MaxIterations  => "max-iterations",
            PathMethod::DirectShort    => "direct-short",
            PathMethod::NoPath         => "no-path",
        }
    }

    /// `false` only for outcomes backed by a graph route to the destination.
    #[inline]
    pub fn is_estimate(self) -> bool {
        !matches!(self, PathMethod::Dijkstra | PathMethod::CloseEnough | PathMethod::SameNode)
    }

    /// `true` when the reported geometry is a real route (graph or straight
    /// line), `false` for pure multiplier estimates.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(
            self,
            PathMethod::Direct
                | PathMethod::SameNode
                | PathMethod::Dijkstra
                | PathMethod::CloseEnough
                | PathMethod::IterationLimit
        )
    }
}

impl fmt::Display for PathMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── PathResult ────────────────────────────────────────────────────────────────

/// Outcome of one path query.  Created per query, never cached here.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathResult {
    pub success:            bool,
    /// Great-circle distance between the two query points.
    pub direct_distance_m:  f64,
    /// Routed or estimated walking distance, snap legs included.
    pub walking_distance_m: f64,
    pub walking_time_secs:  f64,
    /// Query start, intermediate graph nodes, query end.
    pub path:               Vec<GeoPoint>,
    pub method:             PathMethod,
}

impl PathResult {
    fn new(method: PathMethod, direct_m: f64, walking_m: f64, path: Vec<GeoPoint>, cfg: &RoutingConfig) -> Self {
        Self {
            success:            method.is_success(),
            direct_distance_m:  direct_m,
            walking_distance_m: walking_m,
            walking_time_secs:  walking_m / cfg.walking_speed_mps,
            path,
            method,
        }
    }

    fn estimate(
        method:   PathMethod,
        start:    GeoPoint,
        end:      GeoPoint,
        direct_m: f64,
        factor:   f64,
        cfg:      &RoutingConfig,
    ) -> Self {
        Self::new(method, direct_m, direct_m * factor, vec![start, end], cfg)
    }

    /// Shorthand for `self.method.is_estimate()`.
    #[inline]
    pub fn is_estimate(&self) -> bool {
        self.method.is_estimate()
    }

    #[inline]
    pub fn walking_minutes(&self) -> f64 {
        self.walking_time_secs / 60.0
    }
}

// ── PathFinder trait ──────────────────────────────────────────────────────────

/// Pluggable point-to-point routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one finder can serve concurrent
/// queries against a shared, read-only [`RoadNetwork`].
pub trait PathFinder: Send + Sync {
    /// Route between two arbitrary coordinates.  Never fails; see
    /// [`PathMethod`] for the degraded outcomes.
    fn find_path(&self, network: &RoadNetwork, start: GeoPoint, end: GeoPoint) -> PathResult;
}

/// Bounded, early-terminating Dijkstra over edge lengths.
#[derive(Clone, Debug, Default)]
pub struct DijkstraPathFinder {
    pub config: RoutingConfig,
}

impl DijkstraPathFinder {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }
}

impl PathFinder for DijkstraPathFinder {
    fn find_path(&self, network: &RoadNetwork, start: GeoPoint, end: GeoPoint) -> PathResult {
        find_path(network, &self.config, start, end)
    }
}

// ── Query driver ──────────────────────────────────────────────────────────────

/// Run the full query state machine described in the module docs.
pub fn find_path(network: &RoadNetwork, cfg: &RoutingConfig, start: GeoPoint, end: GeoPoint) -> PathResult {
    let direct_m = start.distance_m(end);

    if direct_m < cfg.direct_threshold_m {
        return PathResult::new(PathMethod::Direct, direct_m, direct_m, vec![start, end], cfg);
    }

    let (Some(from), Some(to)) = (network.snap(start, cfg.snap_max_m), network.snap(end, cfg.snap_max_m)) else {
        debug!("no node within {} m of {start} or {end}; estimating", cfg.snap_max_m);
        return PathResult::estimate(PathMethod::Estimate, start, end, direct_m, cfg.estimate_factor, cfg);
    };
    let snap_legs_m = from.distance_m + to.distance_m;

    if from.node == to.node {
        let node_pos = network.node_pos[from.node.index()];
        return PathResult::new(PathMethod::SameNode, direct_m, snap_legs_m, vec![start, node_pos, end], cfg);
    }

    let search = bounded_search(network, from.node, to.node, cfg);
    debug!("search {} → {}: {:?} after {} iterations", from.node, to.node, search.outcome, search.iterations);

    match search.outcome {
        Outcome::Reached => {
            let nodes = search.chain(network, to.node);
            let walking_m = search.dist[to.node.index()] + snap_legs_m;
            let path = geometry(network, start, &nodes, None, end);
            PathResult::new(PathMethod::Dijkstra, direct_m, walking_m, path, cfg)
        }
        Outcome::Hop { via, hop_m, method } => {
            let nodes = search.chain(network, via);
            let walking_m = search.dist[via.index()] + hop_m + snap_legs_m;
            let path = geometry(network, start, &nodes, Some(to.node), end);
            PathResult::new(method, direct_m, walking_m, path, cfg)
        }
        Outcome::Capped => {
            PathResult::estimate(PathMethod::MaxIterations, start, end, direct_m, cfg.estimate_factor, cfg)
        }
        Outcome::Unreachable if direct_m < cfg.short_estimate_max_m => {
            PathResult::estimate(PathMethod::DirectShort, start, end, direct_m, cfg.short_estimate_factor, cfg)
        }
        Outcome::Unreachable => {
            PathResult::estimate(PathMethod::NoPath, start, end, direct_m, cfg.estimate_factor, cfg)
        }
    }
}

fn geometry(
    network: &RoadNetwork,
    start:   GeoPoint,
    nodes:   &[NodeId],
    hop_to:  Option<NodeId>,
    end:     GeoPoint,
) -> Vec<GeoPoint> {
    let mut path = Vec::with_capacity(nodes.len() + 3);
    path.push(start);
    path.extend(nodes.iter().map(|n| network.node_pos[n.index()]));
    path.extend(hop_to.map(|n| network.node_pos[n.index()]));
    path.push(end);
    path
}

// ── Bounded search ────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
enum Outcome {
    Reached,
    /// Finish with a straight hop from `via` to the destination node.
    Hop { via: NodeId, hop_m: f64, method: PathMethod },
    /// Iteration cap hit and nothing usable near the destination.
    Capped,
    Unreachable,
}

struct Search {
    outcome:    Outcome,
    iterations: usize,
    dist:       Vec<f64>,
    prev_edge:  Vec<EdgeId>,
}

impl Search {
    /// Node sequence from the search origin to `last`, inclusive.
    fn chain(&self, network: &RoadNetwork, last: NodeId) -> Vec<NodeId> {
        let mut nodes = vec![last];
        let mut cur = last;
        loop {
            let e = self.prev_edge[cur.index()];
            if e == EdgeId::INVALID {
                break;
            }
            cur = network.edge_from[e.index()];
            nodes.push(cur);
        }
        nodes.reverse();
        nodes
    }
}

fn bounded_search(network: &RoadNetwork, from: NodeId, to: NodeId, cfg: &RoutingConfig) -> Search {
    let n = network.node_count();
    let target_pos = network.node_pos[to.index()];

    let mut dist      = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    let mut visited   = vec![false; n];
    let mut unvisited = n;

    let mut frontier = Frontier::new(cfg.frontier);
    dist[from.index()] = 0.0;
    frontier.push(from, 0.0, true);

    let mut iterations = 0usize;
    // Finalised node with the smallest straight-line gap to the target.
    let mut closest = (from, network.node_pos[from.index()].distance_m(target_pos));

    let outcome = loop {
        let Some(node) = frontier.pop(&dist, &visited, unvisited) else {
            break Outcome::Unreachable;
        };
        if iterations >= cfg.max_iterations {
            break if closest.1 <= cfg.iteration_fallback_m {
                Outcome::Hop { via: closest.0, hop_m: closest.1, method: PathMethod::IterationLimit }
            } else {
                Outcome::Capped
            };
        }
        iterations += 1;
        visited[node.index()] = true;
        unvisited -= 1;

        if node == to {
            break Outcome::Reached;
        }

        let hop_m = network.node_pos[node.index()].distance_m(target_pos);
        if hop_m < closest.1 {
            closest = (node, hop_m);
        }
        if hop_m < cfg.close_enough_m {
            break Outcome::Hop { via: node, hop_m, method: PathMethod::CloseEnough };
        }

        let base = dist[node.index()];
        for edge in network.out_edges(node) {
            let next = network.edge_to[edge.index()];
            if visited[next.index()] {
                continue;
            }
            let candidate = base + network.edge_length_m[edge.index()];
            if candidate < dist[next.index()] {
                let first_reach = dist[next.index()].is_infinite();
                dist[next.index()] = candidate;
                prev_edge[next.index()] = edge;
                frontier.push(next, candidate, first_reach);
            }
        }
    };

    Search { outcome, iterations, dist, prev_edge }
}

// ── Frontier ──────────────────────────────────────────────────────────────────

/// Min-heap entry ordered by cost, then `NodeId` for deterministic ties.
#[derive(Copy, Clone, Debug)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

enum Frontier {
    Heap(BinaryHeap<HeapEntry>),
    /// Discovered, unvisited nodes in discovery order (modulo swap-removes).
    Sampled { open: Vec<NodeId>, cap: usize },
}

impl Frontier {
    fn new(policy: FrontierPolicy) -> Self {
        match policy {
            FrontierPolicy::Exact => Frontier::Heap(BinaryHeap::new()),
            FrontierPolicy::Sampled { cap } => Frontier::Sampled { open: Vec::new(), cap: cap.max(1) },
        }
    }

    /// Record an improved tentative cost.  The sampled frontier reads costs
    /// from `dist` at pop time, so it only tracks first discovery.
    fn push(&mut self, node: NodeId, cost: f64, first_reach: bool) {
        match self {
            Frontier::Heap(heap) => heap.push(HeapEntry { cost, node }),
            Frontier::Sampled { open, .. } => {
                if first_reach {
                    open.push(node);
                }
            }
        }
    }

    fn pop(&mut self, dist: &[f64], visited: &[bool], unvisited: usize) -> Option<NodeId> {
        match self {
            Frontier::Heap(heap) => {
                while let Some(HeapEntry { cost, node }) = heap.pop() {
                    // Skip stale entries.
                    if visited[node.index()] || cost > dist[node.index()] {
                        continue;
                    }
                    return Some(node);
                }
                None
            }
            Frontier::Sampled { open, cap } => {
                let window = if unvisited > *cap { (*cap).min(open.len()) } else { open.len() };
                let best = open[..window]
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| dist[a.index()].total_cmp(&dist[b.index()]))
                    .map(|(i, _)| i)?;
                Some(open.swap_remove(best))
            }
        }
    }
}
