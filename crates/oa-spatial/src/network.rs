//! Road network representation and low-level builder.
//!
//! # Node identity
//!
//! A node is a distinct coordinate rounded to 5 decimal places
//! ([`CoordKey`], ≈ 1.1 m).  Segment endpoints that describe the same
//! physical intersection therefore collapse to one node.  Nodes receive
//! sequential [`NodeId`]s in creation order and are never removed.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_*[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays are sorted by source node and indexed by `EdgeId`, so the
//! search's relaxation loop is a contiguous memory scan.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over `[lat, lon]` answers snapping queries.
//! Candidates come from the query's bounding circle and are ranked by exact
//! haversine distance, which gives the same answer as a linear scan of every
//! node.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use rustc_hash::FxHashMap;

use oa_core::{EdgeId, GeoPoint, NodeId, RoadId, bounding_circle};

use crate::segment::RoadClass;

/// Envelope slack over the snap radius; covers the planar bounding-circle
/// approximation at the box corners.
const SNAP_ENVELOPE_SLACK: f64 = 1.05;

// ── CoordKey ──────────────────────────────────────────────────────────────────

/// A coordinate rounded to 5 decimal places, stored as scaled integers.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CoordKey {
    lat_e5: i64,
    lon_e5: i64,
}

impl CoordKey {
    const SCALE: f64 = 1e5;

    pub fn of(p: GeoPoint) -> Self {
        Self {
            lat_e5: (p.lat * Self::SCALE).round() as i64,
            lon_e5: (p.lon * Self::SCALE).round() as i64,
        }
    }

    /// The rounded coordinate this key stands for.
    pub fn point(self) -> GeoPoint {
        GeoPoint::new(self.lat_e5 as f64 / Self::SCALE, self.lon_e5 as f64 / Self::SCALE)
    }
}

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lat, lon]
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Only used by the tree
    /// for pruning; snapping ranks candidates by haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── Public value types ────────────────────────────────────────────────────────

/// Name and class of the road an edge was built from.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadInfo {
    pub name:  String,
    pub class: RoadClass,
}

/// Result of snapping a coordinate onto the graph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Snap {
    pub node:       NodeId,
    pub distance_m: f64,
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph in CSR format plus a spatial index for snapping.
///
/// Immutable once built; share it by reference across concurrent queries.
/// Construct through [`RoadNetworkBuilder`] or
/// [`build_network`](crate::build_network).
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Rounded position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// Outgoing edges of node `n` are at EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    /// Source node of each edge; used to walk predecessor chains.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Great-circle length between the two node positions, metres.
    pub edge_length_m: Vec<f64>,

    /// Traversal time at the road's speed, milliseconds.
    pub edge_travel_ms: Vec<u32>,

    /// Road the edge came from.
    pub edge_road: Vec<RoadId>,

    /// Interned road table.  Indexed by `RoadId`.
    pub roads: Vec<RoadInfo>,

    // ── Lookups ───────────────────────────────────────────────────────────
    node_keys:   FxHashMap<CoordKey, NodeId>,
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// A network with no nodes or edges.  Every path query against it
    /// degrades to a distance-based estimate.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    /// First edge from `from` to `to`, if any.
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.out_edges(from).find(|e| self.edge_to[e.index()] == to)
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge_between(from, to).is_some()
    }

    /// Road metadata for `edge`.
    pub fn road(&self, edge: EdgeId) -> &RoadInfo {
        &self.roads[self.edge_road[edge.index()].index()]
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// The node whose rounded key equals that of `pos`, if one exists.
    pub fn node_at(&self, pos: GeoPoint) -> Option<NodeId> {
        self.node_keys.get(&CoordKey::of(pos)).copied()
    }

    /// Nearest node to `pos` by great-circle distance, provided it lies
    /// within `max_m`.  Ties break on the lower `NodeId`.
    pub fn snap(&self, pos: GeoPoint, max_m: f64) -> Option<Snap> {
        if self.is_empty() || max_m.is_nan() || max_m < 0.0 {
            return None;
        }

        let bbox = bounding_circle(pos, max_m * SNAP_ENVELOPE_SLACK);
        let envelope = AABB::from_corners([bbox.min_lat, bbox.min_lon], [bbox.max_lat, bbox.max_lon]);

        self.spatial_idx
            .locate_in_envelope(&envelope)
            .map(|e| Snap { node: e.id, distance_m: pos.distance_m(self.node_pos[e.id.index()]) })
            .filter(|s| s.distance_m <= max_m)
            .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.node.cmp(&b.node)))
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// Nodes are created on demand from coordinates ([`node_for`](Self::node_for)
/// is idempotent per rounded key).  `build()` sorts edges by source node,
/// constructs the CSR arrays, and bulk-loads the R-tree.
///
/// # Example
///
/// ```
/// use oa_core::GeoPoint;
/// use oa_spatial::{RoadClass, RoadNetworkBuilder};
///
/// let mut b = RoadNetworkBuilder::new();
/// let road = b.road_for("Elgin Street", RoadClass::Secondary);
/// let a = b.node_for(GeoPoint::new(45.42000, -75.69560));
/// let c = b.node_for(GeoPoint::new(45.41600, -75.69160));
/// assert_eq!(b.node_for(GeoPoint::new(45.420001, -75.695601)), a);
/// b.add_road(a, c, road, 545.0, 32_700);
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    keys:      FxHashMap<CoordKey, NodeId>,
    raw_edges: Vec<RawEdge>,
    roads:     Vec<RoadInfo>,
    road_ids:  FxHashMap<(String, RoadClass), RoadId>,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    road:      RoadId,
    length_m:  f64,
    travel_ms: u32,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            keys:      FxHashMap::with_capacity_and_hasher(nodes, Default::default()),
            raw_edges: Vec::with_capacity(edges),
            roads:     Vec::new(),
            road_ids:  FxHashMap::default(),
        }
    }

    /// Return the node for `pos`'s rounded key, creating it if absent.
    pub fn node_for(&mut self, pos: GeoPoint) -> NodeId {
        let key = CoordKey::of(pos);
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(key.point());
        self.keys.insert(key, id);
        id
    }

    /// Intern a road name/class pair.
    pub fn road_for(&mut self, name: &str, class: RoadClass) -> RoadId {
        if let Some(&id) = self.road_ids.get(&(name.to_owned(), class)) {
            return id;
        }
        let id = RoadId(self.roads.len() as u32);
        self.roads.push(RoadInfo { name: name.to_owned(), class });
        self.road_ids.insert((name.to_owned(), class), id);
        id
    }

    /// Add a **directed** edge from `from` to `to`.
    pub fn add_directed_edge(
        &mut self,
        from:      NodeId,
        to:        NodeId,
        road:      RoadId,
        length_m:  f64,
        travel_ms: u32,
    ) {
        self.raw_edges.push(RawEdge { from, to, road, length_m, travel_ms });
    }

    /// Add edges in **both directions**.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, road: RoadId, length_m: f64, travel_ms: u32) {
        self.add_directed_edge(a, b, road, length_m, travel_ms);
        self.add_directed_edge(b, a, road, length_m, travel_ms);
    }

    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E log E) for the edge sort + O(N log N) for the
    /// R-tree bulk load.
    pub fn build(self) -> RoadNetwork {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        // Stable sort keeps per-node insertion order for equal sources.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:      Vec<NodeId> = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId> = raw.iter().map(|e| e.to).collect();
        let edge_length_m:  Vec<f64>    = raw.iter().map(|e| e.length_m).collect();
        let edge_travel_ms: Vec<u32>    = raw.iter().map(|e| e.travel_ms).collect();
        let edge_road:      Vec<RoadId> = raw.iter().map(|e| e.road).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: [pos.lat, pos.lon], id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_ms,
            edge_road,
            roads: self.roads,
            node_keys: self.keys,
            spatial_idx,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
