//! Road graph bookkeeping: vertex deduplication, symmetric adjacency,
//! edge splitting, and candidate-edge enumeration.
//!
//! Vertices are deduplicated by exact coordinate equality and never
//! removed, so a [`VertexId`] stays valid for the lifetime of the graph.
//! Edges are implicit in the adjacency lists, which are kept symmetric
//! by every mutating operation.

use std::collections::HashMap;

use geo::Line;
use petgraph::unionfind::UnionFind;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use serde::{Deserialize, Serialize};

use crate::geometry::{Segment, nearest_parameter_distance};
use crate::propagate::CandidateEdge;
use crate::types::{BoundingBox, GraphError, MapConfig, Point};

/// Index of a vertex in [`RoadGraph::vertices`].
pub type VertexId = usize;

/// Relative distance within which a vertex counts as lying on an edge
/// when walking a chain of collinear sub-edges.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Exact-equality lookup key for a vertex position.
///
/// Holds the IEEE bit patterns of both coordinates, with `-0.0`
/// normalised to `0.0` so that key equality agrees with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexKey {
    x: u64,
    y: u64,
}

impl VertexKey {
    /// Key for `point`.
    #[must_use]
    pub fn new(point: Point) -> Self {
        Self {
            x: canonical_bits(point.x),
            y: canonical_bits(point.y),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}

/// A graph vertex with its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    point: Point,
    adjacency: Vec<VertexId>,
}

impl Vertex {
    const fn new(point: Point) -> Self {
        Self {
            point,
            adjacency: Vec::new(),
        }
    }

    /// Position.
    #[must_use]
    pub const fn point(&self) -> Point {
        self.point
    }

    /// Neighbours in insertion order.
    #[must_use]
    pub fn neighbors(&self) -> &[VertexId] {
        &self.adjacency
    }

    /// Number of neighbours.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.adjacency.len()
    }
}

/// R-tree entry: an edge line tagged with its candidate index.
type IndexedEdge = GeomWithData<Line<f64>, usize>;

/// The accumulated road network.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    vertices: Vec<Vertex>,
    index: HashMap<VertexKey, VertexId>,
    edge_count: usize,
    max_edge_length: f64,
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadGraph {
    /// Empty graph with the default edge-length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_edge_length(MapConfig::DEFAULT_MAX_EDGE_LENGTH)
    }

    /// Empty graph rejecting edges longer than `max_edge_length`.
    #[must_use]
    pub fn with_max_edge_length(max_edge_length: f64) -> Self {
        Self {
            vertices: Vec::new(),
            index: HashMap::new(),
            edge_count: 0,
            max_edge_length,
        }
    }

    /// Longest edge [`add_edge`](Self::add_edge) accepts.
    #[must_use]
    pub const fn max_edge_length(&self) -> f64 {
        self.max_edge_length
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// `true` when the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All vertices, indexed by [`VertexId`].
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Vertex `id`, if present.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Neighbours of vertex `id`; empty for an unknown id.
    #[must_use]
    pub fn neighbors(&self, id: VertexId) -> &[VertexId] {
        self.vertices.get(id).map_or(&[], |v| v.neighbors())
    }

    /// Id of the vertex at exactly `point`.
    #[must_use]
    pub fn vertex_id(&self, point: Point) -> Option<VertexId> {
        self.index.get(&VertexKey::new(point)).copied()
    }

    /// Every directed adjacency pair `(from, to)`, in vertex then
    /// adjacency order. Each undirected edge appears twice.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .flat_map(|(from, v)| v.adjacency.iter().map(move |&to| (from, to)))
    }

    /// Every undirected edge once, as `(lower id, higher id)`.
    pub fn undirected_edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.edges().filter(|&(from, to)| from < to)
    }

    /// Largest vertex degree, `0` for an empty graph.
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.vertices.iter().map(Vertex::degree).max().unwrap_or(0)
    }

    /// `true` when every adjacency entry has its mirror entry.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.edges()
            .all(|(from, to)| self.neighbors(to).contains(&from))
    }

    /// Number of connected components (isolated vertices included).
    #[must_use]
    pub fn component_count(&self) -> usize {
        let mut components = UnionFind::<usize>::new(self.vertices.len());
        let mut count = self.vertices.len();
        for (from, to) in self.undirected_edges() {
            if components.union(from, to) {
                count -= 1;
            }
        }
        count
    }

    /// Id of the vertex at `point`, inserting it when absent.
    pub fn map_vertex(&mut self, point: Point) -> VertexId {
        let key = VertexKey::new(point);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.vertices.len();
        self.vertices.push(Vertex::new(point));
        self.index.insert(key, id);
        id
    }

    /// Insert the undirected edge `a`-`b`, mapping both endpoints.
    ///
    /// Returns the endpoint ids, or `None` when `a` and `b` are the same
    /// vertex (the vertex is still mapped). Adding an edge that already
    /// exists leaves the adjacency unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeTooLong`] without touching the graph
    /// when `a` and `b` are farther apart than the edge-length limit.
    pub fn add_edge(
        &mut self,
        a: Point,
        b: Point,
    ) -> Result<Option<(VertexId, VertexId)>, GraphError> {
        self.add_edge_within(a, b, self.max_edge_length)
    }

    /// [`add_edge`](Self::add_edge) against an explicit edge-length
    /// limit instead of the graph's own.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeTooLong`] without touching the graph
    /// when `a` and `b` are farther apart than `limit`.
    pub fn add_edge_within(
        &mut self,
        a: Point,
        b: Point,
        limit: f64,
    ) -> Result<Option<(VertexId, VertexId)>, GraphError> {
        let length = a.distance(b);
        if length > limit {
            return Err(GraphError::EdgeTooLong {
                from: a,
                to: b,
                length,
                limit,
            });
        }
        let u = self.map_vertex(a);
        let v = self.map_vertex(b);
        if u == v {
            return Ok(None);
        }
        self.link(u, v);
        Ok(Some((u, v)))
    }

    /// Insert vertex `w` into the edge `u`-`v`.
    ///
    /// Rewrites `u`'s entry for `v` to `w` and `v`'s entry for `u` to
    /// `w`, then links `w` back to both. Returns `false` without changes
    /// when `u` and `v` are not adjacent or `w` is one of them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] when any of the three
    /// points is not a vertex.
    pub fn split_edge(&mut self, u: Point, v: Point, w: Point) -> Result<bool, GraphError> {
        let iu = self.require(u)?;
        let iv = self.require(v)?;
        let iw = self.require(w)?;
        Ok(self.split_ids(iu, iv, iw))
    }

    /// Insert `w` into the edge `u`-`v`, or into the sub-edge of it that
    /// contains `w` when `u`-`v` has already been subdivided.
    ///
    /// Starting at `u`, walks neighbours that lie on the segment `u`-`v`
    /// in order of their position along it, and splits the first
    /// sub-edge whose far end lies at or beyond `w`'s projection.
    /// Returns `false` when `w` is already on the chain or no such
    /// sub-edge exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] when any of the three
    /// points is not a vertex.
    pub fn split_edge_along(&mut self, u: Point, v: Point, w: Point) -> Result<bool, GraphError> {
        let iu = self.require(u)?;
        let iv = self.require(v)?;
        let iw = self.require(w)?;
        if iw == iu || iw == iv {
            return Ok(false);
        }
        if self.vertices[iu].adjacency.contains(&iv) {
            return Ok(self.split_ids(iu, iv, iw));
        }

        let line = Segment::new(u, v);
        let target = line.project(w);
        let tolerance = COLLINEAR_TOLERANCE * line.length().max(1.0);

        let mut current = iu;
        let mut current_t = 0.0;
        loop {
            let next = self.vertices[current]
                .adjacency
                .iter()
                .map(|&n| (n, self.vertices[n].point))
                .filter(|&(_, p)| nearest_parameter_distance(&line, p) <= tolerance)
                .map(|(n, p)| (n, line.project(p)))
                .filter(|&(_, t)| t > current_t)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let Some((next, next_t)) = next else {
                return Ok(false);
            };
            if next == iw {
                return Ok(false);
            }
            if next_t >= target {
                return Ok(self.split_ids(current, next, iw));
            }
            if next == iv {
                return Ok(false);
            }
            current = next;
            current_t = next_t;
        }
    }

    /// One candidate per directed adjacency entry, numbered in
    /// enumeration order.
    #[must_use]
    pub fn candidate_edges(&self) -> Vec<CandidateEdge> {
        self.edges()
            .filter_map(|(from, to)| {
                let a = self.vertices[from].point;
                let b = self.vertices[to].point;
                (a != b).then(|| (from, to, Segment::new(a, b)))
            })
            .enumerate()
            .map(|(id, (from, to, segment))| CandidateEdge::new(id, from, to, segment))
            .collect()
    }

    /// The candidates of [`candidate_edges`](Self::candidate_edges)
    /// whose envelope comes within `margin` of `bounds`.
    ///
    /// Candidate ids and relative order are the same as in the full
    /// enumeration.
    #[must_use]
    pub fn candidate_edges_near(&self, bounds: &BoundingBox, margin: f64) -> Vec<CandidateEdge> {
        let candidates = self.candidate_edges();
        if candidates.is_empty() {
            return candidates;
        }

        let entries: Vec<IndexedEdge> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (a, b) = (c.segment.start(), c.segment.end());
                GeomWithData::new(
                    Line::new(geo::Coord { x: a.x, y: a.y }, geo::Coord { x: b.x, y: b.y }),
                    i,
                )
            })
            .collect();
        let tree = RTree::bulk_load(entries);

        let grown = bounds.expanded(margin);
        let envelope = AABB::from_corners(
            geo::Point::new(grown.min.x, grown.min.y),
            geo::Point::new(grown.max.x, grown.max.y),
        );
        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();

        let mut candidates: Vec<Option<CandidateEdge>> = candidates.into_iter().map(Some).collect();
        hits.into_iter()
            .filter_map(|i| candidates[i].take())
            .collect()
    }

    fn require(&self, point: Point) -> Result<VertexId, GraphError> {
        self.vertex_id(point)
            .ok_or(GraphError::UnknownVertex(point))
    }

    fn link(&mut self, u: VertexId, v: VertexId) {
        if self.vertices[u].adjacency.contains(&v) {
            return;
        }
        self.vertices[u].adjacency.push(v);
        self.vertices[v].adjacency.push(u);
        self.edge_count += 1;
    }

    fn split_ids(&mut self, u: VertexId, v: VertexId, w: VertexId) -> bool {
        if w == u || w == v || !self.vertices[u].adjacency.contains(&v) {
            return false;
        }
        self.redirect(u, v, w);
        self.redirect(v, u, w);
        self.edge_count -= 1;
        self.link(u, w);
        self.link(v, w);
        true
    }

    /// Replace `from`'s entry for `old` with `new` in place, dropping it
    /// instead when `new` is already a neighbour. The mirror entry on
    /// `new` is left to the caller.
    fn redirect(&mut self, from: VertexId, old: VertexId, new: VertexId) {
        let adjacency = &mut self.vertices[from].adjacency;
        let already_linked = adjacency.contains(&new);
        if let Some(pos) = adjacency.iter().position(|&n| n == old) {
            if already_linked {
                adjacency.remove(pos);
            } else {
                adjacency[pos] = new;
                self.vertices[new].adjacency.push(from);
                self.edge_count += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    // --- Vertex mapping ---

    #[test]
    fn map_vertex_deduplicates_exact_coordinates() {
        let mut g = RoadGraph::new();
        let a = g.map_vertex(p(1.0, 2.0));
        let b = g.map_vertex(p(1.0, 2.0));
        assert_eq!(a, b);
        assert_eq!(g.vertex_count(), 1);
    }

    #[test]
    fn near_duplicates_stay_distinct() {
        let mut g = RoadGraph::new();
        let a = g.map_vertex(p(1.0, 2.0));
        let b = g.map_vertex(p(1.0 + 1e-12, 2.0));
        assert_ne!(a, b);
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn negative_zero_maps_to_positive_zero() {
        let mut g = RoadGraph::new();
        let a = g.map_vertex(p(0.0, 5.0));
        let b = g.map_vertex(p(-0.0, 5.0));
        assert_eq!(a, b);
    }

    // --- add_edge ---

    #[test]
    fn add_edge_is_symmetric() {
        let mut g = RoadGraph::new();
        let (u, v) = g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap().unwrap();
        assert_eq!(g.neighbors(u), &[v]);
        assert_eq!(g.neighbors(v), &[u]);
        assert_eq!(g.edge_count(), 1);
        assert!(g.is_symmetric());
    }

    #[test]
    fn add_edge_skips_self_loop_but_maps_vertex() {
        let mut g = RoadGraph::new();
        assert_eq!(g.add_edge(p(3.0, 3.0), p(3.0, 3.0)).unwrap(), None);
        assert_eq!(g.vertex_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn add_edge_twice_does_not_duplicate() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        g.add_edge(p(10.0, 0.0), p(0.0, 0.0)).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.max_degree(), 1);
    }

    #[test]
    fn add_edge_rejects_long_edge_without_mutation() {
        let mut g = RoadGraph::new();
        let err = g.add_edge(p(0.0, 0.0), p(20_000.0, 0.0)).unwrap_err();
        assert!(matches!(err, GraphError::EdgeTooLong { .. }));
        assert!(g.is_empty());
    }

    #[test]
    fn custom_edge_limit() {
        let mut g = RoadGraph::with_max_edge_length(5.0);
        assert!(g.add_edge(p(0.0, 0.0), p(3.0, 4.0)).is_ok());
        assert!(g.add_edge(p(0.0, 0.0), p(3.0, 4.1)).is_err());
    }

    #[test]
    fn explicit_edge_limit_overrides_graph_limit() {
        let mut g = RoadGraph::new();
        let err = g
            .add_edge_within(p(0.0, 0.0), p(60.0, 0.0), 50.0)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::EdgeTooLong {
                from: p(0.0, 0.0),
                to: p(60.0, 0.0),
                length: 60.0,
                limit: 50.0,
            }
        );
        assert!(g.is_empty());
        assert!(g.add_edge_within(p(0.0, 0.0), p(60.0, 0.0), 100.0).is_ok());
    }

    #[test]
    fn degree_grows_without_bound() {
        let mut g = RoadGraph::new();
        let hub = p(0.0, 0.0);
        for i in 0..64 {
            let angle = f64::from(i) * std::f64::consts::TAU / 64.0;
            g.add_edge(hub, p(100.0 * angle.cos(), 100.0 * angle.sin()))
                .unwrap();
        }
        let id = g.vertex_id(hub).unwrap();
        assert_eq!(g.vertex(id).unwrap().degree(), 64);
        assert_eq!(g.max_degree(), 64);
        assert!(g.is_symmetric());
    }

    // --- split_edge ---

    #[test]
    fn split_edge_rewrites_both_sides() {
        let mut g = RoadGraph::new();
        let (u, v) = g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap().unwrap();
        let w = g.map_vertex(p(4.0, 0.0));
        assert!(g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(4.0, 0.0)).unwrap());
        assert_eq!(g.neighbors(u), &[w]);
        assert_eq!(g.neighbors(v), &[w]);
        assert_eq!(g.neighbors(w), &[u, v]);
        assert_eq!(g.edge_count(), 2);
        assert!(g.is_symmetric());
    }

    #[test]
    fn split_edge_keeps_neighbour_position() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(0.0, 10.0)).unwrap();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        g.add_edge(p(0.0, 0.0), p(0.0, -10.0)).unwrap();
        let w = g.map_vertex(p(5.0, 0.0));
        g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 0.0)).unwrap();
        let origin = g.vertex_id(p(0.0, 0.0)).unwrap();
        assert_eq!(g.neighbors(origin)[1], w);
    }

    #[test]
    fn split_edge_with_already_linked_vertex() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        g.add_edge(p(0.0, 0.0), p(5.0, 1.0)).unwrap();
        assert!(g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 1.0)).unwrap());
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.max_degree(), 2);
        assert!(g.is_symmetric());
    }

    #[test]
    fn split_edge_without_relation_is_noop() {
        let mut g = RoadGraph::new();
        g.map_vertex(p(0.0, 0.0));
        g.map_vertex(p(10.0, 0.0));
        g.map_vertex(p(5.0, 0.0));
        assert!(!g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 0.0)).unwrap());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn split_edge_at_endpoint_is_noop() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        assert!(!g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(10.0, 0.0)).unwrap());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn split_edge_unknown_vertex_is_error() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        let err = g.split_edge(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 0.0)).unwrap_err();
        assert_eq!(err, GraphError::UnknownVertex(p(5.0, 0.0)));
    }

    #[test]
    fn split_edge_along_finds_sub_edge() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(100.0, 0.0)).unwrap();
        g.map_vertex(p(25.0, 0.0));
        g.map_vertex(p(75.0, 0.0));
        assert!(g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(25.0, 0.0)).unwrap());
        assert!(g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(75.0, 0.0)).unwrap());

        let a = g.vertex_id(p(25.0, 0.0)).unwrap();
        let b = g.vertex_id(p(75.0, 0.0)).unwrap();
        let end = g.vertex_id(p(100.0, 0.0)).unwrap();
        assert!(g.neighbors(a).contains(&b));
        assert!(g.neighbors(b).contains(&end));
        assert!(!g.neighbors(a).contains(&end));
        assert_eq!(g.edge_count(), 3);
        assert!(g.is_symmetric());
    }

    #[test]
    fn split_edge_along_ignores_off_line_neighbours() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(100.0, 0.0)).unwrap();
        g.map_vertex(p(50.0, 0.0));
        g.split_edge(p(0.0, 0.0), p(100.0, 0.0), p(50.0, 0.0)).unwrap();
        // A spur leaving the chain must not be followed.
        g.add_edge(p(0.0, 0.0), p(60.0, 30.0)).unwrap();
        g.map_vertex(p(80.0, 0.0));
        assert!(g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(80.0, 0.0)).unwrap());
        let mid = g.vertex_id(p(50.0, 0.0)).unwrap();
        let w = g.vertex_id(p(80.0, 0.0)).unwrap();
        assert!(g.neighbors(mid).contains(&w));
    }

    #[test]
    fn split_edge_along_twice_is_noop() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(100.0, 0.0)).unwrap();
        g.map_vertex(p(40.0, 0.0));
        assert!(g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(40.0, 0.0)).unwrap());
        assert!(!g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(40.0, 0.0)).unwrap());
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn split_edge_along_reversed_direction() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(100.0, 0.0)).unwrap();
        g.map_vertex(p(30.0, 0.0));
        g.map_vertex(p(60.0, 0.0));
        g.split_edge_along(p(0.0, 0.0), p(100.0, 0.0), p(30.0, 0.0)).unwrap();
        assert!(g.split_edge_along(p(100.0, 0.0), p(0.0, 0.0), p(60.0, 0.0)).unwrap());
        let a = g.vertex_id(p(30.0, 0.0)).unwrap();
        let b = g.vertex_id(p(60.0, 0.0)).unwrap();
        assert!(g.neighbors(a).contains(&b));
        assert_eq!(g.edge_count(), 3);
    }

    // --- Read API ---

    #[test]
    fn component_count_counts_isolated_vertices() {
        let mut g = RoadGraph::new();
        assert_eq!(g.component_count(), 0);
        g.add_edge(p(0.0, 0.0), p(1.0, 0.0)).unwrap();
        g.add_edge(p(1.0, 0.0), p(2.0, 0.0)).unwrap();
        g.add_edge(p(10.0, 0.0), p(11.0, 0.0)).unwrap();
        g.map_vertex(p(50.0, 50.0));
        assert_eq!(g.component_count(), 3);
    }

    #[test]
    fn edges_lists_both_directions() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(1.0, 0.0)).unwrap();
        g.add_edge(p(1.0, 0.0), p(2.0, 0.0)).unwrap();
        let directed: Vec<_> = g.edges().collect();
        assert_eq!(directed, vec![(0, 1), (1, 0), (1, 2), (2, 1)]);
        let undirected: Vec<_> = g.undirected_edges().collect();
        assert_eq!(undirected, vec![(0, 1), (1, 2)]);
    }

    // --- Candidates ---

    #[test]
    fn candidate_edges_one_per_direction() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        let candidates = g.candidate_edges();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 0);
        assert_eq!(candidates[0].segment.start(), p(0.0, 0.0));
        assert_eq!(candidates[1].segment.start(), p(10.0, 0.0));
        assert!(candidates.iter().all(|c| !c.done));
    }

    #[test]
    fn candidate_edges_near_keeps_ids_and_order() {
        let mut g = RoadGraph::new();
        g.add_edge(p(0.0, 0.0), p(10.0, 0.0)).unwrap();
        g.add_edge(p(5000.0, 5000.0), p(5010.0, 5000.0)).unwrap();
        g.add_edge(p(10.0, 0.0), p(10.0, 10.0)).unwrap();

        let all = g.candidate_edges();
        let bounds = BoundingBox {
            min: p(-5.0, -5.0),
            max: p(20.0, 20.0),
        };
        let near = g.candidate_edges_near(&bounds, 1.0);

        let near_ids: Vec<usize> = near.iter().map(|c| c.id).collect();
        let expected: Vec<usize> = all
            .iter()
            .filter(|c| c.segment.start().x < 1000.0)
            .map(|c| c.id)
            .collect();
        assert_eq!(near_ids, expected);
        assert_eq!(near.len(), 4);
    }

    #[test]
    fn candidate_edges_near_on_empty_graph() {
        let g = RoadGraph::new();
        let bounds = BoundingBox {
            min: p(0.0, 0.0),
            max: p(1.0, 1.0),
        };
        assert!(g.candidate_edges_near(&bounds, 1.0).is_empty());
    }
}
