//! Plain-text graph tables.
//!
//! All three tables walk the adjacency lists in vertex order, so every
//! undirected edge appears once per direction.

use std::fmt::Write;

use mapweave_core::RoadGraph;

/// One line `x1 x2 y1 y2` per directed adjacency pair.
#[must_use]
pub fn to_adjacency_list(graph: &RoadGraph) -> String {
    let vertices = graph.vertices();
    let mut out = String::new();
    for (from, to) in graph.edges() {
        let (a, b) = (vertices[from].point(), vertices[to].point());
        let _ = writeln!(out, "{} {} {} {}", a.x, b.x, a.y, b.y);
    }
    out
}

/// One line `index,x,y` per vertex.
#[must_use]
pub fn to_vertex_table(graph: &RoadGraph) -> String {
    let mut out = String::new();
    for (i, v) in graph.vertices().iter().enumerate() {
        let p = v.point();
        let _ = writeln!(out, "{i},{},{}", p.x, p.y);
    }
    out
}

/// One line `edge_index,from_index,to_index` per directed adjacency
/// pair, numbered from zero.
#[must_use]
pub fn to_edge_table(graph: &RoadGraph) -> String {
    let mut out = String::new();
    for (count, (from, to)) in graph.edges().enumerate() {
        let _ = writeln!(out, "{count},{from},{to}");
    }
    out
}
