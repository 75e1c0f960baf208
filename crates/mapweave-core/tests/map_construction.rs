//! Integration test: build maps from several overlapping trajectories
//! through the public builder API and check graph-wide invariants.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mapweave_core::{
    MapBuilder, MapConfig, Point, RoadGraph, Trajectory, TrajectoryPoint, build_map,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn trajectory(coords: &[(f64, f64)]) -> Trajectory {
    coords
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| TrajectoryPoint::new(x, y, f64::from(u32::try_from(i).unwrap()) * 5.0))
        .collect()
}

/// A small grid of streets driven in both directions with some jitter.
fn city() -> Vec<Trajectory> {
    let mut out = Vec::new();
    let mut seed: u32 = 7;
    let mut jitter = || {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        f64::from((seed >> 16) % 7) - 3.0
    };
    for row in 0..3 {
        let y = f64::from(row) * 400.0;
        let forward: Vec<(f64, f64)> = (0..9)
            .map(|i| (f64::from(i) * 100.0, y + jitter()))
            .collect();
        let mut backward: Vec<(f64, f64)> = (0..9)
            .map(|i| (f64::from(i) * 100.0 + 50.0, y + jitter()))
            .collect();
        backward.reverse();
        out.push(trajectory(&forward));
        out.push(trajectory(&backward));
    }
    for col in 0..3 {
        let x = f64::from(col) * 400.0;
        let up: Vec<(f64, f64)> = (0..9)
            .map(|i| (x + jitter(), f64::from(i) * 100.0))
            .collect();
        out.push(trajectory(&up));
    }
    out
}

fn snapshot(graph: &RoadGraph) -> (Vec<Point>, Vec<(usize, usize)>) {
    (
        graph.vertices().iter().map(|v| v.point()).collect(),
        graph.edges().collect(),
    )
}

#[test]
fn city_graph_is_symmetric_and_connected() {
    init_logging();
    let graph = build_map(&city(), &MapConfig::with_eps(20.0)).unwrap();

    assert!(graph.is_symmetric());
    assert_eq!(graph.component_count(), 1);
    for (u, v) in graph.edges() {
        assert_ne!(u, v, "self-loop at vertex {u}");
        let length = graph.vertices()[u].point().distance(graph.vertices()[v].point());
        assert!(length <= MapConfig::DEFAULT_MAX_EDGE_LENGTH);
    }
    for vertex in graph.vertices() {
        let mut neighbors = vertex.neighbors().to_vec();
        neighbors.sort_unstable();
        neighbors.dedup();
        assert_eq!(neighbors.len(), vertex.degree(), "duplicate neighbour entry");
    }
}

#[test]
fn reverse_drives_reuse_forward_streets() {
    init_logging();
    let trips = city();
    let mut builder = MapBuilder::new(MapConfig::with_eps(20.0)).unwrap();
    builder.add_trajectory(&trips[0]).unwrap();
    let before = builder.graph().vertex_count();
    let report = builder.add_trajectory(&trips[1]).unwrap();

    assert!(!report.chunks[0].novel);
    assert!(report.reused_span() > 7.0);
    // Only the 50-unit overhang at the far end is new.
    assert!(builder.graph().vertex_count() - before <= 4);
}

#[test]
fn rebuilding_is_deterministic() {
    let config = MapConfig::with_eps(20.0);
    let a = build_map(&city(), &config).unwrap();
    let b = build_map(&city(), &config).unwrap();
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[test]
fn spatial_index_matches_full_scan() {
    let indexed = build_map(&city(), &MapConfig::with_eps(20.0)).unwrap();
    let full = build_map(
        &city(),
        &MapConfig {
            use_spatial_index: false,
            ..MapConfig::with_eps(20.0)
        },
    )
    .unwrap();
    assert_eq!(snapshot(&indexed), snapshot(&full));
}

#[test]
fn remerging_covered_trajectories_adds_nothing() {
    let trips = city();
    let mut builder = MapBuilder::new(MapConfig::with_eps(20.0)).unwrap();
    for t in &trips {
        builder.add_trajectory(t).unwrap();
    }
    let before = snapshot(builder.graph());
    for t in &trips[..2] {
        let report = builder.add_trajectory(t).unwrap();
        assert_eq!(report.new_edges(), 0);
    }
    assert_eq!(before.0.len(), builder.graph().vertex_count());
}
