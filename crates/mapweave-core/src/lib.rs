//! mapweave-core: Incremental road-map construction from GPS
//! trajectories (sans-IO).
//!
//! Trajectories are merged one at a time into a growing road graph:
//! stretches that stay within `eps` of an existing edge (in the Fréchet
//! sense) reuse that edge, and the rest of the trajectory becomes new
//! edges, optionally stitched to the matched edges with short connectors.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! trajectories and returns structured data. Parsing and serialization
//! live in `mapweave-export`, file handling in the `mapweave` binary.

pub mod builder;
pub mod diagnostics;
pub mod geometry;
pub mod graph;
pub mod interval;
pub mod merge;
pub mod propagate;
pub mod trajectory;
pub mod types;

pub use builder::{BuildStats, MapBuilder, TrajectoryReport};
pub use geometry::Segment;
pub use graph::{RoadGraph, Vertex, VertexId};
pub use merge::{MergeOutcome, merge_trajectory};
pub use trajectory::{Trajectory, TrajectoryPoint};
pub use types::{
    BoundingBox, ConfigError, GeometryError, GraphError, MapConfig, MergeError, Point,
};

/// Build a road graph from `trajectories`, merged in order.
///
/// A trajectory that fails to merge is logged and skipped; whatever it
/// added before failing stays in the graph.
///
/// # Errors
///
/// Returns [`ConfigError`] if `config` is invalid.
pub fn build_map<'a>(
    trajectories: impl IntoIterator<Item = &'a Trajectory>,
    config: &MapConfig,
) -> Result<RoadGraph, ConfigError> {
    let mut builder = MapBuilder::new(config.clone())?;
    for (i, trajectory) in trajectories.into_iter().enumerate() {
        if let Err(e) = builder.add_trajectory(trajectory) {
            log::warn!("trajectory {i} not fully merged: {e}");
        }
    }
    Ok(builder.into_graph())
}
