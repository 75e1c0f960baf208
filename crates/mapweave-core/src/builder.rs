//! Incremental map construction over a sequence of trajectories.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::graph::RoadGraph;
use crate::merge::{MergeOutcome, merge_trajectory};
use crate::trajectory::Trajectory;
use crate::types::{ConfigError, MapConfig, MergeError};

/// Result of adding one trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryReport {
    /// Samples dropped as consecutive duplicates.
    pub duplicates_removed: usize,
    /// Samples lost because their chunk had fewer than two points.
    pub dropped_samples: usize,
    /// One outcome per merged chunk, in trajectory order.
    pub chunks: Vec<MergeOutcome>,
}

impl TrajectoryReport {
    /// Net edges added over all chunks.
    #[must_use]
    pub fn new_edges(&self) -> usize {
        self.chunks.iter().map(|c| c.new_edges).sum()
    }

    /// Connector edges added over all chunks.
    #[must_use]
    pub fn connector_edges(&self) -> usize {
        self.chunks.iter().map(|c| c.connector_edges).sum()
    }

    /// Edge splits over all chunks.
    #[must_use]
    pub fn splits(&self) -> usize {
        self.chunks.iter().map(|c| c.splits).sum()
    }

    /// Reused trajectory span over all chunks.
    #[must_use]
    pub fn reused_span(&self) -> f64 {
        self.chunks.iter().map(|c| c.reused_span).sum()
    }
}

/// Running totals for a [`MapBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Trajectories merged without error.
    pub trajectories: usize,
    /// Trajectories that stopped with a [`MergeError`].
    pub failed_trajectories: usize,
    /// Chunks merged.
    pub chunks: usize,
    /// Chunks that matched no existing edge.
    pub novel_chunks: usize,
}

/// Owns one road graph and merges trajectories into it in order.
#[derive(Debug, Clone)]
pub struct MapBuilder {
    graph: RoadGraph,
    config: MapConfig,
    stats: BuildStats,
}

impl MapBuilder {
    /// Builder with an empty graph.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`MapConfig::validate`].
    pub fn new(config: MapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            graph: RoadGraph::with_max_edge_length(config.max_edge_length),
            config,
            stats: BuildStats::default(),
        })
    }

    /// Deduplicate `trajectory`, cut it at time gaps, and merge every
    /// chunk into the graph.
    ///
    /// # Errors
    ///
    /// Returns the first [`MergeError`]. Chunks merged before it stay in
    /// the graph and the rest of the trajectory is not merged.
    pub fn add_trajectory(
        &mut self,
        trajectory: &Trajectory,
    ) -> Result<TrajectoryReport, MergeError> {
        let deduped = trajectory.remove_consecutive_duplicates();
        let chunks = deduped.split_on_time_gaps(self.config.time_gap_threshold);
        let kept: usize = chunks.iter().map(Trajectory::len).sum();

        let mut report = TrajectoryReport {
            duplicates_removed: trajectory.len() - deduped.len(),
            dropped_samples: deduped.len() - kept,
            chunks: Vec::with_capacity(chunks.len()),
        };
        if chunks.is_empty() {
            warn!(
                "trajectory with {} samples has no chunk of two or more points",
                trajectory.len()
            );
        }

        for (i, chunk) in chunks.iter().enumerate() {
            let points = chunk.to_points();
            match merge_trajectory(&mut self.graph, &points, &self.config) {
                Ok(outcome) => {
                    debug!(
                        "chunk {i}: {} points, {} new edges",
                        points.len(),
                        outcome.new_edges
                    );
                    self.stats.chunks += 1;
                    if outcome.novel {
                        self.stats.novel_chunks += 1;
                    }
                    report.chunks.push(outcome);
                }
                Err(e) => {
                    warn!("chunk {i} of {} failed: {e}", chunks.len());
                    self.stats.failed_trajectories += 1;
                    return Err(e);
                }
            }
        }

        self.stats.trajectories += 1;
        info!(
            "merged trajectory: {} chunks, {} new edges; graph has {} vertices, {} edges",
            report.chunks.len(),
            report.new_edges(),
            self.graph.vertex_count(),
            self.graph.edge_count(),
        );
        Ok(report)
    }

    /// The graph built so far.
    #[must_use]
    pub const fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Totals so far.
    #[must_use]
    pub const fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Consume the builder, returning the graph.
    #[must_use]
    pub fn into_graph(self) -> RoadGraph {
        self.graph
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::trajectory::TrajectoryPoint;
    use crate::types::{GeometryError, GraphError, Point};

    fn traj(samples: &[(f64, f64, f64)]) -> Trajectory {
        samples
            .iter()
            .map(|&(x, y, t)| TrajectoryPoint::new(x, y, t))
            .collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = MapConfig {
            eps: 0.0,
            ..MapConfig::default()
        };
        assert!(matches!(
            MapBuilder::new(config),
            Err(ConfigError::InvalidEps(_))
        ));
    }

    #[test]
    fn first_trajectory_becomes_the_graph() {
        let mut builder = MapBuilder::new(MapConfig::with_eps(10.0)).unwrap();
        let report = builder
            .add_trajectory(&traj(&[
                (0.0, 0.0, 0.0),
                (0.0, 0.0, 1.0),
                (100.0, 0.0, 2.0),
                (200.0, 0.0, 3.0),
            ]))
            .unwrap();

        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.new_edges(), 2);
        assert_eq!(builder.graph().vertex_count(), 3);
        assert_eq!(builder.stats().trajectories, 1);
        assert_eq!(builder.stats().novel_chunks, 1);
    }

    #[test]
    fn time_gap_chunks_merge_separately() {
        let mut builder = MapBuilder::new(MapConfig::with_eps(10.0)).unwrap();
        let report = builder
            .add_trajectory(&traj(&[
                (0.0, 0.0, 0.0),
                (100.0, 0.0, 10.0),
                (500.0, 500.0, 1000.0),
                (600.0, 500.0, 1010.0),
                (900.0, 900.0, 5000.0),
            ]))
            .unwrap();

        assert_eq!(report.chunks.len(), 2);
        assert_eq!(report.dropped_samples, 1);
        assert_eq!(builder.graph().edge_count(), 2);
        assert_eq!(builder.graph().component_count(), 2);
    }

    #[test]
    fn repeated_trajectory_reuses_graph() {
        let mut builder = MapBuilder::new(MapConfig::with_eps(10.0)).unwrap();
        let t = traj(&[(0.0, 0.0, 0.0), (100.0, 0.0, 1.0), (200.0, 0.0, 2.0)]);
        builder.add_trajectory(&t).unwrap();
        let report = builder.add_trajectory(&t).unwrap();

        assert_eq!(report.new_edges(), 0);
        assert!(report.reused_span() > 1.9);
        assert_eq!(builder.stats().trajectories, 2);
        assert_eq!(builder.stats().novel_chunks, 1);
    }

    #[test]
    fn failure_keeps_earlier_chunks() {
        let config = MapConfig {
            max_edge_length: 150.0,
            ..MapConfig::with_eps(10.0)
        };
        let mut builder = MapBuilder::new(config).unwrap();
        let err = builder
            .add_trajectory(&traj(&[
                (0.0, 0.0, 0.0),
                (100.0, 0.0, 10.0),
                (1000.0, 1000.0, 1000.0),
                (2000.0, 1000.0, 1010.0),
            ]))
            .unwrap_err();

        assert!(matches!(
            err,
            MergeError::Graph(GraphError::EdgeTooLong { .. })
        ));
        assert_eq!(builder.stats().failed_trajectories, 1);
        assert_eq!(builder.stats().trajectories, 0);
        assert!(builder.graph().vertex_id(Point::new(100.0, 0.0)).is_some());
        assert_eq!(builder.graph().edge_count(), 1);
    }

    #[test]
    fn geometry_error_stops_only_that_trajectory() {
        let config = MapConfig {
            max_edge_length: f64::INFINITY,
            use_spatial_index: false,
            ..MapConfig::with_eps(10.0)
        };
        let mut builder = MapBuilder::new(config).unwrap();
        // Its length overflows f64, which no band computation survives.
        builder
            .add_trajectory(&traj(&[(0.0, 0.0, 0.0), (1.5e308, 1.5e308, 10.0)]))
            .unwrap();

        let err = builder
            .add_trajectory(&traj(&[
                (-1000.0, -1000.0, 0.0),
                (-900.0, -1000.0, 10.0),
                (-5.0, 5.0, 1000.0),
                (5.0, -5.0, 1010.0),
            ]))
            .unwrap_err();

        assert!(matches!(
            err,
            MergeError::Geometry(GeometryError::Inconsistent { .. })
        ));
        assert_eq!(builder.stats().failed_trajectories, 1);
        assert_eq!(builder.stats().trajectories, 1);
        // The chunk before the failing one was merged.
        assert!(builder.graph().vertex_id(Point::new(-900.0, -1000.0)).is_some());
        assert_eq!(builder.graph().edge_count(), 2);
        assert!(builder.graph().is_symmetric());

        builder
            .add_trajectory(&traj(&[(-1000.0, 500.0, 0.0), (-900.0, 500.0, 10.0)]))
            .unwrap();
        assert_eq!(builder.stats().trajectories, 2);
        assert_eq!(builder.graph().edge_count(), 3);
    }

    #[test]
    fn into_graph_returns_built_graph() {
        let mut builder = MapBuilder::new(MapConfig::with_eps(10.0)).unwrap();
        builder
            .add_trajectory(&traj(&[(0.0, 0.0, 0.0), (10.0, 0.0, 1.0)]))
            .unwrap();
        let graph = builder.into_graph();
        assert_eq!(graph.edge_count(), 1);
    }
}
