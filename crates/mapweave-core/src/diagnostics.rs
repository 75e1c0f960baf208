//! Run diagnostics: per-trajectory timing and merge counts.
//!
//! The core crate does no I/O and reads no clock of its own. Callers
//! pass a [`Clock`] so that timing works on any platform, and get back
//! plain data that serializes to JSON or formats as a text report.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::builder::{BuildStats, MapBuilder};
use crate::graph::RoadGraph;
use crate::trajectory::Trajectory;
use crate::types::{MapConfig, MergeError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics for one epsilon run over a set of trajectories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Configuration the run used.
    pub config: MapConfig,
    /// One entry per input trajectory, in input order.
    pub trajectories: Vec<TrajectoryDiagnostics>,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Final graph and builder totals.
    pub summary: RunSummary,
}

/// Diagnostics for one input trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryDiagnostics {
    /// Caller-supplied label, typically the file name.
    pub name: String,
    /// Wall-clock time spent merging (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What happened to the trajectory.
    pub outcome: TrajectoryOutcome,
}

/// How a trajectory was handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrajectoryOutcome {
    /// Every chunk merged.
    Merged {
        /// Chunks merged.
        chunks: usize,
        /// Chunks that matched no existing edge.
        novel_chunks: usize,
        /// Samples removed as consecutive duplicates.
        duplicates_removed: usize,
        /// Samples in chunks too short to merge.
        dropped_samples: usize,
        /// Net edges added.
        new_edges: usize,
        /// Connector edges added.
        connector_edges: usize,
        /// Existing edges split.
        splits: usize,
        /// Trajectory span matched to existing edges, in segment units.
        reused_span: f64,
    },
    /// Merging stopped with an error.
    Failed {
        /// Error message.
        error: String,
    },
    /// Never merged, e.g. because the input could not be read.
    Skipped {
        /// Why.
        reason: String,
    },
}

/// Totals at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Vertices in the final graph.
    pub vertex_count: usize,
    /// Undirected edges in the final graph.
    pub edge_count: usize,
    /// Connected components in the final graph.
    pub component_count: usize,
    /// Largest vertex degree.
    pub max_degree: usize,
    /// Builder totals.
    pub stats: BuildStats,
    /// Trajectories skipped before merging.
    pub skipped: usize,
}

impl RunDiagnostics {
    /// Empty diagnostics for a run with `config`.
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            trajectories: Vec::new(),
            total_duration: Duration::ZERO,
            summary: RunSummary::default(),
        }
    }

    /// Record a trajectory that was never merged.
    pub fn record_skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.summary.skipped += 1;
        self.trajectories.push(TrajectoryDiagnostics {
            name: name.into(),
            duration: Duration::ZERO,
            outcome: TrajectoryOutcome::Skipped {
                reason: reason.into(),
            },
        });
    }

    /// Fill in the summary from the final graph and builder totals.
    pub fn finish(&mut self, graph: &RoadGraph, stats: &BuildStats, total_duration: Duration) {
        self.total_duration = total_duration;
        self.summary = RunSummary {
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
            component_count: graph.component_count(),
            max_degree: graph.max_degree(),
            stats: stats.clone(),
            skipped: self.summary.skipped,
        };
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Map Construction Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "eps={}  connect={}  time_gap={}s",
            self.config.eps, self.config.connect, self.config.time_gap_threshold,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<28} {:>10}  {}",
            "Trajectory", "Duration", "Details"
        ));
        lines.push("-".repeat(80));
        for t in &self.trajectories {
            let ms = duration_ms(t.duration);
            let details = format_outcome(&t.outcome);
            lines.push(format!("{:<28} {ms:>8.3}ms  {details}", t.name));
        }

        lines.push(String::new());
        let s = &self.summary;
        lines.push(format!(
            "Vertices: {}  |  Edges: {}  |  Components: {}  |  Max degree: {}",
            s.vertex_count, s.edge_count, s.component_count, s.max_degree,
        ));
        lines.push(format!(
            "Merged: {}  |  Failed: {}  |  Skipped: {}  |  Chunks: {} ({} novel)",
            s.stats.trajectories,
            s.stats.failed_trajectories,
            s.skipped,
            s.stats.chunks,
            s.stats.novel_chunks,
        ));

        lines.join("\n")
    }
}

/// Merge `trajectory` through `builder`, timing it and appending the
/// result to `diagnostics`.
///
/// # Errors
///
/// Returns the [`MergeError`] from [`MapBuilder::add_trajectory`]; it
/// is also recorded as a failed entry.
pub fn add_trajectory_with_diagnostics<C: Clock>(
    builder: &mut MapBuilder,
    name: &str,
    trajectory: &Trajectory,
    clock: &C,
    diagnostics: &mut RunDiagnostics,
) -> Result<(), MergeError> {
    let start = clock.now();
    let result = builder.add_trajectory(trajectory);
    let duration = clock.elapsed(&start);

    let (outcome, result) = match result {
        Ok(report) => (
            TrajectoryOutcome::Merged {
                chunks: report.chunks.len(),
                novel_chunks: report.chunks.iter().filter(|c| c.novel).count(),
                duplicates_removed: report.duplicates_removed,
                dropped_samples: report.dropped_samples,
                new_edges: report.new_edges(),
                connector_edges: report.connector_edges(),
                splits: report.splits(),
                reused_span: report.reused_span(),
            },
            Ok(()),
        ),
        Err(e) => (
            TrajectoryOutcome::Failed {
                error: e.to_string(),
            },
            Err(e),
        ),
    };

    diagnostics.trajectories.push(TrajectoryDiagnostics {
        name: name.to_owned(),
        duration,
        outcome,
    });
    result
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_outcome(outcome: &TrajectoryOutcome) -> String {
    match outcome {
        TrajectoryOutcome::Merged {
            chunks,
            novel_chunks,
            new_edges,
            connector_edges,
            splits,
            reused_span,
            ..
        } => format!(
            "{chunks} chunks ({novel_chunks} novel) +{new_edges} edges, {connector_edges} connectors, {splits} splits, reused {reused_span:.2}",
        ),
        TrajectoryOutcome::Failed { error } => format!("FAILED: {error}"),
        TrajectoryOutcome::Skipped { reason } => format!("skipped: {reason}"),
    }
}
