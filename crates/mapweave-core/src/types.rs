//! Shared types for the mapweave map-construction core.

use serde::{Deserialize, Serialize};

use crate::geometry::Segment;

/// A 2D point in projected map coordinates (for example UTM metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Axis-aligned bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Lower-left corner.
    pub min: Point,
    /// Upper-right corner.
    pub max: Point,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty input.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// The box grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

/// Configuration for one map-construction run.
///
/// One `MapConfig` describes one epsilon run: every trajectory merged
/// into the same graph is matched with the same tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Matching tolerance in coordinate units. A graph edge matches a
    /// trajectory portion when the portion stays within `eps` of it.
    pub eps: f64,

    /// Whether to stitch the boundaries of unmatched trajectory portions
    /// to the matched graph edges with short connector edges.
    pub connect: bool,

    /// Largest timestamp gap between consecutive samples that still
    /// belongs to one trajectory chunk.
    pub time_gap_threshold: f64,

    /// Connector edges are only added when the boundary points are at
    /// most `connector_factor * eps` apart.
    pub connector_factor: f64,

    /// Sanity limit on the length of any edge inserted into the graph.
    pub max_edge_length: f64,

    /// Prefilter candidate edges through an R-tree of edge envelopes
    /// before the per-segment interval scan.
    pub use_spatial_index: bool,
}

impl MapConfig {
    /// Default matching tolerance.
    pub const DEFAULT_EPS: f64 = 150.0;
    /// Default connector stitching.
    pub const DEFAULT_CONNECT: bool = true;
    /// Default time gap used to split trajectories into chunks.
    pub const DEFAULT_TIME_GAP_THRESHOLD: f64 = 120.0;
    /// Default connector distance factor.
    pub const DEFAULT_CONNECTOR_FACTOR: f64 = 10.0;
    /// Default maximum inserted edge length.
    pub const DEFAULT_MAX_EDGE_LENGTH: f64 = 10_000.0;
    /// Default spatial prefilter setting.
    pub const DEFAULT_USE_SPATIAL_INDEX: bool = true;

    /// Default configuration with a different tolerance.
    #[must_use]
    pub fn with_eps(eps: f64) -> Self {
        Self {
            eps,
            ..Self::default()
        }
    }

    /// Maximum distance between the two endpoints of a connector edge.
    #[must_use]
    pub fn connector_distance(&self) -> f64 {
        self.connector_factor * self.eps
    }

    /// Check every field for a usable value.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] for the first field that is not a
    /// finite positive number (`time_gap_threshold` may be zero).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(ConfigError::InvalidEps(self.eps));
        }
        if !(self.time_gap_threshold.is_finite() && self.time_gap_threshold >= 0.0) {
            return Err(ConfigError::InvalidTimeGapThreshold(self.time_gap_threshold));
        }
        if !(self.connector_factor.is_finite() && self.connector_factor >= 0.0) {
            return Err(ConfigError::InvalidConnectorFactor(self.connector_factor));
        }
        if self.max_edge_length.is_nan() || self.max_edge_length <= 0.0 {
            return Err(ConfigError::InvalidMaxEdgeLength(self.max_edge_length));
        }
        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            eps: Self::DEFAULT_EPS,
            connect: Self::DEFAULT_CONNECT,
            time_gap_threshold: Self::DEFAULT_TIME_GAP_THRESHOLD,
            connector_factor: Self::DEFAULT_CONNECTOR_FACTOR,
            max_edge_length: Self::DEFAULT_MAX_EDGE_LENGTH,
            use_spatial_index: Self::DEFAULT_USE_SPATIAL_INDEX,
        }
    }
}

/// Invalid [`MapConfig`] field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `eps` must be finite and positive.
    #[error("eps must be finite and positive, got {0}")]
    InvalidEps(f64),

    /// `time_gap_threshold` must be finite and non-negative.
    #[error("time gap threshold must be finite and non-negative, got {0}")]
    InvalidTimeGapThreshold(f64),

    /// `connector_factor` must be finite and non-negative.
    #[error("connector factor must be finite and non-negative, got {0}")]
    InvalidConnectorFactor(f64),

    /// `max_edge_length` must be positive.
    #[error("maximum edge length must be positive, got {0}")]
    InvalidMaxEdgeLength(f64),
}

/// Internal-consistency failure in the free-space geometry.
///
/// Raised when the resolved interval leaves its valid domain after all
/// clipping. Carries both segments so the failing pair can be replayed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A resolved interval parameter is non-finite or outside `[0, 1]`.
    #[error(
        "inconsistent free-space interval ({reason}) for edge {edge:?} and trajectory segment {segment:?}: t = [{t_lo}, {t_hi}]"
    )]
    Inconsistent {
        /// What went wrong.
        reason: &'static str,
        /// The graph edge.
        edge: Segment,
        /// The trajectory segment.
        segment: Segment,
        /// Lower trajectory parameter before the final clamp.
        t_lo: f64,
        /// Upper trajectory parameter before the final clamp.
        t_hi: f64,
    },
}

/// Graph bookkeeping failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// An inserted edge is longer than the configured sanity limit.
    #[error("edge from ({}, {}) to ({}, {}) has length {length}, over the limit of {limit}", .from.x, .from.y, .to.x, .to.y)]
    EdgeTooLong {
        /// First endpoint.
        from: Point,
        /// Second endpoint.
        to: Point,
        /// Euclidean length of the rejected edge.
        length: f64,
        /// Configured `max_edge_length`.
        limit: f64,
    },

    /// A point that was expected to be a graph vertex is not one.
    #[error("point ({}, {}) is not a vertex of the graph", .0.x, .0.y)]
    UnknownVertex(Point),
}

/// Failure while merging one trajectory into the graph.
///
/// The graph may hold a partial merge of the failing trajectory; no
/// adjacency relation is ever left asymmetric.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The interval computation hit an inconsistent state.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A graph update was rejected.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Matched coverage moved backwards along the trajectory.
    #[error("coverage regressed from {previous} to {current}")]
    CoverageRegressed {
        /// Coverage before the offending step.
        previous: f64,
        /// Coverage after the offending step.
        current: f64,
    },
}
