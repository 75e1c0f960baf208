//! Timestamped trajectories and their preprocessing.

use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, Point};

/// A GPS sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Sample time in seconds.
    pub timestamp: f64,
}

impl TrajectoryPoint {
    /// Create a sample.
    #[must_use]
    pub const fn new(x: f64, y: f64, timestamp: f64) -> Self {
        Self { x, y, timestamp }
    }

    /// Position without the timestamp.
    #[must_use]
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An ordered sequence of samples from one vehicle trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory(Vec<TrajectoryPoint>);

impl Trajectory {
    /// Wrap `points` without reordering them.
    #[must_use]
    pub const fn new(points: Vec<TrajectoryPoint>) -> Self {
        Self(points)
    }

    /// The samples in order.
    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.0
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sample positions in order.
    #[must_use]
    pub fn to_points(&self) -> Vec<Point> {
        self.0.iter().map(TrajectoryPoint::point).collect()
    }

    /// Drop every sample at exactly the same position as its
    /// predecessor. The first sample of a run is kept.
    #[must_use]
    pub fn remove_consecutive_duplicates(&self) -> Self {
        let mut points: Vec<TrajectoryPoint> = Vec::with_capacity(self.0.len());
        for &p in &self.0 {
            if points.last().is_some_and(|last| last.point() == p.point()) {
                continue;
            }
            points.push(p);
        }
        Self(points)
    }

    /// Split wherever consecutive samples are more than `threshold`
    /// seconds apart. Pieces with fewer than two samples are dropped.
    #[must_use]
    pub fn split_on_time_gaps(&self, threshold: f64) -> Vec<Self> {
        let mut chunks = Vec::new();
        let mut current: Vec<TrajectoryPoint> = Vec::new();
        for &p in &self.0 {
            if let Some(last) = current.last()
                && p.timestamp - last.timestamp > threshold
            {
                let done = std::mem::take(&mut current);
                if done.len() >= 2 {
                    chunks.push(Self(done));
                }
            }
            current.push(p);
        }
        if current.len() >= 2 {
            chunks.push(Self(current));
        }
        chunks
    }

    /// Bounding box of the sample positions, `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.0.iter().map(TrajectoryPoint::point))
    }
}

impl FromIterator<TrajectoryPoint> for Trajectory {
    fn from_iter<I: IntoIterator<Item = TrajectoryPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
