//! Free-space interval records and their queue ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Match between a graph edge and a single trajectory segment.
///
/// `cstart..cend` parameterises the trajectory segment and
/// `vstart..vend` the graph edge; all four lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalInterval {
    /// Start of the match along the trajectory segment.
    pub cstart: f64,
    /// End of the match along the trajectory segment.
    pub cend: f64,
    /// Edge position matched by `cstart`.
    pub vstart: f64,
    /// Edge position matched by `cend`.
    pub vend: f64,
}

/// Match between a graph edge and a run of trajectory segments.
///
/// `cstart` and `cend` are global trajectory coordinates: the integer
/// part is the index of the segment's first point and the fraction is
/// the position within that segment, so `2.5` is halfway between
/// samples 2 and 3. `start_index` is the first segment's start sample
/// and `end_index` the sample index from which a later scan resumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeInterval {
    /// Start of the match in trajectory coordinates.
    pub cstart: f64,
    /// End of the match in trajectory coordinates.
    pub cend: f64,
    /// Edge position matched by `cstart`, in `[0, 1]`.
    pub vstart: f64,
    /// Edge position matched by `cend`, in `[0, 1]`.
    pub vend: f64,
    /// Sample index of the first matched segment's start.
    pub start_index: usize,
    /// Sample index where the scan that produced this interval stopped.
    pub end_index: usize,
}

impl FreeInterval {
    /// Length of the match in trajectory-segment units.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.cend - self.cstart
    }
}

/// Priority-queue key for a candidate edge.
///
/// Orders by `cstart`, then `cend`, then candidate id, using the IEEE
/// total order so the ordering is total even for unusual values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntervalKey {
    /// Interval start in trajectory coordinates.
    pub cstart: f64,
    /// Interval end in trajectory coordinates.
    pub cend: f64,
    /// Candidate id; breaks ties deterministically.
    pub id: usize,
}

impl IntervalKey {
    /// Key for candidate `id` holding `interval`.
    #[must_use]
    pub const fn new(interval: &FreeInterval, id: usize) -> Self {
        Self {
            cstart: interval.cstart,
            cend: interval.cend,
            id,
        }
    }
}

impl Ord for IntervalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cstart
            .total_cmp(&other.cstart)
            .then_with(|| self.cend.total_cmp(&other.cend))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for IntervalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IntervalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IntervalKey {}
