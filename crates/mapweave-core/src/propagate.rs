//! Interval propagation: scan a trajectory for the next maximal match
//! with one candidate edge.

use serde::{Deserialize, Serialize};

use crate::geometry::{Segment, segment_band_intersection};
use crate::graph::VertexId;
use crate::interval::{FreeInterval, IntervalKey, LocalInterval};
use crate::types::{GeometryError, Point};

/// A directed graph edge tested against the current trajectory.
///
/// Candidates are rebuilt from the graph's adjacency for every
/// trajectory, so `interval` and `done` are per-trajectory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEdge {
    /// Position in the graph's full candidate enumeration.
    pub id: usize,
    /// Start vertex.
    pub from: VertexId,
    /// End vertex.
    pub to: VertexId,
    /// Geometry from `from` to `to`.
    pub segment: Segment,
    /// Latest interval found by [`extend_interval`].
    pub interval: FreeInterval,
    /// No further match is possible along the rest of the trajectory.
    pub done: bool,
}

impl CandidateEdge {
    /// Fresh candidate with an empty interval.
    #[must_use]
    pub fn new(id: usize, from: VertexId, to: VertexId, segment: Segment) -> Self {
        Self {
            id,
            from,
            to,
            segment,
            interval: FreeInterval::default(),
            done: false,
        }
    }

    /// Queue key of the current interval.
    #[must_use]
    pub const fn key(&self) -> IntervalKey {
        IntervalKey::new(&self.interval, self.id)
    }

    /// Edge point matched by the start of the current interval.
    #[must_use]
    pub fn entry_point(&self) -> Point {
        self.segment.point_at(self.interval.vstart)
    }

    /// Edge point matched by the end of the current interval.
    #[must_use]
    pub fn exit_point(&self) -> Point {
        self.segment.point_at(self.interval.vend)
    }

    fn finish(&mut self, start_index: usize, first: LocalInterval, cend: f64, vend: f64, end_index: usize) {
        #[allow(clippy::cast_precision_loss)]
        let cstart = start_index as f64 + first.cstart;
        self.interval = FreeInterval {
            cstart,
            cend,
            vstart: first.vstart,
            vend,
            start_index,
            end_index,
        };
        self.done = false;
    }
}

/// Scan `trajectory` from segment `start_segment` for the next maximal
/// interval where `candidate` stays within `eps`.
///
/// Segment `i` joins samples `i - 1` and `i`. On return either
/// `candidate.interval` holds the new match, or `candidate.done` is set
/// and the previous interval is left untouched.
///
/// A match ends inside the first segment whose local match stops short
/// of the segment end, at the shared sample before the first segment
/// that does not match at all, or at the last sample.
///
/// # Errors
///
/// Propagates [`GeometryError`] from the per-segment intersection.
#[allow(clippy::cast_precision_loss)]
pub fn extend_interval(
    candidate: &mut CandidateEdge,
    trajectory: &[Point],
    start_segment: usize,
    eps: f64,
) -> Result<(), GeometryError> {
    let len = trajectory.len();
    let start = start_segment.max(1);
    if start >= len {
        candidate.interval.end_index = len;
        candidate.done = true;
        return Ok(());
    }

    let mut first: Option<(usize, LocalInterval)> = None;
    let mut last: Option<LocalInterval> = None;

    for i in start..len {
        let segment = Segment::new(trajectory[i - 1], trajectory[i]);
        let local = segment_band_intersection(&candidate.segment, &segment, eps)?;

        match (first, local) {
            (None, Some(local)) => {
                first = Some((i - 1, local));
                if local.cend < 1.0 {
                    candidate.finish(i - 1, local, (i - 1) as f64 + local.cend, local.vend, i);
                    return Ok(());
                }
                last = Some(local);
            }
            (Some((start_index, first_local)), Some(local)) => {
                if local.cend < 1.0 {
                    candidate.finish(
                        start_index,
                        first_local,
                        (i - 1) as f64 + local.cend,
                        local.vend,
                        i,
                    );
                    return Ok(());
                }
                last = Some(local);
            }
            (Some((start_index, first_local)), None) => {
                // The previous segment matched through its end sample.
                let vend = last.map_or(first_local.vend, |l| l.vend);
                candidate.finish(start_index, first_local, (i - 1) as f64, vend, i);
                return Ok(());
            }
            (None, None) => {}
        }
    }

    match (first, last) {
        (Some((start_index, first_local)), Some(last)) => {
            candidate.finish(
                start_index,
                first_local,
                (len - 2) as f64 + last.cend,
                last.vend,
                len - 2,
            );
        }
        _ => {
            candidate.interval.end_index = len;
            candidate.done = true;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(x0: f64, y0: f64, x1: f64, y1: f64) -> CandidateEdge {
        CandidateEdge::new(
            0,
            0,
            1,
            Segment::new(Point::new(x0, y0), Point::new(x1, y1)),
        )
    }

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn no_match_marks_done() {
        let mut c = candidate(0.0, 0.0, 100.0, 0.0);
        let traj = points(&[(0.0, 500.0), (100.0, 500.0), (200.0, 500.0)]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(c.done);
        assert_eq!(c.interval.end_index, 3);
    }

    #[test]
    fn start_beyond_trajectory_marks_done() {
        let mut c = candidate(0.0, 0.0, 100.0, 0.0);
        let traj = points(&[(0.0, 0.0), (100.0, 0.0)]);
        extend_interval(&mut c, &traj, 2, 10.0).unwrap();
        assert!(c.done);
        assert_eq!(c.interval.end_index, 2);
    }

    #[test]
    fn start_segment_zero_is_treated_as_one() {
        let mut c = candidate(0.0, 0.0, 100.0, 0.0);
        let traj = points(&[(0.0, 0.0), (100.0, 0.0)]);
        extend_interval(&mut c, &traj, 0, 10.0).unwrap();
        assert!(!c.done);
        assert!(approx(c.interval.cstart, 0.0));
        assert!(approx(c.interval.cend, 1.0));
    }

    #[test]
    fn match_ending_inside_first_segment() {
        let mut c = candidate(0.0, 0.0, 100.0, 0.0);
        let traj = points(&[(0.0, 0.0), (200.0, 0.0), (300.0, 0.0)]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(!c.done);
        assert_eq!(c.interval.start_index, 0);
        assert_eq!(c.interval.end_index, 1);
        assert!(approx(c.interval.cstart, 0.0));
        // Leaves the end disc at x = 110.
        assert!(approx(c.interval.cend, 0.55));
        assert!(approx(c.interval.vstart, 0.0));
        assert!(approx(c.interval.vend, 1.0));
    }

    #[test]
    fn match_spanning_segments_ends_inside_later_segment() {
        let mut c = candidate(0.0, 0.0, 400.0, 0.0);
        let traj = points(&[(50.0, 100.0), (100.0, 0.0), (300.0, 0.0), (350.0, 100.0)]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(!c.done);
        assert_eq!(c.interval.start_index, 0);
        assert_eq!(c.interval.end_index, 3);
        assert!(approx(c.interval.cstart, 0.9));
        assert!(approx(c.interval.cend, 2.1));
        assert!(approx(c.interval.vstart, 0.2375));
        assert!(approx(c.interval.vend, 0.7625));
    }

    #[test]
    fn match_running_to_the_end() {
        let mut c = candidate(0.0, 0.0, 200.0, 0.0);
        let traj = points(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(!c.done);
        assert_eq!(c.interval.end_index, 1);
        assert!(approx(c.interval.cstart, 0.0));
        assert!(approx(c.interval.cend, 2.0));
        assert!(approx(c.interval.vend, 1.0));
    }

    #[test]
    fn match_leaving_band_tangentially_ends_at_shared_sample() {
        let mut c = candidate(0.0, 0.0, 300.0, 0.0);
        let traj = points(&[(0.0, 10.0), (100.0, 10.0), (100.0, 500.0)]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(!c.done);
        assert!(approx(c.interval.cstart, 0.0));
        assert!(approx(c.interval.cend, 1.0));
        assert!(approx(c.interval.vstart, 0.0));
        assert!(approx(c.interval.vend, 1.0 / 3.0));
        assert_eq!(c.interval.end_index, 2);
    }

    #[test]
    fn rescan_after_end_index_finds_second_visit() {
        let mut c = candidate(0.0, 0.0, 100.0, 0.0);
        let traj = points(&[
            (0.0, 0.0),
            (50.0, 0.0),
            (50.0, 500.0),
            (60.0, 500.0),
            (60.0, 0.0),
            (90.0, 0.0),
        ]);
        extend_interval(&mut c, &traj, 1, 10.0).unwrap();
        assert!(!c.done);
        let first = c.interval;
        assert!(approx(first.cstart, 0.0));
        assert!(first.cend < 2.0);

        extend_interval(&mut c, &traj, first.end_index + 1, 10.0).unwrap();
        assert!(!c.done);
        assert!(c.interval.cstart > first.cend);
        assert!(approx(c.interval.cend, 5.0));

        let previous = c.interval;
        extend_interval(&mut c, &traj, previous.end_index + 1, 10.0).unwrap();
        assert!(c.done || c.interval.cstart >= previous.cstart);
    }
}
