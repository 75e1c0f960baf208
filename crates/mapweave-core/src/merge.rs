//! Merge one trajectory into the road graph.
//!
//! Every directed graph edge is scanned for its earliest match with the
//! trajectory, and the matches are consumed from a min-queue in
//! trajectory order. Stretches of the trajectory that no edge covers are
//! inserted as new edges; where such a stretch meets a matched stretch,
//! an optional short connector edge joins the trajectory to the matched
//! edge, which is split at the junction.
//!
//! The loop is an explicit `MergeState` machine. Each state performs
//! one kind of graph update and names its successor, so the order of
//! updates is visible in one place (`Merge::step`).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geometry::{Segment, TANGENT_TOLERANCE};
use crate::graph::{RoadGraph, VertexId};
use crate::interval::IntervalKey;
use crate::propagate::{CandidateEdge, extend_interval};
use crate::types::{BoundingBox, MapConfig, MergeError, Point};

/// Summary of a single [`merge_trajectory`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Candidate edges scanned against the trajectory.
    pub candidate_count: usize,
    /// Intervals taken from the queue.
    pub matched_intervals: usize,
    /// Vertices added to the graph.
    pub new_vertices: usize,
    /// Net change in the graph's undirected edge count.
    pub new_edges: usize,
    /// Connector edges added between trajectory and matched edges.
    pub connector_edges: usize,
    /// Existing edges split at a matched boundary point.
    pub splits: usize,
    /// Length of trajectory covered by existing edges, in segment units.
    pub reused_span: f64,
    /// Final coverage in trajectory coordinates.
    pub coverage: f64,
    /// Every coverage value reached, in order.
    pub coverage_trace: Vec<f64>,
    /// No existing edge matched any part of the trajectory.
    pub novel: bool,
}

/// Where a matched stretch begins or ends on its graph edge.
///
/// Copied out of the candidate when the stretch is consumed, so later
/// rescans of the same candidate do not move it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    from: Point,
    to: Point,
    point: Point,
}

impl Anchor {
    fn entry(candidate: &CandidateEdge) -> Self {
        Self {
            from: candidate.segment.start(),
            to: candidate.segment.end(),
            point: candidate.entry_point(),
        }
    }

    fn exit(candidate: &CandidateEdge) -> Self {
        Self {
            from: candidate.segment.start(),
            to: candidate.segment.end(),
            point: candidate.exit_point(),
        }
    }
}

/// Merge loop state. Candidate references are positions in the
/// candidate list.
#[derive(Debug, Clone, PartialEq)]
enum MergeState {
    /// Absorb a popped interval into the coverage, rescan its edge, and
    /// pick the next interval.
    Scanning { current: usize },
    /// Insert the uncovered trajectory between two coordinates as new
    /// edges, then stitch onto `next` if there is one.
    EmittingGap {
        from: f64,
        to: f64,
        next: Option<usize>,
    },
    /// Join the trajectory point at `coord` to `anchor`, then continue
    /// with `then`.
    Stitching {
        coord: f64,
        anchor: Anchor,
        then: Box<MergeState>,
    },
    Done,
}

/// Merge `trajectory` into `graph`.
///
/// Trajectories with fewer than two points leave the graph untouched.
/// Every inserted edge, connectors included, is limited to
/// `config.max_edge_length`. On error the graph keeps every update made before the failure; the
/// adjacency stays symmetric.
///
/// # Errors
///
/// Returns [`MergeError::InvalidConfig`] for an invalid `config`, and
/// otherwise any geometry, graph or coverage error raised while
/// merging.
pub fn merge_trajectory(
    graph: &mut RoadGraph,
    trajectory: &[Point],
    config: &MapConfig,
) -> Result<MergeOutcome, MergeError> {
    config.validate()?;
    if trajectory.len() < 2 {
        return Ok(MergeOutcome::default());
    }

    let vertices_before = graph.vertex_count();
    let edges_before = graph.edge_count();

    let mut merge = Merge::new(graph, trajectory, config)?;
    let mut state = merge.start();
    while state != MergeState::Done {
        state = merge.step(state)?;
    }

    let mut outcome = merge.outcome;
    outcome.coverage = merge.coverage;
    outcome.new_vertices = graph.vertex_count().saturating_sub(vertices_before);
    outcome.new_edges = graph.edge_count().saturating_sub(edges_before);
    debug!(
        "merged {} points: {} intervals, {} new edges, {} connectors, {} splits",
        trajectory.len(),
        outcome.matched_intervals,
        outcome.new_edges,
        outcome.connector_edges,
        outcome.splits,
    );
    Ok(outcome)
}

struct Merge<'a> {
    graph: &'a mut RoadGraph,
    trajectory: &'a [Point],
    config: &'a MapConfig,
    candidates: Vec<CandidateEdge>,
    queue: BinaryHeap<Reverse<(IntervalKey, usize)>>,
    /// Trajectory coordinate up to which the trajectory is accounted for.
    coverage: f64,
    /// Exit anchor of the interval that set `coverage`.
    covering: Option<Anchor>,
    /// End of the last inserted gap.
    emitted_until: f64,
    outcome: MergeOutcome,
}

impl<'a> Merge<'a> {
    fn new(
        graph: &'a mut RoadGraph,
        trajectory: &'a [Point],
        config: &'a MapConfig,
    ) -> Result<Self, MergeError> {
        let bounds = BoundingBox::from_points(trajectory.iter().copied());
        let mut candidates = match bounds {
            Some(bounds) if config.use_spatial_index => {
                graph.candidate_edges_near(&bounds, config.eps + TANGENT_TOLERANCE)
            }
            _ => graph.candidate_edges(),
        };

        let mut queue = BinaryHeap::with_capacity(candidates.len());
        for (pos, candidate) in candidates.iter_mut().enumerate() {
            extend_interval(candidate, trajectory, 1, config.eps)?;
            if !candidate.done {
                queue.push(Reverse((candidate.key(), pos)));
            }
        }

        let outcome = MergeOutcome {
            candidate_count: candidates.len(),
            ..MergeOutcome::default()
        };
        Ok(Self {
            graph,
            trajectory,
            config,
            candidates,
            queue,
            coverage: 0.0,
            covering: None,
            emitted_until: 0.0,
            outcome,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn last(&self) -> f64 {
        (self.trajectory.len() - 1) as f64
    }

    fn start(&mut self) -> MergeState {
        let Some(first) = self.pop() else {
            debug!("no existing edge matches; inserting trajectory as new edges");
            self.outcome.novel = true;
            return MergeState::EmittingGap {
                from: 0.0,
                to: self.last(),
                next: None,
            };
        };

        let candidate = &self.candidates[first];
        self.coverage = candidate.interval.cstart;
        self.covering = Some(Anchor::entry(candidate));
        if candidate.interval.cstart > 0.0 {
            MergeState::EmittingGap {
                from: 0.0,
                to: candidate.interval.cstart,
                next: Some(first),
            }
        } else {
            MergeState::Scanning { current: first }
        }
    }

    fn step(&mut self, state: MergeState) -> Result<MergeState, MergeError> {
        match state {
            MergeState::Scanning { current } => self.scan(current),
            MergeState::EmittingGap { from, to, next } => {
                self.emit_gap(from, to)?;
                Ok(next.map_or(MergeState::Done, |next| MergeState::Stitching {
                    coord: to,
                    anchor: Anchor::entry(&self.candidates[next]),
                    then: Box::new(MergeState::Scanning { current: next }),
                }))
            }
            MergeState::Stitching {
                coord,
                anchor,
                then,
            } => {
                self.stitch(coord, anchor)?;
                Ok(*then)
            }
            MergeState::Done => Ok(MergeState::Done),
        }
    }

    fn pop(&mut self) -> Option<usize> {
        let Reverse((_, pos)) = self.queue.pop()?;
        self.outcome.matched_intervals += 1;
        Some(pos)
    }

    fn scan(&mut self, current: usize) -> Result<MergeState, MergeError> {
        let candidate = &self.candidates[current];
        let interval = candidate.interval;
        if interval.cend > self.coverage {
            self.outcome.reused_span += interval.cend - interval.cstart.max(self.coverage);
            self.coverage = interval.cend;
            self.covering = Some(Anchor::exit(candidate));
            self.outcome.coverage_trace.push(self.coverage);
        }
        if self.coverage >= self.last() {
            return Ok(MergeState::Done);
        }

        let candidate = &mut self.candidates[current];
        extend_interval(
            candidate,
            self.trajectory,
            interval.end_index + 1,
            self.config.eps,
        )?;
        if !candidate.done {
            self.queue.push(Reverse((candidate.key(), current)));
        }

        let coverage = self.coverage;
        let next = self.pop();
        let gap_end = match next {
            None => self.last(),
            Some(next) if self.candidates[next].interval.cstart > coverage => {
                self.candidates[next].interval.cstart
            }
            Some(next) => return Ok(MergeState::Scanning { current: next }),
        };

        let gap = MergeState::EmittingGap {
            from: coverage,
            to: gap_end,
            next,
        };
        Ok(match self.covering {
            Some(anchor) => MergeState::Stitching {
                coord: coverage,
                anchor,
                then: Box::new(gap),
            },
            None => gap,
        })
    }

    /// Insert the trajectory between coordinates `from` and `to` as
    /// new edges, splitting the end segments at the fractional points.
    fn emit_gap(&mut self, from: f64, to: f64) -> Result<(), MergeError> {
        if from < self.emitted_until {
            return Err(MergeError::CoverageRegressed {
                previous: self.emitted_until,
                current: from,
            });
        }
        if to < from {
            return Err(MergeError::CoverageRegressed {
                previous: from,
                current: to,
            });
        }
        debug!("inserting uncovered stretch {from:.3}..{to:.3}");

        let (i0, p0) = self.locate(from);
        let (i1, p1) = self.locate(to);
        if i0 == i1 {
            self.insert(p0, p1)?;
        } else {
            self.insert(p0, self.trajectory[i0 + 1])?;
            for i in i0 + 1..i1 {
                self.insert(self.trajectory[i], self.trajectory[i + 1])?;
            }
            self.insert(self.trajectory[i1], p1)?;
        }
        self.emitted_until = to;
        Ok(())
    }

    /// Connect the trajectory point at `coord` to `anchor` when
    /// connectors are enabled and the two are close enough, and split
    /// the anchor's edge there.
    fn stitch(&mut self, coord: f64, anchor: Anchor) -> Result<(), MergeError> {
        if !self.config.connect {
            return Ok(());
        }
        let (_, point) = self.locate(coord);
        let distance = point.distance(anchor.point);
        if distance > self.config.connector_distance() {
            debug!(
                "no connector at {coord:.3}: {distance:.3} exceeds {:.3}",
                self.config.connector_distance()
            );
            return Ok(());
        }

        if self.insert(point, anchor.point)?.is_some() {
            self.outcome.connector_edges += 1;
        }
        if self
            .graph
            .split_edge_along(anchor.from, anchor.to, anchor.point)?
        {
            self.outcome.splits += 1;
            debug!(
                "split edge ({}, {})-({}, {}) at ({}, {})",
                anchor.from.x, anchor.from.y, anchor.to.x, anchor.to.y, anchor.point.x, anchor.point.y,
            );
        }
        Ok(())
    }

    /// Add the edge `a`-`b`, limited by the configured edge length.
    fn insert(&mut self, a: Point, b: Point) -> Result<Option<(VertexId, VertexId)>, MergeError> {
        Ok(self
            .graph
            .add_edge_within(a, b, self.config.max_edge_length)?)
    }

    /// Segment index and position of trajectory coordinate `coord`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn locate(&self, coord: f64) -> (usize, Point) {
        let last_segment = self.trajectory.len() - 2;
        let index = (coord.max(0.0).floor() as usize).min(last_segment);
        let t = coord - index as f64;
        let segment = Segment::new(self.trajectory[index], self.trajectory[index + 1]);
        (index, segment.point_at(t))
    }
}
