//! Free-space geometry between graph edges and trajectory segments.
//!
//! A graph edge matches a trajectory segment on the part of the segment
//! that lies inside the edge's epsilon capsule: the strip of half-width
//! `eps` around the edge, closed off by the discs of radius `eps` around
//! its two endpoints. [`segment_band_intersection`] resolves that part
//! into a [`LocalInterval`]: `cstart..cend` along the trajectory segment
//! and `vstart..vend` along the edge.
//!
//! All lines are handled in parametric form `start + t * delta`, so
//! vertical and horizontal segments need no special cases.

use serde::{Deserialize, Serialize};

use crate::interval::LocalInterval;
use crate::types::{GeometryError, Point};

/// Largest amount (in coordinate units) by which a point's eps-disc may
/// miss a line and still count as a zero-width tangential touch.
///
/// Applied by [`Segment::point_band_intersection`] everywhere it is used.
pub const TANGENT_TOLERANCE: f64 = 0.03;

/// Two directions are parallel when the sine of the angle between them
/// is at most this value.
pub const PARALLEL_TOLERANCE: f64 = 1e-12;

/// An immutable line segment with a cached direction vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    start: Point,
    end: Point,
    dx: f64,
    dy: f64,
}

impl Segment {
    /// Segment from `start` to `end`.
    #[must_use]
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            dx: end.x - start.x,
            dy: end.y - start.y,
        }
    }

    /// Segment from `start` along an explicit direction vector.
    ///
    /// Both boundaries of an epsilon band are built from the direction
    /// of the segment they surround, so all three lines share the same
    /// slope bit for bit.
    #[must_use]
    pub fn with_direction(start: Point, dx: f64, dy: f64) -> Self {
        Self {
            start,
            end: Point::new(start.x + dx, start.y + dy),
            dx,
            dy,
        }
    }

    /// First endpoint (`t = 0`).
    #[must_use]
    pub const fn start(&self) -> Point {
        self.start
    }

    /// Second endpoint (`t = 1`).
    #[must_use]
    pub const fn end(&self) -> Point {
        self.end
    }

    /// Direction vector `(dx, dy)`.
    #[must_use]
    pub const fn delta(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(&self) -> f64 {
        self.dx.mul_add(self.dx, self.dy * self.dy)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// `true` when both endpoints coincide.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    /// Slope `dy / dx`: infinite for vertical segments, NaN when degenerate.
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.dy / self.dx
    }

    /// Direction angle in radians, in `(-pi, pi]`.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.dy.atan2(self.dx)
    }

    /// Point at parameter `t`.
    ///
    /// `t == 0` and `t == 1` return the stored endpoints exactly, so
    /// points derived from integral trajectory coordinates coincide with
    /// the trajectory samples they name.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        if t == 0.0 {
            return self.start;
        }
        if t == 1.0 {
            return self.end;
        }
        Point::new(
            t.mul_add(self.dx, self.start.x),
            t.mul_add(self.dy, self.start.y),
        )
    }

    /// Parameter of the perpendicular foot of `p` on the carrier line.
    ///
    /// Not clamped to `[0, 1]`. Degenerate segments return `0.0`.
    #[must_use]
    pub fn project(&self, p: Point) -> f64 {
        let len_sq = self.length_squared();
        if len_sq == 0.0 {
            return 0.0;
        }
        (p.x - self.start.x).mul_add(self.dx, (p.y - self.start.y) * self.dy) / len_sq
    }

    /// Distance from `p` to the infinite carrier line.
    #[must_use]
    pub fn line_distance(&self, p: Point) -> f64 {
        let len = self.length();
        if len == 0.0 {
            return self.start.distance(p);
        }
        self.dx
            .mul_add(p.y - self.start.y, -(self.dy * (p.x - self.start.x)))
            .abs()
            / len
    }

    /// Parameters where the carrier line is at distance exactly `eps`
    /// from `p`, ordered `t0 <= t1`.
    ///
    /// Solves `|start + t * delta - p|^2 = eps^2`. Returns `None` for a
    /// degenerate segment, or when the disc around `p` misses the line
    /// by more than [`TANGENT_TOLERANCE`]. A near miss within the
    /// tolerance is reported as the zero-width pair `(t, t)` at the
    /// perpendicular foot.
    #[must_use]
    pub fn point_band_intersection(&self, p: Point, eps: f64) -> Option<(f64, f64)> {
        let a = self.length_squared();
        if a == 0.0 {
            return None;
        }
        let fx = self.start.x - p.x;
        let fy = self.start.y - p.y;
        let b = 2.0 * fx.mul_add(self.dx, fy * self.dy);
        let c = fx.mul_add(fx, fy * fy) - eps * eps;
        let disc = b.mul_add(b, -4.0 * a * c);

        // -disc / 4a is (line distance)^2 - eps^2, so the tolerance test
        // below is in coordinate units.
        let root = if disc >= 0.0 {
            disc.sqrt()
        } else if (-disc).sqrt() / (2.0 * a.sqrt()) < TANGENT_TOLERANCE {
            0.0
        } else {
            return None;
        };

        let t0 = (-b - root) / (2.0 * a);
        let t1 = (-b + root) / (2.0 * a);
        Some((t0.min(t1), t0.max(t1)))
    }

    /// The two boundary lines of the epsilon band, offset by `eps` to
    /// the left and to the right of this segment.
    ///
    /// Both boundaries keep this segment's direction vector, so a band
    /// parameter `s` names the same position along the segment on either
    /// side. A degenerate segment has no normal and returns two copies
    /// of itself.
    #[must_use]
    pub fn epsilon_band(&self, eps: f64) -> (Self, Self) {
        let len = self.length();
        if len == 0.0 {
            return (*self, *self);
        }
        let nx = -self.dy / len * eps;
        let ny = self.dx / len * eps;
        let left = Self::with_direction(
            Point::new(self.start.x + nx, self.start.y + ny),
            self.dx,
            self.dy,
        );
        let right = Self::with_direction(
            Point::new(self.start.x - nx, self.start.y - ny),
            self.dx,
            self.dy,
        );
        (left, right)
    }

    /// Crossing of the two carrier lines as `(t_self, t_other)`.
    ///
    /// Returns `None` for parallel (or degenerate) lines.
    #[must_use]
    pub fn line_intersection(&self, other: &Self) -> Option<(f64, f64)> {
        let cross = self.dx.mul_add(other.dy, -(self.dy * other.dx));
        let scale = self.length() * other.length();
        if scale == 0.0 || cross.abs() <= PARALLEL_TOLERANCE * scale {
            return None;
        }
        let wx = other.start.x - self.start.x;
        let wy = other.start.y - self.start.y;
        let t = wx.mul_add(other.dy, -(wy * other.dx)) / cross;
        let s = wx.mul_add(self.dy, -(wy * self.dx)) / cross;
        Some((t, s))
    }
}

/// Approximate distance from `p` to `segment`.
///
/// The perpendicular distance when the foot of `p` falls inside the
/// segment, otherwise the distance to the nearer endpoint.
#[must_use]
pub fn nearest_parameter_distance(segment: &Segment, p: Point) -> f64 {
    let radius = segment.line_distance(p);
    match segment.point_band_intersection(p, radius) {
        Some((t0, _)) if (0.0..=1.0).contains(&t0) => radius,
        _ => segment.start().distance(p).min(segment.end().distance(p)),
    }
}

fn in_unit(t: f64) -> bool {
    (0.0..=1.0).contains(&t)
}

/// Matched interval between a graph edge and one trajectory segment.
///
/// Intersects the trajectory segment's carrier line with the epsilon
/// capsule of `edge` and clips the result to the segment. `cstart` and
/// `cend` parameterise `trajectory_segment`; `vstart` and `vend` are the
/// corresponding positions along `edge`.
///
/// Returns `Ok(None)` when the segment never comes within `eps` of the
/// edge, or when either segment is degenerate.
///
/// # Errors
///
/// Returns [`GeometryError::Inconsistent`] when a resolved parameter is
/// NaN, when a matched trajectory point turns out not to lie within
/// `eps` of the edge, or when an edge parameter leaves `[0, 1]`.
#[allow(clippy::too_many_lines, clippy::similar_names)]
pub fn segment_band_intersection(
    edge: &Segment,
    trajectory_segment: &Segment,
    eps: f64,
) -> Result<Option<LocalInterval>, GeometryError> {
    if edge.is_degenerate() || trajectory_segment.is_degenerate() {
        return Ok(None);
    }

    let inconsistent = |reason: &'static str, t_lo: f64, t_hi: f64| GeometryError::Inconsistent {
        reason,
        edge: *edge,
        segment: *trajectory_segment,
        t_lo,
        t_hi,
    };

    // Crossings of the trajectory line with the two band boundaries:
    // `t` along the trajectory segment, `s` along the edge.
    let (left, right) = edge.epsilon_band(eps);
    let (mut t_lo, mut s_lo, mut t_hi, mut s_hi) = match (
        trajectory_segment.line_intersection(&left),
        trajectory_segment.line_intersection(&right),
    ) {
        (Some((ta, sa)), Some((tb, sb))) => (ta, sa, tb, sb),
        _ => {
            // Parallel: the trajectory line never leaves the band, which
            // is the limit of the crossings running off to infinity.
            if trajectory_segment.line_distance(edge.start()) > eps {
                return Ok(None);
            }
            let (edx, edy) = edge.delta();
            let (tdx, tdy) = trajectory_segment.delta();
            if edx.mul_add(tdx, edy * tdy) > 0.0 {
                (f64::NEG_INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY)
            } else {
                (f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY)
            }
        }
    };
    if t_lo > t_hi {
        std::mem::swap(&mut t_lo, &mut t_hi);
        std::mem::swap(&mut s_lo, &mut s_hi);
    }

    // Where the trajectory line passes the endpoint discs of the edge.
    let cap_start = trajectory_segment.point_band_intersection(edge.start(), eps);
    let cap_end = trajectory_segment.point_band_intersection(edge.end(), eps);

    // Band crossings both before the start or both past the end: the
    // line only meets the capsule in that end's disc.
    let before_start = s_lo < 0.0 && s_hi < 0.0;
    let past_end = s_lo > 1.0 && s_hi > 1.0;
    let beyond_one_end = before_start || past_end;
    let both_inside = in_unit(s_lo) && in_unit(s_hi);

    let (mut min1, mut max1, mut min2, mut max2) = (0.0_f64, 1.0_f64, 0.0_f64, 1.0_f64);
    let mut v_lo: Option<f64> = None;
    let mut v_hi: Option<f64> = None;

    if cap_start.is_none() && cap_end.is_none() {
        // Without either cap the match is the band crossing alone, which
        // must lie entirely beside the edge.
        if t_lo > 1.0 || t_hi < 0.0 || beyond_one_end || !both_inside {
            return Ok(None);
        }
        t_lo = t_lo.max(0.0);
        t_hi = t_hi.min(1.0);
    }

    if let Some((lo, hi)) = cap_start {
        min1 = lo;
        max1 = hi;
        if before_start && (lo > 1.0 || hi < 0.0) {
            return Ok(None);
        }
        if s_lo < 0.0 {
            if lo <= 1.0 {
                t_lo = t_lo.max(lo);
            }
            if t_lo == lo {
                v_lo = Some(0.0);
            }
        }
        if s_hi < 0.0 {
            if hi >= 0.0 {
                t_hi = t_hi.min(hi);
            }
            if t_hi == hi {
                v_hi = Some(0.0);
            }
        }
    }

    if let Some((lo, hi)) = cap_end {
        min2 = lo;
        max2 = hi;
        if past_end && (lo > 1.0 || hi < 0.0) {
            return Ok(None);
        }
        if s_lo > 1.0 {
            if lo <= 1.0 {
                t_lo = t_lo.max(lo);
            }
            if t_lo == lo {
                v_lo = Some(1.0);
            }
        }
        if s_hi > 1.0 {
            if hi >= 0.0 {
                t_hi = t_hi.min(hi);
            }
            if t_hi == hi {
                v_hi = Some(1.0);
            }
        }
    }

    // With a single cap, a band crossing beside the edge must still meet
    // the trajectory segment on the same side as that cap.
    if !both_inside {
        let single_cap = match (cap_start, cap_end) {
            (Some(cap), None) | (None, Some(cap)) => Some(cap),
            _ => None,
        };
        if let Some((lo, hi)) = single_cap {
            if in_unit(s_lo) && ((t_lo > 1.0 && lo > 1.0) || (t_lo < 0.0 && hi < 0.0)) {
                return Ok(None);
            }
            if in_unit(s_hi) && ((t_hi > 1.0 && lo > 1.0) || (t_hi < 0.0 && hi < 0.0)) {
                return Ok(None);
            }
        }
    }

    if t_lo > t_hi {
        std::mem::swap(&mut t_lo, &mut t_hi);
        std::mem::swap(&mut v_lo, &mut v_hi);
    }
    if t_lo > 1.0 || t_hi < 0.0 {
        return Ok(None);
    }
    if max1.max(max2) < 0.0 || min1.min(min2) > 1.0 {
        return Ok(None);
    }
    if t_lo.is_nan() || t_hi.is_nan() {
        return Err(inconsistent("trajectory parameter is NaN", t_lo, t_hi));
    }

    let cstart = t_lo.max(0.0);
    let cend = t_hi.min(1.0);

    // A cap-snapped edge parameter only describes the clipped point when
    // the clip did not move it.
    let vstart = match v_lo {
        Some(v) if t_lo >= 0.0 => v,
        _ => edge_parameter(edge, trajectory_segment.point_at(cstart), eps)
            .ok_or_else(|| inconsistent("interval start lies outside the edge band", t_lo, t_hi))?,
    };
    let vend = match v_hi {
        Some(v) if t_hi <= 1.0 => v,
        _ => edge_parameter(edge, trajectory_segment.point_at(cend), eps)
            .ok_or_else(|| inconsistent("interval end lies outside the edge band", t_lo, t_hi))?,
    };

    if !(in_unit(vstart) && in_unit(vend)) {
        return Err(inconsistent("edge parameter outside [0, 1]", t_lo, t_hi));
    }
    if cstart > cend {
        return Err(inconsistent("interval bounds are reversed", t_lo, t_hi));
    }

    Ok(Some(LocalInterval {
        cstart,
        cend,
        vstart,
        vend,
    }))
}

/// Position along `edge` matched by the point `p`: the perpendicular foot,
/// clamped to the edge. `None` when `p` is not within `eps` of the edge's
/// carrier line.
fn edge_parameter(edge: &Segment, p: Point, eps: f64) -> Option<f64> {
    let (r0, r1) = edge.point_band_intersection(p, eps)?;
    Some(f64::midpoint(r0, r1).clamp(0.0, 1.0))
}
