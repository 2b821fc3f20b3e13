//! Geometry and visibility helpers.
//!
//! This module provides:
//! - Static axis-aligned obstacles
//! - Segment intersection and point-segment distance
//! - Line-of-sight against inflated obstacles
//! - 2D rotation and angle wrapping

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Obstacle inflation used by [`has_line_of_sight`].
pub const LOS_PADDING: f32 = 2.0;

/// Direction substituted when a vector is too short to normalize.
pub const DEFAULT_DIRECTION: Vec2 = Vec2::X;

const EPSILON: f32 = 1e-6;

/// Static axis-aligned rectangle blocking movement, projectiles and sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Obstacle {
    /// Creates an obstacle from its top-left corner and size.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_corners(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    /// Creates an obstacle from any two opposite corners.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Returns the width of the obstacle.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Returns the height of the obstacle.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Returns the center of the obstacle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Checks if a point lies inside or on the border.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Returns the obstacle grown by a margin on all sides.
    #[must_use]
    pub fn inflated(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    /// Closest point of the rectangle to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Distance from `point` to the rectangle (0 when inside).
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        point.distance(self.closest_point(point))
    }

    /// The four edges as segments, clockwise from the top.
    #[must_use]
    pub fn edges(&self) -> [(Vec2, Vec2); 4] {
        let top_right = Vec2::new(self.max.x, self.min.y);
        let bottom_left = Vec2::new(self.min.x, self.max.y);
        [
            (self.min, top_right),
            (top_right, self.max),
            (self.max, bottom_left),
            (bottom_left, self.min),
        ]
    }
}

/// Normalizes `v`, falling back to [`DEFAULT_DIRECTION`] for near-zero input.
#[must_use]
pub fn direction_or_default(v: Vec2) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq < EPSILON * EPSILON || !len_sq.is_finite() {
        DEFAULT_DIRECTION
    } else {
        v / len_sq.sqrt()
    }
}

/// Rotates `v` counter-clockwise by `angle` radians.
#[must_use]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Angle of a vector measured from the +X axis.
#[must_use]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Wraps an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Checks whether segments `p1-p2` and `q1-q2` share at least one point.
#[must_use]
pub fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = cross(r, s);
    let qp = q1 - p1;

    if denom.abs() < EPSILON {
        // Parallel: only collinear overlap counts.
        if cross(qp, r).abs() > EPSILON {
            return false;
        }
        let rr = r.length_squared();
        if rr < EPSILON {
            return point_segment_distance(p1, q1, q2) < EPSILON;
        }
        let t0 = qp.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= 0.0 && lo <= 1.0;
    }

    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Shortest distance from `point` to the segment `a-b`.
#[must_use]
pub fn point_segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Line-of-sight test with the default padding.
#[must_use]
pub fn has_line_of_sight(from: Vec2, to: Vec2, obstacles: &[Obstacle]) -> bool {
    has_line_of_sight_padded(from, to, obstacles, LOS_PADDING)
}

/// Returns false if `from-to` crosses an edge of any obstacle inflated by
/// `padding`.
///
/// An obstacle whose inflated footprint already contains either endpoint is
/// skipped, so agents standing flush against a wall still see past it.
#[must_use]
pub fn has_line_of_sight_padded(
    from: Vec2,
    to: Vec2,
    obstacles: &[Obstacle],
    padding: f32,
) -> bool {
    for obstacle in obstacles {
        let rect = obstacle.inflated(padding);
        if rect.contains(from) || rect.contains(to) {
            continue;
        }
        if rect
            .edges()
            .iter()
            .any(|&(a, b)| segments_intersect(from, to, a, b))
        {
            return false;
        }
    }
    true
}
