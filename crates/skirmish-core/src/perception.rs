//! Perception: view cones, line-of-sight and the idle vision sweep.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{has_line_of_sight_padded, rotate, Obstacle, LOS_PADDING};

/// Distances below this are treated as "same point" and never visible.
const MIN_SIGHT_DISTANCE: f32 = 1e-3;

/// Tests whether an agent can see `target`.
///
/// Visible iff the distance is within `view_distance` (and not ~0), the angle
/// between `facing` and the direction to the target is at most
/// `fov_half_angle`, and no obstacle blocks the line of sight.
#[must_use]
pub fn can_see(
    self_pos: Vec2,
    facing: Vec2,
    view_distance: f32,
    fov_half_angle: f32,
    target: Vec2,
    obstacles: &[Obstacle],
) -> bool {
    can_see_padded(
        self_pos,
        facing,
        view_distance,
        fov_half_angle,
        target,
        obstacles,
        LOS_PADDING,
    )
}

/// [`can_see`] with an explicit line-of-sight padding.
#[must_use]
pub fn can_see_padded(
    self_pos: Vec2,
    facing: Vec2,
    view_distance: f32,
    fov_half_angle: f32,
    target: Vec2,
    obstacles: &[Obstacle],
    padding: f32,
) -> bool {
    let to_target = target - self_pos;
    let distance = to_target.length();
    if distance > view_distance || distance < MIN_SIGHT_DISTANCE {
        return false;
    }

    let dir = to_target / distance;
    let angle = facing.dot(dir).clamp(-1.0, 1.0).acos();
    if angle > fov_half_angle {
        return false;
    }

    has_line_of_sight_padded(self_pos, target, obstacles, padding)
}

/// View cone constants for one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionCone {
    /// Maximum perception distance
    pub view_distance: f32,
    /// Half-angle of the cone in radians
    pub fov_half_angle: f32,
    /// Obstacle inflation for the line-of-sight test
    pub padding: f32,
}

impl VisionCone {
    /// Creates a cone with the default line-of-sight padding.
    #[must_use]
    pub const fn new(view_distance: f32, fov_half_angle: f32) -> Self {
        Self {
            view_distance,
            fov_half_angle,
            padding: LOS_PADDING,
        }
    }

    /// Overrides the line-of-sight padding.
    #[must_use]
    pub const fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// Tests visibility of `target` from `origin` looking along `facing`.
    #[must_use]
    pub fn sees(&self, origin: Vec2, facing: Vec2, target: Vec2, obstacles: &[Obstacle]) -> bool {
        can_see_padded(
            origin,
            facing,
            self.view_distance,
            self.fov_half_angle,
            target,
            obstacles,
            self.padding,
        )
    }
}

/// Continuous side-to-side oscillation layered over an agent's base facing.
///
/// The phase is a triangle wave bounded to `[-1, 1]`; the angular offset is
/// `phase * amplitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionSweep {
    phase: f32,
    rising: bool,
    /// Phase units per second
    pub rate: f32,
    /// Offset in radians at phase +-1
    pub amplitude: f32,
}

impl VisionSweep {
    /// Creates a sweep starting at phase 0, rising.
    #[must_use]
    pub const fn new(rate: f32, amplitude: f32) -> Self {
        Self {
            phase: 0.0,
            rising: true,
            rate,
            amplitude,
        }
    }

    /// Starts the sweep at a given phase (clamped to `[-1, 1]`).
    #[must_use]
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase.clamp(-1.0, 1.0);
        self
    }

    /// Current phase in `[-1, 1]`.
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Current angular offset in radians.
    #[must_use]
    pub fn offset(&self) -> f32 {
        self.phase * self.amplitude
    }

    /// Advances the triangle wave, reflecting at the bounds.
    pub fn advance(&mut self, dt: f32) {
        let mut remaining = (self.rate * dt).max(0.0);
        // Reflect at most a few times; a huge dt just settles on a bound.
        for _ in 0..4 {
            if remaining <= 0.0 {
                break;
            }
            if self.rising {
                let room = 1.0 - self.phase;
                if remaining < room {
                    self.phase += remaining;
                    remaining = 0.0;
                } else {
                    self.phase = 1.0;
                    remaining -= room;
                    self.rising = false;
                }
            } else {
                let room = self.phase + 1.0;
                if remaining < room {
                    self.phase -= remaining;
                    remaining = 0.0;
                } else {
                    self.phase = -1.0;
                    remaining -= room;
                    self.rising = true;
                }
            }
        }
    }

    /// Applies the sweep offset to a base facing.
    #[must_use]
    pub fn apply(&self, base: Vec2) -> Vec2 {
        rotate(base, self.offset()).normalize_or_zero()
    }
}
