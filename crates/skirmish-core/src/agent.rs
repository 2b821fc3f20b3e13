//! Shared agent building blocks.
//!
//! Player, enemies and bosses are separate types; the pieces they have in
//! common (health, facing, cooldowns, awareness state) live here together
//! with the [`Combatant`] and [`Hostile`] capability traits the combat and
//! aggro phases are written against.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;

use crate::geometry::{direction_or_default, rotate, Obstacle};
use crate::perception::VisionCone;

// ============================================================================
// Health
// ============================================================================

/// Result of applying damage to a [`Health`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageOutcome {
    /// Health actually removed
    pub applied: f32,
    /// True only on the hit that took health from above zero to zero
    pub killed: bool,
}

/// Health pool with `0 <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full pool.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Alive iff current health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Health as a 0-1 fraction.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    /// Removes `amount` (negative amounts are ignored), flooring at zero.
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        let was_alive = self.is_alive();
        let before = self.current;
        self.current = (self.current - amount.max(0.0)).max(0.0);
        DamageOutcome {
            applied: before - self.current,
            killed: was_alive && !self.is_alive(),
        }
    }

    /// Restores up to `amount`, capped at max. Dead pools stay dead.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount.max(0.0)).min(self.max);
        self.current - before
    }

    /// Raises max and current health by the same amount.
    pub fn raise_max(&mut self, amount: f32) {
        let amount = amount.max(0.0);
        self.max += amount;
        if self.is_alive() {
            self.current += amount;
        }
    }
}

// ============================================================================
// Facing
// ============================================================================

/// Unit-length facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Facing(Vec2);

impl Facing {
    /// Creates a facing from any vector (zero falls back to +X).
    #[must_use]
    pub fn new(direction: Vec2) -> Self {
        Self(direction_or_default(direction))
    }

    /// Creates a facing from an angle.
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        Self(Vec2::from_angle(angle))
    }

    /// The unit direction.
    #[must_use]
    pub fn vec(&self) -> Vec2 {
        self.0
    }

    /// Angle from +X in radians.
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.0.y.atan2(self.0.x)
    }

    /// Points the facing along `direction`; near-zero input keeps the
    /// current facing.
    pub fn look_along(&mut self, direction: Vec2) {
        if direction.length_squared() > 1e-8 {
            self.0 = direction_or_default(direction);
        }
    }

    /// Rotates and renormalizes.
    pub fn rotate(&mut self, angle: f32) {
        self.0 = direction_or_default(rotate(self.0, angle));
    }
}

impl Default for Facing {
    fn default() -> Self {
        Self(Vec2::X)
    }
}

// ============================================================================
// Cooldowns
// ============================================================================

/// Countdown timer that saturates at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: f32,
}

impl Cooldown {
    /// A cooldown that is already ready.
    #[must_use]
    pub const fn ready_now() -> Self {
        Self { remaining: 0.0 }
    }

    /// A cooldown starting at `seconds`.
    #[must_use]
    pub fn started(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    /// Counts down by `dt`.
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Whether the timer has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Restarts the timer.
    pub fn trigger(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

// ============================================================================
// Awareness
// ============================================================================

/// AI awareness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Walking toward the active patrol endpoint
    #[default]
    Patrolling,
    /// Pausing at an endpoint while looking around
    Turning,
    /// Pursuing a last-known target position
    Alert,
}

impl AiState {
    /// Whether the agent is alert.
    #[must_use]
    pub fn is_alert(self) -> bool {
        self == Self::Alert
    }
}

/// Alert is dropped only when the target is unseen AND the last-known target
/// lies farther than `view_distance * leash_factor`.
#[must_use]
pub fn alert_lost(sees_target: bool, distance: f32, view_distance: f32, leash_factor: f32) -> bool {
    !sees_target && distance > view_distance * leash_factor
}

/// Archetype tag carried by kill events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Weak patrolling enemy
    Patroller,
    /// Burst-firing enemy
    Strong,
    /// Boss
    Boss,
}

/// Snapshot of the player handed to AI phases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    /// Player id
    pub id: EntityId,
    /// Player position
    pub position: Vec2,
    /// Player collider radius
    pub radius: f32,
    /// Whether the player is alive
    pub alive: bool,
}

// ============================================================================
// Capability traits
// ============================================================================

/// Anything that occupies space, has health and can perceive.
pub trait Combatant {
    /// Stable id.
    fn id(&self) -> EntityId;
    /// Current position.
    fn position(&self) -> Vec2;
    /// Collider radius.
    fn radius(&self) -> f32;
    /// Health pool.
    fn health(&self) -> &Health;
    /// Effective facing (unit vector).
    fn facing(&self) -> Vec2;
    /// View cone constants.
    fn vision(&self) -> VisionCone;

    /// Alive iff health is above zero.
    fn is_alive(&self) -> bool {
        self.health().is_alive()
    }

    /// Whether this agent currently sees `target`. Dead agents see nothing.
    fn can_see(&self, target: Vec2, obstacles: &[Obstacle]) -> bool {
        self.is_alive()
            && self
                .vision()
                .sees(self.position(), self.facing(), target, obstacles)
    }
}

/// AI-controlled combatant that the player can damage and provoke.
pub trait Hostile: Combatant {
    /// Archetype tag.
    fn archetype(&self) -> Archetype;
    /// Applies incoming damage with no mitigation.
    fn take_damage(&mut self, amount: f32) -> DamageOutcome;
    /// Forces the Alert state with `target` as the last-known position.
    fn force_aggro(&mut self, target: Vec2);
    /// Returns true exactly once after death; later calls return false.
    fn claim_kill(&mut self) -> bool;
    /// Kill credit awarded to the player.
    fn kill_credit(&self) -> u32;
}
