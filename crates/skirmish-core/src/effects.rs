//! Transient visual effects requested by the simulation.
//!
//! The core only tracks lifetimes; drawing is the renderer's job.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Kind of visual effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Burst at a projectile impact
    Explosion {
        /// Drawn radius
        radius: f32,
    },
    /// Fading copy of a dashing/ramming agent
    Afterimage {
        /// Facing angle of the copy
        angle: f32,
        /// Drawn radius
        radius: f32,
    },
    /// Ground marker under a boss slam
    SlamWarning {
        /// Slam reach
        radius: f32,
    },
    /// Corpse fading out
    DeathFade {
        /// Drawn radius
        radius: f32,
    },
}

/// Request to spawn an effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSpawn {
    /// What to draw
    pub kind: EffectKind,
    /// Where to draw it
    pub position: Vec2,
    /// Lifetime in seconds
    pub duration: f32,
}

impl EffectSpawn {
    /// Creates a spawn request.
    #[must_use]
    pub fn new(kind: EffectKind, position: Vec2, duration: f32) -> Self {
        Self {
            kind,
            position,
            duration: duration.max(0.0),
        }
    }
}

/// A live effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Spawn parameters
    pub spawn: EffectSpawn,
    /// Seconds left
    pub remaining: f32,
}

impl Effect {
    /// Opacity in 0-1, fading linearly to zero.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        if self.spawn.duration > 0.0 {
            (self.remaining / self.spawn.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Live effects, aged once per frame.
#[derive(Debug, Clone, Default)]
pub struct EffectQueue {
    effects: Vec<Effect>,
}

impl EffectQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an effect.
    pub fn push(&mut self, spawn: EffectSpawn) {
        self.effects.push(Effect {
            spawn,
            remaining: spawn.duration,
        });
    }

    /// Adds many effects.
    pub fn extend(&mut self, spawns: impl IntoIterator<Item = EffectSpawn>) {
        for spawn in spawns {
            self.push(spawn);
        }
    }

    /// Ages every effect and drops the expired ones.
    pub fn tick(&mut self, dt: f32) {
        for effect in &mut self.effects {
            effect.remaining -= dt;
        }
        self.effects.retain(|effect| effect.remaining > 0.0);
    }

    /// Live effects.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Number of live effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether there are no live effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Removes every effect.
    pub fn clear(&mut self) {
        self.effects.clear();
    }
}
