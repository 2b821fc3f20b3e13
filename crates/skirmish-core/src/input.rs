//! Per-frame player intent.
//!
//! The input collaborator samples its devices once per frame and hands the
//! core a [`FrameIntent`]; nothing inside the core reads device state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// What the player wants to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameIntent {
    /// Desired movement direction; longer than 1 is clamped
    pub movement: Vec2,
    /// World-space aim point, if the player is aiming
    pub aim: Option<Vec2>,
    /// Attack with the active weapon (held)
    pub attack: bool,
    /// Dash along the movement (or facing) direction
    pub dodge: bool,
    /// Toggle between melee and ranged weapons
    pub switch_weapon: bool,
    /// Drink a health potion
    pub use_potion: bool,
    /// Drink a haste draught
    pub use_haste: bool,
}

impl FrameIntent {
    /// An idle frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the movement direction.
    #[must_use]
    pub fn moving(mut self, movement: Vec2) -> Self {
        self.movement = movement;
        self
    }

    /// Sets the aim point.
    #[must_use]
    pub fn aiming_at(mut self, point: Vec2) -> Self {
        self.aim = Some(point);
        self
    }

    /// Holds the attack trigger.
    #[must_use]
    pub fn attacking(mut self) -> Self {
        self.attack = true;
        self
    }

    /// Requests a dash.
    #[must_use]
    pub fn dodging(mut self) -> Self {
        self.dodge = true;
        self
    }

    /// Requests a weapon switch.
    #[must_use]
    pub fn switching_weapon(mut self) -> Self {
        self.switch_weapon = true;
        self
    }

    /// Requests a health potion.
    #[must_use]
    pub fn drinking_potion(mut self) -> Self {
        self.use_potion = true;
        self
    }

    /// Requests a haste draught.
    #[must_use]
    pub fn drinking_haste(mut self) -> Self {
        self.use_haste = true;
        self
    }

    /// Movement clamped to unit length.
    #[must_use]
    pub fn movement_clamped(&self) -> Vec2 {
        if self.movement.is_finite() {
            self.movement.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        }
    }

    /// Whether any movement is requested.
    #[must_use]
    pub fn has_movement(&self) -> bool {
        self.movement_clamped().length_squared() > 1e-8
    }
}
