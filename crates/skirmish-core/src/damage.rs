//! Damage formulas.
//!
//! Outgoing player damage scales with attributes and weapon power; incoming
//! player damage is mitigated by armor and dexterity. Enemies and bosses take
//! incoming damage unmitigated.

use serde::{Deserialize, Serialize};

/// Minimum damage the player takes from any hit.
pub const MIN_PLAYER_DAMAGE: f32 = 1.0;

/// Player attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Melee power
    pub strength: f32,
    /// Melee finesse and damage avoidance
    pub dexterity: f32,
    /// Ranged power
    pub gunsmith: f32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 5.0,
            dexterity: 5.0,
            gunsmith: 5.0,
        }
    }
}

/// Attribute a stat point can be spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    /// Strength
    Strength,
    /// Dexterity
    Dexterity,
    /// Gunsmith
    Gunsmith,
}

impl Attributes {
    /// Adds one point to a stat.
    pub fn raise(&mut self, stat: Stat) {
        match stat {
            Stat::Strength => self.strength += 1.0,
            Stat::Dexterity => self.dexterity += 1.0,
            Stat::Gunsmith => self.gunsmith += 1.0,
        }
    }
}

/// `(12 + STR*2.2 + DEX*0.6 + power) * 0.7`
#[must_use]
pub fn player_melee_damage(attributes: &Attributes, weapon_power: f32) -> f32 {
    (12.0 + attributes.strength * 2.2 + attributes.dexterity * 0.6 + weapon_power) * 0.7
}

/// `(9 + GUN*2.4 + power) * 1.3`, scaled by `pellet_factor` per pellet when
/// the weapon fires more than one projectile.
#[must_use]
pub fn player_ranged_damage(
    attributes: &Attributes,
    weapon_power: f32,
    pellets: u32,
    pellet_factor: f32,
) -> f32 {
    let base = (9.0 + attributes.gunsmith * 2.4 + weapon_power) * 1.3;
    if pellets > 1 {
        base * pellet_factor
    } else {
        base
    }
}

/// `max(1, raw - armor*0.75 - DEX*0.12)`
#[must_use]
pub fn player_damage_taken(raw: f32, armor_defense: f32, attributes: &Attributes) -> f32 {
    (raw - armor_defense * 0.75 - attributes.dexterity * 0.12).max(MIN_PLAYER_DAMAGE)
}
