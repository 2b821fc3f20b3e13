//! Player controller.
//!
//! Turns a [`FrameIntent`] into movement, dashes, weapon switches,
//! consumable use and attacks. Also owns damage intake (with armor and
//! dexterity mitigation), leveling and the equipment loadout.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use std::f32::consts::PI;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::{Combatant, Cooldown, Facing, Health, PlayerView};
use crate::combat::{Arena, MeleeShape, MeleeVolume, Projectile, Side};
use crate::config::{PlayerTuning, SimConfig};
use crate::damage::{
    player_damage_taken, player_melee_damage, player_ranged_damage, Attributes, Stat,
};
use crate::effects::{EffectKind, EffectSpawn};
use crate::events::{EventBus, PhaseOutput, SimEvent};
use crate::geometry::rotate;
use crate::input::FrameIntent;
use crate::movement::{move_with_collisions, sweep_with_collisions};
use crate::perception::VisionCone;

/// Afterimages left along a dash.
const DASH_AFTERIMAGES: usize = 3;

/// Errors from player operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// No unspent stat points
    #[error("no unspent stat points")]
    NoStatPoints,
    /// The player is dead
    #[error("player is dead")]
    Dead,
}

/// Result type for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

// ============================================================================
// Equipment
// ============================================================================

/// Loadout slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    /// Melee weapon
    Melee,
    /// Ranged weapon
    Ranged,
    /// Armor
    Armor,
}

/// Shape of a melee swing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SwingStyle {
    /// Sector centered on the facing
    Arc {
        /// Reach
        reach: f32,
        /// Half the sector angle (radians)
        half_arc: f32,
    },
    /// Thrust along the facing
    Line {
        /// Thrust length
        length: f32,
        /// Hit distance from the thrust line
        width: f32,
    },
}

/// Melee weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeWeapon {
    /// Display name
    pub name: String,
    /// Flat damage bonus
    pub power: f32,
    /// Swing shape
    pub style: SwingStyle,
}

impl MeleeWeapon {
    /// Wide arc swing.
    #[must_use]
    pub fn sword() -> Self {
        Self {
            name: "Sword".to_string(),
            power: 4.0,
            style: SwingStyle::Arc {
                reach: 62.0,
                half_arc: 0.9,
            },
        }
    }

    /// Long narrow thrust.
    #[must_use]
    pub fn spear() -> Self {
        Self {
            name: "Spear".to_string(),
            power: 6.0,
            style: SwingStyle::Line {
                length: 96.0,
                width: 14.0,
            },
        }
    }
}

/// Projectile pattern of a ranged weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FirePattern {
    /// One projectile along the facing
    Single,
    /// Pellets fanned evenly across `[-spread, spread]`
    Spread {
        /// Projectiles per shot
        pellets: u32,
        /// Half the fan angle (radians)
        spread: f32,
    },
}

impl FirePattern {
    /// Projectiles per shot.
    #[must_use]
    pub fn pellets(&self) -> u32 {
        match *self {
            Self::Single => 1,
            Self::Spread { pellets, .. } => pellets.max(1),
        }
    }

    /// Angular offset of every pellet relative to the aim.
    #[must_use]
    pub fn offsets(&self) -> Vec<f32> {
        match *self {
            Self::Single => vec![0.0],
            Self::Spread { pellets, spread } => {
                let pellets = pellets.max(1);
                if pellets == 1 {
                    return vec![0.0];
                }
                let step = 2.0 * spread / (pellets - 1) as f32;
                (0..pellets).map(|i| -spread + step * i as f32).collect()
            },
        }
    }
}

/// Ranged weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedWeapon {
    /// Display name
    pub name: String,
    /// Flat damage bonus
    pub power: f32,
    /// Projectile pattern
    pub pattern: FirePattern,
    /// Projectile speed
    pub projectile_speed: f32,
}

impl RangedWeapon {
    /// Single-shot sidearm.
    #[must_use]
    pub fn pistol() -> Self {
        Self {
            name: "Pistol".to_string(),
            power: 2.0,
            pattern: FirePattern::Single,
            projectile_speed: 620.0,
        }
    }

    /// Five-pellet spread.
    #[must_use]
    pub fn shotgun() -> Self {
        Self {
            name: "Shotgun".to_string(),
            power: 5.0,
            pattern: FirePattern::Spread {
                pellets: 5,
                spread: 0.3,
            },
            projectile_speed: 540.0,
        }
    }
}

/// Body armor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    /// Display name
    pub name: String,
    /// Defense rating
    pub defense: f32,
}

impl Armor {
    /// Creates armor.
    #[must_use]
    pub fn new(name: impl Into<String>, defense: f32) -> Self {
        Self {
            name: name.into(),
            defense,
        }
    }

    /// Starting armor.
    #[must_use]
    pub fn leather() -> Self {
        Self::new("Leather", 2.0)
    }
}

/// Equipped items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    /// Melee slot
    pub melee: MeleeWeapon,
    /// Ranged slot
    pub ranged: RangedWeapon,
    /// Armor slot
    pub armor: Armor,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            melee: MeleeWeapon::sword(),
            ranged: RangedWeapon::pistol(),
            armor: Armor::leather(),
        }
    }
}

/// Weapon used by the attack trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActiveWeapon {
    /// Melee slot
    #[default]
    Melee,
    /// Ranged slot
    Ranged,
}

impl ActiveWeapon {
    /// The other weapon.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Melee => Self::Ranged,
            Self::Ranged => Self::Melee,
        }
    }
}

// ============================================================================
// Player
// ============================================================================

/// The player character.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    position: Vec2,
    facing: Facing,
    health: Health,
    attributes: Attributes,
    loadout: Loadout,
    active: ActiveWeapon,
    dash: Cooldown,
    melee_cooldown: Cooldown,
    ranged_cooldown: Cooldown,
    potions: u32,
    haste_draughts: u32,
    haste_timer: f32,
    experience: u32,
    level: u32,
    stat_points: u32,
    kills: u32,
    tuning: PlayerTuning,
}

impl Player {
    /// Creates a player with default attributes and loadout.
    #[must_use]
    pub fn new(position: Vec2, config: &SimConfig) -> Self {
        let tuning = config.player.clone();
        Self {
            id: EntityId::new(),
            position,
            facing: Facing::default(),
            health: Health::new(tuning.max_health),
            attributes: Attributes::default(),
            loadout: Loadout::default(),
            active: ActiveWeapon::Melee,
            dash: Cooldown::ready_now(),
            melee_cooldown: Cooldown::ready_now(),
            ranged_cooldown: Cooldown::ready_now(),
            potions: tuning.starting_potions,
            haste_draughts: tuning.starting_haste,
            haste_timer: 0.0,
            experience: 0,
            level: 1,
            stat_points: 0,
            kills: 0,
            tuning,
        }
    }

    /// Replaces the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Replaces the loadout without emitting events.
    #[must_use]
    pub fn with_loadout(mut self, loadout: Loadout) -> Self {
        self.loadout = loadout;
        self
    }

    /// Moves the player without collision checks.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Equipped items.
    #[must_use]
    pub fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    /// Weapon the attack trigger uses.
    #[must_use]
    pub fn active_weapon(&self) -> ActiveWeapon {
        self.active
    }

    /// Health potions left.
    #[must_use]
    pub fn potions(&self) -> u32 {
        self.potions
    }

    /// Haste draughts left.
    #[must_use]
    pub fn haste_draughts(&self) -> u32 {
        self.haste_draughts
    }

    /// Whether haste is active.
    #[must_use]
    pub fn is_hasted(&self) -> bool {
        self.haste_timer > 0.0
    }

    /// Current level (starts at 1).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Experience toward the next level.
    #[must_use]
    pub fn experience(&self) -> u32 {
        self.experience
    }

    /// Experience needed to leave the current level.
    #[must_use]
    pub fn experience_to_next(&self) -> u32 {
        (self.tuning.xp_base + (self.level - 1) * self.tuning.xp_growth).max(1)
    }

    /// Unspent stat points.
    #[must_use]
    pub fn stat_points(&self) -> u32 {
        self.stat_points
    }

    /// Total kill credit earned.
    #[must_use]
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Seconds until the next dash.
    #[must_use]
    pub fn dash_cooldown(&self) -> f32 {
        self.dash.remaining()
    }

    /// Snapshot handed to the AI phases.
    #[must_use]
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            position: self.position,
            radius: self.tuning.radius,
            alive: self.is_alive(),
        }
    }

    /// Runs one frame of player control. Dead players ignore intent.
    pub fn update(
        &mut self,
        intent: &FrameIntent,
        dt: f32,
        arena: Arena<'_>,
        out: &mut PhaseOutput,
        config: &SimConfig,
    ) {
        if !self.is_alive() {
            return;
        }

        self.dash.tick(dt);
        self.melee_cooldown.tick(dt);
        self.ranged_cooldown.tick(dt);
        self.haste_timer = (self.haste_timer - dt).max(0.0);

        self.use_consumables(intent);

        if intent.switch_weapon {
            self.active = self.active.toggled();
            debug!(weapon = ?self.active, "weapon switched");
        }

        let movement = intent.movement_clamped();
        match intent.aim {
            Some(point) => self.facing.look_along(point - self.position),
            None => self.facing.look_along(movement),
        }

        let speed = if self.is_hasted() {
            self.tuning.move_speed * self.tuning.haste_multiplier
        } else {
            self.tuning.move_speed
        };
        self.position = move_with_collisions(
            self.position,
            movement * speed * dt,
            self.tuning.radius,
            arena.obstacles,
            arena.world_size,
        );

        if intent.dodge && self.dash.is_ready() {
            self.perform_dash(movement, arena, out, config);
        }

        if intent.attack {
            self.attack(out, config);
        }
    }

    fn use_consumables(&mut self, intent: &FrameIntent) {
        if intent.use_potion && self.potions > 0 && self.health.current() < self.health.max() {
            let healed = self.health.heal(self.tuning.potion_heal);
            self.potions -= 1;
            debug!(healed, left = self.potions, "potion used");
        }
        if intent.use_haste && self.haste_draughts > 0 {
            self.haste_timer = self.tuning.haste_duration;
            self.haste_draughts -= 1;
            debug!(left = self.haste_draughts, "haste used");
        }
    }

    fn perform_dash(
        &mut self,
        movement: Vec2,
        arena: Arena<'_>,
        out: &mut PhaseOutput,
        config: &SimConfig,
    ) {
        let dir = if movement.length_squared() > 1e-8 {
            movement.normalize()
        } else {
            self.facing.vec()
        };
        let sweep = sweep_with_collisions(
            self.position,
            dir * self.tuning.dash_distance,
            self.tuning.radius,
            arena.obstacles,
            arena.world_size,
        );

        let stride = (sweep.path.len() / DASH_AFTERIMAGES).max(1);
        let angle = self.facing.angle();
        let start = self.position;
        out.effects.extend(
            std::iter::once(start)
                .chain(sweep.path.iter().copied().step_by(stride))
                .take(DASH_AFTERIMAGES)
                .map(|point| {
                    EffectSpawn::new(
                        EffectKind::Afterimage {
                            angle,
                            radius: self.tuning.radius,
                        },
                        point,
                        config.combat.afterimage_duration,
                    )
                }),
        );

        self.position = sweep.end;
        self.dash.trigger(self.tuning.dash_cooldown);
        debug!(distance = start.distance(sweep.end), "dash");
    }

    fn attack(&mut self, out: &mut PhaseOutput, config: &SimConfig) {
        match self.active {
            ActiveWeapon::Melee if self.melee_cooldown.is_ready() => {
                out.melee.push(self.swing(config));
                self.melee_cooldown.trigger(self.tuning.melee_cooldown);
            },
            ActiveWeapon::Ranged if self.ranged_cooldown.is_ready() => {
                out.projectiles.extend(self.shoot(config));
                self.ranged_cooldown.trigger(self.tuning.ranged_cooldown);
            },
            _ => {},
        }
    }

    fn swing(&self, config: &SimConfig) -> MeleeVolume {
        let weapon = &self.loadout.melee;
        let facing = self.facing.vec();
        let shape = match weapon.style {
            SwingStyle::Arc { reach, half_arc } => {
                let center = self.facing.angle();
                MeleeShape::Arc {
                    origin: self.position,
                    radius: reach,
                    angle_start: center - half_arc,
                    angle_end: center + half_arc,
                }
            },
            SwingStyle::Line { length, width } => MeleeShape::Line {
                start: self.position,
                end: self.position + facing * length,
                width,
            },
        };
        let damage = player_melee_damage(&self.attributes, weapon.power);
        MeleeVolume::new(self.id, shape, damage, config.combat.melee_volume_lifetime)
    }

    fn shoot(&self, config: &SimConfig) -> Vec<Projectile> {
        let weapon = &self.loadout.ranged;
        let damage = player_ranged_damage(
            &self.attributes,
            weapon.power,
            weapon.pattern.pellets(),
            config.combat.pellet_factor,
        );
        let aim = self.facing.vec();
        let muzzle = self.position + aim * self.tuning.radius;
        weapon
            .pattern
            .offsets()
            .into_iter()
            .map(|offset| {
                Projectile::new(
                    self.id,
                    Side::Player,
                    muzzle,
                    rotate(aim, offset),
                    weapon.projectile_speed,
                    damage,
                    &config.combat,
                )
            })
            .collect()
    }

    /// Applies a raw hit through armor and dexterity mitigation. Returns the
    /// damage applied.
    pub fn take_hit(&mut self, raw: f32, source: EntityId, bus: &EventBus) -> f32 {
        if !self.is_alive() {
            return 0.0;
        }
        let amount = player_damage_taken(raw, self.loadout.armor.defense, &self.attributes);
        let outcome = self.health.apply_damage(amount);
        bus.publish(SimEvent::PlayerDamaged {
            amount: outcome.applied,
            source,
            remaining: self.health.current(),
        });
        if outcome.killed {
            info!(%source, "player died");
            bus.publish(SimEvent::PlayerDied);
        }
        outcome.applied
    }

    /// Credits kills and processes any level-ups.
    pub fn award_kill(&mut self, credit: u32, bus: &EventBus) {
        self.kills += credit;
        self.experience += self.tuning.xp_per_kill * credit;

        while self.experience >= self.experience_to_next() {
            self.experience -= self.experience_to_next();
            self.level += 1;
            self.stat_points += self.tuning.stat_points_per_level;
            self.health.raise_max(self.tuning.health_per_level);
            info!(level = self.level, stat_points = self.stat_points, "level up");
            bus.publish(SimEvent::LevelUp {
                level: self.level,
                stat_points: self.stat_points,
            });
        }
    }

    /// Spends one stat point.
    pub fn allocate(&mut self, stat: Stat) -> PlayerResult<()> {
        if !self.is_alive() {
            return Err(PlayerError::Dead);
        }
        if self.stat_points == 0 {
            return Err(PlayerError::NoStatPoints);
        }
        self.stat_points -= 1;
        self.attributes.raise(stat);
        Ok(())
    }

    /// Equips a melee weapon and returns the previous one.
    pub fn equip_melee(&mut self, weapon: MeleeWeapon, bus: &EventBus) -> MeleeWeapon {
        publish_equip(bus, EquipmentSlot::Melee, &weapon.name);
        std::mem::replace(&mut self.loadout.melee, weapon)
    }

    /// Equips a ranged weapon and returns the previous one.
    pub fn equip_ranged(&mut self, weapon: RangedWeapon, bus: &EventBus) -> RangedWeapon {
        publish_equip(bus, EquipmentSlot::Ranged, &weapon.name);
        std::mem::replace(&mut self.loadout.ranged, weapon)
    }

    /// Equips armor and returns the previous piece.
    pub fn equip_armor(&mut self, armor: Armor, bus: &EventBus) -> Armor {
        publish_equip(bus, EquipmentSlot::Armor, &armor.name);
        std::mem::replace(&mut self.loadout.armor, armor)
    }
}

fn publish_equip(bus: &EventBus, slot: EquipmentSlot, name: &str) {
    bus.publish(SimEvent::EquipmentChanged {
        slot,
        name: name.to_string(),
    });
}

impl Combatant for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.tuning.radius
    }

    fn health(&self) -> &Health {
        &self.health
    }

    fn facing(&self) -> Vec2 {
        self.facing.vec()
    }

    /// The player perceives anything in line of sight.
    fn vision(&self) -> VisionCone {
        VisionCone::new(f32::INFINITY, PI)
    }
}
