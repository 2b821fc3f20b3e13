//! Combat resolution: projectiles and melee volumes.
//!
//! This module provides:
//! - Projectile flight, expiry and hit detection
//! - Arc and line melee volumes
//! - Applying player damage to enemies and bosses, including the aggro and
//!   struck signals every landed hit produces
//!
//! Spent projectiles and expired volumes are collected by id during a pass
//! and removed afterwards.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use std::f32::consts::TAU;
use tracing::trace;

use crate::agent::{Combatant, DamageOutcome, Hostile, PlayerView};
use crate::boss::Boss;
use crate::config::CombatTuning;
use crate::effects::{EffectKind, EffectSpawn};
use crate::enemy::Enemy;
use crate::events::{EventBus, FrameSignals, PhaseOutput, SimEvent};
use crate::geometry::{angle_of, direction_or_default, point_segment_distance, Obstacle};
use crate::movement::circle_overlaps_any;

/// Which side fired a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Fired by the player; hits enemies and bosses
    Player,
    /// Fired by an enemy or boss; hits only the player
    Hostile,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Stable id
    pub id: EntityId,
    /// Entity that fired it
    pub owner: EntityId,
    /// Side that fired it
    pub side: Side,
    /// Current position
    pub position: Vec2,
    /// Unit travel direction
    pub direction: Vec2,
    /// Units per second
    pub speed: f32,
    /// Seconds left before it fizzles
    pub lifetime: f32,
    /// Damage on hit
    pub damage: f32,
    /// Hit radius
    pub radius: f32,
}

impl Projectile {
    /// Creates a projectile; `direction` is normalized.
    #[must_use]
    pub fn new(
        owner: EntityId,
        side: Side,
        position: Vec2,
        direction: Vec2,
        speed: f32,
        damage: f32,
        tuning: &CombatTuning,
    ) -> Self {
        Self {
            id: EntityId::new(),
            owner,
            side,
            position,
            direction: direction_or_default(direction),
            speed,
            lifetime: tuning.projectile_lifetime,
            damage,
            radius: tuning.projectile_radius,
        }
    }

    /// Velocity vector.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.direction * self.speed
    }

    /// Moves along the direction and burns lifetime.
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity() * dt;
        self.lifetime -= dt;
    }

    /// Whether the lifetime has run out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }

    /// Whether the projectile touches a circle.
    #[must_use]
    pub fn touches(&self, center: Vec2, radius: f32) -> bool {
        self.position.distance(center) <= radius + self.radius
    }
}

/// Shape of a melee volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeleeShape {
    /// Circular sector
    Arc {
        /// Center of the sector
        origin: Vec2,
        /// Reach
        radius: f32,
        /// Start angle (radians)
        angle_start: f32,
        /// End angle (radians), counter-clockwise from start
        angle_end: f32,
    },
    /// Thick segment
    Line {
        /// Segment start
        start: Vec2,
        /// Segment end
        end: Vec2,
        /// Hit threshold from the segment
        width: f32,
    },
}

impl MeleeShape {
    /// Whether `point` lies in the shape. Arcs reach `radius + arc_pad`.
    #[must_use]
    pub fn contains(&self, point: Vec2, arc_pad: f32) -> bool {
        match *self {
            Self::Arc {
                origin,
                radius,
                angle_start,
                angle_end,
            } => {
                let offset = point - origin;
                if offset.length() > radius + arc_pad {
                    return false;
                }
                let span = angle_end - angle_start;
                if span >= TAU {
                    return true;
                }
                let relative = (angle_of(offset) - angle_start).rem_euclid(TAU);
                relative <= span
            },
            Self::Line { start, end, width } => point_segment_distance(point, start, end) < width,
        }
    }
}

/// Short-lived melee hit region.
///
/// Overlap is re-evaluated every frame the volume lives and damage is applied
/// again on each of those frames; a target standing in a swing takes one hit
/// per frame of overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeVolume {
    /// Stable id
    pub id: EntityId,
    /// Attacker
    pub owner: EntityId,
    /// Hit region
    pub shape: MeleeShape,
    /// Seconds left
    pub lifetime: f32,
    /// Damage per overlapping frame
    pub damage: f32,
}

impl MeleeVolume {
    /// Creates a volume.
    #[must_use]
    pub fn new(owner: EntityId, shape: MeleeShape, damage: f32, lifetime: f32) -> Self {
        Self {
            id: EntityId::new(),
            owner,
            shape,
            lifetime,
            damage,
        }
    }
}

/// Read-only arena data shared by the combat passes.
#[derive(Debug, Clone, Copy)]
pub struct Arena<'a> {
    /// Static obstacles
    pub obstacles: &'a [Obstacle],
    /// Side length of the playable square
    pub world_size: f32,
}

impl Arena<'_> {
    /// Whether `point` is inside `[0, world_size]` on both axes.
    #[must_use]
    pub fn in_bounds(&self, point: Vec2) -> bool {
        (0.0..=self.world_size).contains(&point.x) && (0.0..=self.world_size).contains(&point.y)
    }
}

/// Hostile lists the player can hit, in hit-priority order.
pub struct Targets<'a> {
    /// Regular enemies (tested first)
    pub enemies: &'a mut [Enemy],
    /// Bosses
    pub bosses: &'a mut [Boss],
}

/// Applies player damage to a hostile: damage, aggro toward the player, and
/// a damage event.
pub fn strike_hostile<H: Hostile>(
    target: &mut H,
    amount: f32,
    attacker_position: Vec2,
    bus: &EventBus,
) -> DamageOutcome {
    let outcome = target.take_damage(amount);
    target.force_aggro(attacker_position);
    bus.publish(SimEvent::HostileDamaged {
        entity: target.id(),
        amount: outcome.applied,
        remaining: target.health().current(),
    });
    outcome
}

fn explosion(position: Vec2, tuning: &CombatTuning) -> EffectSpawn {
    EffectSpawn::new(
        EffectKind::Explosion {
            radius: tuning.explosion_radius,
        },
        position,
        tuning.explosion_duration,
    )
}

/// Advances every projectile and resolves hits.
///
/// Player projectiles test alive enemies, then alive bosses; the first match
/// absorbs the projectile. Hostile projectiles test only the player. A hit
/// queues an explosion; hostile hits on the player are queued in `out`.
pub fn resolve_projectiles(
    projectiles: &mut Vec<Projectile>,
    dt: f32,
    arena: Arena<'_>,
    targets: &mut Targets<'_>,
    player: &PlayerView,
    signals: &mut FrameSignals,
    out: &mut PhaseOutput,
    bus: &EventBus,
    tuning: &CombatTuning,
) {
    let mut spent = Vec::new();

    for projectile in projectiles.iter_mut() {
        projectile.advance(dt);

        if projectile.is_expired()
            || !arena.in_bounds(projectile.position)
            || circle_overlaps_any(projectile.position, projectile.radius, arena.obstacles)
        {
            spent.push(projectile.id);
            continue;
        }

        let hit = match projectile.side {
            Side::Player => hit_hostiles(projectile, targets, player.position, signals, bus),
            Side::Hostile => {
                let hit = player.alive && projectile.touches(player.position, player.radius);
                if hit {
                    out.hit_player(projectile.owner, projectile.damage);
                }
                hit
            },
        };

        if hit {
            out.effects.push(explosion(projectile.position, tuning));
            spent.push(projectile.id);
        }
    }

    if !spent.is_empty() {
        trace!(count = spent.len(), "projectiles removed");
        projectiles.retain(|p| !spent.contains(&p.id));
    }
}

fn hit_hostiles(
    projectile: &Projectile,
    targets: &mut Targets<'_>,
    shooter_position: Vec2,
    signals: &mut FrameSignals,
    bus: &EventBus,
) -> bool {
    if let Some(enemy) = targets
        .enemies
        .iter_mut()
        .find(|e| e.is_alive() && projectile.touches(e.position(), e.radius()))
    {
        strike_hostile(enemy, projectile.damage, shooter_position, bus);
        signals.mark_struck(enemy.id(), enemy.position());
        return true;
    }

    if let Some(boss) = targets
        .bosses
        .iter_mut()
        .find(|b| b.is_alive() && projectile.touches(b.position(), b.radius()))
    {
        strike_hostile(boss, projectile.damage, shooter_position, bus);
        return true;
    }

    false
}

/// Applies every live melee volume to every overlapping hostile, then ages
/// the volumes and drops the expired ones.
pub fn resolve_melee(
    volumes: &mut Vec<MeleeVolume>,
    dt: f32,
    targets: &mut Targets<'_>,
    attacker_position: Vec2,
    signals: &mut FrameSignals,
    bus: &EventBus,
    tuning: &CombatTuning,
) {
    for volume in volumes.iter_mut() {
        for enemy in targets.enemies.iter_mut() {
            if enemy.is_alive() && volume.shape.contains(enemy.position(), tuning.arc_pad) {
                strike_hostile(enemy, volume.damage, attacker_position, bus);
                signals.mark_struck(enemy.id(), enemy.position());
            }
        }
        for boss in targets.bosses.iter_mut() {
            if boss.is_alive() && volume.shape.contains(boss.position(), tuning.arc_pad) {
                strike_hostile(boss, volume.damage, attacker_position, bus);
            }
        }
        volume.lifetime -= dt;
    }

    volumes.retain(|v| v.lifetime > 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AiState;
    use crate::config::SimConfig;

    fn arc(radius: f32) -> MeleeShape {
        MeleeShape::Arc {
            origin: Vec2::ZERO,
            radius,
            angle_start: -0.5,
            angle_end: 0.5,
        }
    }

    fn player_view(position: Vec2) -> PlayerView {
        PlayerView {
            id: EntityId::new(),
            position,
            radius: 14.0,
            alive: true,
        }
    }

    #[test]
    fn test_arc_contains() {
        let shape = arc(80.0);
        assert!(shape.contains(Vec2::from_angle(0.2) * 70.0, 6.0));
        assert!(!shape.contains(Vec2::from_angle(0.2) * 90.0, 6.0));
        assert!(!shape.contains(Vec2::from_angle(0.7) * 50.0, 6.0));
        assert!(!shape.contains(Vec2::from_angle(-0.7) * 50.0, 6.0));
    }

    #[test]
    fn test_arc_wraps_past_pi() {
        let shape = MeleeShape::Arc {
            origin: Vec2::ZERO,
            radius: 50.0,
            angle_start: 2.8,
            angle_end: 3.6,
        };
        assert!(shape.contains(Vec2::from_angle(-3.0) * 30.0, 0.0));
        assert!(!shape.contains(Vec2::from_angle(0.0) * 30.0, 0.0));
    }

    #[test]
    fn test_line_contains() {
        let shape = MeleeShape::Line {
            start: Vec2::ZERO,
            end: Vec2::new(100.0, 0.0),
            width: 10.0,
        };
        assert!(shape.contains(Vec2::new(50.0, 9.0), 0.0));
        assert!(!shape.contains(Vec2::new(50.0, 11.0), 0.0));
        assert!(!shape.contains(Vec2::new(115.0, 0.0), 0.0));
    }

    #[test]
    fn test_projectile_kinematics() {
        let tuning = CombatTuning::default();
        let origin = Vec2::new(10.0, 20.0);
        let dir = Vec2::new(3.0, 4.0);
        let mut p =
            Projectile::new(EntityId::new(), Side::Player, origin, dir, 300.0, 5.0, &tuning);
        let dt = 1.0 / 60.0;
        for _ in 0..30 {
            p.advance(dt);
        }
        let expected = origin + Vec2::new(0.6, 0.8) * 300.0 * (30.0 * dt);
        assert!(p.position.distance(expected) < 1e-2);
        assert!(!p.is_expired());
    }

    #[test]
    fn test_projectile_removed_on_obstacle_and_bounds() {
        let tuning = CombatTuning::default();
        let obstacles = [Obstacle::new(100.0, 0.0, 20.0, 200.0)];
        let arena = Arena {
            obstacles: &obstacles,
            world_size: 500.0,
        };
        let owner = EntityId::new();
        let shot = |origin: Vec2, dir: Vec2, speed: f32| {
            Projectile::new(owner, Side::Player, origin, dir, speed, 5.0, &tuning)
        };
        let mut projectiles = vec![
            shot(Vec2::new(95.0, 50.0), Vec2::X, 600.0),
            shot(Vec2::new(495.0, 400.0), Vec2::X, 600.0),
            shot(Vec2::new(300.0, 400.0), Vec2::Y, 60.0),
        ];
        let mut targets = Targets {
            enemies: &mut [],
            bosses: &mut [],
        };
        let mut signals = FrameSignals::new();
        let mut out = PhaseOutput::new();
        let bus = EventBus::default();
        resolve_projectiles(
            &mut projectiles,
            1.0 / 60.0,
            arena,
            &mut targets,
            &player_view(Vec2::new(250.0, 250.0)),
            &mut signals,
            &mut out,
            &bus,
            &tuning,
        );
        assert_eq!(projectiles.len(), 1);
        assert_eq!(projectiles[0].direction, Vec2::Y);
    }

    #[test]
    fn test_player_projectile_hits_first_enemy_only() {
        let config = SimConfig::default();
        let tuning = &config.combat;
        let mut enemies = vec![
            Enemy::new_patroller(Vec2::new(200.0, 100.0), Vec2::new(200.0, 300.0), &config),
            Enemy::new_patroller(Vec2::new(200.0, 100.0), Vec2::new(200.0, 300.0), &config),
        ];
        let arena = Arena {
            obstacles: &[],
            world_size: 1000.0,
        };
        let shooter = player_view(Vec2::new(100.0, 100.0));
        let mut projectiles = vec![Projectile::new(
            shooter.id,
            Side::Player,
            Vec2::new(190.0, 100.0),
            Vec2::X,
            60.0,
            40.0,
            tuning,
        )];
        let mut signals = FrameSignals::new();
        let mut out = PhaseOutput::new();
        let bus = EventBus::default();
        {
            let mut targets = Targets {
                enemies: &mut enemies,
                bosses: &mut [],
            };
            resolve_projectiles(
                &mut projectiles,
                1.0 / 60.0,
                arena,
                &mut targets,
                &shooter,
                &mut signals,
                &mut out,
                &bus,
                tuning,
            );
        }

        assert!(projectiles.is_empty());
        assert_eq!(enemies[0].health().current(), 20.0);
        assert_eq!(enemies[1].health().current(), 60.0);
        assert!(signals.is_struck(enemies[0].id()));
        assert_eq!(enemies[0].state(), AiState::Alert);
        assert_eq!(enemies[0].target(), Some(shooter.position));
        assert_eq!(out.effects.len(), 1);
    }

    #[test]
    fn test_hostile_projectile_queues_player_hit() {
        let tuning = CombatTuning::default();
        let player = player_view(Vec2::new(300.0, 300.0));
        let enemy_id = EntityId::new();
        let mut projectiles = vec![Projectile::new(
            enemy_id,
            Side::Hostile,
            Vec2::new(290.0, 300.0),
            Vec2::X,
            60.0,
            8.0,
            &tuning,
        )];
        let mut out = PhaseOutput::new();
        let mut targets = Targets {
            enemies: &mut [],
            bosses: &mut [],
        };
        resolve_projectiles(
            &mut projectiles,
            1.0 / 60.0,
            Arena {
                obstacles: &[],
                world_size: 1000.0,
            },
            &mut targets,
            &player,
            &mut FrameSignals::new(),
            &mut out,
            &EventBus::default(),
            &tuning,
        );
        assert!(projectiles.is_empty());
        assert_eq!(out.player_hits.len(), 1);
        assert_eq!(out.player_hits[0].source, enemy_id);
        assert_eq!(out.player_hits[0].amount, 8.0);
    }

    #[test]
    fn test_melee_reapplies_every_overlapping_frame() {
        let config = SimConfig::default();
        let mut enemies = vec![Enemy::new_patroller(
            Vec2::new(50.0, 0.0),
            Vec2::new(50.0, 200.0),
            &config,
        )];
        let owner = EntityId::new();
        let mut volumes = vec![MeleeVolume::new(owner, arc(80.0), 5.0, 0.04)];
        let mut signals = FrameSignals::new();
        let bus = EventBus::default();
        let dt = 1.0 / 60.0;
        for _ in 0..5 {
            let mut targets = Targets {
                enemies: &mut enemies,
                bosses: &mut [],
            };
            resolve_melee(
                &mut volumes,
                dt,
                &mut targets,
                Vec2::ZERO,
                &mut signals,
                &bus,
                &config.combat,
            );
        }
        // 0.04s lifetime at 60 fps covers three frames of overlap
        assert!(volumes.is_empty());
        assert_eq!(enemies[0].health().current(), 60.0 - 15.0);
        assert!(signals.is_struck(enemies[0].id()));
    }
}
