//! Arena data and run-start spawning.
//!
//! World generation lives outside the core; it hands over the obstacles,
//! the zone centers and the arena size. [`Population::spawn`] turns the
//! zone centers into a player, a patrolling enemy population and a boss.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::info;

use crate::boss::Boss;
use crate::combat::Arena;
use crate::config::SimConfig;
use crate::enemy::Enemy;
use crate::geometry::Obstacle;
use crate::movement::{circle_overlaps_any, clamp_to_world};
use crate::player::Player;

/// Rings probed around a blocked spawn point.
const SPAWN_PROBE_RINGS: u32 = 8;
/// Directions probed per ring.
const SPAWN_PROBE_DIRECTIONS: u32 = 12;
/// Enemy anchors are scattered this far from their zone center.
const ZONE_SCATTER: (f32, f32) = (40.0, 160.0);

/// Static arena handed over by world generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Side length of the playable square `[0, size]`
    pub size: f32,
    /// Static obstacles
    pub obstacles: Vec<Obstacle>,
    /// Zone centers used to pick spawn points
    pub zone_centers: Vec<Vec2>,
}

impl World {
    /// Creates a world.
    #[must_use]
    pub fn new(size: f32, obstacles: Vec<Obstacle>, zone_centers: Vec<Vec2>) -> Self {
        Self {
            size,
            obstacles,
            zone_centers,
        }
    }

    /// Borrowed view used by the movement and combat phases.
    #[must_use]
    pub fn arena(&self) -> Arena<'_> {
        Arena {
            obstacles: &self.obstacles,
            world_size: self.size,
        }
    }

    /// Whether a circle fits at `center` without touching an obstacle or
    /// the arena border.
    #[must_use]
    pub fn is_free(&self, center: Vec2, radius: f32) -> bool {
        clamp_to_world(center, radius, self.size).distance_squared(center) < 1e-6
            && !circle_overlaps_any(center, radius, &self.obstacles)
    }

    /// Nearest free spot around `near`, probing rings of increasing radius.
    /// Falls back to the clamped input when everything nearby is blocked.
    #[must_use]
    pub fn free_spot(&self, near: Vec2, radius: f32) -> Vec2 {
        let start = clamp_to_world(near, radius, self.size);
        if self.is_free(start, radius) {
            return start;
        }
        for ring in 1..=SPAWN_PROBE_RINGS {
            let distance = ring as f32 * radius * 2.0;
            for k in 0..SPAWN_PROBE_DIRECTIONS {
                let angle = k as f32 * TAU / SPAWN_PROBE_DIRECTIONS as f32;
                let candidate =
                    clamp_to_world(start + Vec2::from_angle(angle) * distance, radius, self.size);
                if self.is_free(candidate, radius) {
                    return candidate;
                }
            }
        }
        start
    }

    /// Zone centers, or the arena center when none were supplied.
    #[must_use]
    pub fn spawn_zones(&self) -> Vec<Vec2> {
        if self.zone_centers.is_empty() {
            vec![Vec2::splat(self.size * 0.5)]
        } else {
            self.zone_centers.clone()
        }
    }
}

/// Every agent of a run.
#[derive(Debug, Clone)]
pub struct Population {
    /// The player
    pub player: Player,
    /// Regular enemies
    pub enemies: Vec<Enemy>,
    /// Bosses
    pub bosses: Vec<Boss>,
}

impl Population {
    /// Places the run's agents.
    ///
    /// - The player starts at the first zone center
    /// - Every other zone gets `enemies_per_zone` patrollers scattered around
    ///   it, every `strong_every`-th one strong
    /// - The boss guards the zone farthest from the player
    ///
    /// Spawn points are pushed off obstacles.
    #[must_use]
    pub fn spawn(world: &World, config: &SimConfig, rng: &mut fastrand::Rng) -> Self {
        let zones = world.spawn_zones();
        let player_spot = world.free_spot(zones[0], config.player.radius);
        let player = Player::new(player_spot, config);

        let mut enemies = Vec::new();
        let mut spawned = 0u32;
        for &zone in zones.iter().skip(1) {
            for _ in 0..config.enemy.enemies_per_zone {
                spawned += 1;
                let strong =
                    config.enemy.strong_every > 0 && spawned % config.enemy.strong_every == 0;
                enemies.push(spawn_enemy(world, config, rng, zone, strong));
            }
        }

        let bosses = zones
            .iter()
            .skip(1)
            .copied()
            .max_by(|a, b| {
                a.distance_squared(player_spot)
                    .total_cmp(&b.distance_squared(player_spot))
            })
            .map(|zone| {
                let spot = world.free_spot(zone, config.boss.radius);
                Boss::new(spot, config).facing_toward(player_spot - spot)
            })
            .into_iter()
            .collect::<Vec<_>>();

        info!(enemies = enemies.len(), bosses = bosses.len(), "population spawned");
        Self {
            player,
            enemies,
            bosses,
        }
    }
}

fn spawn_enemy(
    world: &World,
    config: &SimConfig,
    rng: &mut fastrand::Rng,
    zone: Vec2,
    strong: bool,
) -> Enemy {
    let radius = if strong {
        config.enemy.strong.radius
    } else {
        config.enemy.weak.radius
    };

    let (min, max) = ZONE_SCATTER;
    let scatter = Vec2::from_angle(rng.f32() * TAU) * (min + rng.f32() * (max - min));
    let anchor = world.free_spot(zone + scatter, radius);

    let axis = Vec2::from_angle(rng.f32() * TAU) * config.enemy.patrol_half_span;
    let a = world.free_spot(anchor - axis, radius);
    let b = world.free_spot(anchor + axis, radius);

    let enemy = if strong {
        Enemy::new_strong(a, b, config)
    } else {
        Enemy::new_patroller(a, b, config)
    };
    enemy.with_sweep_phase(rng.f32() * 2.0 - 1.0)
}
