//! Boss AI.
//!
//! A boss idles until it sees the player (or is provoked), then pursues to
//! its engage distance while three abilities cycle on independent
//! cooldowns:
//!
//! - Volley: a fan of hostile projectiles with random angular spread
//! - Ram: a long collision-swept lunge along the facing, leaving afterimages
//! - Slam: a stationary area hit preceded by a ground warning
//!
//! Awareness uses the same leash rule as regular enemies. An idle boss
//! reports [`AiState::Patrolling`].

use glam::Vec2;
use skirmish_common::EntityId;
use tracing::debug;

use crate::agent::{
    alert_lost, AiState, Archetype, Combatant, Cooldown, DamageOutcome, Facing, Health, Hostile,
    PlayerView,
};
use crate::combat::{Projectile, Side};
use crate::config::{BossTuning, CombatTuning, SimConfig};
use crate::effects::{EffectKind, EffectSpawn};
use crate::events::PhaseOutput;
use crate::geometry::{direction_or_default, rotate, Obstacle};
use crate::movement::{move_with_collisions, sweep_with_collisions};
use crate::perception::VisionCone;

/// Boss ability, used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BossAbility {
    /// Projectile fan
    Volley,
    /// Swept lunge
    Ram,
    /// Area slam
    Slam,
}

/// A boss.
#[derive(Debug, Clone)]
pub struct Boss {
    id: EntityId,
    position: Vec2,
    facing: Facing,
    health: Health,
    state: AiState,
    target: Option<Vec2>,
    volley: Cooldown,
    ram: Cooldown,
    slam: Cooldown,
    slam_warning: f32,
    kill_credited: bool,
    tuning: BossTuning,
    los_padding: f32,
}

impl Boss {
    /// Creates an idle boss at `position`. Every ability starts on a full
    /// cooldown.
    #[must_use]
    pub fn new(position: Vec2, config: &SimConfig) -> Self {
        let tuning = config.boss.clone();
        Self {
            id: EntityId::new(),
            position,
            facing: Facing::default(),
            health: Health::new(tuning.max_health),
            state: AiState::Patrolling,
            target: None,
            volley: Cooldown::started(tuning.volley_cooldown),
            ram: Cooldown::started(tuning.ram_cooldown),
            slam: Cooldown::started(tuning.slam_cooldown),
            slam_warning: 0.0,
            kill_credited: false,
            tuning,
            los_padding: config.perception.los_padding,
        }
    }

    /// Faces the boss along `direction`.
    #[must_use]
    pub fn facing_toward(mut self, direction: Vec2) -> Self {
        self.facing.look_along(direction);
        self
    }

    /// Current AI state.
    #[must_use]
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Last-known target while Alert.
    #[must_use]
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    /// Seconds the slam warning stays visible.
    #[must_use]
    pub fn slam_warning(&self) -> f32 {
        self.slam_warning
    }

    /// Seconds until `ability` is ready.
    #[must_use]
    pub fn cooldown(&self, ability: BossAbility) -> f32 {
        match ability {
            BossAbility::Volley => self.volley.remaining(),
            BossAbility::Ram => self.ram.remaining(),
            BossAbility::Slam => self.slam.remaining(),
        }
    }

    /// Tuning this boss was built with.
    #[must_use]
    pub fn tuning(&self) -> &BossTuning {
        &self.tuning
    }

    /// Whether this boss's kill has already been credited.
    #[must_use]
    pub fn kill_credited(&self) -> bool {
        self.kill_credited
    }

    /// Runs one frame of AI.
    pub fn update(
        &mut self,
        dt: f32,
        player: &PlayerView,
        obstacles: &[Obstacle],
        world_size: f32,
        out: &mut PhaseOutput,
        rng: &mut fastrand::Rng,
        config: &SimConfig,
    ) {
        self.slam_warning = (self.slam_warning - dt).max(0.0);
        if !self.is_alive() {
            return;
        }

        self.volley.tick(dt);
        self.ram.tick(dt);
        self.slam.tick(dt);

        let sees = player.alive && self.can_see(player.position, obstacles);
        self.update_awareness(sees, player, config.perception.alert_leash_factor);
        if !self.state.is_alert() {
            return;
        }

        self.approach(dt, obstacles, world_size);

        if self.volley.is_ready() {
            self.fire_volley(out, rng, &config.combat);
            self.volley.trigger(self.tuning.volley_cooldown);
        }
        if self.ram.is_ready() {
            self.perform_ram(player, obstacles, world_size, out, &config.combat);
            self.ram.trigger(self.tuning.ram_cooldown);
        }
        if self.slam.is_ready() {
            self.perform_slam(player, out);
            self.slam.trigger(self.tuning.slam_cooldown);
        }
    }

    fn update_awareness(&mut self, sees: bool, player: &PlayerView, leash_factor: f32) {
        if sees {
            if !self.state.is_alert() {
                debug!(boss = %self.id, "boss engaged");
            }
            self.state = AiState::Alert;
            self.target = Some(player.position);
        } else if self.state.is_alert() {
            let distance = self
                .target
                .map_or(f32::INFINITY, |target| self.position.distance(target));
            if !player.alive
                || alert_lost(false, distance, self.tuning.view_distance, leash_factor)
            {
                debug!(boss = %self.id, distance, "boss disengaged");
                self.state = AiState::Patrolling;
                self.target = None;
            }
        }
    }

    fn approach(&mut self, dt: f32, obstacles: &[Obstacle], world_size: f32) {
        let Some(target) = self.target else {
            return;
        };
        let to_target = target - self.position;
        self.facing.look_along(to_target);

        let gap = (to_target.length() - self.tuning.engage_distance).max(0.0);
        let travel = (self.tuning.speed * dt).min(gap);
        if travel > 0.0 {
            let step = direction_or_default(to_target) * travel;
            self.position = move_with_collisions(
                self.position,
                step,
                self.tuning.radius,
                obstacles,
                world_size,
            );
        }
    }

    fn fire_volley(&self, out: &mut PhaseOutput, rng: &mut fastrand::Rng, combat: &CombatTuning) {
        let aim = self.facing.vec();
        let muzzle = self.position + aim * self.tuning.radius;
        for _ in 0..self.tuning.volley_count {
            let spread = (rng.f32() * 2.0 - 1.0) * self.tuning.volley_spread;
            out.projectiles.push(Projectile::new(
                self.id,
                Side::Hostile,
                muzzle,
                rotate(aim, spread),
                self.tuning.projectile_speed,
                self.tuning.projectile_damage,
                combat,
            ));
        }
        debug!(
            boss = %self.id,
            count = self.tuning.volley_count,
            ability = ?BossAbility::Volley,
            "boss ability"
        );
    }

    fn perform_ram(
        &mut self,
        player: &PlayerView,
        obstacles: &[Obstacle],
        world_size: f32,
        out: &mut PhaseOutput,
        combat: &CombatTuning,
    ) {
        let delta = self.facing.vec() * self.tuning.ram_distance;
        let sweep =
            sweep_with_collisions(self.position, delta, self.tuning.radius, obstacles, world_size);

        let count = self.tuning.afterimage_count as usize;
        if count > 0 && !sweep.path.is_empty() {
            let stride = (sweep.path.len() / count).max(1);
            let angle = self.facing.angle();
            out.effects.extend(sweep.path.iter().step_by(stride).take(count).map(|&point| {
                EffectSpawn::new(
                    EffectKind::Afterimage {
                        angle,
                        radius: self.tuning.radius,
                    },
                    point,
                    combat.afterimage_duration,
                )
            }));
        }

        self.position = sweep.end;
        let hit =
            player.alive && self.position.distance(player.position) <= self.tuning.ram_hit_radius;
        if hit {
            out.hit_player(self.id, self.tuning.ram_damage);
        }
        debug!(boss = %self.id, hit, ability = ?BossAbility::Ram, "boss ability");
    }

    fn perform_slam(&mut self, player: &PlayerView, out: &mut PhaseOutput) {
        self.slam_warning = self.tuning.slam_warning;
        out.effects.push(EffectSpawn::new(
            EffectKind::SlamWarning {
                radius: self.tuning.slam_radius,
            },
            self.position,
            self.tuning.slam_warning,
        ));

        let hit =
            player.alive && self.position.distance(player.position) <= self.tuning.slam_radius;
        if hit {
            out.hit_player(self.id, self.tuning.slam_damage);
        }
        debug!(boss = %self.id, hit, ability = ?BossAbility::Slam, "boss ability");
    }
}

impl Combatant for Boss {
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

    fn vision(&self) -> VisionCone {
        VisionCone::new(self.tuning.view_distance, self.tuning.fov_half_angle)
            .with_padding(self.los_padding)
    }
}

impl Hostile for Boss {
    fn archetype(&self) -> Archetype {
        Archetype::Boss
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let outcome = self.health.apply_damage(amount);
        if outcome.killed {
            debug!(boss = %self.id, "boss killed");
            self.target = None;
        }
        outcome
    }

    fn force_aggro(&mut self, target: Vec2) {
        if !self.is_alive() {
            return;
        }
        self.state = AiState::Alert;
        self.target = Some(target);
    }

    fn claim_kill(&mut self) -> bool {
        if self.is_alive() || self.kill_credited {
            return false;
        }
        self.kill_credited = true;
        true
    }

    fn kill_credit(&self) -> u32 {
        self.tuning.kill_credit
    }
}
