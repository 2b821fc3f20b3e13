//! Enemy AI state machine.
//!
//! Enemies patrol between two endpoints, pause to look around at each end,
//! and switch to Alert when they see the player or are provoked. Alert is
//! sticky: it only drops once the player is out of sight and beyond the
//! leash distance.
//!
//! Per-frame order inside [`Enemy::update`]:
//! 1. Vision sweep (always, even while dead)
//! 2. Perception and awareness transitions
//! 3. Movement for the current state
//! 4. Burst fire (strong archetype, Alert only)
//! 5. Contact attack (any state)

use glam::Vec2;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use std::f32::consts::PI;
use tracing::debug;

use crate::agent::{
    alert_lost, AiState, Archetype, Combatant, Cooldown, DamageOutcome, Facing, Health, Hostile,
    PlayerView,
};
use crate::combat::{Projectile, Side};
use crate::config::{ArchetypeTuning, EnemyTuning, SimConfig};
use crate::events::PhaseOutput;
use crate::geometry::{direction_or_default, Obstacle};
use crate::movement::move_with_collisions;
use crate::perception::{VisionCone, VisionSweep};

/// Pursuit stops this fraction of the strike radius short of the target.
const APPROACH_FRACTION: f32 = 0.6;

/// Movement below this length counts as blocked.
const STUCK_EPSILON: f32 = 1e-3;

// ============================================================================
// Burst fire
// ============================================================================

/// Multi-shot ranged sequence of the strong archetype.
///
/// When the trigger cooldown elapses the burst is armed with
/// `burst_shots` shots; while armed, one shot fires each time the
/// inter-shot cooldown elapses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstFire {
    shots_left: u32,
    trigger: Cooldown,
    interval: Cooldown,
}

impl BurstFire {
    /// Creates a disarmed burst whose trigger starts counting down.
    #[must_use]
    pub fn new(tuning: &EnemyTuning) -> Self {
        Self {
            shots_left: 0,
            trigger: Cooldown::started(tuning.burst_trigger_cooldown),
            interval: Cooldown::ready_now(),
        }
    }

    /// Shots still queued in the current burst.
    #[must_use]
    pub fn shots_left(&self) -> u32 {
        self.shots_left
    }

    /// Whether a burst is in progress.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.shots_left > 0
    }

    /// Advances both timers; returns true when a shot fires this frame.
    pub fn tick(&mut self, dt: f32, tuning: &EnemyTuning) -> bool {
        self.trigger.tick(dt);
        self.interval.tick(dt);

        if self.shots_left == 0 {
            if !self.trigger.is_ready() {
                return false;
            }
            self.shots_left = tuning.burst_shots;
            self.trigger.trigger(tuning.burst_trigger_cooldown);
            self.interval = Cooldown::ready_now();
        }

        if self.shots_left > 0 && self.interval.is_ready() {
            self.shots_left -= 1;
            self.interval.trigger(tuning.burst_interval);
            return true;
        }
        false
    }

    /// Drops any queued shots; the trigger keeps its timer.
    pub fn disarm(&mut self) {
        self.shots_left = 0;
    }
}

/// Enemy archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Weak melee-only patroller
    Patroller,
    /// Tougher enemy with a burst-fire ranged attack
    Strong {
        /// Burst state
        burst: BurstFire,
    },
}

// ============================================================================
// Enemy
// ============================================================================

/// A patrolling enemy.
#[derive(Debug, Clone)]
pub struct Enemy {
    id: EntityId,
    kind: EnemyKind,
    position: Vec2,
    base_facing: Facing,
    sweep: VisionSweep,
    health: Health,
    state: AiState,
    endpoints: [Vec2; 2],
    active_endpoint: usize,
    turn_timer: f32,
    target: Option<Vec2>,
    melee: Cooldown,
    death_fade: f32,
    kill_credited: bool,
    stats: ArchetypeTuning,
    los_padding: f32,
    fade_duration: f32,
}

impl Enemy {
    /// Creates a weak patroller at `a`, walking toward `b`.
    #[must_use]
    pub fn new_patroller(a: Vec2, b: Vec2, config: &SimConfig) -> Self {
        Self::with_kind(EnemyKind::Patroller, config.enemy.weak.clone(), a, b, config)
    }

    /// Creates a strong burst-firing enemy at `a`, walking toward `b`.
    #[must_use]
    pub fn new_strong(a: Vec2, b: Vec2, config: &SimConfig) -> Self {
        let kind = EnemyKind::Strong {
            burst: BurstFire::new(&config.enemy),
        };
        Self::with_kind(kind, config.enemy.strong.clone(), a, b, config)
    }

    fn with_kind(
        kind: EnemyKind,
        stats: ArchetypeTuning,
        a: Vec2,
        b: Vec2,
        config: &SimConfig,
    ) -> Self {
        let perception = &config.perception;
        Self {
            id: EntityId::new(),
            kind,
            position: a,
            base_facing: Facing::new(b - a),
            sweep: VisionSweep::new(perception.sweep_rate, perception.sweep_amplitude),
            health: Health::new(stats.max_health),
            state: AiState::Patrolling,
            endpoints: [a, b],
            active_endpoint: 1,
            turn_timer: 0.0,
            target: None,
            melee: Cooldown::ready_now(),
            death_fade: 0.0,
            kill_credited: false,
            stats,
            los_padding: perception.los_padding,
            fade_duration: config.enemy.death_fade,
        }
    }

    /// Starts the vision sweep at a different phase so neighbors don't move
    /// in lockstep.
    #[must_use]
    pub fn with_sweep_phase(mut self, phase: f32) -> Self {
        self.sweep = self.sweep.with_phase(phase);
        self
    }

    /// Archetype variant.
    #[must_use]
    pub fn kind(&self) -> &EnemyKind {
        &self.kind
    }

    /// Archetype stats.
    #[must_use]
    pub fn stats(&self) -> &ArchetypeTuning {
        &self.stats
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

    /// Patrol endpoints.
    #[must_use]
    pub fn endpoints(&self) -> [Vec2; 2] {
        self.endpoints
    }

    /// Index of the endpoint currently walked toward.
    #[must_use]
    pub fn active_endpoint(&self) -> usize {
        self.active_endpoint
    }

    /// Facing chosen by the state machine, before the sweep.
    #[must_use]
    pub fn base_facing(&self) -> Vec2 {
        self.base_facing.vec()
    }

    /// Vision sweep state.
    #[must_use]
    pub fn sweep(&self) -> &VisionSweep {
        &self.sweep
    }

    /// Seconds of death fade left (zero while alive or fully faded).
    #[must_use]
    pub fn death_fade(&self) -> f32 {
        self.death_fade
    }

    /// Whether this enemy's kill has already been credited.
    #[must_use]
    pub fn kill_credited(&self) -> bool {
        self.kill_credited
    }

    /// Whether this enemy currently sees `point`.
    #[must_use]
    pub fn can_see_point(&self, point: Vec2, obstacles: &[Obstacle]) -> bool {
        self.can_see(point, obstacles)
    }

    /// Runs one frame of AI.
    pub fn update(
        &mut self,
        dt: f32,
        player: &PlayerView,
        obstacles: &[Obstacle],
        world_size: f32,
        out: &mut PhaseOutput,
        config: &SimConfig,
    ) {
        self.sweep.advance(dt);

        if !self.is_alive() {
            self.death_fade = (self.death_fade - dt).max(0.0);
            return;
        }

        self.melee.tick(dt);

        let sees = player.alive && self.can_see(player.position, obstacles);
        self.update_awareness(sees, player, config.perception.alert_leash_factor);

        match self.state {
            AiState::Patrolling => self.patrol(dt, obstacles, world_size, &config.enemy),
            AiState::Turning => self.turn(dt, &config.enemy),
            AiState::Alert => self.pursue(dt, obstacles, world_size, out, config),
        }

        self.contact_attack(player, out, &config.enemy);
    }

    fn update_awareness(&mut self, sees: bool, player: &PlayerView, leash_factor: f32) {
        if sees {
            if !self.state.is_alert() {
                debug!(enemy = %self.id, "enemy spotted player");
            }
            self.state = AiState::Alert;
            self.target = Some(player.position);
            return;
        }

        if self.state.is_alert() {
            // Leash runs to the last-known target, not the player's live position
            let distance = self
                .target
                .map_or(f32::INFINITY, |target| self.position.distance(target));
            if !player.alive
                || alert_lost(false, distance, self.stats.view_distance, leash_factor)
            {
                debug!(enemy = %self.id, distance, "enemy lost target");
                self.state = AiState::Patrolling;
                self.target = None;
                if let EnemyKind::Strong { burst } = &mut self.kind {
                    burst.disarm();
                }
            }
        }
    }

    fn patrol(&mut self, dt: f32, obstacles: &[Obstacle], world_size: f32, tuning: &EnemyTuning) {
        let endpoint = self.endpoints[self.active_endpoint];
        let to_endpoint = endpoint - self.position;
        let distance = to_endpoint.length();
        if distance <= tuning.endpoint_radius {
            self.begin_turn(tuning);
            return;
        }

        let dir = to_endpoint / distance;
        self.base_facing.look_along(dir);
        let step = dir * (self.stats.patrol_speed * dt).min(distance);
        let next =
            move_with_collisions(self.position, step, self.stats.radius, obstacles, world_size);

        // A wall between the endpoints: give up on this leg
        if step.length() > STUCK_EPSILON && next.distance(self.position) < STUCK_EPSILON {
            self.begin_turn(tuning);
        }
        self.position = next;
    }

    fn begin_turn(&mut self, tuning: &EnemyTuning) {
        self.state = AiState::Turning;
        self.turn_timer = tuning.turn_duration;
    }

    fn turn(&mut self, dt: f32, tuning: &EnemyTuning) {
        self.base_facing.rotate(PI * dt / tuning.turn_duration);
        self.turn_timer -= dt;
        if self.turn_timer <= 0.0 {
            self.active_endpoint = 1 - self.active_endpoint;
            self.state = AiState::Patrolling;
            let next = self.endpoints[self.active_endpoint];
            self.base_facing.look_along(next - self.position);
        }
    }

    fn pursue(
        &mut self,
        dt: f32,
        obstacles: &[Obstacle],
        world_size: f32,
        out: &mut PhaseOutput,
        config: &SimConfig,
    ) {
        let Some(target) = self.target else {
            return;
        };

        let to_target = target - self.position;
        let distance = to_target.length();
        let dir = direction_or_default(to_target);
        self.base_facing.look_along(to_target);

        let stop = config.enemy.strike_radius * APPROACH_FRACTION;
        let travel = (self.stats.chase_speed * dt).min((distance - stop).max(0.0));
        if travel > 0.0 {
            self.position = move_with_collisions(
                self.position,
                dir * travel,
                self.stats.radius,
                obstacles,
                world_size,
            );
        }

        if let EnemyKind::Strong { burst } = &mut self.kind {
            if burst.tick(dt, &config.enemy) {
                let muzzle = self.position + dir * self.stats.radius;
                out.projectiles.push(Projectile::new(
                    self.id,
                    Side::Hostile,
                    muzzle,
                    dir,
                    self.stats.projectile_speed,
                    self.stats.projectile_damage,
                    &config.combat,
                ));
            }
        }
    }

    fn contact_attack(&mut self, player: &PlayerView, out: &mut PhaseOutput, tuning: &EnemyTuning) {
        if !player.alive || !self.melee.is_ready() {
            return;
        }
        if self.position.distance(player.position) <= tuning.strike_radius {
            out.hit_player(self.id, self.stats.melee_damage);
            self.melee.trigger(self.stats.melee_cooldown);
        }
    }
}

impl Combatant for Enemy {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.stats.radius
    }

    fn health(&self) -> &Health {
        &self.health
    }

    fn facing(&self) -> Vec2 {
        direction_or_default(self.sweep.apply(self.base_facing.vec()))
    }

    fn vision(&self) -> VisionCone {
        VisionCone::new(self.stats.view_distance, self.stats.fov_half_angle)
            .with_padding(self.los_padding)
    }
}

impl Hostile for Enemy {
    fn archetype(&self) -> Archetype {
        match self.kind {
            EnemyKind::Patroller => Archetype::Patroller,
            EnemyKind::Strong { .. } => Archetype::Strong,
        }
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let outcome = self.health.apply_damage(amount);
        if outcome.killed {
            debug!(enemy = %self.id, "enemy killed");
            self.death_fade = self.fade_duration;
            self.target = None;
        }
        outcome
    }

    fn force_aggro(&mut self, target: Vec2) {
        if !self.is_alive() {
            return;
        }
        if !self.state.is_alert() {
            debug!(enemy = %self.id, x = target.x, y = target.y, "enemy provoked");
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
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WORLD: f32 = 1000.0;
    const DT: f32 = 1.0 / 60.0;

    fn player_at(position: Vec2) -> PlayerView {
        PlayerView {
            id: EntityId::new(),
            position,
            radius: 14.0,
            alive: true,
        }
    }

    fn far_player() -> PlayerView {
        player_at(Vec2::new(950.0, 950.0))
    }

    #[test]
    fn test_patrol_turns_at_endpoint_and_flips() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0), &config);
        let mut out = PhaseOutput::new();
        let player = far_player();

        let mut frames = 0;
        while enemy.state() != AiState::Turning {
            enemy.update(DT, &player, &[], WORLD, &mut out, &config);
            frames += 1;
            assert!(frames < 600, "enemy never reached its endpoint");
        }
        let reach = config.enemy.endpoint_radius + 1e-3;
        assert!(enemy.position().distance(Vec2::new(300.0, 100.0)) <= reach);
        assert_eq!(enemy.active_endpoint(), 1);

        for _ in 0..78 {
            enemy.update(DT, &player, &[], WORLD, &mut out, &config);
        }
        assert_eq!(enemy.state(), AiState::Patrolling);
        assert_eq!(enemy.active_endpoint(), 0);
        assert!(enemy.base_facing().x < 0.0);
    }

    #[test]
    fn test_spots_visible_player() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0), &config);
        let player = player_at(Vec2::new(200.0, 110.0));
        enemy.update(DT, &player, &[], WORLD, &mut PhaseOutput::new(), &config);
        assert_eq!(enemy.state(), AiState::Alert);
        assert_eq!(enemy.target(), Some(player.position));
    }

    #[test]
    fn test_wall_blocks_spotting() {
        let config = SimConfig::default();
        let wall = [Obstacle::new(140.0, 50.0, 20.0, 100.0)];
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(100.0, 300.0), &config);
        // Face the player explicitly, the wall still hides them
        enemy.base_facing = Facing::new(Vec2::X);
        let player = player_at(Vec2::new(220.0, 100.0));
        assert!(!enemy.can_see_point(player.position, &wall));
        enemy.update(DT, &player, &wall, WORLD, &mut PhaseOutput::new(), &config);
        assert_ne!(enemy.state(), AiState::Alert);
    }

    #[test]
    fn test_alert_hysteresis() {
        let config = SimConfig::default();
        let leash = config.enemy.weak.view_distance * config.perception.alert_leash_factor;
        let mut enemy =
            Enemy::new_patroller(Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0), &config);
        let mut out = PhaseOutput::new();

        let spotted_at = Vec2::new(600.0, 505.0);
        enemy.update(DT, &player_at(spotted_at), &[], WORLD, &mut out, &config);
        assert_eq!(enemy.state(), AiState::Alert);
        assert_eq!(enemy.target(), Some(spotted_at));

        // Player slips behind and far past the leash; the last-known spot is still close
        let behind_far = player_at(Vec2::new(20.0, 500.0));
        assert!(enemy.position().distance(behind_far.position) > leash);
        for _ in 0..10 {
            enemy.update(DT, &behind_far, &[], WORLD, &mut out, &config);
            assert_eq!(enemy.state(), AiState::Alert);
            assert_eq!(enemy.target(), Some(spotted_at));
        }

        // A last-known target beyond the leash is given up on
        let distant = Vec2::new(enemy.position().x + leash + 50.0, enemy.position().y);
        enemy.force_aggro(distant);
        enemy.update(DT, &behind_far, &[], WORLD, &mut out, &config);
        assert_eq!(enemy.state(), AiState::Patrolling);
        assert_eq!(enemy.target(), None);
    }

    #[test]
    fn test_alert_dropped_when_player_dies() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(500.0, 500.0), Vec2::new(700.0, 500.0), &config);
        enemy.force_aggro(Vec2::new(550.0, 500.0));

        let mut dead = player_at(Vec2::new(550.0, 500.0));
        dead.alive = false;
        enemy.update(DT, &dead, &[], WORLD, &mut PhaseOutput::new(), &config);
        assert_eq!(enemy.state(), AiState::Patrolling);
        assert_eq!(enemy.target(), None);
    }

    #[test]
    fn test_strong_burst_fires_three_shots() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_strong(Vec2::new(100.0, 500.0), Vec2::new(100.0, 700.0), &config);
        let player = player_at(Vec2::new(400.0, 500.0));
        enemy.force_aggro(player.position);

        let mut out = PhaseOutput::new();
        for _ in 0..174 {
            enemy.update(DT, &player, &[], WORLD, &mut out, &config);
        }
        assert_eq!(enemy.state(), AiState::Alert);
        assert_eq!(out.projectiles.len(), 3);
        assert!(out.projectiles.iter().all(|p| p.side == Side::Hostile && p.owner == enemy.id()));
        assert!(out.projectiles.iter().all(|p| p.damage == config.enemy.strong.projectile_damage));
    }

    #[test]
    fn test_patroller_never_fires() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 500.0), Vec2::new(100.0, 700.0), &config);
        let player = player_at(Vec2::new(300.0, 500.0));
        enemy.force_aggro(player.position);
        let mut out = PhaseOutput::new();
        for _ in 0..300 {
            enemy.update(DT, &player, &[], WORLD, &mut out, &config);
        }
        assert!(out.projectiles.is_empty());
    }

    #[test]
    fn test_contact_attack_regardless_of_state() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0), &config);
        // Directly behind: unseen, but within strike radius
        let player = player_at(Vec2::new(80.0, 100.0));
        let mut out = PhaseOutput::new();
        enemy.update(DT, &player, &[], WORLD, &mut out, &config);
        assert_eq!(enemy.state(), AiState::Patrolling);
        assert_eq!(out.player_hits.len(), 1);
        assert_eq!(out.player_hits[0].amount, config.enemy.weak.melee_damage);

        // Cooldown gates the next strike
        enemy.update(DT, &player, &[], WORLD, &mut out, &config);
        assert_eq!(out.player_hits.len(), 1);
    }

    #[test]
    fn test_dead_enemy_is_inert_but_sweeps() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0), &config);
        let outcome = enemy.take_damage(1_000.0);
        assert!(outcome.killed);
        assert_eq!(enemy.death_fade(), config.enemy.death_fade);

        let start = enemy.position();
        let phase = enemy.sweep().phase();
        let mut out = PhaseOutput::new();
        enemy.update(DT, &player_at(Vec2::new(110.0, 100.0)), &[], WORLD, &mut out, &config);

        assert_eq!(enemy.position(), start);
        assert!(enemy.sweep().phase() > phase);
        assert!(enemy.death_fade() < config.enemy.death_fade);
        assert!(out.player_hits.is_empty());

        enemy.force_aggro(Vec2::ZERO);
        assert_ne!(enemy.state(), AiState::Alert);
    }

    #[test]
    fn test_kill_claimed_once() {
        let config = SimConfig::default();
        let mut enemy =
            Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0), &config);
        assert!(!enemy.claim_kill());
        enemy.take_damage(60.0);
        enemy.take_damage(30.0);
        assert!(enemy.claim_kill());
        assert!(!enemy.claim_kill());
        assert!(enemy.kill_credited());
        assert_eq!(enemy.health().current(), 0.0);
    }

    #[test]
    fn test_archetype_tags() {
        let config = SimConfig::default();
        let weak = Enemy::new_patroller(Vec2::ZERO, Vec2::X, &config);
        let strong = Enemy::new_strong(Vec2::ZERO, Vec2::X, &config);
        assert_eq!(weak.archetype(), Archetype::Patroller);
        assert_eq!(strong.archetype(), Archetype::Strong);
        assert!(strong.vision().view_distance > weak.vision().view_distance);
        assert_eq!(strong.health().max(), config.enemy.strong.max_health);
    }

    proptest! {
        #[test]
        fn prop_facing_stays_unit(frames in proptest::collection::vec(0.001f32..0.1, 1..200)) {
            let config = SimConfig::default();
            let mut enemy =
                Enemy::new_patroller(Vec2::new(100.0, 100.0), Vec2::new(160.0, 130.0), &config);
            let player = far_player();
            let mut out = PhaseOutput::new();
            for dt in frames {
                enemy.update(dt, &player, &[], WORLD, &mut out, &config);
                prop_assert!((enemy.facing().length() - 1.0).abs() < 1e-4);
                prop_assert!((enemy.base_facing().length() - 1.0).abs() < 1e-4);
            }
        }
    }
}
