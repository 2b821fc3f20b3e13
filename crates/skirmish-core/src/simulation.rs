//! Frame stepping.
//!
//! [`Simulation::step`] runs the phases in a fixed order:
//!
//! 1. Player control (intent, movement, dash, attacks)
//! 2. Enemy AI (perception, awareness, movement, attacks)
//! 3. Boss AI
//! 4. Aggro propagation, consuming the struck signals left by the previous
//!    frame's combat phases
//! 5. Projectile flight and hits
//! 6. Melee volumes
//! 7. Effect aging and kill crediting
//!
//! New projectiles and melee volumes requested by phases 1-3 join the live
//! lists before phase 5, so they resolve in the frame they were created.
//! Damage addressed to the player is applied through the player's intake
//! formula right after the phase that produced it.

use glam::Vec2;
use skirmish_common::EntityId;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::aggro;
use crate::agent::{Combatant, Hostile};
use crate::boss::Boss;
use crate::combat::{resolve_melee, resolve_projectiles, MeleeVolume, Projectile, Targets};
use crate::config::SimConfig;
use crate::effects::{EffectKind, EffectQueue, EffectSpawn};
use crate::enemy::Enemy;
use crate::events::{EventBus, FrameSignals, PhaseOutput, SimEvent};
use crate::input::FrameIntent;
use crate::movement::circle_overlaps_any;
use crate::player::Player;
use crate::world::{Population, World};

/// Tolerance for the unit-facing check.
const FACING_TOLERANCE: f32 = 1e-4;

/// A broken simulation invariant, surfaced to test harnesses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// Health outside `[0, max]`
    #[error("{entity} health {current} outside [0, {max}]")]
    HealthOutOfRange {
        /// Offending entity
        entity: EntityId,
        /// Current health
        current: f32,
        /// Maximum health
        max: f32,
    },
    /// Facing is not unit length
    #[error("{entity} facing has length {length}")]
    FacingNotUnit {
        /// Offending entity
        entity: EntityId,
        /// Facing length
        length: f32,
    },
    /// Collider overlaps an obstacle
    #[error("{entity} at {position} overlaps an obstacle")]
    InsideObstacle {
        /// Offending entity
        entity: EntityId,
        /// Its position
        position: Vec2,
    },
    /// Collider leaves the arena
    #[error("{entity} at {position} is outside the arena")]
    OutOfBounds {
        /// Offending entity
        entity: EntityId,
        /// Its position
        position: Vec2,
    },
}

/// How the run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// Player alive, hostiles remain
    InProgress,
    /// Every enemy and boss is dead
    Victory,
    /// The player died
    Defeat,
}

/// The simulation core.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: SimConfig,
    player: Player,
    enemies: Vec<Enemy>,
    bosses: Vec<Boss>,
    projectiles: Vec<Projectile>,
    melee: Vec<MeleeVolume>,
    effects: EffectQueue,
    signals: FrameSignals,
    bus: EventBus,
    rng: fastrand::Rng,
    frame: u64,
    elapsed: f32,
}

impl Simulation {
    /// Spawns a run in `world`.
    #[must_use]
    pub fn new(world: World, config: SimConfig, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let population = Population::spawn(&world, &config, &mut rng);
        Self::assemble(world, config, population, rng)
    }

    /// Runs a hand-placed population.
    #[must_use]
    pub fn with_population(
        world: World,
        config: SimConfig,
        population: Population,
        seed: u64,
    ) -> Self {
        Self::assemble(world, config, population, fastrand::Rng::with_seed(seed))
    }

    fn assemble(
        world: World,
        config: SimConfig,
        population: Population,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            world,
            config,
            player: population.player,
            enemies: population.enemies,
            bosses: population.bosses,
            projectiles: Vec::new(),
            melee: Vec::new(),
            effects: EffectQueue::new(),
            signals: FrameSignals::new(),
            bus: EventBus::default(),
            rng,
            frame: 0,
            elapsed: 0.0,
        }
    }

    /// Throws the current run away and spawns a fresh one.
    pub fn restart(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
        let population = Population::spawn(&self.world, &self.config, &mut self.rng);
        self.player = population.player;
        self.enemies = population.enemies;
        self.bosses = population.bosses;
        self.projectiles.clear();
        self.melee.clear();
        self.effects.clear();
        self.signals = FrameSignals::new();
        self.bus.drain();
        self.frame = 0;
        self.elapsed = 0.0;
        info!(seed, "run restarted");
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, intent: &FrameIntent) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let arena = self.world.arena();
        let mut out = PhaseOutput::new();

        self.player.update(intent, dt, arena, &mut out, &self.config);
        let view = self.player.view();

        for enemy in &mut self.enemies {
            enemy.update(dt, &view, arena.obstacles, arena.world_size, &mut out, &self.config);
        }
        for boss in &mut self.bosses {
            boss.update(
                dt,
                &view,
                arena.obstacles,
                arena.world_size,
                &mut out,
                &mut self.rng,
                &self.config,
            );
        }
        apply_player_hits(&mut self.player, &mut out, &self.bus);

        aggro::propagate(&mut self.enemies, &mut self.signals, arena.obstacles);

        self.projectiles.append(&mut out.projectiles);
        self.melee.append(&mut out.melee);

        let view = self.player.view();
        let mut targets = Targets {
            enemies: &mut self.enemies,
            bosses: &mut self.bosses,
        };
        resolve_projectiles(
            &mut self.projectiles,
            dt,
            arena,
            &mut targets,
            &view,
            &mut self.signals,
            &mut out,
            &self.bus,
            &self.config.combat,
        );
        resolve_melee(
            &mut self.melee,
            dt,
            &mut targets,
            view.position,
            &mut self.signals,
            &self.bus,
            &self.config.combat,
        );
        apply_player_hits(&mut self.player, &mut out, &self.bus);

        self.effects.tick(dt);
        self.effects.extend(out.effects.drain(..));
        self.credit_kills();

        self.frame += 1;
        self.elapsed += dt;
        trace!(
            frame = self.frame,
            projectiles = self.projectiles.len(),
            melee = self.melee.len(),
            effects = self.effects.len(),
            "frame stepped"
        );
    }

    fn credit_kills(&mut self) {
        let fade = self.config.enemy.death_fade;
        for enemy in &mut self.enemies {
            credit_kill(enemy, &mut self.player, &mut self.effects, &self.bus, fade);
        }
        for boss in &mut self.bosses {
            credit_kill(boss, &mut self.player, &mut self.effects, &self.bus, fade);
        }
    }

    /// Checks every agent invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        check_agent(&self.player, &self.world)?;
        for enemy in &self.enemies {
            check_agent(enemy, &self.world)?;
        }
        for boss in &self.bosses {
            check_agent(boss, &self.world)?;
        }
        Ok(())
    }

    /// How the run stands.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        if !self.player.is_alive() {
            RunOutcome::Defeat
        } else if self.enemies.iter().all(|e| !e.is_alive())
            && self.bosses.iter().all(|b| !b.is_alive())
        {
            RunOutcome::Victory
        } else {
            RunOutcome::InProgress
        }
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable player, for equipment and stat collaborators.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Regular enemies, alive and dead.
    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Bosses, alive and dead.
    #[must_use]
    pub fn bosses(&self) -> &[Boss] {
        &self.bosses
    }

    /// Live projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Live melee volumes.
    #[must_use]
    pub fn melee_volumes(&self) -> &[MeleeVolume] {
        &self.melee
    }

    /// Live visual effects.
    #[must_use]
    pub fn effects(&self) -> &EffectQueue {
        &self.effects
    }

    /// Struck signals waiting for the next aggro pass.
    #[must_use]
    pub fn signals(&self) -> &FrameSignals {
        &self.signals
    }

    /// Event bus; collaborators drain it after each step.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<SimEvent> {
        self.bus.drain()
    }

    /// The arena.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Tuning in use.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Frames stepped since the run started.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated seconds since the run started.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

fn apply_player_hits(player: &mut Player, out: &mut PhaseOutput, bus: &EventBus) {
    for hit in out.player_hits.drain(..) {
        player.take_hit(hit.amount, hit.source, bus);
    }
}

fn credit_kill<H: Hostile>(
    hostile: &mut H,
    player: &mut Player,
    effects: &mut EffectQueue,
    bus: &EventBus,
    fade: f32,
) {
    if !hostile.claim_kill() {
        return;
    }
    let credit = hostile.kill_credit();
    debug!(entity = %hostile.id(), credit, "kill credited");
    bus.publish(SimEvent::Kill {
        entity: hostile.id(),
        archetype: hostile.archetype(),
        credit,
        position: hostile.position(),
    });
    effects.push(EffectSpawn::new(
        EffectKind::DeathFade {
            radius: hostile.radius(),
        },
        hostile.position(),
        fade,
    ));
    player.award_kill(credit, bus);
}

fn check_agent<C: Combatant>(agent: &C, world: &World) -> Result<(), InvariantViolation> {
    let entity = agent.id();
    let health = agent.health();
    if !(0.0..=health.max()).contains(&health.current()) {
        return Err(InvariantViolation::HealthOutOfRange {
            entity,
            current: health.current(),
            max: health.max(),
        });
    }

    let length = agent.facing().length();
    if (length - 1.0).abs() > FACING_TOLERANCE {
        return Err(InvariantViolation::FacingNotUnit { entity, length });
    }

    let position = agent.position();
    let radius = agent.radius();
    let lo = radius - 1e-3;
    let hi = world.size - radius + 1e-3;
    if position.x < lo || position.y < lo || position.x > hi || position.y > hi {
        return Err(InvariantViolation::OutOfBounds { entity, position });
    }
    // Small slack so touching a wall is not reported
    if circle_overlaps_any(position, radius - 1e-2, &world.obstacles) {
        return Err(InvariantViolation::InsideObstacle { entity, position });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AiState;
    use crate::combat::Side;
    use crate::damage::{player_ranged_damage, Attributes};
    use crate::geometry::Obstacle;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn open_world() -> World {
        World::new(1000.0, Vec::new(), Vec::new())
    }

    fn population(
        player_at: Vec2,
        enemies: Vec<Enemy>,
        bosses: Vec<Boss>,
        config: &SimConfig,
    ) -> Population {
        Population {
            player: Player::new(player_at, config),
            enemies,
            bosses,
        }
    }

    fn kills(events: &[SimEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SimEvent::Kill { .. }))
            .count()
    }

    #[test]
    fn test_projectile_hit_alerts_and_flags_enemy() {
        let mut config = SimConfig::default();
        config.enemy.weak.max_health = 100.0;
        // Patrols away from the player so it never notices the shot coming
        let enemy = Enemy::new_patroller(Vec2::new(300.0, 300.0), Vec2::new(600.0, 300.0), &config);
        let enemy_id = enemy.id();
        let pop = population(Vec2::new(100.0, 300.0), vec![enemy], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        let shoot = FrameIntent::new()
            .switching_weapon()
            .aiming_at(Vec2::new(300.0, 300.0))
            .attacking();
        sim.step(DT, &shoot);
        let mut frames = 0;
        while sim.enemies()[0].health().current() >= 100.0 {
            sim.step(DT, &FrameIntent::new());
            frames += 1;
            assert!(frames < 120, "projectile never landed");
        }

        let damage =
            player_ranged_damage(&Attributes::default(), 2.0, 1, sim.config().combat.pellet_factor);
        let enemy = &sim.enemies()[0];
        assert!((enemy.health().current() - (100.0 - damage)).abs() < 1e-3);
        assert_eq!(enemy.state(), AiState::Alert);
        assert_eq!(enemy.target(), Some(sim.player().position()));
        assert!(sim.signals().is_struck(enemy_id));
        assert!(sim.projectiles().is_empty());
    }

    #[test]
    fn test_forty_damage_leaves_sixty() {
        let mut config = SimConfig::default();
        config.enemy.weak.max_health = 100.0;
        let enemy = Enemy::new_patroller(Vec2::new(300.0, 300.0), Vec2::new(300.0, 600.0), &config);
        let pop = population(Vec2::new(100.0, 300.0), vec![enemy], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        let shooter = sim.player().id();
        sim.projectiles.push(Projectile::new(
            shooter,
            Side::Player,
            Vec2::new(290.0, 300.0),
            Vec2::X,
            60.0,
            40.0,
            &sim.config.combat,
        ));
        sim.step(DT, &FrameIntent::new());

        let enemy = &sim.enemies()[0];
        assert!((enemy.health().current() - 60.0).abs() < 1e-4);
        assert!(sim.signals().is_struck(enemy.id()));
        assert_eq!(enemy.state(), AiState::Alert);
        assert_eq!(enemy.target(), Some(Vec2::new(100.0, 300.0)));
    }

    #[test]
    fn test_struck_signal_propagates_next_frame() {
        let config = SimConfig::default();
        let struck =
            Enemy::new_patroller(Vec2::new(500.0, 500.0), Vec2::new(500.0, 800.0), &config);
        // Looks at the struck enemy; the player is far behind it
        let witness =
            Enemy::new_patroller(Vec2::new(300.0, 500.0), Vec2::new(400.0, 500.0), &config);
        let struck_id = struck.id();
        let pop = population(Vec2::new(900.0, 100.0), vec![struck, witness], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        sim.signals.mark_struck(struck_id, Vec2::new(500.0, 500.0));
        sim.step(DT, &FrameIntent::new());

        assert!(!sim.signals().is_struck(struck_id));
        assert_eq!(sim.enemies()[1].state(), AiState::Alert);
        assert_eq!(sim.enemies()[1].target(), Some(Vec2::new(500.0, 500.0)));
    }

    #[test]
    fn test_provoked_witness_keeps_closing_on_struck_position() {
        let config = SimConfig::default();
        let struck =
            Enemy::new_patroller(Vec2::new(500.0, 500.0), Vec2::new(500.0, 800.0), &config);
        let witness =
            Enemy::new_patroller(Vec2::new(300.0, 500.0), Vec2::new(400.0, 500.0), &config);
        let struck_id = struck.id();
        let struck_at = Vec2::new(500.0, 500.0);
        // Out of every cone and far from both enemies
        let pop = population(Vec2::new(900.0, 100.0), vec![struck, witness], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        sim.signals.mark_struck(struck_id, struck_at);
        sim.step(DT, &FrameIntent::new());
        assert_eq!(sim.enemies()[1].state(), AiState::Alert);

        let mut gap = sim.enemies()[1].position().distance(struck_at);
        for _ in 0..30 {
            sim.step(DT, &FrameIntent::new());
            let witness = &sim.enemies()[1];
            assert_eq!(witness.state(), AiState::Alert);
            assert_eq!(witness.target(), Some(struck_at));
            let now = witness.position().distance(struck_at);
            assert!(now < gap);
            gap = now;
        }
    }

    #[test]
    fn test_kill_credited_once_despite_multi_tick_melee() {
        let mut config = SimConfig::default();
        config.enemy.weak.max_health = 5.0;
        let enemy = Enemy::new_patroller(Vec2::new(140.0, 100.0), Vec2::new(140.0, 400.0), &config);
        let pop = population(Vec2::new(100.0, 100.0), vec![enemy], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        let swing = FrameIntent::new().aiming_at(Vec2::new(140.0, 100.0)).attacking();
        sim.step(DT, &swing);
        assert!(!sim.enemies()[0].is_alive());
        assert!(sim
            .effects()
            .iter()
            .any(|e| matches!(e.spawn.kind, EffectKind::DeathFade { .. })));

        let mut events = sim.drain_events();
        for _ in 0..90 {
            sim.step(DT, &swing);
            events.extend(sim.drain_events());
        }

        assert_eq!(kills(&events), 1);
        assert_eq!(sim.player().kills(), 1);
        assert_eq!(sim.outcome(), RunOutcome::Victory);
    }

    #[test]
    fn test_boss_kill_credit_multiplier() {
        let mut config = SimConfig::default();
        config.boss.max_health = 5.0;
        let boss = Boss::new(Vec2::new(150.0, 100.0), &config);
        let pop = population(Vec2::new(100.0, 100.0), Vec::new(), vec![boss], &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        let swing = FrameIntent::new().aiming_at(Vec2::new(150.0, 100.0)).attacking();
        let mut events = Vec::new();
        for _ in 0..10 {
            sim.step(DT, &swing);
            events.extend(sim.drain_events());
        }

        assert_eq!(kills(&events), 1);
        assert_eq!(sim.player().kills(), 3);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Kill {
                archetype: crate::agent::Archetype::Boss,
                credit: 3,
                ..
            }
        )));
    }

    #[test]
    fn test_contact_damage_goes_through_mitigation() {
        let config = SimConfig::default();
        let enemy = Enemy::new_patroller(Vec2::new(120.0, 100.0), Vec2::new(400.0, 100.0), &config);
        let pop = population(Vec2::new(100.0, 100.0), vec![enemy], Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);

        sim.step(DT, &FrameIntent::new());
        let events = sim.drain_events();
        let taken = events.iter().find_map(|e| match e {
            SimEvent::PlayerDamaged { amount, .. } => Some(*amount),
            _ => None,
        });
        // 10 raw - leather 2*0.75 - dex 5*0.12
        let expected = 10.0 - 1.5 - 0.6;
        assert!(taken.is_some_and(|amount| (amount - expected).abs() < 1e-4));
    }

    #[test]
    fn test_player_death_is_defeat() {
        let config = SimConfig::default();
        let pop = population(Vec2::new(100.0, 100.0), Vec::new(), Vec::new(), &config);
        let mut sim = Simulation::with_population(open_world(), config, pop, 1);
        sim.player.take_hit(10_000.0, EntityId::new(), &sim.bus);
        assert_eq!(sim.outcome(), RunOutcome::Defeat);
        assert!(sim.drain_events().contains(&SimEvent::PlayerDied));
    }

    #[test]
    fn test_restart_resets_run() {
        let world = World::new(
            1200.0,
            Vec::new(),
            vec![Vec2::new(100.0, 100.0), Vec2::new(600.0, 600.0), Vec2::new(1000.0, 1000.0)],
        );
        let mut sim = Simulation::new(world, SimConfig::default(), 4);
        for _ in 0..30 {
            sim.step(DT, &FrameIntent::new().moving(Vec2::ONE).attacking());
        }
        sim.restart(4);
        assert_eq!(sim.frame(), 0);
        assert!(sim.projectiles().is_empty());
        assert_eq!(sim.player().position(), Vec2::new(100.0, 100.0));
        assert_eq!(sim.enemies().len(), 6);
        assert_eq!(sim.bosses().len(), 1);
    }

    #[test]
    fn test_invariant_violation_reported() {
        let config = SimConfig::default();
        let world = World::new(1000.0, vec![Obstacle::new(90.0, 90.0, 20.0, 20.0)], Vec::new());
        let pop = population(Vec2::new(100.0, 100.0), Vec::new(), Vec::new(), &config);
        let sim = Simulation::with_population(world, config, pop, 1);
        assert!(matches!(
            sim.check_invariants(),
            Err(InvariantViolation::InsideObstacle { .. })
        ));
    }

    fn busy_world() -> World {
        World::new(
            1400.0,
            vec![
                Obstacle::new(500.0, 300.0, 60.0, 400.0),
                Obstacle::new(800.0, 900.0, 300.0, 40.0),
                Obstacle::new(200.0, 1000.0, 120.0, 120.0),
            ],
            vec![
                Vec2::new(150.0, 150.0),
                Vec2::new(400.0, 500.0),
                Vec2::new(900.0, 500.0),
                Vec2::new(700.0, 1200.0),
            ],
        )
    }

    fn intent_strategy() -> impl Strategy<Value = FrameIntent> {
        (
            (-1.0f32..1.0, -1.0f32..1.0),
            (0.0f32..1400.0, 0.0f32..1400.0),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|((mx, my), (ax, ay), attack, dodge, switch, potion)| FrameIntent {
                movement: Vec2::new(mx, my),
                aim: Some(Vec2::new(ax, ay)),
                attack,
                dodge,
                switch_weapon: switch,
                use_potion: potion,
                use_haste: false,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_invariants_hold_every_frame(
            seed in any::<u64>(),
            intents in proptest::collection::vec(intent_strategy(), 60..180),
        ) {
            let mut sim = Simulation::new(busy_world(), SimConfig::default(), seed);
            prop_assert_eq!(sim.check_invariants(), Ok(()));
            for intent in &intents {
                sim.step(DT, intent);
                prop_assert_eq!(sim.check_invariants(), Ok(()));
            }
        }
    }
}
