//! Headless run driver.
//!
//! Builds the default arena, feeds the simulation an autopilot intent every
//! frame, logs the event stream and reports how the run ended.

use glam::Vec2;
use skirmish_common::{SkirmishError, SkirmishResult};
use skirmish_core::{
    ActiveWeapon, Combatant, FrameIntent, Obstacle, RunOutcome, SimEvent, Simulation, SwingStyle,
    World,
};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::timing::FrameTiming;

/// Beyond this distance the autopilot prefers its ranged weapon.
const RANGED_SWITCH_DISTANCE: f32 = 180.0;
/// The autopilot only pulls the trigger inside this distance.
const ENGAGE_DISTANCE: f32 = 420.0;
/// Health fraction below which the autopilot tries to recover.
const LOW_HEALTH_FRACTION: f32 = 0.35;

/// How a run went.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Seed the run was spawned with
    pub seed: u64,
    /// Frames stepped
    pub frames: u64,
    /// Simulated seconds
    pub simulated_seconds: f32,
    /// Final outcome
    pub outcome: RunOutcome,
    /// Hostiles the player was credited with
    pub kills: u32,
    /// Player level at the end
    pub level: u32,
    /// Player health at the end
    pub player_health: f32,
    /// Enemies and bosses still alive
    pub hostiles_alive: usize,
    /// Events drained from the bus
    pub events: usize,
    /// Average compute time per step, in milliseconds
    pub average_step_ms: f32,
}

// ============================================================================
// Arena
// ============================================================================

/// Default arena: a few walls and pillars splitting a square into five zones.
///
/// Obstacles are laid out as fractions of `size`; the border itself is the
/// world bound, so no wall hugs the edge.
#[must_use]
pub fn default_arena(size: f32) -> World {
    let at = |fx: f32, fy: f32, fw: f32, fh: f32| {
        Obstacle::new(fx * size, fy * size, fw * size, fh * size)
    };

    let obstacles = vec![
        // Central cross, open in the middle
        at(0.30, 0.48, 0.15, 0.04),
        at(0.55, 0.48, 0.15, 0.04),
        at(0.48, 0.25, 0.04, 0.15),
        at(0.48, 0.60, 0.04, 0.15),
        // Pillars
        at(0.15, 0.15, 0.05, 0.05),
        at(0.80, 0.15, 0.05, 0.05),
        at(0.15, 0.80, 0.05, 0.05),
        at(0.80, 0.80, 0.05, 0.05),
    ];

    let zone_centers = [(0.1, 0.5), (0.5, 0.1), (0.5, 0.5), (0.5, 0.9), (0.9, 0.5)]
        .into_iter()
        .map(|(fx, fy)| Vec2::new(fx * size, fy * size))
        .collect();

    World::new(size, obstacles, zone_centers)
}

// ============================================================================
// Autopilot
// ============================================================================

/// Scripted stand-in for a human player.
///
/// Chases the nearest living hostile, aims at it, fights with the melee
/// weapon up close and the ranged weapon from afar, and drinks a potion or
/// dashes away when health runs low.
#[must_use]
pub fn autopilot(sim: &Simulation) -> FrameIntent {
    let player = sim.player();
    if !player.is_alive() {
        return FrameIntent::new();
    }

    let position = player.position();
    let nearest = sim
        .enemies()
        .iter()
        .filter(|e| e.is_alive())
        .map(Combatant::position)
        .chain(sim.bosses().iter().filter(|b| b.is_alive()).map(Combatant::position))
        .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)));

    let Some(target) = nearest else {
        return FrameIntent::new();
    };

    let offset = target - position;
    let distance = offset.length();
    let toward = offset.normalize_or_zero();
    let mut intent = FrameIntent::new().aiming_at(target);

    if player.health().fraction() < LOW_HEALTH_FRACTION {
        if player.potions() > 0 {
            intent = intent.drinking_potion();
        }
        intent = intent.moving(-toward);
        if player.dash_cooldown() <= 0.0 {
            intent = intent.dodging();
        }
        return intent;
    }

    let wanted = if distance > RANGED_SWITCH_DISTANCE {
        ActiveWeapon::Ranged
    } else {
        ActiveWeapon::Melee
    };
    if player.active_weapon() != wanted {
        intent = intent.switching_weapon();
    }

    let stand_off = match player.loadout().melee.style {
        SwingStyle::Arc { reach, .. } => reach,
        SwingStyle::Line { length, .. } => length,
    } * 0.6;
    if distance > stand_off {
        intent = intent.moving(toward);
    }
    if distance < ENGAGE_DISTANCE {
        intent = intent.attacking();
    }
    intent
}

// ============================================================================
// Run loop
// ============================================================================

/// Runs one session to completion or until the frame budget runs out.
pub fn run(config: &EngineConfig) -> SkirmishResult<RunSummary> {
    config.check()?;

    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    let world = default_arena(config.arena_size);
    let mut sim = Simulation::new(world, config.sim.clone(), seed);
    let mut timing = FrameTiming::new(config.fixed_dt).with_fixed_step(config.fixed_step);

    info!(
        seed,
        enemies = sim.enemies().len(),
        bosses = sim.bosses().len(),
        fixed_step = timing.is_fixed_step(),
        fixed_dt = timing.fixed_dt(),
        "run started"
    );

    let mut events = 0;
    let mut kills = 0;
    'run: while sim.frame() < config.max_frames {
        for dt in timing.steps(config.frame_dt) {
            let intent = autopilot(&sim);

            let started = Instant::now();
            sim.step(dt, &intent);
            timing.record_step(started.elapsed());

            if config.check_invariants {
                sim.check_invariants()
                    .map_err(|violation| SkirmishError::Invariant(violation.to_string()))?;
            }

            for event in sim.drain_events() {
                events += 1;
                if matches!(event, SimEvent::Kill { .. }) {
                    kills += 1;
                }
                log_event(sim.frame(), &event);
            }

            if sim.outcome() != RunOutcome::InProgress || sim.frame() >= config.max_frames {
                break 'run;
            }
        }
    }

    let player = sim.player();
    let summary = RunSummary {
        seed,
        frames: sim.frame(),
        simulated_seconds: sim.elapsed(),
        outcome: sim.outcome(),
        kills,
        level: player.level(),
        player_health: player.health().current(),
        hostiles_alive: sim.enemies().iter().filter(|e| e.is_alive()).count()
            + sim.bosses().iter().filter(|b| b.is_alive()).count(),
        events,
        average_step_ms: timing.average_step_time_ms(),
    };

    info!(
        outcome = ?summary.outcome,
        frames = summary.frames,
        kills = summary.kills,
        level = summary.level,
        hostiles_alive = summary.hostiles_alive,
        "run finished"
    );
    Ok(summary)
}

fn log_event(frame: u64, event: &SimEvent) {
    match event {
        SimEvent::Kill {
            entity,
            archetype,
            credit,
            ..
        } => info!(frame, ?entity, ?archetype, credit, "kill"),
        SimEvent::LevelUp { level, stat_points } => info!(frame, level, stat_points, "level up"),
        SimEvent::PlayerDied => info!(frame, "player died"),
        SimEvent::PlayerDamaged {
            amount,
            source,
            remaining,
        } => debug!(frame, amount, ?source, remaining, "player damaged"),
        SimEvent::EquipmentChanged { slot, name } => {
            debug!(frame, ?slot, name = %name, "equipment changed");
        }
        SimEvent::HostileDamaged {
            entity,
            amount,
            remaining,
        } => trace!(frame, ?entity, amount, remaining, "hostile damaged"),
    }
}
