//! Aggro propagation.
//!
//! Enemies that see an ally get hit join the fight: for every struck enemy,
//! each other alive enemy whose view cone and line of sight reach the
//! struck enemy's position is forced into Alert with that position as its
//! target.

use tracing::debug;

use crate::agent::{Combatant, Hostile};
use crate::enemy::Enemy;
use crate::events::FrameSignals;
use crate::geometry::Obstacle;

/// Consumes every pending struck signal and alerts the peers that saw it.
///
/// Returns the number of enemies forced into Alert.
pub fn propagate(
    enemies: &mut [Enemy],
    signals: &mut FrameSignals,
    obstacles: &[Obstacle],
) -> usize {
    let mut alerted = 0;

    for signal in signals.take_struck() {
        for enemy in enemies.iter_mut() {
            if enemy.id() == signal.enemy || !enemy.is_alive() {
                continue;
            }
            if enemy.can_see(signal.position, obstacles) {
                enemy.force_aggro(signal.position);
                alerted += 1;
            }
        }
    }

    if alerted > 0 {
        debug!(alerted, "aggro propagated");
    }
    alerted
}
