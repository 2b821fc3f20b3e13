//! Events and one-frame signals.
//!
//! [`SimEvent`]s leave the core through the [`EventBus`] for leveling and UI
//! collaborators. Signals ([`StruckSignal`], [`PlayerHit`]) stay inside the
//! core: one phase produces them and a later phase consumes them.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use tracing::warn;

use crate::agent::Archetype;
use crate::combat::{MeleeVolume, Projectile};
use crate::effects::EffectSpawn;
use crate::player::EquipmentSlot;

/// Discrete outcome of a frame, published for collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A hostile died and was credited to the player
    Kill {
        /// Entity that died
        entity: EntityId,
        /// Archetype of the entity
        archetype: Archetype,
        /// Kill credit (bosses award more)
        credit: u32,
        /// Where it died
        position: Vec2,
    },
    /// The player took damage
    PlayerDamaged {
        /// Damage after mitigation
        amount: f32,
        /// Entity that dealt it
        source: EntityId,
        /// Player health afterwards
        remaining: f32,
    },
    /// An enemy or boss took damage from the player
    HostileDamaged {
        /// Entity hit
        entity: EntityId,
        /// Damage applied
        amount: f32,
        /// Health afterwards
        remaining: f32,
    },
    /// The player's health reached zero
    PlayerDied,
    /// The player gained a level
    LevelUp {
        /// New level
        level: u32,
        /// Unspent stat points after the level-up
        stat_points: u32,
    },
    /// A loadout slot changed
    EquipmentChanged {
        /// Slot that changed
        slot: EquipmentSlot,
        /// Name of the new item
        name: String,
    },
}

/// Event bus for broadcasting events to collaborators.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<SimEvent>,
    receiver: Receiver<SimEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Never blocks; a full bus drops the event.
    pub fn publish(&self, event: SimEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                warn!(?event, capacity = self.capacity, "event bus full, dropping event");
            },
            Err(TrySendError::Disconnected(_)) => {},
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<SimEvent> {
        self.sender.clone()
    }
}

/// An enemy was just hit by the player. Produced by combat resolution and
/// consumed by the next aggro propagation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StruckSignal {
    /// Enemy that was hit
    pub enemy: EntityId,
    /// Its position at the time of the hit
    pub position: Vec2,
}

/// Damage addressed to the player, applied through the player's intake
/// formula by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHit {
    /// Attacker
    pub source: EntityId,
    /// Raw damage before mitigation
    pub amount: f32,
}

/// One-frame signals carried between phases.
#[derive(Debug, Default)]
pub struct FrameSignals {
    struck: Vec<StruckSignal>,
}

impl FrameSignals {
    /// Creates an empty signal set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `enemy` was hit at `position`. Repeated hits on the same
    /// enemy keep only the latest position.
    pub fn mark_struck(&mut self, enemy: EntityId, position: Vec2) {
        if let Some(existing) = self.struck.iter_mut().find(|s| s.enemy == enemy) {
            existing.position = position;
        } else {
            self.struck.push(StruckSignal { enemy, position });
        }
    }

    /// Whether `enemy` has a pending struck signal.
    #[must_use]
    pub fn is_struck(&self, enemy: EntityId) -> bool {
        self.struck.iter().any(|s| s.enemy == enemy)
    }

    /// Pending struck signals.
    #[must_use]
    pub fn struck(&self) -> &[StruckSignal] {
        &self.struck
    }

    /// Consumes all pending struck signals.
    pub fn take_struck(&mut self) -> Vec<StruckSignal> {
        std::mem::take(&mut self.struck)
    }
}

/// Everything a phase wants to add to the world, applied by the simulation
/// once the phase is done.
#[derive(Debug, Default)]
pub struct PhaseOutput {
    /// New projectiles
    pub projectiles: Vec<Projectile>,
    /// New melee volumes
    pub melee: Vec<MeleeVolume>,
    /// Visual effect requests
    pub effects: Vec<EffectSpawn>,
    /// Damage addressed to the player
    pub player_hits: Vec<PlayerHit>,
}

impl PhaseOutput {
    /// Creates an empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues damage for the player.
    pub fn hit_player(&mut self, source: EntityId, amount: f32) {
        self.player_hits.push(PlayerHit { source, amount });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_drain() {
        let bus = EventBus::new(8);
        bus.publish(SimEvent::PlayerDied);
        bus.publish(SimEvent::LevelUp {
            level: 2,
            stat_points: 2,
        });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SimEvent::PlayerDied);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_event_bus_drops_when_full() {
        let bus = EventBus::new(1);
        bus.publish(SimEvent::PlayerDied);
        bus.publish(SimEvent::PlayerDied);
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_sender_handle_feeds_same_bus() {
        let bus = EventBus::default();
        let sender = bus.sender();
        sender
            .send(SimEvent::PlayerDied)
            .expect("bus receiver alive");
        assert_eq!(bus.drain(), vec![SimEvent::PlayerDied]);
    }

    #[test]
    fn test_struck_signals_deduplicate() {
        let mut signals = FrameSignals::new();
        let id = EntityId::new();
        signals.mark_struck(id, Vec2::ZERO);
        signals.mark_struck(id, Vec2::ONE);
        assert_eq!(signals.struck().len(), 1);
        assert_eq!(signals.struck()[0].position, Vec2::ONE);

        let taken = signals.take_struck();
        assert_eq!(taken.len(), 1);
        assert!(!signals.is_struck(id));
    }

    #[test]
    fn test_event_serializes() {
        let event = SimEvent::Kill {
            entity: EntityId::from_raw(7),
            archetype: Archetype::Boss,
            credit: 3,
            position: Vec2::new(1.0, 2.0),
        };
        let json = serde_json::to_string(&event).expect("serialize event");
        let back: SimEvent = serde_json::from_str(&json).expect("deserialize event");
        assert_eq!(back, event);
    }
}
