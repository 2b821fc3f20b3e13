//! Simulation tuning.
//!
//! Every gameplay constant lives here so the engine can load overrides from
//! its TOML file. All tables use `#[serde(default)]`, so a partial file only
//! replaces the fields it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a [`SimConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Dotted path of the offending field
        field: &'static str,
        /// Value found
        value: f32,
    },
    /// A value fell outside its allowed range.
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Dotted path of the offending field
        field: &'static str,
        /// Value found
        value: f32,
        /// Inclusive minimum
        min: f32,
        /// Inclusive maximum
        max: f32,
    },
}

/// Perception and awareness tuning shared by every AI agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionTuning {
    /// Obstacle inflation used by line-of-sight tests
    pub los_padding: f32,
    /// Alert is kept while the target is within `view_distance * factor`
    pub alert_leash_factor: f32,
    /// Sweep phase units per second (one full cycle is 4 units)
    pub sweep_rate: f32,
    /// Angular offset (radians) at sweep phase +-1
    pub sweep_amplitude: f32,
}

impl Default for PerceptionTuning {
    fn default() -> Self {
        Self {
            los_padding: 2.0,
            alert_leash_factor: 1.8,
            sweep_rate: 0.6,
            sweep_amplitude: 0.45,
        }
    }
}

/// Player movement, abilities and progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Collider radius
    pub radius: f32,
    /// Starting maximum health
    pub max_health: f32,
    /// Movement speed in units per second
    pub move_speed: f32,
    /// Dash displacement length
    pub dash_distance: f32,
    /// Seconds between dashes
    pub dash_cooldown: f32,
    /// Seconds between melee swings
    pub melee_cooldown: f32,
    /// Seconds between ranged shots
    pub ranged_cooldown: f32,
    /// Health restored by one potion
    pub potion_heal: f32,
    /// Speed multiplier while hasted
    pub haste_multiplier: f32,
    /// Seconds a haste draught lasts
    pub haste_duration: f32,
    /// Potions carried at run start
    pub starting_potions: u32,
    /// Haste draughts carried at run start
    pub starting_haste: u32,
    /// Experience per kill credit
    pub xp_per_kill: u32,
    /// Experience needed for the first level-up
    pub xp_base: u32,
    /// Extra experience needed per level
    pub xp_growth: u32,
    /// Stat points granted on level-up
    pub stat_points_per_level: u32,
    /// Max health granted on level-up
    pub health_per_level: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: 14.0,
            max_health: 100.0,
            move_speed: 220.0,
            dash_distance: 150.0,
            dash_cooldown: 0.9,
            melee_cooldown: 0.35,
            ranged_cooldown: 0.22,
            potion_heal: 40.0,
            haste_multiplier: 1.5,
            haste_duration: 4.0,
            starting_potions: 3,
            starting_haste: 1,
            xp_per_kill: 10,
            xp_base: 40,
            xp_growth: 25,
            stat_points_per_level: 2,
            health_per_level: 10.0,
        }
    }
}

/// Stats for one enemy archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeTuning {
    /// Maximum health
    pub max_health: f32,
    /// Collider radius
    pub radius: f32,
    /// Maximum perception distance
    pub view_distance: f32,
    /// Half-angle of the view cone (radians)
    pub fov_half_angle: f32,
    /// Speed while patrolling
    pub patrol_speed: f32,
    /// Speed while alert
    pub chase_speed: f32,
    /// Contact attack damage
    pub melee_damage: f32,
    /// Seconds between contact attacks
    pub melee_cooldown: f32,
    /// Speed of fired projectiles
    pub projectile_speed: f32,
    /// Damage per projectile
    pub projectile_damage: f32,
}

impl ArchetypeTuning {
    /// Default stats for the weak patrolling archetype.
    #[must_use]
    pub fn weak() -> Self {
        Self {
            max_health: 60.0,
            radius: 14.0,
            view_distance: 260.0,
            fov_half_angle: 0.6,
            patrol_speed: 70.0,
            chase_speed: 110.0,
            melee_damage: 10.0,
            melee_cooldown: 0.9,
            projectile_speed: 0.0,
            projectile_damage: 0.0,
        }
    }

    /// Default stats for the strong burst-firing archetype.
    #[must_use]
    pub fn strong() -> Self {
        Self {
            max_health: 120.0,
            radius: 16.0,
            view_distance: 360.0,
            fov_half_angle: 0.7,
            patrol_speed: 80.0,
            chase_speed: 125.0,
            melee_damage: 16.0,
            melee_cooldown: 1.0,
            projectile_speed: 420.0,
            projectile_damage: 8.0,
        }
    }
}

impl Default for ArchetypeTuning {
    fn default() -> Self {
        Self::weak()
    }
}

/// Enemy population and state-machine timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Weak archetype stats
    pub weak: ArchetypeTuning,
    /// Strong archetype stats
    pub strong: ArchetypeTuning,
    /// Distance at which a patrol endpoint counts as reached
    pub endpoint_radius: f32,
    /// Seconds spent looking around at a patrol endpoint
    pub turn_duration: f32,
    /// Seconds a dead enemy keeps fading out
    pub death_fade: f32,
    /// Contact attack reach
    pub strike_radius: f32,
    /// Half distance between the two patrol endpoints
    pub patrol_half_span: f32,
    /// Shots in one burst
    pub burst_shots: u32,
    /// Seconds between bursts
    pub burst_trigger_cooldown: f32,
    /// Seconds between shots inside a burst
    pub burst_interval: f32,
    /// Enemies placed around each zone center
    pub enemies_per_zone: u32,
    /// Every n-th spawned enemy is strong
    pub strong_every: u32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            weak: ArchetypeTuning::weak(),
            strong: ArchetypeTuning::strong(),
            endpoint_radius: 8.0,
            turn_duration: 1.2,
            death_fade: 0.6,
            strike_radius: 34.0,
            patrol_half_span: 120.0,
            burst_shots: 3,
            burst_trigger_cooldown: 2.4,
            burst_interval: 0.14,
            enemies_per_zone: 3,
            strong_every: 3,
        }
    }
}

/// Boss stats and ability timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Maximum health
    pub max_health: f32,
    /// Collider radius
    pub radius: f32,
    /// Maximum perception distance
    pub view_distance: f32,
    /// Half-angle of the view cone (radians)
    pub fov_half_angle: f32,
    /// Approach speed while alert
    pub speed: f32,
    /// The boss stops approaching inside this distance
    pub engage_distance: f32,
    /// Seconds between volleys
    pub volley_cooldown: f32,
    /// Projectiles per volley
    pub volley_count: u32,
    /// Max random angular offset per volley projectile (radians)
    pub volley_spread: f32,
    /// Volley projectile speed
    pub projectile_speed: f32,
    /// Volley projectile damage
    pub projectile_damage: f32,
    /// Seconds between rams
    pub ram_cooldown: f32,
    /// Ram displacement length
    pub ram_distance: f32,
    /// Ram hits when the target ends up within this distance
    pub ram_hit_radius: f32,
    /// Ram contact damage
    pub ram_damage: f32,
    /// Afterimage markers left along a ram
    pub afterimage_count: u32,
    /// Seconds between slams
    pub slam_cooldown: f32,
    /// Slam reach
    pub slam_radius: f32,
    /// Slam damage
    pub slam_damage: f32,
    /// Seconds the slam warning stays visible
    pub slam_warning: f32,
    /// Kill credit multiplier relative to a regular enemy
    pub kill_credit: u32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            max_health: 900.0,
            radius: 28.0,
            view_distance: 520.0,
            fov_half_angle: 1.1,
            speed: 120.0,
            engage_distance: 90.0,
            volley_cooldown: 2.6,
            volley_count: 7,
            volley_spread: 0.14,
            projectile_speed: 360.0,
            projectile_damage: 12.0,
            ram_cooldown: 5.5,
            ram_distance: 240.0,
            ram_hit_radius: 64.0,
            ram_damage: 28.0,
            afterimage_count: 5,
            slam_cooldown: 7.0,
            slam_radius: 150.0,
            slam_damage: 24.0,
            slam_warning: 0.6,
            kill_credit: 3,
        }
    }
}

/// Projectile, melee volume and effect tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    /// Seconds a projectile lives
    pub projectile_lifetime: f32,
    /// Projectile hit radius
    pub projectile_radius: f32,
    /// Extra reach added to arc swings
    pub arc_pad: f32,
    /// Seconds a melee volume stays active
    pub melee_volume_lifetime: f32,
    /// Per-pellet damage factor for multi-shot patterns
    pub pellet_factor: f32,
    /// Seconds an explosion effect lasts
    pub explosion_duration: f32,
    /// Radius of the explosion effect
    pub explosion_radius: f32,
    /// Seconds an afterimage lasts
    pub afterimage_duration: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            projectile_lifetime: 1.6,
            projectile_radius: 4.0,
            arc_pad: 6.0,
            melee_volume_lifetime: 0.05,
            pellet_factor: 0.45,
            explosion_duration: 0.25,
            explosion_radius: 18.0,
            afterimage_duration: 0.35,
        }
    }
}

/// Complete simulation tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Perception tuning
    pub perception: PerceptionTuning,
    /// Player tuning
    pub player: PlayerTuning,
    /// Enemy tuning
    pub enemy: EnemyTuning,
    /// Boss tuning
    pub boss: BossTuning,
    /// Combat tuning
    pub combat: CombatTuning,
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl ArchetypeTuning {
    fn validate(&self, prefix: [&'static str; 5]) -> Result<(), ConfigError> {
        positive(prefix[0], self.max_health)?;
        positive(prefix[1], self.radius)?;
        positive(prefix[2], self.view_distance)?;
        in_range(prefix[3], self.fov_half_angle, 0.0, std::f32::consts::PI)?;
        positive(prefix[4], self.chase_speed)
    }
}

impl SimConfig {
    /// Checks that every value can drive the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.perception;
        in_range("perception.los_padding", p.los_padding, 0.0, 64.0)?;
        in_range("perception.alert_leash_factor", p.alert_leash_factor, 1.0, 10.0)?;

        let pl = &self.player;
        positive("player.radius", pl.radius)?;
        positive("player.max_health", pl.max_health)?;
        positive("player.move_speed", pl.move_speed)?;
        positive("player.haste_multiplier", pl.haste_multiplier)?;
        positive("player.xp_base", pl.xp_base as f32)?;

        let e = &self.enemy;
        e.weak.validate([
            "enemy.weak.max_health",
            "enemy.weak.radius",
            "enemy.weak.view_distance",
            "enemy.weak.fov_half_angle",
            "enemy.weak.chase_speed",
        ])?;
        e.strong.validate([
            "enemy.strong.max_health",
            "enemy.strong.radius",
            "enemy.strong.view_distance",
            "enemy.strong.fov_half_angle",
            "enemy.strong.chase_speed",
        ])?;
        positive("enemy.turn_duration", e.turn_duration)?;
        positive("enemy.burst_interval", e.burst_interval)?;

        let b = &self.boss;
        positive("boss.max_health", b.max_health)?;
        positive("boss.radius", b.radius)?;
        positive("boss.view_distance", b.view_distance)?;
        in_range("boss.fov_half_angle", b.fov_half_angle, 0.0, std::f32::consts::PI)?;

        let c = &self.combat;
        positive("combat.projectile_lifetime", c.projectile_lifetime)?;
        positive("combat.melee_volume_lifetime", c.melee_volume_lifetime)?;
        in_range("combat.pellet_factor", c.pellet_factor, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_strong_sees_farther_than_weak() {
        let config = EnemyTuning::default();
        assert!(config.strong.view_distance > config.weak.view_distance);
        assert!(BossTuning::default().view_distance > config.strong.view_distance);
    }

    #[test]
    fn test_validate_rejects_negative_speed() {
        let mut config = SimConfig::default();
        config.player.move_speed = -5.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "player.move_speed",
                value: -5.0,
            })
        );
    }

    #[test]
    fn test_validate_rejects_wide_fov() {
        let mut config = SimConfig::default();
        config.enemy.strong.fov_half_angle = 4.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "enemy.strong.fov_half_angle",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "boss": { "volley_count": 3 } }"#).expect("parse config");
        assert_eq!(config.boss.volley_count, 3);
        assert_eq!(config.boss.ram_distance, BossTuning::default().ram_distance);
        assert_eq!(config.player, PlayerTuning::default());
    }
}
