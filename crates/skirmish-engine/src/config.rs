//! Engine configuration.
//!
//! Run settings for the headless driver plus the full simulation tuning
//! under a `[sim]` table. Configuration can be loaded from and saved to a
//! TOML file.

use serde::{Deserialize, Serialize};
use skirmish_common::{SkirmishError, SkirmishResult};
use skirmish_core::SimConfig;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "skirmish.toml";

/// Environment variable overriding the configuration path.
const CONFIG_ENV: &str = "SKIRMISH_CONFIG";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run Settings ===
    /// Run seed (None = random)
    pub seed: Option<u64>,
    /// Maximum number of simulation frames before the run is cut off
    pub max_frames: u64,
    /// Time fed to the frame clock per outer tick, in seconds
    pub frame_dt: f32,
    /// Step the simulation with a fixed timestep accumulator
    pub fixed_step: bool,
    /// Fixed timestep (when `fixed_step` is on)
    pub fixed_dt: f32,
    /// Check simulation invariants after every frame
    pub check_invariants: bool,

    // === Arena Settings ===
    /// Side length of the square arena
    pub arena_size: f32,

    // === Simulation ===
    /// Simulation tuning
    pub sim: SimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Run
            seed: None,
            max_frames: 60 * 120, // two minutes at 60 fps
            frame_dt: 1.0 / 60.0,
            fixed_step: true,
            fixed_dt: 1.0 / 60.0,
            check_invariants: cfg!(debug_assertions),

            // Arena
            arena_size: 2400.0,

            // Simulation
            sim: SimConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Configuration path: `$SKIRMISH_CONFIG`, else `skirmish.toml` in the
    /// working directory.
    fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from)
    }

    /// Clamp run settings to sensible ranges.
    pub fn validate(&mut self) {
        self.max_frames = self.max_frames.clamp(1, 60 * 60 * 60);
        self.frame_dt = self.frame_dt.clamp(1.0 / 1000.0, 0.25);
        self.fixed_dt = self.fixed_dt.clamp(1.0 / 1000.0, 0.1);
        self.arena_size = self.arena_size.clamp(400.0, 20_000.0);
    }

    /// Checks the simulation tuning, which is rejected rather than clamped.
    pub fn check(&self) -> SkirmishResult<()> {
        self.sim
            .validate()
            .map_err(|e| SkirmishError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.seed, None);
        assert!(config.fixed_step);
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < 1e-6);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.max_frames = 0;
        config.frame_dt = 5.0;
        config.arena_size = 10.0;

        config.validate();

        assert_eq!(config.max_frames, 1);
        assert_eq!(config.frame_dt, 0.25);
        assert_eq!(config.arena_size, 400.0);
    }

    #[test]
    fn test_config_check_rejects_bad_tuning() {
        let mut config = EngineConfig::default();
        config.sim.player.move_speed = -1.0;
        let err = config.check().expect_err("negative speed accepted");
        assert!(matches!(err, SkirmishError::Config(_)));
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("skirmish.toml");

        let mut config = EngineConfig::default();
        config.seed = Some(12345);
        config.fixed_step = false;
        config.sim.boss.kill_credit = 5;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/skirmish.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("skirmish.toml");
        fs::write(&config_path, "seed = [not toml").expect("write config");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("skirmish.toml");
        fs::write(&config_path, "seed = 9\n\n[sim.player]\nmove_speed = 300.0\n")
            .expect("write config");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.sim.player.move_speed, 300.0);
        assert_eq!(config.sim.boss, SimConfig::default().boss);
        assert_eq!(config.arena_size, EngineConfig::default().arena_size);
    }
}
