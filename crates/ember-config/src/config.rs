//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Session/network settings.
    pub network: NetworkConfig,
    /// Save store settings.
    pub persistence: PersistenceConfig,
    /// Combat pipeline tuning.
    pub combat: CombatConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Network/session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server address for multiplayer.
    pub server_address: String,
    /// Server port.
    pub server_port: u16,
    /// Maximum number of players. Entity indices are a single byte.
    pub max_players: u32,
    /// Simulation tick rate (Hz).
    pub tick_rate: u32,
    /// Capacity of the channel that carries decoded messages from the I/O
    /// tasks into the tick loop.
    pub inbound_capacity: usize,
}

/// Save store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding one save file per player.
    pub save_dir: PathBuf,
    /// Number of pending saves the background writer may buffer.
    pub queue_capacity: usize,
    /// Ticks between automatic checkpoints (0 disables autosave).
    pub autosave_interval_ticks: u64,
}

/// Combat pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatConfig {
    /// Expert difficulty; scales defense-based overrides by 1.5.
    pub expert_mode: bool,
    /// Invulnerability granted by a revive.
    pub revive_immunity_ticks: i32,
    /// Invulnerability granted by a revive with long-invincibility gear.
    pub long_revive_immunity_ticks: i32,
    /// Length of the revive visual timer.
    pub revive_visual_ticks: i32,
    /// Upper bound on any adversary attack-selection weight.
    pub max_attack_weight: i32,
    /// Ticks before an element-shield orb decays.
    pub shield_decay_ticks: i32,
    /// Maximum number of element-shield orbs.
    pub max_shield_orbs: i32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 7777,
            max_players: 255,
            tick_rate: 60,
            inbound_capacity: 1024,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("./saves/"),
            queue_capacity: 64,
            autosave_interval_ticks: 60 * 60 * 5,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            expert_mode: false,
            revive_immunity_ticks: 120,
            long_revive_immunity_ticks: 180,
            revive_visual_ticks: 60,
            max_attack_weight: 10_000,
            shield_decay_ticks: 600,
            max_shield_orbs: 6,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for Ember (`$XDG_CONFIG_HOME/ember` on Linux).
/// Falls back to the working directory when the platform reports none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("ember"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

impl Config {
    /// Reads `config.ron` from `config_dir`, writing the defaults there first
    /// when the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        let config = Self::read(&path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes this config as pretty RON, creating `config_dir` if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;
        std::fs::write(config_dir.join(CONFIG_FILE_NAME), text).map_err(ConfigError::WriteError)
    }

    /// Re-reads the file. `Some` only when its contents differ from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read(&config_dir.join(CONFIG_FILE_NAME))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config changed on disk");
        Ok(Some(fresh))
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = ron::from_str(&text).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_players == 0 || self.network.max_players > 255 {
            return Err(ConfigError::Invalid {
                field: "network.max_players",
                reason: format!("{} is outside 1..=255", self.network.max_players),
            });
        }
        if self.network.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "network.tick_rate",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.persistence.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "persistence.queue_capacity",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
