//! Configuration system for Ember.
//!
//! Runtime settings for the sync session, save store, and combat tuning,
//! persisted to disk as RON. Supports CLI overrides via clap, hot-reload
//! detection, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, CombatConfig, Config, DebugConfig, NetworkConfig, PersistenceConfig,
    default_config_dir,
};
pub use error::ConfigError;
