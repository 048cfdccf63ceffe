//! Command-line argument parsing for Ember binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Ember command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "ember", about = "Ember player-state sync")]
pub struct CliArgs {
    /// Server address.
    #[arg(long)]
    pub server: Option<String>,

    /// Server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Simulation tick rate (Hz).
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Directory holding player save files.
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Enable expert-mode combat tuning.
    #[arg(long)]
    pub expert: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref addr) = args.server {
            self.network.server_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.network.server_port = port;
        }
        if let Some(rate) = args.tick_rate {
            self.network.tick_rate = rate;
        }
        if let Some(ref dir) = args.save_dir {
            self.persistence.save_dir = dir.clone();
        }
        if let Some(expert) = args.expert {
            self.combat.expert_mode = expert;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            server: Some("192.168.1.1".to_string()),
            expert: Some(true),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.network.server_address, "192.168.1.1");
        assert!(config.combat.expert_mode);
        // Non-overridden fields retain defaults
        assert_eq!(config.network.server_port, 7777);
        assert_eq!(config.network.tick_rate, 60);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["ember", "--port", "8000", "--log-level", "debug"]);
        assert_eq!(args.port, Some(8000));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
