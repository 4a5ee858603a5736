// Configuration module for reading Snake.toml
// This module provides OOP-style configuration management for the snake

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub decision: DecisionConfig,
    pub oracle: OracleConfig,
    pub grid: GridConfig,
    pub appearance: AppearanceConfig,
    pub debug: DebugConfig,
}

/// Move reconciliation constants
#[derive(Debug, Deserialize, Clone)]
pub struct DecisionConfig {
    /// Below this health a food move overrides the policy
    pub starvation_health_threshold: i32,
    /// Evaluate the four probe actions on the rayon pool
    pub parallel_probes: bool,
}

/// Where policy models live and which board sizes they cover
#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    pub model_dir: String,
    pub supported_board_sizes: Vec<u32>,
}

/// Occupancy grid layout
#[derive(Debug, Deserialize, Clone)]
pub struct GridConfig {
    /// Padding cells on each side of the board, at least 1
    pub border: usize,
    /// Seconds a remembered grid survives without a new turn
    pub history_ttl_secs: u64,
}

/// Customization returned from GET /
#[derive(Debug, Deserialize, Clone)]
pub struct AppearanceConfig {
    pub author: String,
    pub color: String,
    pub head: String,
    pub tail: String,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            decision: DecisionConfig {
                starvation_health_threshold: 30,
                parallel_probes: true,
            },
            oracle: OracleConfig {
                model_dir: "models".to_string(),
                supported_board_sizes: vec![7, 11, 15, 19],
            },
            grid: GridConfig {
                border: 1,
                history_ttl_secs: 600,
            },
            appearance: AppearanceConfig {
                author: "pretrained-snake".to_string(),
                color: "#00FF00".to_string(),
                head: "default".to_string(),
                tail: "default".to_string(),
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "snake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default()
            .unwrap_or_else(|e| {
                log::warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
                Self::default_hardcoded()
            })
    }

    fn validate(&self) -> Result<(), String> {
        if self.grid.border == 0 {
            return Err("grid.border must be at least 1".to_string());
        }
        if self.oracle.supported_board_sizes.is_empty() {
            return Err("oracle.supported_board_sizes must not be empty".to_string());
        }
        Ok(())
    }
}
