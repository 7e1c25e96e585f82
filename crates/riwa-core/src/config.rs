//! Configuration loading and typed config structures for the RIWA2
//! simulation.
//!
//! The canonical configuration lives in `riwa-config.yaml` at the project
//! root. Every section and field is optional; missing values fall back to
//! the defaults below. Command-line flags are applied on top by the
//! engine binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use riwa_world::GenesisConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `riwa-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World selection, seed and timing.
    #[serde(default)]
    pub world: WorldConfig,

    /// Story narration.
    #[serde(default)]
    pub story: StoryConfig,

    /// Save file location and cadence.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Fragment catalog and clue set for a new cycle.
    #[serde(default)]
    pub genesis: GenesisConfig,

    /// Pacing of the escape storyline.
    #[serde(default)]
    pub escape: EscapeConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.world.tick_rate_secs.is_finite() || self.world.tick_rate_secs < 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "world.tick_rate_secs must be a non-negative number, got {}",
                    self.world.tick_rate_secs
                ),
            });
        }
        if !(self.escape.printing_step > 0.0 && self.escape.printing_step <= 1.0) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "escape.printing_step must be in (0, 1], got {}",
                    self.escape.printing_step
                ),
            });
        }
        if !(0.0..1.0).contains(&self.escape.key_misread_chance) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "escape.key_misread_chance must be in [0, 1), got {}",
                    self.escape.key_misread_chance
                ),
            });
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Id of the world the seekers start in. Registered on demand if it
    /// is not one of the built-in worlds.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for genesis and seeker choices.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time seconds per tick. Zero runs ticks back to back.
    #[serde(default = "default_tick_rate_secs")]
    pub tick_rate_secs: f64,

    /// Stop after this many ticks in one run (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_rate_secs: default_tick_rate_secs(),
            max_ticks: 0,
        }
    }
}

/// Story narration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryConfig {
    /// Whether tick events are narrated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Narration lines kept in memory; older lines are dropped.
    #[serde(default = "default_story_max_entries")]
    pub max_entries: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_story_max_entries(),
        }
    }
}

/// Save file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Where the universe snapshot is written and resumed from.
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Ticks between auto-saves (0 = only at shutdown).
    #[serde(default = "default_save_interval_ticks")]
    pub save_interval_ticks: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            save_interval_ticks: default_save_interval_ticks(),
        }
    }
}

/// Pacing of the escape storyline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EscapeConfig {
    /// Printing progress added per tick, in `(0, 1]`.
    #[serde(default = "default_printing_step")]
    pub printing_step: f64,

    /// Clues a seeker gathers before trying to decrypt the key.
    #[serde(default = "default_key_clues_required")]
    pub key_clues_required: usize,

    /// Chance a seeker misreads the clues and offers a wrong key. Must be
    /// below 1 or no seeker could ever decrypt and the cycle would not settle.
    #[serde(default = "default_key_misread_chance")]
    pub key_misread_chance: f64,
}

impl Default for EscapeConfig {
    fn default() -> Self {
        Self {
            printing_step: default_printing_step(),
            key_clues_required: default_key_clues_required(),
            key_misread_chance: default_key_misread_chance(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "default_world".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_rate_secs() -> f64 {
    1.0
}

const fn default_story_max_entries() -> usize {
    500
}

fn default_save_path() -> PathBuf {
    PathBuf::from("riwa-state.json")
}

const fn default_save_interval_ticks() -> u64 {
    30
}

const fn default_printing_step() -> f64 {
    0.25
}

const fn default_key_clues_required() -> usize {
    3
}

const fn default_key_misread_chance() -> f64 {
    0.2
}

const fn default_true() -> bool {
    true
}
