//! Configuration for ScoreForge score directors.
//!
//! Load scoring configuration from TOML or YAML files to control assertion
//! levels, match tracking, node sharing and constraint weights without code
//! changes.
//!
//! # Examples
//!
//! ```
//! use scoreforge_config::{EnvironmentMode, ScoringConfig};
//!
//! let config = ScoringConfig::from_toml_str(r#"
//!     environment_mode = "full_assert"
//!     constraint_match_enabled = true
//!
//!     [constraint_weights]
//!     "Room conflict" = "1hard/0soft"
//! "#).unwrap();
//!
//! assert_eq!(config.environment_mode, EnvironmentMode::FullAssert);
//! assert!(config.constraint_match_enabled);
//! assert!(config.node_sharing);
//! assert_eq!(config.constraint_weight("Room conflict"), Some("1hard/0soft"));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use scoreforge_config::ScoringConfig;
//!
//! let config = ScoringConfig::load("scoring.toml").unwrap_or_default();
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Score director configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ScoringConfig {
    /// Environment mode affecting assertions.
    pub environment_mode: EnvironmentMode,

    /// Whether constraint matches and indictments are tracked.
    pub constraint_match_enabled: bool,

    /// Whether structurally identical stream chains compile to one node.
    pub node_sharing: bool,

    /// Weight overrides keyed by constraint name or `package/name`.
    ///
    /// Values use the textual score format of the director's score type,
    /// e.g. `"1hard/0soft"`.
    pub constraint_weights: BTreeMap<String, String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            environment_mode: EnvironmentMode::default(),
            constraint_match_enabled: false,
            node_sharing: true,
            constraint_weights: BTreeMap::new(),
        }
    }
}

impl ScoringConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file, picking the format by extension.
    ///
    /// `.yaml` and `.yml` are read as YAML, anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()
    }

    /// Sets the environment mode.
    pub fn with_environment_mode(mut self, mode: EnvironmentMode) -> Self {
        self.environment_mode = mode;
        self
    }

    /// Enables or disables constraint match tracking.
    pub fn with_constraint_match_enabled(mut self, enabled: bool) -> Self {
        self.constraint_match_enabled = enabled;
        self
    }

    /// Enables or disables node sharing.
    pub fn with_node_sharing(mut self, enabled: bool) -> Self {
        self.node_sharing = enabled;
        self
    }

    /// Overrides the weight of one constraint.
    pub fn with_constraint_weight(
        mut self,
        constraint: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        self.constraint_weights
            .insert(constraint.into(), weight.into());
        self
    }

    /// Returns the textual weight override for a constraint, if any.
    pub fn constraint_weight(&self, constraint: &str) -> Option<&str> {
        self.constraint_weights.get(constraint).map(String::as_str)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if let Some(name) = self
            .constraint_weights
            .keys()
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "constraint weight key ({:?}) must name a constraint",
                name
            )));
        }
        Ok(self)
    }
}

/// Environment mode affecting how much the engine checks itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    /// Non-reproducible mode with minimal overhead.
    #[default]
    NonReproducible,

    /// Reproducible mode with deterministic behavior.
    Reproducible,

    /// Verifies node queues are drained after every calculation cycle.
    FastAssert,

    /// Also recomputes every score from scratch and compares.
    FullAssert,
}

impl EnvironmentMode {
    /// Returns true for the asserting modes.
    pub fn is_asserted(self) -> bool {
        matches!(self, EnvironmentMode::FastAssert | EnvironmentMode::FullAssert)
    }

    /// Returns true if every score must be checked against a full rebuild.
    pub fn is_fully_asserted(self) -> bool {
        self == EnvironmentMode::FullAssert
    }
}
