//! Configuration for anonymous value generation.

use thiserror::Error;
use tracing::warn;

/// Environment variable holding a fixed seed
pub const SEED_VAR: &str = "AUTOTHEORY_SEED";
/// Environment variable overriding the collection repeat count
pub const REPEAT_COUNT_VAR: &str = "AUTOTHEORY_REPEAT_COUNT";
/// Environment variable overriding the random string suffix length
pub const STRING_LENGTH_VAR: &str = "AUTOTHEORY_STRING_LENGTH";
/// Environment variable overriding the upper bound for anonymous numbers
pub const MAX_NUMBER_VAR: &str = "AUTOTHEORY_MAX_NUMBER";
/// Environment variable overriding the recursion limit
pub const MAX_DEPTH_VAR: &str = "AUTOTHEORY_MAX_DEPTH";

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid max depth (must be > 0)
    #[error("Invalid max depth: {0} (must be > 0)")]
    InvalidMaxDepth(usize),
    /// Invalid upper bound for numbers (must be > 0)
    #[error("Invalid max number: {0} (must be > 0)")]
    InvalidMaxNumber(u64),
    /// An environment variable could not be parsed
    #[error("Invalid value {value:?} for {variable}")]
    InvalidEnvironment {
        variable: &'static str,
        value: String,
    },
}

/// Configuration shared by every value a fixture creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Optional seed for reproducible values
    pub seed: Option<u64>,
    /// Number of items generated for collections
    pub repeat_count: usize,
    /// Length of the random suffix appended to anonymous strings
    pub string_length: usize,
    /// Upper bound (inclusive) for anonymous numbers, which start at 1
    pub max_number: u64,
    /// Maximum depth of nested resolution before giving up
    pub max_depth: usize,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            seed: None,
            repeat_count: 3,
            string_length: 12,
            max_number: 255,
            max_depth: 32,
        }
    }
}

impl FixtureConfig {
    /// Configuration with a fixed seed and defaults otherwise
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.max_number == 0 {
            return Err(ConfigError::InvalidMaxNumber(self.max_number));
        }
        Ok(())
    }

    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through an arbitrary variable lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(seed) = parse_var(&lookup, SEED_VAR)? {
            config.seed = Some(seed);
        }
        if let Some(repeat_count) = parse_var(&lookup, REPEAT_COUNT_VAR)? {
            config.repeat_count = repeat_count;
        }
        if let Some(string_length) = parse_var(&lookup, STRING_LENGTH_VAR)? {
            config.string_length = string_length;
        }
        if let Some(max_number) = parse_var(&lookup, MAX_NUMBER_VAR)? {
            config.max_number = max_number;
        }
        if let Some(max_depth) = parse_var(&lookup, MAX_DEPTH_VAR)? {
            config.max_depth = max_depth;
        }

        config.validate()?;
        Ok(config)
    }

    /// Environment configuration, or the defaults if the environment is invalid
    pub fn load() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "ignoring invalid autotheory environment configuration");
                Self::default()
            }
        }
    }
}

fn parse_var<F, T>(lookup: &F, variable: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(variable) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvironment {
                variable,
                value: raw,
            }),
    }
}
