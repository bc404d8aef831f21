use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{CODE_FIELD, DEFAULT_FLUSH_EVERY, DEFAULT_PROGRESS_EVERY};
use crate::error::{Result, ToolError};

/// Tool configuration. Every section and field is optional in the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dedupe: DedupeConfig,
    pub extract: ExtractConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupeConfig {
    /// Field whose string value identifies a record.
    pub key_field: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Flush the output after this many written entries.
    pub flush_every: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Log a progress line after this many input lines.
    pub progress_every: u64,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            key_field: CODE_FIELD.to_string(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl Config {
    /// Load from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|e| {
            ToolError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dedupe.key_field.is_empty() {
            return Err(ToolError::Config("dedupe.key_field must not be empty".into()));
        }
        if self.extract.flush_every == 0 {
            return Err(ToolError::Config("extract.flush_every must be greater than 0".into()));
        }
        if self.run.progress_every == 0 {
            return Err(ToolError::Config("run.progress_every must be greater than 0".into()));
        }
        Ok(())
    }
}
