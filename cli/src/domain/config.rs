//! Domain types and validators for deckhand configuration.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::pipeline::DEFAULT_PIPELINE_SUFFIX;
use crate::domain::service::validate_region;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "iac.binary",
    "iac.templates_dir",
    "state.bucket",
    "state.region",
    "aws.cli",
    "aws.region",
    "aws.role_arn",
    "aws.session_name",
    "aws.connection_arn",
    "registry.path",
    "pipeline.suffix",
];

#[cfg(windows)]
pub const DEFAULT_IAC_BINARY: &str = "terraform.exe";
#[cfg(not(windows))]
pub const DEFAULT_IAC_BINARY: &str = "terraform";

pub const DEFAULT_AWS_CLI: &str = "aws";
pub const DEFAULT_SESSION_NAME: &str = "deckhand";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.deckhand/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeckhandConfig {
    pub iac: IacConfig,
    pub state: StateConfig,
    pub aws: AwsConfig,
    pub registry: RegistryConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IacConfig {
    pub binary: String,
    /// Directory containing one template per kind (`static-site/`, `server/`).
    /// Defaults to `~/.deckhand/templates`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<String>,
}

impl Default for IacConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_IAC_BINARY.to_string(),
            templates_dir: None,
        }
    }
}

/// Remote state backend passed to `init`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsConfig {
    pub cli: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    pub session_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_arn: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            cli: DEFAULT_AWS_CLI.to_string(),
            region: None,
            role_arn: None,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            connection_arn: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Defaults to `~/.deckhand/registry.redb`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    pub suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_PIPELINE_SUFFIX.to_string(),
        }
    }
}

impl DeckhandConfig {
    /// Current value of a whitelisted key, `None` when unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "iac.binary" => Some(self.iac.binary.clone()),
            "iac.templates_dir" => self.iac.templates_dir.clone(),
            "state.bucket" => self.state.bucket.clone(),
            "state.region" => self.state.region.clone(),
            "aws.cli" => Some(self.aws.cli.clone()),
            "aws.region" => self.aws.region.clone(),
            "aws.role_arn" => self.aws.role_arn.clone(),
            "aws.session_name" => Some(self.aws.session_name.clone()),
            "aws.connection_arn" => self.aws.connection_arn.clone(),
            "registry.path" => self.registry.path.clone(),
            "pipeline.suffix" => Some(self.pipeline.suffix.clone()),
            _ => None,
        }
    }

    /// Validate and store a value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is unknown or the value invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        let value = value.to_string();
        match key {
            "iac.binary" => self.iac.binary = value,
            "iac.templates_dir" => self.iac.templates_dir = Some(value),
            "state.bucket" => self.state.bucket = Some(value),
            "state.region" => self.state.region = Some(value),
            "aws.cli" => self.aws.cli = value,
            "aws.region" => self.aws.region = Some(value),
            "aws.role_arn" => self.aws.role_arn = Some(value),
            "aws.session_name" => self.aws.session_name = value,
            "aws.connection_arn" => self.aws.connection_arn = Some(value),
            "registry.path" => self.registry.path = Some(value),
            "pipeline.suffix" => self.pipeline.suffix = value,
            _ => {}
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |reason: &str| -> anyhow::Error {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
        .into()
    };

    if value.trim().is_empty() {
        return Err(invalid("Value must not be empty."));
    }
    match key {
        "state.region" | "aws.region" if validate_region(value).is_err() => {
            Err(invalid("Expected a region code such as eu-west-1."))
        }
        "aws.role_arn" | "aws.connection_arn" if !value.starts_with("arn:") => {
            Err(invalid("Expected an ARN starting with 'arn:'."))
        }
        "pipeline.suffix" if value.chars().any(char::is_whitespace) => {
            Err(invalid("Suffix must not contain whitespace."))
        }
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
