//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::CommandProfile;
use crate::codec::PromptSet;
use crate::error::{HolefillError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(HolefillError::ConfigError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HolefillError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path`, or the defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                HolefillError::ConfigError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            HolefillError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `max_rounds` must be positive
    /// - `eval_timeout_seconds` and every command timeout must be positive
    /// - `placeholder` must be non-empty and contain no whitespace
    /// - `prompt_templates` must name known prompts and use known variables
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(invalid("max_rounds must be greater than 0"));
        }

        if self.eval_timeout_seconds == 0 {
            return Err(invalid("eval_timeout_seconds must be greater than 0"));
        }

        for (name, profile) in [
            ("generator", &self.generator),
            ("critic", &self.critic),
            ("evaluator", &self.evaluator),
        ] {
            if profile.timeout_seconds == 0 {
                return Err(invalid(&format!(
                    "{}.timeout_seconds must be greater than 0",
                    name
                )));
            }
        }

        if self.placeholder.is_empty() {
            return Err(invalid("placeholder must be non-empty"));
        }
        if self.placeholder.chars().any(char::is_whitespace) {
            return Err(invalid(&format!(
                "placeholder must not contain whitespace (found '{}')",
                self.placeholder
            )));
        }

        PromptSet::with_overrides(&self.prompt_templates)?;

        Ok(())
    }

    /// Evaluator timeout as a duration.
    pub fn eval_timeout(&self) -> Duration {
        Duration::from_secs(self.eval_timeout_seconds)
    }

    /// Profile used for critic calls: the critic when configured, else the generator.
    pub fn critic_profile(&self) -> &CommandProfile {
        if self.critic.is_configured() {
            &self.critic
        } else {
            &self.generator
        }
    }
}

fn invalid(message: &str) -> HolefillError {
    HolefillError::ConfigError(format!("config validation failed: {}", message))
}
