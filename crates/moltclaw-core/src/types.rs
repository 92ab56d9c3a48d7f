use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MoltClawError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 800;

/// Settings an agent is created with.
///
/// Built once per agent and only handed out by shared reference afterwards.
/// Every field is always present when serialized, including defaults, so a
/// `start` event carries the effective configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier, e.g. `gpt-4.1-mini`.
    pub model: String,
    /// Sampling temperature, conventionally 0.0 to 1.0.
    pub temperature: f64,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AgentConfig {
    pub fn new(model: impl Into<String>, temperature: f64, max_tokens: u32) -> Result<Self> {
        let config = Self {
            model: model.into(),
            temperature,
            max_tokens,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no model endpoint would accept.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(MoltClawError::Config("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(MoltClawError::Config(
                "max_tokens must be greater than 0".into(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(MoltClawError::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if self.temperature > 1.0 {
            warn!(
                temperature = self.temperature,
                "temperature above the conventional 0.0-1.0 range"
            );
        }
        Ok(())
    }
}
