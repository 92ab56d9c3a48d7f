//! The agent: a configuration bound to an event producer.

use std::sync::Arc;

use tracing::{debug, warn};

use moltclaw_core::error::{MoltClawError, Result};
use moltclaw_core::types::AgentConfig;

use crate::event::FinalResult;
use crate::producer::{EventProducer, PlaceholderProducer};
use crate::stream::{AgentStream, spawn_stream};

pub struct Agent {
    config: AgentConfig,
    producer: Arc<dyn EventProducer>,
}

impl Agent {
    /// Agent backed by the [`PlaceholderProducer`]. `None` applies the defaults.
    pub fn new(config: Option<AgentConfig>) -> Self {
        Self::with_producer(config, Arc::new(PlaceholderProducer::default()))
    }

    pub fn with_producer(config: Option<AgentConfig>, producer: Arc<dyn EventProducer>) -> Self {
        Self {
            config: config.unwrap_or_default(),
            producer,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Start a run and return its event stream.
    ///
    /// The first event is always `start`. Fails outside a tokio runtime.
    pub fn stream(&self, prompt: &str) -> Result<AgentStream> {
        if prompt.trim().is_empty() {
            return Err(MoltClawError::Agent("prompt must not be empty".into()));
        }
        self.config.validate()?;

        debug!(model = %self.config.model, prompt_len = prompt.len(), "starting stream");
        spawn_stream(
            self.producer.clone(),
            prompt.to_string(),
            self.config.clone(),
        )
    }

    /// Drain a run and return the `final` payload.
    ///
    /// A stream that ends without `final` yields `Ok(None)`, not an error.
    pub async fn run(&self, prompt: &str) -> Result<Option<FinalResult>> {
        let result = self.stream(prompt)?.finish().await;
        if result.is_none() {
            warn!("run ended without a final event");
        }
        Ok(result)
    }
}

/// Stream a run with a fresh default-producer agent.
pub fn stream(prompt: &str, config: Option<AgentConfig>) -> Result<AgentStream> {
    Agent::new(config).stream(prompt)
}

/// Run to completion with a fresh default-producer agent.
pub async fn run(prompt: &str, config: Option<AgentConfig>) -> Result<Option<FinalResult>> {
    Agent::new(config).run(prompt).await
}
