//! Event producers: whatever fills a stream after its `start` event.

use async_trait::async_trait;
use tracing::debug;

use moltclaw_core::types::AgentConfig;

use crate::event::{FinalResult, StreamEvent, Usage};
use crate::stream::EventSink;

/// Fills a stream with events for one prompt.
///
/// The `start` event has already been sent when `produce` is called.
/// Returning `Err` before the `final` event aborts the stream with a
/// trailing `error` event. Emitting an `error` event through the sink does
/// not end the stream; the producer decides whether to keep going.
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn produce(
        &self,
        prompt: &str,
        config: &AgentConfig,
        sink: &mut EventSink,
    ) -> anyhow::Result<()>;
}

/// Stand-in for a model: one `token`, then a `final` with zero usage.
#[derive(Debug, Clone)]
pub struct PlaceholderProducer {
    pub thinking: String,
    pub answer: String,
}

impl Default for PlaceholderProducer {
    fn default() -> Self {
        Self {
            thinking: "Thinking... ".into(),
            answer: "No model is attached; this is a placeholder answer.".into(),
        }
    }
}

#[async_trait]
impl EventProducer for PlaceholderProducer {
    async fn produce(
        &self,
        prompt: &str,
        config: &AgentConfig,
        sink: &mut EventSink,
    ) -> anyhow::Result<()> {
        debug!(model = %config.model, prompt_len = prompt.len(), "placeholder producer");
        sink.token(self.thinking.clone()).await?;
        sink.finish(FinalResult::new(self.answer.clone(), Usage::default()))
            .await?;
        Ok(())
    }
}

/// Replays a fixed list of events, optionally failing afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProducer {
    events: Vec<StreamEvent>,
    failure: Option<String>,
}

impl ScriptedProducer {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            failure: None,
        }
    }

    /// Return an error with `message` once the script has been replayed.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[async_trait]
impl EventProducer for ScriptedProducer {
    async fn produce(
        &self,
        _prompt: &str,
        _config: &AgentConfig,
        sink: &mut EventSink,
    ) -> anyhow::Result<()> {
        for event in &self.events {
            sink.emit(event.clone()).await?;
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}
