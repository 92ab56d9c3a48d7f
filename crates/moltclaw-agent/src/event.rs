//! Stream event types.

use std::fmt;

use serde::{Deserialize, Serialize};

use moltclaw_core::types::AgentConfig;

/// One step of an agent run, as seen by the caller.
///
/// Serialized with an internal `"type"` tag and the payload fields inline,
/// e.g. `{"type":"token","text":"Thinking... "}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Always first. Carries the effective configuration.
    Start { config: AgentConfig },

    /// Incremental text fragment.
    Token { text: String },

    /// A tool invocation requested by the model.
    Tool {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },

    /// Terminal success event.
    Final(FinalResult),

    /// An error report. Does not end the stream on its own.
    Error { message: String },
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Token { .. } => EventKind::Token,
            Self::Tool { .. } => EventKind::Tool,
            Self::Final(_) => EventKind::Final,
            Self::Error { .. } => EventKind::Error,
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn tool(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::Tool {
            name: name.into(),
            arguments,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final(_))
    }
}

/// Discriminant of a [`StreamEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Token,
    Tool,
    Final,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Token => "token",
            Self::Tool => "tool",
            Self::Final => "final",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Payload of the terminal `final` event, and the value a run returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub answer: String,
    pub usage: Usage,
}

impl FinalResult {
    pub fn new(answer: impl Into<String>, usage: Usage) -> Self {
        Self {
            answer: answer.into(),
            usage,
        }
    }
}

/// Token accounting for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_event_shape() {
        let event = StreamEvent::Start {
            config: AgentConfig::default(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "start",
                "config": {"model": "gpt-4.1-mini", "temperature": 0.4, "max_tokens": 800}
            })
        );
    }

    #[test]
    fn test_final_event_is_flat() {
        let event = StreamEvent::Final(FinalResult::new("done", Usage::default()));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "final",
                "answer": "done",
                "usage": {"prompt_tokens": 0, "completion_tokens": 0}
            })
        );
    }

    #[test]
    fn test_tool_event_parses_without_arguments() {
        let event: StreamEvent =
            serde_json::from_value(json!({"type": "tool", "name": "get_hours"})).unwrap();
        assert_eq!(event.kind(), EventKind::Tool);
        assert_eq!(event, StreamEvent::tool("get_hours", serde_json::Value::Null));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let parsed = serde_json::from_value::<StreamEvent>(json!({"type": "progress"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(StreamEvent::token("x").kind().to_string(), "token");
        assert_eq!(StreamEvent::error("boom").kind().to_string(), "error");
    }
}
