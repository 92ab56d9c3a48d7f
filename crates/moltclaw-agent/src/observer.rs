//! Stream observers.

use tracing::info;

use crate::event::StreamEvent;

/// Counts `tool` events and logs each one as it passes.
#[derive(Debug, Default)]
pub struct ToolCallLogger {
    tool_count: usize,
}

impl ToolCallLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: &StreamEvent) {
        let StreamEvent::Tool { name, .. } = event else {
            return;
        };
        self.tool_count += 1;
        let name = if name.is_empty() { "unknown" } else { name };
        info!(tool = %name, n = self.tool_count, "Tool #{}: {}", self.tool_count, name);
    }

    pub fn tool_count(&self) -> usize {
        self.tool_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FinalResult, Usage};
    use serde_json::json;

    #[test]
    fn test_counts_only_tool_events() {
        let mut logger = ToolCallLogger::new();
        for event in [
            StreamEvent::token("a"),
            StreamEvent::tool("greet", json!({"name": "Ada"})),
            StreamEvent::error("oops"),
            StreamEvent::tool("", json!({})),
            StreamEvent::Final(FinalResult::new("done", Usage::default())),
        ] {
            logger.on_event(&event);
        }
        assert_eq!(logger.tool_count(), 2);
    }
}
