//! Tool implementations.
//!
//! Tools are capabilities an agent can describe to a model and a caller can
//! invoke by name. Each tool implements the [`Tool`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use moltclaw_core::config::Config;

pub mod greet;
pub mod moltbook;
pub mod travel;

/// Context provided to tools during execution.
pub struct ToolContext {
    pub config: Arc<Config>,
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Successful output holding `value` as JSON text.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::ok(serde_json::to_string(value)?))
    }
}

/// The core tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the model (e.g., "get_hours").
    fn name(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// Execute the tool with the given parameters.
    async fn execute(
        &self,
        params: serde_json::Value,
        context: &ToolContext,
    ) -> anyhow::Result<ToolOutput>;
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Generate tool definitions for a model API request.
    pub fn to_llm_tools(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.parameters_schema(),
                })
            })
            .collect()
    }
}

/// Register every built-in tool. The Moltbook tools share one client built
/// from `config.moltbook`.
pub fn register_builtin_tools(registry: &mut ToolRegistry, config: &Config) -> anyhow::Result<()> {
    registry.register(Box::new(greet::GreetTool));
    registry.register(Box::new(travel::ListAttractionsTool));
    registry.register(Box::new(travel::ReadAttractionsFileTool));
    registry.register(Box::new(travel::GetHoursTool));

    let client = Arc::new(moltbook::MoltbookClient::new(&config.moltbook())?);
    registry.register(Box::new(moltbook::CreatePostTool::new(client.clone())));
    registry.register(Box::new(moltbook::AddCommentTool::new(client)));
    Ok(())
}
