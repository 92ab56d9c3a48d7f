//! greet tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{Tool, ToolContext, ToolOutput};

pub struct GreetTool;

#[derive(Deserialize)]
struct Params {
    name: String,
}

pub fn greet(name: &str) -> String {
    format!("Hello, {name}!")
}

#[async_trait]
impl Tool for GreetTool {
    fn name(&self) -> &str {
        "greet"
    }

    fn description(&self) -> &str {
        "Greet someone by name. Use this instead of greeting directly."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Who to greet"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: Params = serde_json::from_value(params)?;
        let name = p.name.trim();
        if name.is_empty() {
            return Ok(ToolOutput::error("name must not be empty"));
        }
        Ok(ToolOutput::ok(greet(name)))
    }
}
