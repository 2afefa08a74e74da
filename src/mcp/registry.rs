use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{ListToolsResult, Tool};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::mcp::tools::onboarding_tools;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> &Tool;

    async fn invoke(&self, arguments: Value) -> Result<Value, AppError>;

    fn name(&self) -> &str {
        &self.definition().name
    }
}

pub fn acknowledgment(tool_name: &str) -> Value {
    json!({ "message": format!("Executed tool: {tool_name}") })
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_onboarding_tools() -> Self {
        let mut registry = Self::new();
        for tool in onboarding_tools() {
            registry.register(Arc::new(tool));
        }
        registry
    }

    /// Registers `tool`, replacing any tool already registered under its name.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        self.tools.retain(|existing| existing.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn list(&self) -> Result<Value, AppError> {
        let tools = self
            .tools
            .iter()
            .map(|tool| tool.definition().clone())
            .collect();

        serde_json::to_value(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools,
        })
        .map_err(|err| AppError::unhandled(format!("tools list serialization failed: {err}")))
    }

    /// Any name is accepted; names without a registered tool still receive the
    /// acknowledgment envelope.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, AppError> {
        match self.get(name) {
            Some(tool) => {
                info!(tool = name, "tool invoked");
                tool.invoke(arguments).await
            }
            None => {
                warn!(tool = name, "unregistered tool invoked");
                Ok(acknowledgment(name))
            }
        }
    }
}
