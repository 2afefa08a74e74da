//! Onboarding tools advertised over the MCP tool routes
//!
//! Each tool is declared with its argument schema; invocation is a stub
//! acknowledgment until the analysis backends are wired in.

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::mcp::registry::{acknowledgment, ToolHandler};

#[macros::mcp_tool(
    name = "analyze_document",
    description = "Analyze an uploaded onboarding document"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AnalyzeDocumentTool {
    pub document_id: String,
    pub analysis_type: Option<String>,
}

#[macros::mcp_tool(
    name = "validate_compliance",
    description = "Validate client data against regulatory requirements"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ValidateComplianceTool {
    pub client_id: String,
    pub jurisdictions: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "predict_risk",
    description = "Predict onboarding risk for a client profile"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct PredictRiskTool {
    pub client_id: String,
}

#[macros::mcp_tool(
    name = "chat",
    description = "Conversational onboarding assistant"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ChatTool {
    pub message: String,
    pub session_id: Option<String>,
}

/// A registered tool whose invocation only acknowledges the call.
pub struct AcknowledgeTool {
    definition: Tool,
}

impl AcknowledgeTool {
    pub fn new(definition: Tool) -> Self {
        Self { definition }
    }
}

#[async_trait]
impl ToolHandler for AcknowledgeTool {
    fn definition(&self) -> &Tool {
        &self.definition
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, AppError> {
        Ok(acknowledgment(&self.definition.name))
    }
}

pub fn onboarding_tools() -> Vec<AcknowledgeTool> {
    vec![
        AcknowledgeTool::new(AnalyzeDocumentTool::tool()),
        AcknowledgeTool::new(ValidateComplianceTool::tool()),
        AcknowledgeTool::new(PredictRiskTool::tool()),
        AcknowledgeTool::new(ChatTool::tool()),
    ]
}
