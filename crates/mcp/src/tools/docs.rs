// Document tools: load_skill, read_common and read_app_doc

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_enum, json_schema_object, Tool, ToolRegistry};
use anyhow::Result;
use fit_common_core::{DocumentRouter, Operation};
use std::sync::Arc;

/// Exposes one catalog operation as an MCP tool
pub struct DocumentTool {
    operation: Operation,
    router: Arc<DocumentRouter>,
}

impl DocumentTool {
    pub fn new(operation: Operation, router: Arc<DocumentRouter>) -> Self {
        Self { operation, router }
    }
}

#[async_trait::async_trait]
impl Tool for DocumentTool {
    fn schema(&self) -> ToolSchema {
        let args = self.operation.arguments();

        let mut properties = serde_json::Map::new();
        for arg in args {
            properties.insert(arg.name.to_string(), json_schema_enum(arg.allowed));
        }

        ToolSchema {
            name: self.operation.name().to_string(),
            description: self.operation.description().to_string(),
            input_schema: json_schema_object(
                serde_json::Value::Object(properties),
                args.iter().map(|a| a.name).collect(),
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let outcome = self.router.call(self.operation.name(), arguments).await;
        Ok(outcome.into())
    }
}

/// All document tools, in catalog order
pub fn document_tools(router: Arc<DocumentRouter>) -> Vec<Arc<dyn Tool>> {
    Operation::ALL
        .into_iter()
        .map(|op| Arc::new(DocumentTool::new(op, router.clone())) as Arc<dyn Tool>)
        .collect()
}

impl ToolRegistry {
    /// Registry holding the three document tools
    pub fn with_document_tools(router: Arc<DocumentRouter>) -> Self {
        let mut registry = Self::new();
        for tool in document_tools(router) {
            registry.register(tool);
        }
        registry
    }
}
