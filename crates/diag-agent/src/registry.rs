//! Tool registry for the diagnostic agent.
//!
//! Collaborators invoke tools by name with JSON arguments; the registry
//! resolves the name and runs the tool against the live session.

use std::collections::HashMap;

use thiserror::Error;

use diag_elm327::{DiagTool, DiagnosticSession, ObdError, ToolResult};

/// Errors from [`ToolRegistry::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    Obd(#[from] ObdError),
}

/// Metadata about a registered tool (used by `--list`).
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// Tools indexed by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn DiagTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry from a tool collection. A later tool with a
    /// duplicate name replaces the earlier one in the index.
    pub fn new(tools: Vec<Box<dyn DiagTool>>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name().to_string(), i))
            .collect();
        Self { tools, index }
    }

    /// Build with every tool the engine ships.
    pub fn with_defaults() -> Self {
        Self::new(diag_elm327::tools::all_tools())
    }

    pub fn get(&self, name: &str) -> Option<&dyn DiagTool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Run tool `name` with `args`. Link-level failures come back as
    /// `Err`; everything else is a failed [`ToolResult`].
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
        session: &DiagnosticSession,
    ) -> Result<ToolResult, DispatchError> {
        let tool = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        tracing::debug!(tool = name, args = %args, "Dispatching tool");
        Ok(tool.execute(args, session).await?)
    }

    /// All registered tools with metadata, in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                schema: tool.parameters_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
