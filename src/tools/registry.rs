//! Tool registry for managing available tools
//!
//! Maps tool names to their callable and schema. Registering a name that is
//! already present replaces the earlier entry (last write wins); the replaced
//! schema is returned so callers can tell when that happened.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::schema::{ToolParameters, ToolSchema};
use super::tool::ToolFunction;

/// A callable paired with its schema
#[derive(Clone)]
pub struct RegisteredTool {
    function: Arc<dyn ToolFunction>,
    schema: ToolSchema,
}

impl RegisteredTool {
    /// The callable
    pub fn function(&self) -> &Arc<dyn ToolFunction> {
        &self.function
    }

    /// The declared schema
    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Registry that holds all available tools
///
/// Iteration is ordered by name, so the tool list sent to a backend is the
/// same on every call until the registry changes.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    ///
    /// No check is made that `function` accepts what `parameters` declares.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn ToolFunction>,
        description: impl Into<String>,
        parameters: ToolParameters,
    ) -> Option<ToolSchema> {
        let name = name.into();
        let schema = ToolSchema {
            name: name.clone(),
            description: description.into(),
            parameters,
        };

        let replaced = self
            .tools
            .insert(name.clone(), RegisteredTool { function, schema })
            .map(|old| old.schema);

        if replaced.is_some() {
            tracing::warn!("[ToolRegistry] Replaced existing tool: {}", name);
        } else {
            tracing::info!("[ToolRegistry] Registering tool: {}", name);
        }

        replaced
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Check whether a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool schemas, ordered by name
    pub fn schemas(&self) -> impl Iterator<Item = &ToolSchema> {
        self.tools.values().map(|t| &t.schema)
    }

    /// Get the list of tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
