//! Tool schema types

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON-schema style description of a tool's parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property name → property schema
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Names of required properties
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolParameters {
    /// Create an empty object schema
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a required property
    pub fn required(self, name: &str, property_type: &str, description: &str) -> Self {
        self.with_property(name, json!({ "type": property_type, "description": description }), true)
    }

    /// Add an optional property
    pub fn optional(self, name: &str, property_type: &str, description: &str) -> Self {
        self.with_property(name, json!({ "type": property_type, "description": description }), false)
    }

    /// Add a property with a full schema
    pub fn with_property(mut self, name: &str, schema: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::new()
    }
}

/// Name, description and parameters of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}
