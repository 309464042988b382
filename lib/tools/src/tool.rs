//! Tool interface and registry.
//!
//! A tool is a named, schema-described, side-effecting operation the backend
//! may request during a conversation. The registry is populated once at
//! startup and read-only afterwards; its exported schema is attached to every
//! backend request.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Parameter value types understood by the backend's function-calling schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    String,
    Integer,
}

impl ParameterType {
    fn schema_name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
        }
    }
}

/// A single parameter in a tool's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Parameter value type.
    pub param_type: ParameterType,
    /// Description shown to the backend when it selects arguments.
    pub description: String,
    /// Whether the backend must supply this parameter.
    pub required: bool,
}

impl ParameterSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
        }
    }
}

/// Definition of a tool: name, description, and parameter schema.
/// Immutable, registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter schema.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Renders this descriptor as a backend function declaration.
    #[must_use]
    pub fn function_declaration(&self) -> JsonValue {
        let mut properties = JsonMap::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.schema_name(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(JsonValue::from(param.name.clone()));
            }
        }

        let mut parameters = json!({
            "type": "OBJECT",
            "properties": properties,
        });
        if !required.is_empty() {
            parameters["required"] = JsonValue::Array(required);
        }

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": parameters,
        })
    }
}

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's descriptor.
    fn descriptor(&self) -> ToolDescriptor;

    /// Executes the tool and returns a textual result for the model.
    async fn invoke(&self, arguments: &JsonMap<String, JsonValue>) -> Result<String, ToolError>;
}

/// Registry of available tools. Read-only after construction.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Descriptors in registration order, so the exported schema is stable.
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder {
            registry: Self::default(),
        }
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Returns all registered descriptors, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Renders the full tool schema in the shape the backend expects:
    /// a list with one `function_declarations` group.
    #[must_use]
    pub fn schema(&self) -> JsonValue {
        let declarations: Vec<JsonValue> = self
            .descriptors
            .iter()
            .map(ToolDescriptor::function_declaration)
            .collect();
        json!([{ "function_declarations": declarations }])
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ToolRegistry`]. Registration happens only here; the built
/// registry is immutable.
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    /// Registers a tool. A later registration under the same name replaces
    /// the earlier one.
    #[must_use]
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        let descriptor = tool.descriptor();
        self.registry
            .descriptors
            .retain(|d| d.name != descriptor.name);
        self.registry.tools.insert(descriptor.name.clone(), tool);
        self.registry.descriptors.push(descriptor);
        self
    }

    /// Finishes construction.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}
