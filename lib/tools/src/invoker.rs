//! Tool invocation with failures normalized into text.

use crate::error::ToolError;
use crate::tool::ToolRegistry;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How much of a tool result to reproduce in log lines. The value returned
/// to the conversation loop is never truncated.
const LOG_PREVIEW_CHARS: usize = 100;

/// Dispatches backend-requested tool calls to the registry.
///
/// Failures never propagate to the caller: an unknown tool name or an error
/// raised by the tool implementation becomes a textual error result the
/// model can react to.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    /// Creates an invoker over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executes the named tool and returns its textual result.
    pub async fn execute(&self, name: &str, arguments: &JsonMap<String, JsonValue>) -> String {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "backend requested an unknown tool");
            let e = ToolError::NotFound {
                name: name.to_string(),
            };
            return format!("Error: {e}");
        };

        match tool.invoke(arguments).await {
            Ok(output) => {
                info!(
                    tool = name,
                    result = preview(&output),
                    "tool executed successfully"
                );
                output
            }
            Err(e) => {
                error!(tool = name, error = %e, "tool execution failed");
                format!("Error while executing tool '{name}': {e}")
            }
        }
    }
}

fn preview(output: &str) -> &str {
    match output.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((end, _)) => &output[..end],
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParameterSpec, ParameterType, Tool, ToolDescriptor};
    use async_trait::async_trait;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(
                "flaky",
                "Always fails",
                vec![ParameterSpec::optional(
                    "input",
                    ParameterType::String,
                    "Ignored.",
                )],
            )
        }

        async fn invoke(
            &self,
            _arguments: &JsonMap<String, JsonValue>,
        ) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                name: "flaky".to_string(),
                reason: "backend unavailable".to_string(),
            })
        }
    }

    struct ConstantTool;

    #[async_trait]
    impl Tool for ConstantTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("constant", "Returns a constant", vec![])
        }

        async fn invoke(
            &self,
            _arguments: &JsonMap<String, JsonValue>,
        ) -> Result<String, ToolError> {
            Ok("forty-two".to_string())
        }
    }

    fn invoker() -> ToolInvoker {
        let registry = ToolRegistry::builder()
            .register(Arc::new(FailingTool))
            .register(Arc::new(ConstantTool))
            .build();
        ToolInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_text() {
        let result = invoker().execute("no_such_tool", &JsonMap::new()).await;
        assert!(result.starts_with("Error"));
        assert_eq!(
            result,
            format!(
                "Error: {}",
                ToolError::NotFound {
                    name: "no_such_tool".to_string()
                }
            )
        );
    }

    #[tokio::test]
    async fn tool_failure_yields_error_text() {
        let result = invoker().execute("flaky", &JsonMap::new()).await;
        assert!(result.contains("flaky"));
        assert!(result.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn success_is_returned_verbatim() {
        let result = invoker().execute("constant", &JsonMap::new()).await;
        assert_eq!(result, "forty-two");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), LOG_PREVIEW_CHARS);
        assert!(long.starts_with(p));

        assert_eq!(preview("short"), "short");
    }
}
