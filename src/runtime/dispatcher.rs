use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::{ParsedCall, extract_call};
use crate::schema::{ValidationError, validate};
use crate::tools::{ToolHandler, ToolRegistry};

/// Classification of a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The call names a tool that is not registered
    UnknownTool,
    /// The arguments failed schema validation
    InvalidParameters,
    /// The tool implementation returned an error or panicked
    ToolExecutionError,
    /// Call-shaped text that could not be parsed (strict extraction only)
    MalformedCall,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::InvalidParameters => "InvalidParameters",
            ErrorKind::ToolExecutionError => "ToolExecutionError",
            ErrorKind::MalformedCall => "MalformedCall",
        };
        write!(f, "{}", name)
    }
}

/// Failure half of a [`DispatchResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    pub kind: ErrorKind,
    /// Tool named by the call, when one was parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: ErrorKind, tool: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool: tool.map(ToString::to_string),
            message: message.into(),
        }
    }

    pub fn unknown_tool(tool: &str) -> Self {
        Self::new(
            ErrorKind::UnknownTool,
            Some(tool),
            format!("unknown function: '{}'", tool),
        )
    }

    pub fn invalid_parameters(tool: &str, error: &ValidationError) -> Self {
        Self::new(
            ErrorKind::InvalidParameters,
            Some(tool),
            format!("parameter validation failed: {}", error),
        )
    }

    pub fn execution(tool: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolExecutionError, Some(tool), message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedCall, None, message)
    }
}

/// Either the tool's return value or a classified failure
pub type DispatchResult = Result<Value, DispatchError>;

/// Resolves parsed calls against a registry, validates, and invokes tools.
///
/// Holds the registry read-only, so one dispatcher can serve concurrent
/// requests; cloning is cheap.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    /// Dispatch one parsed call. Never panics on tool failure.
    pub async fn dispatch(&self, call: &ParsedCall) -> DispatchResult {
        let started = Instant::now();
        info!(tool = %call.name, "dispatching tool call");

        let outcome = self.invoke(call).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(tool = %call.name, elapsed_ms, "tool call succeeded"),
            Err(e) => warn!(
                tool = %call.name,
                kind = %e.kind,
                error = %e.message,
                elapsed_ms,
                "tool call failed"
            ),
        }

        outcome
    }

    /// Extract a call from raw model output and dispatch it.
    ///
    /// `None` means the text contains no call (the model answered directly).
    pub async fn dispatch_text(&self, text: &str) -> Option<DispatchResult> {
        let call = extract_call(text)?;
        Some(self.dispatch(&call).await)
    }

    async fn invoke(&self, call: &ParsedCall) -> DispatchResult {
        let registration = self
            .registry
            .get(&call.name)
            .ok_or_else(|| DispatchError::unknown_tool(&call.name))?;

        let args = validate(&registration.schema, &call.arguments)
            .map_err(|e| DispatchError::invalid_parameters(&call.name, &e))?;

        if !args.ignored().is_empty() {
            debug!(
                tool = %call.name,
                ignored = ?args.ignored(),
                "dropping undeclared arguments"
            );
        }

        let result = match &registration.handler {
            ToolHandler::Sync(f) => {
                catch_unwind(AssertUnwindSafe(|| f(args))).unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!("tool panicked: {}", panic_message(&*panic)))
                })
            }
            ToolHandler::Async(f) => AssertUnwindSafe(async move { f(args).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!("tool panicked: {}", panic_message(&*panic)))
                }),
        };

        result.map_err(|e| DispatchError::execution(&call.name, format!("{:#}", e)))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamRule, ParamSchema, ParamType, ToolSchema, ValidatedArgs};
    use serde_json::{Map, json};

    fn call(value: Value) -> ParsedCall {
        serde_json::from_value(value).unwrap()
    }

    async fn explode_later(_args: ValidatedArgs) -> anyhow::Result<Value> {
        tokio::task::yield_now().await;
        panic!("later boom")
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync(
                ToolSchema::new("add", "Add two integers")
                    .param(ParamSchema::required("a", ParamType::Integer, ""))
                    .param(ParamSchema::optional("b", ParamType::Integer, 1, "")),
                |args| Ok(json!(args.i64("a").unwrap_or(0) + args.i64("b").unwrap_or(0))),
            )
            .unwrap();
        registry
            .register_async(
                ToolSchema::new("shout", "Uppercase text after yielding").param(
                    ParamSchema::required("text", ParamType::String, "")
                        .rule(ParamRule::NotEmpty),
                ),
                |args| async move {
                    tokio::task::yield_now().await;
                    Ok(json!(args.str("text").unwrap_or_default().to_uppercase()))
                },
            )
            .unwrap();
        registry
            .register_sync(ToolSchema::new("fail", ""), |_| {
                Err(anyhow::anyhow!("disk full"))
            })
            .unwrap();
        registry
            .register_sync(ToolSchema::new("explode", ""), |_| panic!("boom"))
            .unwrap();
        registry
            .register_async(ToolSchema::new("explode_later", ""), explode_later)
            .unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn sync_tool_result_is_returned() {
        let result = dispatcher()
            .dispatch(&call(json!({"name": "add", "parameters": {"a": 2}})))
            .await;
        assert_eq!(result, Ok(json!(3)));
    }

    #[tokio::test]
    async fn async_tool_result_is_returned() {
        let result = dispatcher()
            .dispatch(&call(json!({"name": "shout", "parameters": {"text": "hi"}})))
            .await;
        assert_eq!(result, Ok(json!("HI")));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let err = dispatcher()
            .dispatch(&ParsedCall::new("missing", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownTool);
        assert!(err.message.contains("missing"));
        assert_eq!(err.tool.as_deref(), Some("missing"));
    }

    #[tokio::test]
    async fn invalid_parameters_carry_validator_detail() {
        let err = dispatcher()
            .dispatch(&call(json!({"name": "add", "parameters": {"a": "two"}})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameters);
        assert!(err.message.contains("parameter 'a' expected integer, got string"));

        let err = dispatcher()
            .dispatch(&call(json!({"name": "shout", "parameters": {}})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameters);
        assert!(err.message.contains("'text' is required"));
    }

    #[tokio::test]
    async fn tool_error_preserves_message() {
        let err = dispatcher()
            .dispatch(&ParsedCall::new("fail", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolExecutionError);
        assert_eq!(err.message, "disk full");
        assert_eq!(err.to_string(), "ToolExecutionError: disk full");
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let d = dispatcher();

        let err = d
            .dispatch(&ParsedCall::new("explode", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolExecutionError);
        assert!(err.message.contains("boom"));

        let err = d
            .dispatch(&ParsedCall::new("explode_later", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolExecutionError);
        assert!(err.message.contains("later boom"));
    }

    #[tokio::test]
    async fn dispatch_text_without_call_is_none() {
        assert!(dispatcher().dispatch_text("Just an answer.").await.is_none());
        let result = dispatcher()
            .dispatch_text(r#"Adding: {"name": "add", "parameters": {"a": 40, "b": 2}}"#)
            .await;
        assert_eq!(result, Some(Ok(json!(42))));
    }
}
