use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ToolHandler, ToolRegistration};
use crate::error::ToolCallerError;
use crate::schema::{ToolSchema, ValidatedArgs};

/// What to do when a tool name is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`ToolCallerError::DuplicateTool`]
    #[default]
    Reject,
    /// Last registration wins; the tool keeps its original publication slot
    Replace,
}

/// Registry for tools, keyed by name and ordered by registration.
///
/// Populated during initialization, then shared read-only (typically behind
/// an `Arc`) by the dispatcher.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: Vec<Arc<ToolRegistration>>,
    index: HashMap<String, usize>,
    policy: DuplicatePolicy,
}

impl ToolRegistry {
    /// Create a new empty registry that rejects duplicate names
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with an explicit duplicate policy
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Register a tool under its schema name
    pub fn register(&mut self, schema: ToolSchema, handler: ToolHandler) -> Result<(), ToolCallerError> {
        schema.check()?;

        let name = schema.name.clone();
        let mode = handler.mode();
        let registration = Arc::new(ToolRegistration { schema, handler });

        match self.index.get(&name) {
            Some(&slot) => match self.policy {
                DuplicatePolicy::Reject => return Err(ToolCallerError::DuplicateTool(name)),
                DuplicatePolicy::Replace => {
                    warn!(tool = %name, %mode, "replacing existing tool registration");
                    self.entries[slot] = registration;
                }
            },
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(registration);
            }
        }

        debug!(tool = %name, %mode, "registered tool");
        Ok(())
    }

    /// Register a tool that runs to completion on the calling task
    pub fn register_sync<F>(&mut self, schema: ToolSchema, f: F) -> Result<(), ToolCallerError>
    where
        F: Fn(ValidatedArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(schema, ToolHandler::synchronous(f))
    }

    /// Register a tool whose result is awaited
    pub fn register_async<F, Fut>(&mut self, schema: ToolSchema, f: F) -> Result<(), ToolCallerError>
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(schema, ToolHandler::asynchronous(f))
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<ToolRegistration>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.entries[slot]))
    }

    /// Get a tool by name, failing with [`ToolCallerError::UnknownTool`]
    pub fn lookup(&self, name: &str) -> Result<Arc<ToolRegistration>, ToolCallerError> {
        self.get(name)
            .ok_or_else(|| ToolCallerError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registrations in registration order
    pub fn all(&self) -> &[Arc<ToolRegistration>] {
        &self.entries
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSchema, ParamType};
    use crate::tools::ExecutionMode;
    use serde_json::json;

    fn echo_schema(description: &str) -> ToolSchema {
        ToolSchema::new("echo", description).param(ParamSchema::required(
            "text",
            ParamType::String,
            "Text to echo",
        ))
    }

    #[test]
    fn registry_tracks_registered_tools() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry
            .register_sync(echo_schema("Echo"), |args| Ok(args.into_value()))
            .unwrap();
        registry
            .register_async(ToolSchema::new("later", "Deferred"), |_| async {
                Ok(json!(null))
            })
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo", "later"]);
        assert_eq!(registry.lookup("later").unwrap().mode(), ExecutionMode::Async);
    }

    #[test]
    fn lookup_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, ToolCallerError::UnknownTool(ref name) if name == "missing"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_is_rejected_by_default() {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync(echo_schema("first"), |_| Ok(json!(1)))
            .unwrap();
        let err = registry
            .register_sync(echo_schema("second"), |_| Ok(json!(2)))
            .unwrap_err();

        assert!(matches!(err, ToolCallerError::DuplicateTool(ref name) if name == "echo"));
        assert_eq!(registry.get("echo").unwrap().schema.description, "first");
    }

    #[test]
    fn replace_policy_keeps_original_slot() {
        let mut registry = ToolRegistry::with_policy(DuplicatePolicy::Replace);
        registry
            .register_sync(echo_schema("first"), |_| Ok(json!(1)))
            .unwrap();
        registry
            .register_sync(ToolSchema::new("other", ""), |_| Ok(json!(null)))
            .unwrap();
        registry
            .register_async(echo_schema("second"), |_| async { Ok(json!(2)) })
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["echo", "other"]);
        let echo = registry.get("echo").unwrap();
        assert_eq!(echo.schema.description, "second");
        assert_eq!(echo.mode(), ExecutionMode::Async);
    }

    #[test]
    fn invalid_schema_is_not_registered() {
        let mut registry = ToolRegistry::new();
        let schema = echo_schema("dup").param(ParamSchema::required(
            "text",
            ParamType::Integer,
            "",
        ));
        let err = registry.register_sync(schema, |_| Ok(json!(null))).unwrap_err();
        assert!(matches!(err, ToolCallerError::InvalidSchema { .. }));
        assert!(registry.is_empty());
    }
}
