mod file;
mod listing;
mod registry;
mod sandbox;
mod weather;

pub use file::{CopyFileTool, CreateFileTool, DeleteFileTool, EditFileTool, RenameFileTool};
pub use listing::ListDirectoryTool;
pub use registry::{DuplicatePolicy, ToolRegistry};
pub use sandbox::Sandbox;
pub use weather::WeatherTool;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolCallerError;
use crate::schema::{ToolSchema, ValidatedArgs};

/// Whether a tool runs to completion inline or must be awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sync,
    Async,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sync => write!(f, "sync"),
            ExecutionMode::Async => write!(f, "async"),
        }
    }
}

pub type SyncToolFn = dyn Fn(ValidatedArgs) -> Result<Value> + Send + Sync;
pub type AsyncToolFn = dyn Fn(ValidatedArgs) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Implementation of a tool, tagged with its execution mode
#[derive(Clone)]
pub enum ToolHandler {
    Sync(Arc<SyncToolFn>),
    Async(Arc<AsyncToolFn>),
}

impl ToolHandler {
    /// Wrap a function that runs to completion on the calling task
    pub fn synchronous<F>(f: F) -> Self
    where
        F: Fn(ValidatedArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wrap a function returning a future that the dispatcher awaits
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::Async(Arc::new(move |args| Box::pin(f(args))))
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            ToolHandler::Sync(_) => ExecutionMode::Sync,
            ToolHandler::Async(_) => ExecutionMode::Async,
        }
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ToolHandler").field(&self.mode()).finish()
    }
}

/// A schema bound to its implementation
#[derive(Debug, Clone)]
pub struct ToolRegistration {
    pub schema: ToolSchema,
    pub handler: ToolHandler,
}

impl ToolRegistration {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn mode(&self) -> ExecutionMode {
        self.handler.mode()
    }
}

/// Register the weather demo and the sandboxed file tools
pub fn register_default_tools(
    registry: &mut ToolRegistry,
    sandbox: &Arc<Sandbox>,
) -> Result<(), ToolCallerError> {
    WeatherTool.register(registry)?;
    CreateFileTool::new(Arc::clone(sandbox)).register(registry)?;
    CopyFileTool::new(Arc::clone(sandbox)).register(registry)?;
    DeleteFileTool::new(Arc::clone(sandbox)).register(registry)?;
    EditFileTool::new(Arc::clone(sandbox)).register(registry)?;
    RenameFileTool::new(Arc::clone(sandbox)).register(registry)?;
    ListDirectoryTool::new(Arc::clone(sandbox)).register(registry)?;
    Ok(())
}
