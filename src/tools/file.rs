use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{Sandbox, ToolRegistry};
use crate::error::ToolCallerError;
use crate::schema::{ParamRule, ParamSchema, ParamType, ToolSchema, ValidatedArgs};

fn required_str<'a>(args: &'a ValidatedArgs, name: &str) -> Result<&'a str> {
    args.str(name)
        .with_context(|| format!("missing '{}' parameter", name))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("failed to check path: {}", path.display()))
}

/// Tool for creating files inside the sandbox
pub struct CreateFileTool {
    sandbox: Arc<Sandbox>,
}

impl CreateFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new(
            "create_file",
            "Create a file with the specified name, path, and content.",
        )
        .param(
            ParamSchema::required(
                "filename",
                ParamType::String,
                "Name of file to create (with extension)",
            )
            .rule(ParamRule::NotEmpty)
            .rule(ParamRule::NoPathSeparators),
        )
        .param(ParamSchema::optional(
            "filepath",
            ParamType::String,
            ".",
            "Directory where the file should be created (default: sandbox root)",
        ))
        .param(ParamSchema::optional(
            "content",
            ParamType::String,
            "",
            "Content to write to the file",
        ))
    }

    pub async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let filename = required_str(&args, "filename")?;
        let filepath = required_str(&args, "filepath")?;
        let content = required_str(&args, "content")?;

        let target = self.sandbox.resolve(Path::new(filepath).join(filename))?;
        ensure_parent(&target).await?;

        tokio::fs::write(&target, content)
            .await
            .with_context(|| format!("failed to write file: {}", target.display()))?;

        debug!(path = %target.display(), bytes = content.len(), "created file");
        Ok(json!({ "created": target.display().to_string() }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_async(Self::schema(), move |args| {
            let tool = Arc::clone(&tool);
            async move { tool.execute(args).await }
        })
    }
}

/// Tool for copying files within the sandbox
pub struct CopyFileTool {
    sandbox: Arc<Sandbox>,
}

impl CopyFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new("copy_file", "Copy a file to a new location.")
            .param(ParamSchema::required(
                "source_filepath",
                ParamType::String,
                "Path of the file to copy",
            ))
            .param(ParamSchema::required(
                "destination_filepath",
                ParamType::String,
                "Destination path for the copy",
            ))
            .param(ParamSchema::optional(
                "overwrite",
                ParamType::Boolean,
                false,
                "Replace the destination if it already exists",
            ))
    }

    pub async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let source = required_str(&args, "source_filepath")?;
        let destination = required_str(&args, "destination_filepath")?;
        let overwrite = args.bool("overwrite").unwrap_or(false);

        let source_path = self.sandbox.resolve(source)?;
        let dest_path = self.sandbox.resolve(destination)?;

        if !exists(&source_path).await? {
            return Ok(json!({
                "copied": false,
                "reason": format!("source file {} not found", source),
            }));
        }
        if !overwrite && exists(&dest_path).await? {
            return Ok(json!({
                "copied": false,
                "reason": format!("destination file {} already exists", destination),
            }));
        }

        ensure_parent(&dest_path).await?;
        let bytes = tokio::fs::copy(&source_path, &dest_path)
            .await
            .with_context(|| format!("failed to copy {} to {}", source, destination))?;

        Ok(json!({
            "copied": true,
            "source": source,
            "destination": destination,
            "bytes": bytes,
        }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_async(Self::schema(), move |args| {
            let tool = Arc::clone(&tool);
            async move { tool.execute(args).await }
        })
    }
}

/// Tool for deleting a single file
pub struct DeleteFileTool {
    sandbox: Arc<Sandbox>,
}

impl DeleteFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new("delete_file", "Delete the file at the given path.").param(
            ParamSchema::required("filepath", ParamType::String, "Path to the file to delete")
                .rule(ParamRule::NotEmpty),
        )
    }

    pub async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let filepath = required_str(&args, "filepath")?;
        let path = self.sandbox.resolve(filepath)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(json!({
                    "deleted": false,
                    "reason": format!("file {} not found", filepath),
                }));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to inspect file: {}", filepath));
            }
        };
        if !metadata.is_file() {
            anyhow::bail!("not a file: {}", filepath);
        }

        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete file: {}", filepath))?;

        Ok(json!({ "deleted": true, "filepath": filepath }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_async(Self::schema(), move |args| {
            let tool = Arc::clone(&tool);
            async move { tool.execute(args).await }
        })
    }
}

/// Tool for replacing or appending to an existing file
pub struct EditFileTool {
    sandbox: Arc<Sandbox>,
}

impl EditFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new(
            "edit_file",
            "Edit an existing file by replacing its content or appending to it.",
        )
        .param(ParamSchema::required(
            "filepath",
            ParamType::String,
            "Path to the file to edit",
        ))
        .param(ParamSchema::optional(
            "content",
            ParamType::String,
            "",
            "Content to write or append",
        ))
        .param(ParamSchema::optional(
            "append",
            ParamType::Boolean,
            false,
            "Append instead of replacing the file content",
        ))
    }

    pub async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let filepath = required_str(&args, "filepath")?;
        let content = required_str(&args, "content")?;
        let append = args.bool("append").unwrap_or(false);

        let path = self.sandbox.resolve(filepath)?;
        if !exists(&path).await? {
            anyhow::bail!("file {} not found", filepath);
        }

        let new_content = if append {
            let current = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read file: {}", filepath))?;
            current + content
        } else {
            content.to_string()
        };

        tokio::fs::write(&path, &new_content)
            .await
            .with_context(|| format!("failed to write file: {}", filepath))?;

        Ok(json!({
            "edited": path.display().to_string(),
            "mode": if append { "append" } else { "replace" },
        }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_async(Self::schema(), move |args| {
            let tool = Arc::clone(&tool);
            async move { tool.execute(args).await }
        })
    }
}

/// Tool for renaming (moving) a file within the sandbox
pub struct RenameFileTool {
    sandbox: Arc<Sandbox>,
}

impl RenameFileTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new("rename_file", "Rename or move a file.")
            .param(ParamSchema::required(
                "old_filepath",
                ParamType::String,
                "Current path of the file",
            ))
            .param(ParamSchema::required(
                "new_filepath",
                ParamType::String,
                "New path for the file",
            ))
    }

    pub async fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let old = required_str(&args, "old_filepath")?;
        let new = required_str(&args, "new_filepath")?;

        let old_path = self.sandbox.resolve(old)?;
        let new_path = self.sandbox.resolve(new)?;

        if !exists(&old_path).await? {
            return Ok(json!({
                "renamed": false,
                "reason": format!("source file {} not found", old),
            }));
        }
        if exists(&new_path).await? {
            return Ok(json!({
                "renamed": false,
                "reason": format!("destination file {} already exists", new),
            }));
        }

        ensure_parent(&new_path).await?;
        tokio::fs::rename(&old_path, &new_path)
            .await
            .with_context(|| format!("failed to rename {} to {}", old, new))?;

        Ok(json!({ "renamed": true, "from": old, "to": new }))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_async(Self::schema(), move |args| {
            let tool = Arc::clone(&tool);
            async move { tool.execute(args).await }
        })
    }
}
