use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use glob::glob;
use serde_json::{Value, json};
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use super::{Sandbox, ToolRegistry};
use crate::error::ToolCallerError;
use crate::schema::{ParamSchema, ParamType, ToolSchema, ValidatedArgs};

struct FileEntry {
    name: String,
    path: String,
    size: u64,
    modified: SystemTime,
    created: SystemTime,
}

impl FileEntry {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "path": self.path,
            "size": self.size,
            "modified": rfc3339(self.modified),
            "created": rfc3339(self.created),
            "is_file": true,
            "is_dir": false,
        })
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Local>::from(time).to_rfc3339()
}

/// Tool for listing files in a sandbox directory
pub struct ListDirectoryTool {
    sandbox: Arc<Sandbox>,
}

impl ListDirectoryTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }

    pub fn schema() -> ToolSchema {
        ToolSchema::new(
            "list_directory",
            "List files in a directory with optional glob filtering and sorting.",
        )
        .param(ParamSchema::optional(
            "directory",
            ParamType::String,
            ".",
            "Directory to list files from",
        ))
        .param(ParamSchema::optional(
            "pattern",
            ParamType::String,
            "*",
            "Glob pattern for filtering files (e.g. '*.txt', '*.py')",
        ))
        .param(ParamSchema::optional(
            "include_hidden",
            ParamType::Boolean,
            false,
            "Include files whose name starts with '.'",
        ))
        .param(ParamSchema::optional(
            "sort_by",
            ParamType::one_of(["name", "size", "modified", "created"]),
            "name",
            "Sort order",
        ))
    }

    /// Runs synchronously: directory listings are small and local
    pub fn execute(&self, args: ValidatedArgs) -> Result<Value> {
        let directory = args.str("directory").unwrap_or(".");
        let pattern = args.str("pattern").unwrap_or("*");
        let include_hidden = args.bool("include_hidden").unwrap_or(false);
        let sort_by = args.str("sort_by").unwrap_or("name");

        let pattern_path = Path::new(pattern);
        if pattern_path.has_root()
            || pattern_path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            anyhow::bail!("pattern must stay within the directory: {}", pattern);
        }

        let dir = self.sandbox.resolve(directory)?;
        if !dir.is_dir() {
            debug!(directory, "directory not found or is not a directory");
            return Ok(json!([]));
        }

        let full_pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy()))
            .join(pattern)
            .to_string_lossy()
            .to_string();
        let paths = glob(&full_pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?;

        let mut entries = Vec::new();
        for path in paths.filter_map(Result::ok) {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };
            if !include_hidden && name.starts_with('.') {
                continue;
            }

            // Follows symlinks; anything resolving outside the root is skipped
            let Ok(canonical) = std::fs::canonicalize(&path) else {
                continue;
            };
            if !canonical.starts_with(self.sandbox.root()) {
                continue;
            }

            let metadata = std::fs::metadata(&canonical)
                .with_context(|| format!("failed to read metadata: {}", path.display()))?;
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let created = metadata.created().unwrap_or(modified);

            entries.push(FileEntry {
                name,
                path: self.sandbox.relative(&path).display().to_string(),
                size: metadata.len(),
                modified,
                created,
            });
        }

        match sort_by {
            "size" => entries.sort_by_key(|e| e.size),
            "modified" => entries.sort_by_key(|e| e.modified),
            "created" => entries.sort_by_key(|e| e.created),
            _ => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        debug!(directory, count = entries.len(), "listed directory");
        Ok(Value::Array(entries.iter().map(FileEntry::to_json).collect()))
    }

    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolCallerError> {
        let tool = Arc::new(self);
        registry.register_sync(Self::schema(), move |args| tool.execute(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use std::fs;
    use tempfile::tempdir;

    fn run(tool: &ListDirectoryTool, value: Value) -> Result<Value> {
        let schema = ListDirectoryTool::schema();
        tool.execute(validate(&schema, value.as_object().unwrap()).unwrap())
    }

    fn names(listing: &Value) -> Vec<&str> {
        listing
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn lists_files_sorted_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.py"), "bb").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(".hidden"), "h").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));

        let listing = run(&tool, json!({})).unwrap();
        assert_eq!(names(&listing), vec!["a.txt", "b.py"]);
        assert_eq!(listing[0]["size"], 1);
        assert_eq!(listing[0]["path"], "a.txt");
        assert!(listing[0]["modified"].as_str().is_some());
    }

    #[test]
    fn filters_by_pattern_and_includes_hidden() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.py"), "").unwrap();
        fs::write(dir.path().join("two.txt"), "").unwrap();
        fs::write(dir.path().join(".env.py"), "").unwrap();
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));

        let listing = run(&tool, json!({"pattern": "*.py"})).unwrap();
        assert_eq!(names(&listing), vec!["one.py"]);

        let listing = run(&tool, json!({"pattern": "*.py", "include_hidden": true})).unwrap();
        assert_eq!(names(&listing), vec![".env.py", "one.py"]);
    }

    #[test]
    fn sorts_by_size() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        fs::write(dir.path().join("small.txt"), "0").unwrap();
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));

        let listing = run(&tool, json!({"sort_by": "size"})).unwrap();
        assert_eq!(names(&listing), vec!["small.txt", "big.txt"]);
    }

    #[test]
    fn large_listing_is_complete_before_sorting() {
        let dir = tempdir().unwrap();
        for i in 0..600 {
            fs::write(dir.path().join(format!("f{:03}.txt", i)), "x".repeat(1000 - i)).unwrap();
        }
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));

        let listing = run(&tool, json!({"sort_by": "size"})).unwrap();
        let entries = listing.as_array().unwrap();
        assert_eq!(entries.len(), 600);
        assert_eq!(entries[0]["name"], "f599.txt");
        assert_eq!(entries[0]["size"], 401);
        assert_eq!(entries[599]["name"], "f000.txt");
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("plain.txt"), "").unwrap();
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));

        assert_eq!(run(&tool, json!({"directory": "nowhere"})).unwrap(), json!([]));
        assert_eq!(run(&tool, json!({"directory": "plain.txt"})).unwrap(), json!([]));
    }

    #[test]
    fn escaping_pattern_is_rejected() {
        let dir = tempdir().unwrap();
        let tool = ListDirectoryTool::new(Arc::new(Sandbox::new(dir.path()).unwrap()));
        assert!(run(&tool, json!({"pattern": "../*"})).is_err());
    }
}
