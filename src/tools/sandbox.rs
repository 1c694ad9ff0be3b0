use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Directory that confines every file tool.
///
/// Paths handed to [`Sandbox::resolve`] are relative to the root. Absolute
/// paths, `..` components and symlinks that lead outside the root are
/// rejected.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open (creating if needed) a sandbox rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create sandbox root: {}", root.display()))?;
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("failed to resolve sandbox root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a sandbox-relative path to an absolute path inside the root
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        if path.has_root() {
            anyhow::bail!("absolute paths are not allowed: {}", path.display());
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            anyhow::bail!("path traversal detected: '..' is not allowed in paths");
        }

        let candidate = self.root.join(path);

        // Canonicalize the deepest ancestor that exists (symlinks included) so
        // links pointing outside the root are caught
        let existing = candidate
            .ancestors()
            .find(|ancestor| ancestor.symlink_metadata().is_ok())
            .unwrap_or(&self.root);
        let canonical = std::fs::canonicalize(existing)
            .with_context(|| format!("failed to resolve path: {}", path.display()))?;

        if !canonical.starts_with(&self.root) {
            anyhow::bail!("path escapes sandbox root: {}", path.display());
        }

        let remainder = candidate
            .strip_prefix(existing)
            .with_context(|| format!("invalid path: {}", path.display()))?;
        Ok(canonical.join(remainder))
    }

    /// Express an absolute path inside the sandbox relative to the root
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
