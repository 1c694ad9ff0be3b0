use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tools::DuplicatePolicy;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tool-caller.toml";

const DEFAULT_SANDBOX_ROOT: &str = "sandbox";

/// Project-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Generation backend to use (e.g., "anthropic", "openai", "ollama")
    #[serde(default)]
    pub provider: Option<String>,

    /// Model to use
    #[serde(default)]
    pub model: Option<String>,

    /// Endpoint override for the backend
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens to generate per request
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Generation timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Directory the file tools are confined to
    #[serde(default)]
    pub sandbox_root: Option<PathBuf>,

    /// Behavior when two tools share a name
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Report malformed call objects instead of treating them as answers
    #[serde(default)]
    pub strict_extraction: bool,
}

impl ProjectConfig {
    /// Load configuration with precedence: project file > global file > defaults
    pub fn load() -> Result<Self> {
        let project = Path::new(CONFIG_FILE_NAME);
        if project.exists() {
            return Self::load_from(project);
        }

        if let Some(global) = Self::global_path() {
            if global.exists() {
                return Self::load_from(&global);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `$HOME/.config/tool-caller/config.toml`
    pub fn global_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("tool-caller")
                .join("config.toml")
        })
    }

    pub fn sandbox_root(&self) -> PathBuf {
        self.sandbox_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SANDBOX_ROOT))
    }
}
