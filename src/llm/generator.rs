use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, MessageType};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use super::{MessageRole, TextGenerator};
use crate::prompt::PromptMessages;

/// Backends reachable through the llm crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    Anthropic,
    OpenAI,
    /// Local models served by Ollama
    Ollama,
}

impl GeneratorBackend {
    fn default_model(&self) -> &'static str {
        match self {
            GeneratorBackend::Anthropic => "claude-sonnet-4-20250514",
            GeneratorBackend::OpenAI => "gpt-4o",
            GeneratorBackend::Ollama => "gemma3:4b",
        }
    }

    fn api_key_var(&self) -> Option<&'static str> {
        match self {
            GeneratorBackend::Anthropic => Some("ANTHROPIC_API_KEY"),
            GeneratorBackend::OpenAI => Some("OPENAI_API_KEY"),
            GeneratorBackend::Ollama => None,
        }
    }

    fn llm_backend(&self) -> LLMBackend {
        match self {
            GeneratorBackend::Anthropic => LLMBackend::Anthropic,
            GeneratorBackend::OpenAI => LLMBackend::OpenAI,
            GeneratorBackend::Ollama => LLMBackend::Ollama,
        }
    }
}

impl FromStr for GeneratorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(GeneratorBackend::Anthropic),
            "openai" => Ok(GeneratorBackend::OpenAI),
            "ollama" => Ok(GeneratorBackend::Ollama),
            _ => anyhow::bail!("unknown provider: {}", s),
        }
    }
}

impl fmt::Display for GeneratorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorBackend::Anthropic => write!(f, "anthropic"),
            GeneratorBackend::OpenAI => write!(f, "openai"),
            GeneratorBackend::Ollama => write!(f, "ollama"),
        }
    }
}

/// Text generator backed by the llm crate
pub struct LlmGenerator {
    backend: GeneratorBackend,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmGenerator {
    /// Create a generator for `backend`, reading its API key from the environment
    pub fn new(backend: GeneratorBackend, model: Option<&str>) -> Result<Self> {
        let api_key = match backend.api_key_var() {
            Some(var) => Some(
                std::env::var(var).with_context(|| format!("{} environment variable not set", var))?,
            ),
            None => None,
        };

        Ok(Self {
            backend,
            model: model.unwrap_or(backend.default_model()).to_string(),
            api_key,
            base_url: None,
            max_tokens: 1024,
            timeout: Duration::from_secs(120),
        })
    }

    /// Override the endpoint (e.g. a remote Ollama host)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    fn name(&self) -> &str {
        match self.backend {
            GeneratorBackend::Anthropic => "anthropic",
            GeneratorBackend::OpenAI => "openai",
            GeneratorBackend::Ollama => "ollama",
        }
    }

    async fn generate(&self, prompt: &PromptMessages) -> Result<String> {
        let mut builder = LLMBuilder::new()
            .backend(self.backend.llm_backend())
            .model(&self.model)
            .system(&prompt.system)
            .max_tokens(self.max_tokens);

        if let Some(api_key) = &self.api_key {
            builder = builder.api_key(api_key);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url);
        }

        let llm = builder.build().context("failed to build LLM client")?;

        // System content travels through the builder, not the message list
        let chat_messages: Vec<ChatMessage> = prompt
            .messages()
            .into_iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    MessageRole::User => ChatRole::User,
                    MessageRole::Assistant => ChatRole::Assistant,
                    MessageRole::System => return None,
                };
                Some(ChatMessage {
                    role,
                    message_type: MessageType::Text,
                    content: msg.content,
                })
            })
            .collect();

        debug!(backend = %self.backend, model = %self.model, "requesting completion");

        let response = timeout(self.timeout, llm.chat(&chat_messages))
            .await
            .with_context(|| {
                format!(
                    "{} API call timed out after {} seconds",
                    self.backend,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("failed to call {} API", self.backend))?;

        Ok(response.text().unwrap_or_else(|| {
            warn!(backend = %self.backend, "API returned empty or missing response text");
            String::new()
        }))
    }
}
