use anyhow::Result;
use async_trait::async_trait;

use crate::prompt::PromptMessages;

/// Text-generation backend the assistant is given at construction time.
///
/// Implementations receive the fully assembled system/user pair and return
/// the raw completion text, which may or may not contain a tool call.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &PromptMessages) -> Result<String>;

    /// Get the generator name
    fn name(&self) -> &str;
}
