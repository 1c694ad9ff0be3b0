use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::{DispatchError, DispatchResult, Dispatcher};
use crate::llm::{ParsedCall, TextGenerator, extract_call, extract_call_strict};
use crate::prompt::PromptMessages;
use crate::tools::ToolRegistry;

/// What happened to a single request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The model replied without calling a tool
    Answered { raw: String },
    /// The model called a tool and it was dispatched
    ToolCalled {
        raw: String,
        call: ParsedCall,
        result: DispatchResult,
    },
    /// Call-shaped output that could not be parsed (strict extraction only)
    Malformed { raw: String, error: DispatchError },
}

/// Runs one request end to end: prompt, generate, extract, dispatch
pub struct Assistant {
    generator: Box<dyn TextGenerator>,
    dispatcher: Dispatcher,
    strict_extraction: bool,
}

impl Assistant {
    /// Create an assistant over a populated registry
    pub fn new(generator: impl TextGenerator + 'static, registry: Arc<ToolRegistry>) -> Self {
        Self::from_boxed(Box::new(generator), registry)
    }

    pub fn from_boxed(generator: Box<dyn TextGenerator>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            generator,
            dispatcher: Dispatcher::new(registry),
            strict_extraction: false,
        }
    }

    /// Report malformed call objects instead of treating them as answers
    pub fn with_strict_extraction(mut self, strict: bool) -> Self {
        self.strict_extraction = strict;
        self
    }

    /// Assemble the prompt for a user message
    pub fn prompt(&self, user_message: &str) -> PromptMessages {
        PromptMessages::for_request(&self.dispatcher.registry(), user_message)
    }

    /// Handle one user message.
    ///
    /// Generator failures are returned as errors; tool failures are part of
    /// the outcome.
    pub async fn handle_request(&self, user_message: &str) -> Result<RequestOutcome> {
        info!(generator = self.generator.name(), "handling request");

        let prompt = self.prompt(user_message);
        let raw = self
            .generator
            .generate(&prompt)
            .await
            .with_context(|| format!("{} generation failed", self.generator.name()))?;

        debug!(raw = %raw, "model output");

        let call = if self.strict_extraction {
            match extract_call_strict(&raw) {
                Ok(call) => call,
                Err(e) => {
                    let error = DispatchError::malformed(e.to_string());
                    return Ok(RequestOutcome::Malformed { raw, error });
                }
            }
        } else {
            extract_call(&raw)
        };

        let Some(call) = call else {
            info!("no tool call, model answered directly");
            return Ok(RequestOutcome::Answered { raw });
        };

        let result = self.dispatcher.dispatch(&call).await;
        Ok(RequestOutcome::ToolCalled { raw, call, result })
    }
}
