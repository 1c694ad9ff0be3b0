#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use tool_caller::{PromptMessages, Sandbox, TextGenerator, ToolRegistry, register_default_tools};

/// A mock generator that replays scripted completions in order.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<PromptMessages>>>,
}

impl ScriptedGenerator {
    /// Create a mock that returns a single completion.
    pub fn single_response(text: &str) -> Self {
        Self::with_responses(vec![text])
    }

    /// Create a mock from a sequence of completions (popped in order).
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the prompts this generator has received.
    pub fn prompts(&self) -> Arc<Mutex<Vec<PromptMessages>>> {
        Arc::clone(&self.prompts)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &PromptMessages) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let mut queue = self.responses.lock().unwrap();
        queue
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("ScriptedGenerator: no more responses in queue"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Create a registry with the built-in tools confined to `root` (same as main.rs).
pub fn create_test_tool_registry(root: &Path) -> Arc<ToolRegistry> {
    let sandbox = Arc::new(Sandbox::new(root).unwrap());
    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, &sandbox).unwrap();
    Arc::new(registry)
}
