//! System/user message assembly around the published tool list.

use serde::{Deserialize, Serialize};

use crate::llm::Message;
use crate::schema::render_schema_block;
use crate::tools::ToolRegistry;

/// The system/user pair sent to the model for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

impl PromptMessages {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Build the prompt advertising every tool in `registry`
    pub fn for_request(registry: &ToolRegistry, user_message: impl Into<String>) -> Self {
        Self::new(
            build_system_prompt(&render_schema_block(registry)),
            user_message,
        )
    }

    pub fn messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Instruction block embedding the published tool list verbatim
pub fn build_system_prompt(schema_json: &str) -> String {
    format!(
        r#"You have access to functions. If you decide to invoke any function, reply *only* with a JSON object of the form
{{"name": <func>, "parameters": {{...}}}} and no other text.
The functions you can call are:

{schema_json}

Reply in natural language with the result of the function call. You can also answer questions directly, if you prefer."#
    )
}
