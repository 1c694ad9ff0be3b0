mod generator;
mod message;
mod provider;
mod tool_call;

pub use generator::{GeneratorBackend, LlmGenerator};
pub use message::{Message, MessageRole};
pub use provider::TextGenerator;
pub use tool_call::{ParsedCall, extract_call, extract_call_strict};
