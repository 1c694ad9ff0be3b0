pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod schema;
pub mod tools;

pub use config::ProjectConfig;
pub use error::ToolCallerError;
pub use llm::{
    GeneratorBackend, LlmGenerator, Message, MessageRole, ParsedCall, TextGenerator, extract_call,
    extract_call_strict,
};
pub use prompt::{PromptMessages, build_system_prompt};
pub use runtime::{Assistant, DispatchError, DispatchResult, Dispatcher, ErrorKind, RequestOutcome};
pub use schema::{
    ParamRule, ParamSchema, ParamType, ToolSchema, ValidatedArgs, ValidationError,
    build_schema_block, render_schema_block, validate,
};
pub use tools::{
    DuplicatePolicy, ExecutionMode, Sandbox, ToolHandler, ToolRegistration, ToolRegistry,
    register_default_tools,
};
