#[derive(Debug, thiserror::Error)]
pub enum ToolCallerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid schema for tool '{tool_name}': {message}")]
    InvalidSchema { tool_name: String, message: String },

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("malformed tool call: {0}")]
    MalformedCall(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
