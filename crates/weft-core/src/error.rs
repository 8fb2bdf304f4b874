use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeftError {
    // Definition errors
    #[error("Invalid workflow: {0}")]
    Structural(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    // Unit errors
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Unit execution failed: {unit}: {message}")]
    UnitExecution { unit: String, message: String },

    #[error("Unit timeout after {timeout_secs}s: {unit}")]
    UnitTimeout { unit: String, timeout_secs: u64 },

    // Chat provider errors
    #[error("Chat request failed: {0}")]
    ChatRequest(String),

    #[error("Chat response parse error: {0}")]
    ChatParse(String),

    #[error("Chat provider not supported: {0}")]
    UnsupportedProvider(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;
