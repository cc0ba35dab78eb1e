//! Error types for the chatplug domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context (filters, memory, tools) has its own error enum.

use thiserror::Error;

/// The top-level error type for chatplug front ends such as the CLI.
#[derive(Debug, Error)]
pub enum Error {
    // --- Filter errors ---
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Input ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Filter {filter} failed: {reason}")]
    Failed { filter: String, reason: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_error_wraps_memory_error() {
        let err = Error::from(FilterError::from(MemoryError::Storage("disk full".into())));
        assert!(err.to_string().contains("disk full"));
        assert!(err.to_string().starts_with("Filter error"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: "client build failed".into(),
        });
        assert!(err.to_string().contains("web_search"));
        assert!(err.to_string().contains("client build failed"));
    }

    #[test]
    fn input_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(parse), Error::Serialization(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "body.json");
        assert!(Error::from(io).to_string().starts_with("I/O error"));
    }
}
