//! Error types for the gymcoach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all gymcoach operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Phrases providers use when a request does not fit the model's window.
const OVERFLOW_MARKERS: &[&str] = &[
    "context_length_exceeded",
    "maximum context length",
    "context window",
    "too many tokens",
    "prompt is too long",
];

impl ProviderError {
    /// Whether this failure means the prompt did not fit the model's context window.
    ///
    /// Covers the dedicated variant as well as raw API errors whose body
    /// carries one of the well-known overflow markers.
    pub fn is_context_overflow(&self) -> bool {
        match self {
            ProviderError::ContextWindowExceeded(_) => true,
            ProviderError::ApiError { status_code, message } => {
                (*status_code == 400 || *status_code == 413) && mentions_overflow(message)
            }
            _ => false,
        }
    }
}

/// Check free text for a context-overflow marker (case-insensitive).
pub fn mentions_overflow(text: &str) -> bool {
    let lower = text.to_lowercase();
    OVERFLOW_MARKERS.iter().any(|m| lower.contains(m))
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Tool-level failures.
///
/// These never abort a turn: the loop turns each one into a tool-result
/// message so the model can see what went wrong and continue.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{0}' is not enabled for this conversation")]
    BlockedByScope(String),

    #[error("Invalid input for {tool_name}: {}", errors.join("; "))]
    InputInvalid {
        tool_name: String,
        errors: Vec<String>,
    },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    /// Stable machine-readable code sent back to the model.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "tool_not_found",
            ToolError::BlockedByScope(_) => "tool_blocked_by_scope",
            ToolError::InputInvalid { .. } => "tool_input_invalid",
            ToolError::ExecutionFailed { .. } => "tool_execution_failed",
        }
    }

    /// Render as the JSON payload of a tool-result message.
    pub fn to_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let ToolError::InputInvalid { errors, .. } = self {
            payload["details"] = serde_json::json!(errors);
        }
        payload
    }
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        ToolError::ExecutionFailed {
            tool_name: "store".into(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn overflow_detection_covers_variant_and_api_body() {
        assert!(ProviderError::ContextWindowExceeded("x".into()).is_context_overflow());
        assert!(
            ProviderError::ApiError {
                status_code: 400,
                message: r#"{"error":{"code":"context_length_exceeded"}}"#.into(),
            }
            .is_context_overflow()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 500,
                message: "context_length_exceeded".into(),
            }
            .is_context_overflow()
        );
        assert!(!ProviderError::Network("reset".into()).is_context_overflow());
    }

    #[test]
    fn input_invalid_payload_lists_details() {
        let err = ToolError::InputInvalid {
            tool_name: "create_template".into(),
            errors: vec!["name: required".into(), "exercises: expected array".into()],
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"], "tool_input_invalid");
        assert_eq!(payload["details"].as_array().unwrap().len(), 2);
        assert!(err.to_string().contains("name: required"));
    }
}
