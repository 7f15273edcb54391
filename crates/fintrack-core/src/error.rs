//! Error types for fintrack-core
//!
//! Every failure a store operation can surface is a [`ClientError`]. The
//! variants follow the HTTP taxonomy of the backend: no response at all,
//! rejected input, expired credentials, missing resources, and server faults.
//! Errors are `Clone` because a store keeps the last one in its state while
//! also handing it back to the caller.

use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No response from the server
    Network,
    /// Request rejected (4xx)
    Validation,
    /// Missing or expired credentials (401)
    Unauthorized,
    /// Resource does not exist (404)
    NotFound,
    /// Server failure (5xx)
    Server,
    /// Response body could not be decoded
    Decode,
    /// Token persistence failed
    Storage,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Network => write!(f, "NETWORK"),
            ErrorCode::Validation => write!(f, "VALIDATION"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::Server => write!(f, "SERVER"),
            ErrorCode::Decode => write!(f, "DECODE"),
            ErrorCode::Storage => write!(f, "STORAGE"),
        }
    }
}

/// Detailed error information for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// HTTP status, when the server answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            status: None,
            suggestions: vec![],
        }
    }

    /// Add the HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - the user can correct it
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - backend is unhealthy
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for fintrack-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request rejected ({status}): {detail}")]
    Validation { status: u16, detail: String },

    #[error("Not authenticated: {detail}")]
    Unauthorized { detail: String },

    #[error("Not found: {detail}")]
    NotFound { detail: String },

    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Invalid response: {message}")]
    Decode { message: String },

    #[error("Token storage error: {message}")]
    Storage { message: String },
}

impl ClientError {
    /// Classify a non-success HTTP response
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            401 => ClientError::Unauthorized {
                detail: detail.unwrap_or_else(|| "Could not validate credentials".to_string()),
            },
            404 => ClientError::NotFound {
                detail: detail.unwrap_or_else(|| "Not found".to_string()),
            },
            400..=499 => ClientError::Validation {
                status,
                detail: detail.unwrap_or_else(|| "Request failed".to_string()),
            },
            500..=599 => ClientError::Server {
                status,
                detail: detail.unwrap_or_else(|| "An unexpected error occurred".to_string()),
            },
            _ => ClientError::Decode {
                message: format!("unexpected HTTP status {}", status),
            },
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Network { .. } => ErrorCode::Network,
            ClientError::Validation { .. } => ErrorCode::Validation,
            ClientError::Unauthorized { .. } => ErrorCode::Unauthorized,
            ClientError::NotFound { .. } => ErrorCode::NotFound,
            ClientError::Server { .. } => ErrorCode::Server,
            ClientError::Decode { .. } => ErrorCode::Decode,
            ClientError::Storage { .. } => ErrorCode::Storage,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ClientError::Network { .. } => ErrorSeverity::Error,
            ClientError::Validation { .. } => ErrorSeverity::Warning,
            ClientError::Unauthorized { .. } => ErrorSeverity::Warning,
            ClientError::NotFound { .. } => ErrorSeverity::Info,
            ClientError::Server { .. } => ErrorSeverity::Critical,
            ClientError::Decode { .. } => ErrorSeverity::Error,
            ClientError::Storage { .. } => ErrorSeverity::Error,
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Validation { status, .. } | ClientError::Server { status, .. } => Some(*status),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    /// Message shown to the user as-is
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network { .. } => "Network error".to_string(),
            ClientError::Validation { detail, .. }
            | ClientError::Unauthorized { detail }
            | ClientError::NotFound { detail }
            | ClientError::Server { detail, .. } => detail.clone(),
            ClientError::Decode { message } | ClientError::Storage { message } => message.clone(),
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());
        if let Some(status) = self.status() {
            details = details.with_status(status);
        }

        match self {
            ClientError::Network { .. } => {
                details = details.with_suggestion(
                    "Check that the API server is running and api.base_url is correct.".to_string()
                );
            }
            ClientError::Unauthorized { .. } => {
                details = details.with_suggestion(
                    "Run `fintrack login` to sign in again.".to_string()
                );
            }
            ClientError::NotFound { .. } => {
                details = details.with_suggestion(
                    "The record may have been deleted; reload the list.".to_string()
                );
            }
            ClientError::Server { .. } => {
                details = details.with_suggestion(
                    "Retry later; the server reported an internal failure.".to_string()
                );
            }
            ClientError::Storage { .. } => {
                details = details.with_suggestion(
                    "Check that session.token_path is writable.".to_string()
                );
            }
            _ => {}
        }

        details
    }
}

/// Pull the `detail` message out of an error body.
///
/// FastAPI sends either `{"detail": "..."}` or, for schema violations,
/// `{"detail": [{"msg": "...", ...}]}`.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(|msg| msg.as_str())
            .map(str::to_string),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Result type with ClientError
pub type ClientResult<T> = Result<T, ClientError>;

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation being performed, e.g. `transactions.create`
    pub operation: String,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            data: serde_json::json!({}),
        }
    }

    /// Add context data
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &ClientError, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &ClientError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Info => log::info!(
                target: "fintrack::error",
                "[{}] {} - Operation: {} - Data: {}",
                error.code(), error, context.operation, context.data
            ),
            ErrorSeverity::Warning => log::warn!(
                target: "fintrack::error",
                "[{}] {} - Operation: {} - Data: {}",
                error.code(), error, context.operation, context.data
            ),
            ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
                target: "fintrack::error",
                "[{}] {} - Operation: {} - Data: {}",
                error.code(), error, context.operation, context.data
            ),
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Network.to_string(), "NETWORK");
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(ErrorCode::Unauthorized.to_string(), "UNAUTHORIZED");
    }

    #[test]
    fn test_unauthorized_keeps_server_detail() {
        let error = ClientError::from_response(401, r#"{"detail": "Incorrect email or password"}"#);
        assert_eq!(error, ClientError::Unauthorized { detail: "Incorrect email or password".to_string() });
        assert_eq!(error.user_message(), "Incorrect email or password");
        assert!(error.is_unauthorized());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(ClientError::from_response(404, "").code(), ErrorCode::NotFound);
        assert_eq!(ClientError::from_response(400, r#"{"detail":"Email already registered"}"#).code(), ErrorCode::Validation);
        assert_eq!(ClientError::from_response(422, "{}").code(), ErrorCode::Validation);
        assert_eq!(ClientError::from_response(503, "Service Unavailable").code(), ErrorCode::Server);
        assert_eq!(ClientError::from_response(302, "").code(), ErrorCode::Decode);
    }

    #[test]
    fn test_validation_array_detail() {
        let body = r#"{"detail":[{"loc":["body","amount"],"msg":"field required","type":"value_error.missing"}]}"#;
        let error = ClientError::from_response(422, body);
        assert_eq!(error.user_message(), "field required");
        assert_eq!(error.status(), Some(422));
    }

    #[test]
    fn test_fallback_messages() {
        assert_eq!(ClientError::from_response(500, "<html>").user_message(), "An unexpected error occurred");
        assert_eq!(ClientError::Network { message: "connection refused".to_string() }.user_message(), "Network error");
    }

    #[test]
    fn test_severity() {
        assert_eq!(ClientError::from_response(500, "").severity(), ErrorSeverity::Critical);
        assert_eq!(ClientError::from_response(404, "").severity(), ErrorSeverity::Info);
        assert_eq!(ClientError::from_response(400, "").severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_details_suggestions() {
        let details = ClientError::Unauthorized { detail: "expired".to_string() }.to_details();
        assert_eq!(details.code, ErrorCode::Unauthorized);
        assert_eq!(details.status, Some(401));
        assert!(details.to_string().contains("fintrack login"));
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("transactions.update")
            .with_data("id", serde_json::json!("abc"));
        assert_eq!(context.operation, "transactions.update");
        assert_eq!(context.data["id"], "abc");
    }
}
