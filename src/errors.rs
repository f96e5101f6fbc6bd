use crate::api::ApiResponse;
use crate::extraction::{format_error_message, ExtractionError};
use crate::llm_providers::ModelError;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

pub type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("LLM service error: {0}")]
    LLMError(String),

    /// Carries the message already worded for end users.
    #[error("{0}")]
    ExtractionError(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> ErrorResponse {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Rejected request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::ExtractionError(message) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Text extraction failed"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(message.clone())),
                )
            }
            ApiError::PayloadTooLarge(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Payload too large"
                );
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        "AI service temporarily unavailable. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "Database operation failed. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(anyhow::Error::from(err))
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::LLMError(err.to_string())
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        ApiError::ExtractionError(format_error_message(&err))
    }
}

/// Helper function to detect error types from anyhow error messages
pub fn classify_database_error(error: &anyhow::Error) -> ApiError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("not found") || error_str.contains("no rows") {
        ApiError::NotFound("Resource not found".to_string())
    } else if error_str.contains("foreign key constraint") {
        ApiError::ValidationError("Referenced resource does not exist".to_string())
    } else if error_str.contains("required") || error_str.contains("cannot be null") {
        ApiError::ValidationError("Required field is missing or invalid".to_string())
    } else {
        ApiError::DatabaseError(anyhow::anyhow!("{}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("get_note", "note")
            .with_id("123")
            .with_user_message("Custom message");

        assert_eq!(context.operation, "get_note");
        assert_eq!(context.resource_type, "note");
        assert_eq!(context.resource_id, Some("123".to_string()));
        assert_eq!(
            context.user_friendly_message,
            Some("Custom message".to_string())
        );
    }

    #[test]
    fn test_error_classification() {
        let missing = anyhow::anyhow!("No rows returned");
        assert!(matches!(classify_database_error(&missing), ApiError::NotFound(_)));

        let orphan = anyhow::anyhow!("FOREIGN KEY constraint failed");
        assert!(matches!(classify_database_error(&orphan), ApiError::ValidationError(_)));

        let null = anyhow::anyhow!("Field cannot be null");
        assert!(matches!(classify_database_error(&null), ApiError::ValidationError(_)));

        let other = anyhow::anyhow!("disk I/O error");
        assert!(matches!(classify_database_error(&other), ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_status_mapping() {
        let context = || ErrorContext::new("test", "resource");

        let (status, _) = ApiError::NotFound("Quiz 9".to_string()).to_response_with_context(context());
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = ApiError::ValidationError("bad".to_string()).to_response_with_context(context());
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = ApiError::PayloadTooLarge("12 MB".to_string()).to_response_with_context(context());
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let model = ModelError::EmptyResponse { provider: "Gemini" };
        let (status, Json(body)) = ApiError::from(model).to_response_with_context(context());
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.success);
    }

    #[test]
    fn test_extraction_error_uses_friendly_message() {
        let err = ApiError::from(ExtractionError::UnsupportedFormat(".pptx".to_string()));
        let (status, Json(body)) = err.to_response_with_context(ErrorContext::new("upload", "file"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.error.as_deref(),
            Some("Invalid file format. Please upload a valid TXT, PDF, or DOCX file.")
        );
    }
}
