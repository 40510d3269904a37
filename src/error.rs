//! Unified error type for the fee engine.
//!
//! Local validation failures never reach the provider; provider failures are
//! never silently swallowed. Each variant maps to an HTTP status and a
//! user-facing message that leaks neither credentials nor raw request bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

pub type FeeResult<T> = Result<T, FeeError>;

#[derive(Debug, Clone, Error)]
pub enum FeeError {
    #[error("Invalid input: {message}")]
    InvalidInput {
        field: Option<String>,
        message: String,
    },

    #[error("Provider authentication failed: {message}")]
    ProviderAuth { message: String },

    #[error("Provider rejected the request: {message}")]
    ProviderRejected {
        message: String,
        code: Option<String>,
    },

    #[error("Provider state unknown: {message}")]
    ProviderUnknownState { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FeeError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        FeeError::InvalidInput {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            FeeError::InvalidInput { .. } => 400,
            FeeError::ProviderAuth { .. } => 502,
            FeeError::ProviderRejected { .. } => 502,
            FeeError::ProviderUnknownState { .. } => 504,
            FeeError::Internal { .. } => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            FeeError::InvalidInput { .. } => false,
            FeeError::ProviderAuth { .. } => true,
            FeeError::ProviderRejected { .. } => false,
            FeeError::ProviderUnknownState { .. } => true,
            FeeError::Internal { .. } => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            FeeError::InvalidInput { .. } => "INVALID_INPUT",
            FeeError::ProviderAuth { .. } => "PROVIDER_AUTH_ERROR",
            FeeError::ProviderRejected { .. } => "PROVIDER_REJECTED",
            FeeError::ProviderUnknownState { .. } => "PROVIDER_UNKNOWN_STATE",
            FeeError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            FeeError::InvalidInput { message, .. } => message.clone(),
            // Auth detail stays in the logs; end users cannot act on it.
            FeeError::ProviderAuth { .. } => {
                "Payment provider is temporarily unavailable. Please try again".to_string()
            }
            FeeError::ProviderRejected { message, .. } => {
                format!(
                    "Payment request was declined: {}. Please retry or use another method",
                    message
                )
            }
            FeeError::ProviderUnknownState { .. } => {
                "Payment status is not yet known. Please wait for confirmation before retrying"
                    .to_string()
            }
            FeeError::Internal { .. } => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
        }
    }
}

/// JSON body returned to clients for every error case.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn from_fee_error(error: &FeeError) -> Self {
        Self {
            error: error.error_code(),
            message: error.user_message(),
            retryable: error.is_retryable(),
            timestamp: Utc::now().to_rfc3339(),
            field: match error {
                FeeError::InvalidInput { field, .. } => field.clone(),
                _ => None,
            },
        }
    }
}

impl IntoResponse for FeeError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from_fee_error(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            FeeError::invalid_input("amount", "must be positive").http_status_code(),
            400
        );
        assert_eq!(
            FeeError::ProviderRejected {
                message: "invalid shortcode".to_string(),
                code: Some("400.002.02".to_string()),
            }
            .http_status_code(),
            502
        );
        assert_eq!(
            FeeError::ProviderUnknownState {
                message: "timed out".to_string()
            }
            .http_status_code(),
            504
        );
    }

    #[test]
    fn retryable_flags_are_set() {
        assert!(FeeError::ProviderAuth {
            message: "exchange failed".to_string()
        }
        .is_retryable());
        assert!(!FeeError::ProviderRejected {
            message: "declined".to_string(),
            code: None,
        }
        .is_retryable());
        assert!(FeeError::ProviderUnknownState {
            message: "timeout".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn auth_errors_are_not_surfaced_verbatim() {
        let error = FeeError::ProviderAuth {
            message: "401 from https://provider/oauth with key abc".to_string(),
        };
        assert!(!error.user_message().contains("abc"));
    }

    #[test]
    fn rejected_errors_carry_the_provider_message() {
        let error = FeeError::ProviderRejected {
            message: "The initiator information is invalid".to_string(),
            code: None,
        };
        assert!(error.user_message().contains("initiator information"));
    }
}
