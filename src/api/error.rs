//! Structured API error responses with error codes
//!
//! Consistent error handling across all API endpoints with machine-readable
//! error codes and human-readable messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::settlement::{AvailabilityError, BridgeError};
use crate::validator::ValidationError;
use crate::vault::SettlementError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Ticket validation errors (1xxx)
    /// No payment ticket was attached to the request
    MissingTicket,
    /// Ticket sequence does not supersede the accepted watermark
    OutdatedSequence,
    /// Ticket names a different payee identity
    WrongPayee,
    /// Ticket targets a different vault deployment
    WrongVault,
    /// Cumulative amount is below the per-request cost
    AmountBelowFloor,
    /// Signature does not recover to the authorized signer
    BadSignature,

    // Settlement errors (2xxx)
    /// Claim amount exceeds the vault's available balance
    InsufficientVaultBalance,
    /// Claim sequence does not exceed the vault's last accepted sequence
    SequenceNotMonotonic,
    /// Caller is not authorized for this vault operation
    Unauthorized,

    // Request errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,

    // Infrastructure errors (8xxx)
    /// Ledger or privacy relay unavailable
    UpstreamUnavailable,
    /// Settlement submitted but outcome unknown
    OutcomeUnknown,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Validation (1xxx)
            ErrorCode::MissingTicket => 1001,
            ErrorCode::OutdatedSequence => 1002,
            ErrorCode::WrongPayee => 1003,
            ErrorCode::WrongVault => 1004,
            ErrorCode::AmountBelowFloor => 1005,
            ErrorCode::BadSignature => 1006,

            // Settlement (2xxx)
            ErrorCode::InsufficientVaultBalance => 2001,
            ErrorCode::SequenceNotMonotonic => 2002,
            ErrorCode::Unauthorized => 2003,

            // Request (3xxx)
            ErrorCode::InvalidRequestBody => 3001,

            // Infrastructure (8xxx)
            ErrorCode::UpstreamUnavailable => 8001,
            ErrorCode::OutcomeUnknown => 8002,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Validation rejections -> 402
            ErrorCode::MissingTicket => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::OutdatedSequence => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::WrongPayee => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::WrongVault => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::AmountBelowFloor => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::BadSignature => StatusCode::PAYMENT_REQUIRED,

            // Settlement rejections -> 409/403
            ErrorCode::InsufficientVaultBalance => StatusCode::CONFLICT,
            ErrorCode::SequenceNotMonotonic => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::FORBIDDEN,

            // Request -> 400
            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,

            // Infrastructure -> 500/503
            ErrorCode::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::OutcomeUnknown => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::MissingTicket => "MISSING_TICKET",
            ErrorCode::OutdatedSequence => "OUTDATED_SEQUENCE",
            ErrorCode::WrongPayee => "WRONG_PAYEE",
            ErrorCode::WrongVault => "WRONG_VAULT",
            ErrorCode::AmountBelowFloor => "AMOUNT_BELOW_FLOOR",
            ErrorCode::BadSignature => "BAD_SIGNATURE",
            ErrorCode::InsufficientVaultBalance => "INSUFFICIENT_VAULT_BALANCE",
            ErrorCode::SequenceNotMonotonic => "SEQUENCE_NOT_MONOTONIC",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::OutcomeUnknown => "OUTCOME_UNKNOWN",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        // Add error code header for easier debugging
        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversions from domain errors
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::MissingTicket => ApiError::new(ErrorCode::MissingTicket, message),
            ValidationError::OutdatedSequence { sequence, watermark } => {
                ApiError::new(ErrorCode::OutdatedSequence, message).with_details(
                    serde_json::json!({
                        "sequence": sequence.to_string(),
                        "watermark": watermark.to_string(),
                    }),
                )
            }
            ValidationError::WrongPayee => ApiError::new(ErrorCode::WrongPayee, message),
            ValidationError::WrongVault => ApiError::new(ErrorCode::WrongVault, message),
            ValidationError::AmountBelowFloor { amount, floor } => {
                ApiError::new(ErrorCode::AmountBelowFloor, message).with_details(
                    serde_json::json!({
                        "amount": amount.to_string(),
                        "floor": floor.to_string(),
                    }),
                )
            }
            ValidationError::BadSignature => ApiError::new(ErrorCode::BadSignature, message),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        let message = err.to_string();
        match err {
            SettlementError::InsufficientVaultBalance { amount, available } => {
                ApiError::new(ErrorCode::InsufficientVaultBalance, message).with_details(
                    serde_json::json!({
                        "amount": amount.to_string(),
                        "available": available.to_string(),
                    }),
                )
            }
            SettlementError::SequenceNotMonotonic { sequence, last_accepted } => {
                ApiError::new(ErrorCode::SequenceNotMonotonic, message).with_details(
                    serde_json::json!({
                        "sequence": sequence.to_string(),
                        "lastAcceptedSequence": last_accepted.to_string(),
                    }),
                )
            }
            SettlementError::Unauthorized(_) => ApiError::new(ErrorCode::Unauthorized, message),
        }
    }
}

impl From<AvailabilityError> for ApiError {
    fn from(err: AvailabilityError) -> Self {
        let message = err.to_string();
        match err {
            AvailabilityError::NotReady(_) => {
                ApiError::new(ErrorCode::UpstreamUnavailable, message)
            }
            AvailabilityError::OutcomeUnknown(_) => {
                ApiError::new(ErrorCode::OutcomeUnknown, message)
            }
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Settlement(e) => e.into(),
            BridgeError::Unavailable(e) => e.into(),
        }
    }
}

impl From<crate::crypto::SigningError> for ApiError {
    fn from(err: crate::crypto::SigningError) -> Self {
        ApiError::new(ErrorCode::InternalError, err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
