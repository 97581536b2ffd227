//! # Engine Error Type
//!
//! Unified error type for every `VendingService` operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Engine                             │
//! │                                                                         │
//! │  ValidationError ─┐                                                    │
//! │  CoreError ───────┤                                                    │
//! │  StoreError ──────┼──► EngineError ──► kind() ──► ErrorResponse        │
//! │  SessionError ────┤                               { code, message }    │
//! │  password/bearer ─┘                                                    │
//! │                                                                         │
//! │  Internal details are logged with tracing::error! and replaced by a    │
//! │  generic message in the response.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Shape
//! ```json
//! {
//!   "code": "INSUFFICIENT_FUNDS",
//!   "message": "insufficient funds to spend [75], available balance is [50]"
//! }
//! ```

use serde::Serialize;
use vending_core::{Action, CoreError, StoreError, ValidationError};

use crate::session::SessionError;

/// Message for every failed session lookup.
pub const NOT_AUTHORIZED: &str = "not authorized, please log in";

/// Message for every failed login.
pub const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Stable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientFunds,
    InsufficientStock,
    Unauthorized,
    Forbidden,
    ConstraintViolation,
    Internal,
}

impl ErrorKind {
    /// The wire code, e.g. `NOT_FOUND`.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    InsufficientStock(String),

    /// Missing, malformed, unknown or expired session.
    #[error("{}", NOT_AUTHORIZED)]
    Unauthorized,

    /// Login with an unknown user or a wrong password.
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("insufficient rights to {action}")]
    Forbidden { action: &'static str },

    #[error("{0}")]
    ConstraintViolation(String),

    /// Lost an optimistic concurrency race. Retried internally.
    #[error("concurrent modification detected")]
    Conflict,

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("{operation} still conflicting after {attempts} attempts")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Forbidden error naming the attempted action.
    pub fn forbidden(action: Action) -> Self {
        EngineError::Forbidden {
            action: action.label(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            EngineError::InsufficientStock(_) => ErrorKind::InsufficientStock,
            EngineError::Unauthorized | EngineError::InvalidCredentials => ErrorKind::Unauthorized,
            EngineError::Forbidden { .. } => ErrorKind::Forbidden,
            EngineError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            EngineError::Conflict
            | EngineError::Timeout { .. }
            | EngineError::RetriesExhausted { .. }
            | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors that warrant retrying the whole transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict)
    }

    /// Outward-facing form. Internal details are logged here and never
    /// leave the engine.
    pub fn to_response(&self) -> ErrorResponse {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Internal error");
                "internal error, please try again later".to_string()
            }
            _ => self.to_string(),
        };

        ErrorResponse {
            code: kind,
            message,
        }
    }
}

/// What the outer layer serializes when an operation fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorKind,

    /// Human-readable error message for display
    pub message: String,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        err.to_response()
    }
}

/// Converts core errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientFunds { .. } => EngineError::InsufficientFunds(err.to_string()),
            CoreError::InsufficientStock { .. } => EngineError::InsufficientStock(err.to_string()),
            CoreError::InvalidDenomination { .. } | CoreError::AmountOverflow { .. } => {
                EngineError::InvalidInput(err.to_string())
            }
            CoreError::Validation(inner) => inner.into(),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

/// Converts store outcomes to engine errors.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            StoreError::ConstraintViolation { field, detail } => {
                tracing::debug!(field = %field, detail = %detail, "Constraint violation");
                EngineError::ConstraintViolation(match field.as_str() {
                    "username" => "username already exists".to_string(),
                    "products" => "account still owns products".to_string(),
                    _ => format!("constraint violation on {field}"),
                })
            }
            StoreError::Conflict => EngineError::Conflict,
            StoreError::Timeout => EngineError::Timeout { operation: "store" },
            StoreError::Backend(msg) => EngineError::Internal(msg),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        EngineError::Internal(err.to_string())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
