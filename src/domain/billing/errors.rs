//! Billing error types.
//!
//! Defines the error conditions of webhook reconciliation and the credit
//! ledger, with HTTP status code mapping and retryability semantics. The
//! status codes drive the provider's retry behavior, so only genuinely
//! retryable failures may map to 5xx.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
///
/// Business-rule rejections (scope mismatch, unknown order, amount
/// mismatch) are NOT errors; they are recorded as terminal event-marker
/// statuses and acknowledged with 200.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature header absent from the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// Failed to parse the webhook payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Provider omitted the event id; deduplication is impossible.
    #[error("Missing event id")]
    MissingEventId,

    /// Required field missing from the webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// - 4xx: rejected, the provider must not retry
    /// - 5xx: transient, the provider retries and re-enters the
    ///   idempotent path
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MissingSignature
            | WebhookError::ParseError(_)
            | WebhookError::MissingEventId
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

/// Errors that occur on the credit ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Balance is lower than the requested debit.
    #[error("Insufficient credits: {available} available, {requested} requested")]
    InsufficientCredits { available: i64, requested: i64 },

    /// Credit or debit amount was zero or negative.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// Referenced user does not exist.
    #[error("User not found")]
    UserNotFound,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            LedgerError::UserNotFound => StatusCode::NOT_FOUND,
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        LedgerError::Database(err.to_string())
    }
}
