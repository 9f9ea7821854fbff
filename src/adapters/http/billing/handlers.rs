//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The webhook handler captures the raw body bytes before any
//! parsing - the provider's signature covers the exact wire bytes, and
//! re-serializing parsed JSON would invalidate it.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CreateOrderCommand, CreateOrderHandler, GetBalanceHandler, GetBalanceQuery,
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, VerifyPaymentCommand,
    VerifyPaymentError, VerifyPaymentHandler,
};
use crate::domain::billing::{
    ClientConfirmationVerifier, LedgerError, Reconciler, WebhookError, WebhookVerifier,
};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{CreditLedger, EventMarkerRepository, OrderRepository};

use super::dto::{
    ApiResponse, BalanceResponse, CreateOrderRequest, ErrorBody, OrderResponse,
    VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck,
};

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all billing dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub orders: Arc<dyn OrderRepository>,
    pub ledger: Arc<dyn CreditLedger>,
    pub event_markers: Arc<dyn EventMarkerRepository>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub confirmation_verifier: Arc<ClientConfirmationVerifier>,
    pub reconciler: Arc<Reconciler>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> HandleProviderWebhookHandler {
        HandleProviderWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.event_markers.clone(),
            self.reconciler.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.confirmation_verifier.clone(),
            self.orders.clone(),
            self.ledger.clone(),
        )
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(self.orders.clone())
    }

    pub fn balance_handler(&self) -> GetBalanceHandler {
        GetBalanceHandler::new(self.ledger.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// In production, this would be extracted from JWT/session by auth
/// middleware. For now, uses a header-based extraction for
/// development/testing.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let body: ApiResponse<()> =
            ApiResponse::error("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // In production, this would validate a session token from the
            // Authorization header. For development, we accept X-User-Id.
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<UserId>().ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint (provider-facing)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/razorpay - Handle provider webhook deliveries.
///
/// Responds in the provider's status-code vocabulary: 200 for every
/// admitted, deduplicated, or business-rule-rejected outcome; 400 for
/// requests the provider must not retry; 500 only when a retry can help.
pub async fn handle_provider_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        let err = WebhookError::MissingSignature;
        return (
            err.status_code(),
            Json(ErrorBody {
                code: "MISSING_SIGNATURE".to_string(),
                message: err.to_string(),
            }),
        )
            .into_response();
    };

    let handler = state.webhook_handler();
    let cmd = HandleProviderWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match handler.handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAck { received: true })).into_response(),
        Err(err) => (
            err.status_code(),
            Json(ErrorBody {
                code: "WEBHOOK_REJECTED".to_string(),
                message: err.to_string(),
            }),
        )
            .into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Client Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/orders - Record a purchase order.
pub async fn create_order(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.create_order_handler();
    let cmd = CreateOrderCommand {
        user_id: user.user_id,
        order_id: request.order_id,
        amount: request.amount,
        credits: request.credits,
    };

    let result = handler.handle(cmd).await?;

    let response = ApiResponse::ok(OrderResponse::from(result.order));
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/payments/verify - Verify a client payment confirmation.
///
/// Read/record-only: records the provider linkage on the order and
/// reports the balance. Crediting is deferred to the webhook.
pub async fn verify_payment(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.verify_payment_handler();
    let cmd = VerifyPaymentCommand {
        user_id: user.user_id,
        order_id: request.order_id,
        payment_id: request.payment_id,
        signature: request.signature,
    };

    let result = handler.handle(cmd).await?;

    let response = ApiResponse::ok(VerifyPaymentResponse {
        credits: result.credits,
        message: result.message,
    });
    Ok(Json(response))
}

/// GET /api/credits - Get the current credit balance.
pub async fn get_balance(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.balance_handler();
    let result = handler
        .handle(GetBalanceQuery {
            user_id: user.user_id,
        })
        .await?;

    let response = ApiResponse::ok(BalanceResponse {
        credits: result.credits,
    });
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts application errors to HTTP responses.
pub enum BillingApiError {
    Verify(VerifyPaymentError),
    Ledger(LedgerError),
    Domain(DomainError),
}

impl From<VerifyPaymentError> for BillingApiError {
    fn from(err: VerifyPaymentError) -> Self {
        Self::Verify(err)
    }
}

impl From<LedgerError> for BillingApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl BillingApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BillingApiError::Verify(err) => (
                err.status_code(),
                match err {
                    VerifyPaymentError::InvalidSignature => "INVALID_SIGNATURE",
                    VerifyPaymentError::OrderNotFound => "ORDER_NOT_FOUND",
                    VerifyPaymentError::Ledger(_) => "LEDGER_ERROR",
                    VerifyPaymentError::Database(_) => "INTERNAL_ERROR",
                },
            ),
            BillingApiError::Ledger(err) => (
                err.status_code(),
                match err {
                    LedgerError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
                    LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
                    LedgerError::UserNotFound => "USER_NOT_FOUND",
                    LedgerError::Database(_) => "INTERNAL_ERROR",
                },
            ),
            BillingApiError::Domain(err) => match err.code {
                ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
                }
                ErrorCode::OrderNotFound => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
                ErrorCode::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
                ErrorCode::OrderExists => (StatusCode::CONFLICT, "ORDER_EXISTS"),
                ErrorCode::InvalidStateTransition => {
                    (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
                }
                ErrorCode::DatabaseError | ErrorCode::InternalError => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            BillingApiError::Verify(err) => err.to_string(),
            BillingApiError::Ledger(err) => err.to_string(),
            BillingApiError::Domain(err) => err.message.clone(),
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        let body: ApiResponse<()> = ApiResponse::error(code, self.message());
        (status, Json(body)).into_response()
    }
}
