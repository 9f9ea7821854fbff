//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing
//! API. Client-facing responses use a uniform `{success, data, error}`
//! envelope; the webhook endpoint answers in the provider's own
//! vocabulary.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{Order, OrderStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to record a purchase order issued by the checkout flow.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// Provider-assigned order id.
    pub order_id: String,
    /// Charged amount in minor currency units.
    pub amount: i64,
    /// Credits to grant once the payment is captured.
    pub credits: i64,
}

/// Request to verify a client-side payment confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    /// Hex HMAC over `order_id|payment_id` from the checkout flow.
    pub signature: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Uniform client-facing response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful envelope carrying a payload.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure envelope carrying an error body.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Machine-readable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Recorded order details.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub credits_requested: i64,
    pub status: OrderStatus,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            amount: order.amount,
            credits_requested: order.credits_requested,
            status: order.status,
        }
    }
}

/// Verify endpoint payload: balance plus the deferred-crediting note.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub credits: i64,
    pub message: String,
}

/// Balance query payload.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub credits: i64,
}

/// Acknowledgement body returned to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
