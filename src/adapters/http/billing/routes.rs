//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for billing-related API
//! endpoints and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_order, get_balance, handle_provider_webhook, verify_payment, BillingAppState,
};

/// Create the client-facing billing router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `POST /payments/orders` - Record a purchase order
/// - `POST /payments/verify` - Verify a client payment confirmation
/// - `GET /credits` - Get current credit balance
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payments/orders", post(create_order))
        .route("/payments/verify", post(verify_payment))
        .route("/credits", get(get_balance))
}

/// Create the provider webhook router.
///
/// Separate from the client routes because webhooks carry no user
/// session; they are authenticated by signature alone.
///
/// # Routes
/// - `POST /razorpay` - Handle provider webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/razorpay", post(handle_provider_webhook))
}

/// Create the complete billing module router.
///
/// Combines client routes and webhook routes into a single router
/// suitable for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .merge(billing_routes())
        .nest("/webhooks", webhook_routes())
}
