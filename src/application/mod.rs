//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::billing::{
    // Webhook pipeline
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, HandleProviderWebhookResult,
    // Client verify path
    VerifyPaymentCommand, VerifyPaymentError, VerifyPaymentHandler, VerifyPaymentResult,
    // Orders
    CreateOrderCommand, CreateOrderHandler, CreateOrderResult,
    // Credit service
    CreditCreditsCommand, CreditCreditsHandler, CreditCreditsResult,
    DebitCreditsCommand, DebitCreditsHandler, DebitCreditsResult,
    GetBalanceHandler, GetBalanceQuery, GetBalanceResult,
};
