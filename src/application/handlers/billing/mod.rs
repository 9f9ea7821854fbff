//! Billing handlers.
//!
//! Command and query handlers for payment reconciliation and the credit
//! ledger:
//!
//! ## Commands
//! - Processing provider webhook deliveries
//! - Verifying client payment confirmations
//! - Recording purchase orders
//! - Debiting and crediting generation credits
//!
//! ## Queries
//! - Get current credit balance

mod create_order;
mod credit_credits;
mod debit_credits;
mod get_balance;
mod handle_provider_webhook;
mod verify_payment;

// Commands
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use credit_credits::{CreditCreditsCommand, CreditCreditsHandler, CreditCreditsResult};
pub use debit_credits::{DebitCreditsCommand, DebitCreditsHandler, DebitCreditsResult};
pub use handle_provider_webhook::{
    HandleProviderWebhookCommand, HandleProviderWebhookHandler, HandleProviderWebhookResult,
};
pub use verify_payment::{
    VerifyPaymentCommand, VerifyPaymentError, VerifyPaymentHandler, VerifyPaymentResult,
};

// Queries
pub use get_balance::{GetBalanceHandler, GetBalanceQuery, GetBalanceResult};
