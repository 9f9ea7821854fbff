//! HTTP adapter for the billing module.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingAppState, SIGNATURE_HEADER};
pub use routes::{billing_router, billing_routes, webhook_routes};
