//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - sqlx-backed repository implementations
//! - `http` - Axum routers, handlers, and DTOs

pub mod http;
pub mod postgres;

pub use http::{billing_router, BillingAppState};
pub use postgres::{PostgresCreditLedger, PostgresEventMarkerRepository, PostgresOrderRepository};
