//! OrderRepository port - persistence for purchase orders.
//!
//! Besides plain persistence, this port carries the settlement operation:
//! the one atomic unit that appends the purchase ledger entry, bumps the
//! cached balance, and marks the order paid. Splitting settlement into
//! separate check/insert/update calls would reopen the double-credit race
//! the idempotency key exists to close, so the port exposes it as a single
//! transactional operation.

use async_trait::async_trait;

use crate::domain::billing::Order;
use crate::domain::foundation::DomainError;

/// Inputs for settling a captured payment.
#[derive(Debug, Clone)]
pub struct OrderSettlement {
    /// Provider order id being settled.
    pub order_id: String,

    /// Provider payment id; the idempotency key is derived from it.
    pub payment_id: String,

    /// Provider signature to record on the order, when available.
    pub signature: Option<String>,

    /// Ledger reason text for the purchase entry.
    pub reason: String,
}

/// Result of a settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Ledger entry appended and balance updated.
    Credited { balance: i64 },
    /// An entry with this payment's idempotency key already existed; the
    /// order status update was re-applied, nothing else changed.
    AlreadyCredited { balance: i64 },
}

/// Port for storing and settling purchase orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a newly created order.
    ///
    /// Fails with `ErrorCode::OrderExists` when the provider order id is
    /// already recorded.
    async fn create(&self, order: &Order) -> Result<(), DomainError>;

    /// Find an order by its provider order id.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>, DomainError>;

    /// Record provider payment details without changing status.
    ///
    /// First write wins; used by the client verify path.
    async fn record_provider_details(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), DomainError>;

    /// Mark the order failed. No ledger effect.
    async fn mark_failed(&self, order_id: &str) -> Result<(), DomainError>;

    /// Settle a captured payment in one atomic unit.
    ///
    /// Within a single transaction: mark the order paid (recording payment
    /// id and signature), append a `purchase` ledger entry under the key
    /// `provider:<payment_id>` unless one already exists, and bump the
    /// user's cached balance if - and only if - the entry was appended.
    ///
    /// # Errors
    ///
    /// - `ErrorCode::OrderNotFound` if the order vanished
    /// - `ErrorCode::InvalidStateTransition` if the order is in a
    ///   terminal non-paid state
    async fn settle_paid(&self, settlement: OrderSettlement) -> Result<SettleOutcome, DomainError>;
}
