//! CreateOrderHandler - Command handler for recording purchase orders.
//!
//! Records the locally-issued order the reconciliation path will later
//! settle against. Pricing happens upstream; the command carries the
//! already-priced amount and credit grant.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::Order;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::OrderRepository;

/// Command to record a new purchase order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub user_id: UserId,
    /// Provider-assigned order id from the checkout flow.
    pub order_id: String,
    /// Charged amount in minor currency units.
    pub amount: i64,
    /// Credits to grant once the payment is captured.
    pub credits: i64,
}

/// Result of recording an order.
#[derive(Debug, Clone)]
pub struct CreateOrderResult {
    pub order: Order,
}

/// Handler for recording purchase orders.
pub struct CreateOrderHandler {
    orders: Arc<dyn OrderRepository>,
}

impl CreateOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, DomainError> {
        let order = Order::create(cmd.order_id, cmd.user_id, cmd.amount, cmd.credits)
            .map_err(|e| DomainError::validation("order", e.to_string()))?;

        self.orders.create(&order).await?;

        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            amount = order.amount,
            credits = order.credits_requested,
            "purchase order recorded"
        );

        Ok(CreateOrderResult { order })
    }
}
