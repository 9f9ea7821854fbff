//! VerifyPaymentHandler - Command handler for client payment confirmations.
//!
//! A read/record-only sibling of the webhook path. The checkout flow hands
//! the client a signature over `order_id|payment_id`; the client submits
//! it here. The handler records the provider details on the order and
//! reports the current balance - it never writes the ledger, so there is
//! exactly one crediting path (the webhook) and nothing for it to race.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::billing::{ClientConfirmationVerifier, LedgerError};
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{CreditLedger, OrderRepository};

/// Command to verify a client-submitted payment confirmation.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user_id: UserId,
    pub order_id: String,
    pub payment_id: String,
    /// Hex HMAC over `order_id|payment_id`.
    pub signature: String,
}

/// Result of a verified confirmation.
#[derive(Debug, Clone)]
pub struct VerifyPaymentResult {
    /// The user's current balance; crediting may still be in flight.
    pub credits: i64,
    /// Client-facing note that crediting is deferred to the webhook.
    pub message: String,
}

/// Errors of the verify path.
#[derive(Debug, Error)]
pub enum VerifyPaymentError {
    /// Client confirmation signature did not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No such order for this user.
    #[error("Order not found")]
    OrderNotFound,

    /// Balance lookup failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl VerifyPaymentError {
    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            VerifyPaymentError::InvalidSignature => StatusCode::BAD_REQUEST,
            VerifyPaymentError::OrderNotFound => StatusCode::NOT_FOUND,
            VerifyPaymentError::Ledger(e) => e.status_code(),
            VerifyPaymentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for VerifyPaymentError {
    fn from(err: DomainError) -> Self {
        VerifyPaymentError::Database(err.to_string())
    }
}

/// Handler for client payment confirmations.
pub struct VerifyPaymentHandler {
    verifier: Arc<ClientConfirmationVerifier>,
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn CreditLedger>,
}

impl VerifyPaymentHandler {
    pub fn new(
        verifier: Arc<ClientConfirmationVerifier>,
        orders: Arc<dyn OrderRepository>,
        ledger: Arc<dyn CreditLedger>,
    ) -> Self {
        Self {
            verifier,
            orders,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, VerifyPaymentError> {
        // 1. Verify the confirmation signature.
        if !self
            .verifier
            .verify(&cmd.order_id, &cmd.payment_id, &cmd.signature)
        {
            warn!(order_id = %cmd.order_id, "client confirmation signature failed");
            return Err(VerifyPaymentError::InvalidSignature);
        }

        // 2. The order must exist and belong to the caller. A foreign
        // order is reported as not-found rather than forbidden.
        let order = self
            .orders
            .find_by_order_id(&cmd.order_id)
            .await?
            .filter(|order| order.user_id == cmd.user_id)
            .ok_or(VerifyPaymentError::OrderNotFound)?;

        // 3. Record the provider linkage; first write wins.
        self.orders
            .record_provider_details(&order.order_id, &cmd.payment_id, &cmd.signature)
            .await?;

        info!(
            order_id = %order.order_id,
            payment_id = %cmd.payment_id,
            user_id = %cmd.user_id,
            "payment confirmation recorded"
        );

        // 4. Report the balance as it stands; the webhook credits.
        let credits = self.ledger.balance(cmd.user_id).await?;

        Ok(VerifyPaymentResult {
            credits,
            message: "Payment recorded. Credits are applied once the provider confirms the payment."
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Order, OrderStatus};
    use crate::domain::foundation::ErrorCode;
    use crate::ports::{CreditCommand, DebitCommand, OrderSettlement, SettleOutcome};
    use async_trait::async_trait;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SECRET: &str = "whsec_test_secret_12345";

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    struct MockOrders {
        orders: Mutex<HashMap<String, Order>>,
    }

    impl MockOrders {
        fn with_order(order: Order) -> Self {
            let repo = Self {
                orders: Mutex::new(HashMap::new()),
            };
            repo.orders
                .lock()
                .unwrap()
                .insert(order.order_id.clone(), order);
            repo
        }

        fn get(&self, order_id: &str) -> Option<Order> {
            self.orders.lock().unwrap().get(order_id).cloned()
        }
    }

    #[async_trait]
    impl OrderRepository for MockOrders {
        async fn create(&self, order: &Order) -> Result<(), DomainError> {
            self.orders
                .lock()
                .unwrap()
                .insert(order.order_id.clone(), order.clone());
            Ok(())
        }

        async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>, DomainError> {
            Ok(self.orders.lock().unwrap().get(order_id).cloned())
        }

        async fn record_provider_details(
            &self,
            order_id: &str,
            payment_id: &str,
            signature: &str,
        ) -> Result<(), DomainError> {
            let mut orders = self.orders.lock().unwrap();
            let order = orders
                .get_mut(order_id)
                .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "missing"))?;
            order.record_provider_details(payment_id, signature);
            Ok(())
        }

        async fn mark_failed(&self, _order_id: &str) -> Result<(), DomainError> {
            unreachable!("verify path never fails orders")
        }

        async fn settle_paid(
            &self,
            _settlement: OrderSettlement,
        ) -> Result<SettleOutcome, DomainError> {
            unreachable!("verify path never settles")
        }
    }

    struct FixedBalanceLedger {
        balance: i64,
    }

    #[async_trait]
    impl CreditLedger for FixedBalanceLedger {
        async fn credit(&self, _cmd: CreditCommand) -> Result<i64, LedgerError> {
            unreachable!("verify path never credits")
        }

        async fn debit(&self, _cmd: DebitCommand) -> Result<i64, LedgerError> {
            unreachable!("verify path never debits")
        }

        async fn balance(&self, _user_id: UserId) -> Result<i64, LedgerError> {
            Ok(self.balance)
        }

        async fn exists_by_key(&self, _key: &str) -> Result<bool, LedgerError> {
            Ok(false)
        }
    }

    fn sign_confirmation(order_id: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn handler(orders: Arc<MockOrders>, balance: i64) -> VerifyPaymentHandler {
        let verifier = Arc::new(ClientConfirmationVerifier::new(
            secrecy::SecretString::new(SECRET.to_string()),
        ));
        VerifyPaymentHandler::new(verifier, orders, Arc::new(FixedBalanceLedger { balance }))
    }

    fn order_for(user_id: i64) -> Order {
        Order::create("order_1", UserId::new(user_id).unwrap(), 2000, 4).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Verify Path Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_confirmation_records_details_and_returns_balance() {
        let orders = Arc::new(MockOrders::with_order(order_for(20)));
        let handler = handler(orders.clone(), 4);

        let result = handler
            .handle(VerifyPaymentCommand {
                user_id: UserId::new(20).unwrap(),
                order_id: "order_1".to_string(),
                payment_id: "pay_1".to_string(),
                signature: sign_confirmation("order_1", "pay_1"),
            })
            .await
            .unwrap();

        assert_eq!(result.credits, 4);
        assert!(result.message.contains("provider confirms"));

        let order = orders.get("order_1").unwrap();
        assert_eq!(order.payment_id.as_deref(), Some("pay_1"));
        // Status untouched: crediting belongs to the webhook.
        assert_eq!(order.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected() {
        let orders = Arc::new(MockOrders::with_order(order_for(20)));
        let handler = handler(orders.clone(), 4);

        let result = handler
            .handle(VerifyPaymentCommand {
                user_id: UserId::new(20).unwrap(),
                order_id: "order_1".to_string(),
                payment_id: "pay_1".to_string(),
                signature: "0".repeat(64),
            })
            .await;

        assert!(matches!(result, Err(VerifyPaymentError::InvalidSignature)));
        assert!(orders.get("order_1").unwrap().payment_id.is_none());
    }

    #[tokio::test]
    async fn foreign_order_reads_as_not_found() {
        let orders = Arc::new(MockOrders::with_order(order_for(20)));
        let handler = handler(orders, 4);

        let result = handler
            .handle(VerifyPaymentCommand {
                user_id: UserId::new(99).unwrap(),
                order_id: "order_1".to_string(),
                payment_id: "pay_1".to_string(),
                signature: sign_confirmation("order_1", "pay_1"),
            })
            .await;

        assert!(matches!(result, Err(VerifyPaymentError::OrderNotFound)));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let orders = Arc::new(MockOrders::with_order(order_for(20)));
        let handler = handler(orders, 4);

        let result = handler
            .handle(VerifyPaymentCommand {
                user_id: UserId::new(20).unwrap(),
                order_id: "order_missing".to_string(),
                payment_id: "pay_1".to_string(),
                signature: sign_confirmation("order_missing", "pay_1"),
            })
            .await;

        assert!(matches!(result, Err(VerifyPaymentError::OrderNotFound)));
    }
}
