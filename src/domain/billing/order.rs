//! Purchase order aggregate.
//!
//! An Order represents one credit-purchase attempt against the payment
//! provider. Orders are never deleted; they are the audit trail linking
//! provider payments to ledger entries.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: amounts are i64 paise/cents, never floats
//! - **Provider-keyed**: `order_id` is assigned by the provider and unique
//! - **Mutated only by reconciliation**: request handlers never touch status

use crate::domain::foundation::{StateMachine, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order issued, payment not yet observed.
    Created,

    /// Payment captured and credits granted. Terminal for crediting.
    Paid,

    /// Payment failed. Terminal, no credit.
    Failed,

    /// Administratively refunded after payment.
    Refunded,
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Created, Paid)
                | (Created, Failed)
                // Redelivered events repeat the same transition.
                | (Paid, Paid)
                | (Failed, Failed)
                | (Paid, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Created => vec![Paid, Failed],
            Paid => vec![Paid, Refunded],
            Failed => vec![Failed],
            Refunded => vec![],
        }
    }
}

/// Order aggregate - one credit purchase attempt.
///
/// # Invariants
///
/// - `order_id` is unique across the deployment
/// - `amount` and `credits_requested` are immutable after creation
/// - Status transitions follow the state machine rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Internal identifier.
    pub id: Uuid,

    /// Provider-assigned order identifier.
    pub order_id: String,

    /// User who initiated the purchase.
    pub user_id: UserId,

    /// Charged amount in minor currency units.
    pub amount: i64,

    /// Credits to grant once the payment is captured.
    pub credits_requested: i64,

    /// Current status in the payment lifecycle.
    pub status: OrderStatus,

    /// Provider-assigned payment identifier, once known.
    pub payment_id: Option<String>,

    /// Provider signature for the payment, once known.
    pub provider_signature: Option<String>,

    /// When the order was created.
    pub created_at: Timestamp,

    /// When the order was last updated.
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new order in `Created` status.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the order id is empty or either
    /// amount is not positive.
    pub fn create(
        order_id: impl Into<String>,
        user_id: UserId,
        amount: i64,
        credits_requested: i64,
    ) -> Result<Self, ValidationError> {
        let order_id = order_id.into();
        if order_id.is_empty() {
            return Err(ValidationError::empty_field("order_id"));
        }
        if amount <= 0 {
            return Err(ValidationError::not_positive("amount", amount));
        }
        if credits_requested <= 0 {
            return Err(ValidationError::not_positive(
                "credits_requested",
                credits_requested,
            ));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            amount,
            credits_requested,
            status: OrderStatus::Created,
            payment_id: None,
            provider_signature: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks the order paid, recording the provider's payment details.
    ///
    /// Safe to repeat: a redelivered capture event re-applies the same
    /// transition without error.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the order is in a terminal non-paid
    /// state (`Failed`, `Refunded`).
    pub fn mark_paid(
        &mut self,
        payment_id: impl Into<String>,
        signature: Option<String>,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(OrderStatus::Paid)?;
        self.payment_id = Some(payment_id.into());
        if signature.is_some() {
            self.provider_signature = signature;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the order failed.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the order already left `Created`.
    pub fn mark_failed(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(OrderStatus::Failed)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Records provider payment details without a status change.
    ///
    /// Used by the client verify path, which must never credit. Existing
    /// details are kept; the first write wins.
    pub fn record_provider_details(
        &mut self,
        payment_id: impl Into<String>,
        signature: impl Into<String>,
    ) {
        if self.payment_id.is_none() {
            self.payment_id = Some(payment_id.into());
        }
        if self.provider_signature.is_none() {
            self.provider_signature = Some(signature.into());
        }
        self.updated_at = Timestamp::now();
    }
}
