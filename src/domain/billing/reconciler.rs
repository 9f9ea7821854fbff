//! Reconciliation orchestrator.
//!
//! Given a verified, admitted provider event, the reconciler drives the
//! order's status transition and the once-only ledger append. It runs only
//! after the event-marker admission gate, so at most one task per event id
//! ever reaches it; per-payment idempotency is still enforced again inside
//! `settle_paid`, because the client verify path and webhook redeliveries
//! of *different* event ids can race for the same payment.
//!
//! ## Outcome Model
//!
//! Business-rule rejections (wrong deployment, unknown order, amount
//! mismatch) are outcomes, not errors: they terminate the event marker
//! with a descriptive status and are acknowledged to the provider with
//! success, since a retry could never change the result.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{ProviderEvent, ProviderEventKind};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{EventMarkerStatus, OrderRepository, OrderSettlement, SettleOutcome};

/// Result of reconciling one admitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Event belongs to another deployment or has an unhandled type.
    Ignored { reason: String },

    /// Event references an order this deployment never created.
    NoMatchingOrder { order_id: Option<String> },

    /// Reported amount differs from the stored order amount.
    AmountMismatch { expected: i64, reported: i64 },

    /// Credits granted and order marked paid.
    Credited {
        order_id: String,
        credits: i64,
        balance: i64,
    },

    /// Payment was already credited; order status re-applied only.
    AlreadyCredited { order_id: String, balance: i64 },

    /// Order closed as failed, no ledger effect.
    MarkedFailed { order_id: String },
}

impl ReconcileOutcome {
    /// Terminal event-marker status recording this outcome.
    pub fn marker_status(&self) -> EventMarkerStatus {
        match self {
            ReconcileOutcome::Ignored { .. } => EventMarkerStatus::Ignored,
            ReconcileOutcome::NoMatchingOrder { .. } => EventMarkerStatus::NoMatchingOrder,
            ReconcileOutcome::AmountMismatch { .. } => EventMarkerStatus::AmountMismatch,
            ReconcileOutcome::Credited { .. }
            | ReconcileOutcome::AlreadyCredited { .. }
            | ReconcileOutcome::MarkedFailed { .. } => EventMarkerStatus::Processed,
        }
    }
}

/// Drives payment status transitions and crediting for admitted events.
pub struct Reconciler {
    orders: Arc<dyn OrderRepository>,
    /// Scope tag of this deployment; events tagged otherwise are noise
    /// from sibling deployments on the shared provider account.
    website_id: String,
}

impl Reconciler {
    /// Creates a reconciler bound to this deployment's scope tag.
    pub fn new(orders: Arc<dyn OrderRepository>, website_id: impl Into<String>) -> Self {
        Self {
            orders,
            website_id: website_id.into(),
        }
    }

    /// Reconcile one admitted event.
    ///
    /// `provider_signature` is the delivery's signature header, recorded
    /// on the order at settlement.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures and illegal state transitions
    /// surface as errors; the caller records them as an `error` marker
    /// and answers 500 so the provider retries.
    pub async fn reconcile(
        &self,
        event: &ProviderEvent,
        provider_signature: Option<&str>,
    ) -> Result<ReconcileOutcome, DomainError> {
        let kind = event.kind();

        if let ProviderEventKind::Unrecognized(event_type) = &kind {
            info!(event_id = %event.id, event_type = %event_type, "ignoring unhandled event type");
            return Ok(ReconcileOutcome::Ignored {
                reason: format!("unhandled event type: {}", event_type),
            });
        }

        // A shared provider account serves several deployments; only
        // events tagged for this one may touch local state.
        match event.scope_tag() {
            Some(tag) if tag == self.website_id => {}
            tag => {
                info!(event_id = %event.id, scope_tag = ?tag, "ignoring event for another deployment");
                return Ok(ReconcileOutcome::Ignored {
                    reason: match tag {
                        Some(tag) => format!("event scoped to deployment {}", tag),
                        None => "event carries no deployment scope tag".to_string(),
                    },
                });
            }
        }

        let Some(order_id) = event.provider_order_id() else {
            return Ok(ReconcileOutcome::NoMatchingOrder { order_id: None });
        };

        let Some(order) = self.orders.find_by_order_id(order_id).await? else {
            info!(event_id = %event.id, order_id = %order_id, "event references unknown order");
            return Ok(ReconcileOutcome::NoMatchingOrder {
                order_id: Some(order_id.to_string()),
            });
        };

        // Amount is the last line of defense against a tampered or
        // misrouted event.
        let reported = event.reported_amount().unwrap_or(0);
        if reported != order.amount {
            warn!(
                event_id = %event.id,
                order_id = %order.order_id,
                expected = order.amount,
                reported,
                "event amount does not match stored order amount"
            );
            return Ok(ReconcileOutcome::AmountMismatch {
                expected: order.amount,
                reported,
            });
        }

        if kind.settles_order() {
            let Some(payment_id) = event.payment_id() else {
                return Err(DomainError::new(
                    ErrorCode::ValidationFailed,
                    "capture event carries no payment entity",
                ));
            };

            let settlement = OrderSettlement {
                order_id: order.order_id.clone(),
                payment_id: payment_id.to_string(),
                signature: provider_signature.map(str::to_string),
                reason: format!(
                    "Purchase of {} credits for order {}",
                    order.credits_requested, order.order_id
                ),
            };

            match self.orders.settle_paid(settlement).await? {
                SettleOutcome::Credited { balance } => {
                    info!(
                        event_id = %event.id,
                        order_id = %order.order_id,
                        user_id = %order.user_id,
                        credits = order.credits_requested,
                        balance,
                        "credits granted"
                    );
                    Ok(ReconcileOutcome::Credited {
                        order_id: order.order_id.clone(),
                        credits: order.credits_requested,
                        balance,
                    })
                }
                SettleOutcome::AlreadyCredited { balance } => {
                    info!(
                        event_id = %event.id,
                        order_id = %order.order_id,
                        "payment already credited, order status re-applied"
                    );
                    Ok(ReconcileOutcome::AlreadyCredited {
                        order_id: order.order_id.clone(),
                        balance,
                    })
                }
            }
        } else {
            self.orders.mark_failed(&order.order_id).await?;
            info!(event_id = %event.id, order_id = %order.order_id, "order marked failed");
            Ok(ReconcileOutcome::MarkedFailed {
                order_id: order.order_id.clone(),
            })
        }
    }
}
