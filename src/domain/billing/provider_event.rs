//! Payment provider webhook event types.
//!
//! Defines the structures for parsing Razorpay webhook payloads.
//! Only fields relevant to reconciliation are captured.

use serde::{Deserialize, Serialize};

use super::errors::WebhookError;

/// Payment provider webhook event (simplified).
///
/// Contains the essential fields needed for reconciliation. Additional
/// fields from the provider's full event schema are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique identifier for the event.
    #[serde(default)]
    pub id: String,

    /// Type of event (e.g., "payment.captured").
    pub event: String,

    /// Container for event-specific entities.
    #[serde(default)]
    pub payload: EventPayload,
}

/// Container for event-specific entities.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EventPayload {
    /// Payment entity, present on payment.* and order.paid events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentEnvelope>,

    /// Order entity, present on order.* events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderEnvelope>,
}

/// Wrapper the provider places around each entity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentEnvelope {
    pub entity: PaymentEntity,
}

/// Payment details reported by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentEntity {
    /// Provider-assigned payment id.
    pub id: String,

    /// Amount in minor currency units.
    pub amount: i64,

    /// Provider order this payment belongs to.
    #[serde(default)]
    pub order_id: Option<String>,

    /// Merchant-supplied metadata attached at order creation.
    #[serde(default)]
    pub notes: PaymentNotes,
}

/// Merchant metadata carried on a payment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentNotes {
    /// Deployment scope tag; events for other deployments are ignored.
    #[serde(default)]
    pub website_id: Option<String>,
}

/// Wrapper around the order entity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderEnvelope {
    pub entity: OrderEntity,
}

/// Order details reported by the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderEntity {
    /// Provider-assigned order id.
    pub id: String,

    /// Amount in minor currency units.
    pub amount: i64,

    /// Merchant receipt reference.
    #[serde(default)]
    pub receipt: Option<String>,
}

/// Known provider event kinds.
///
/// A closed enum with an explicit default-ignore arm: any event type not
/// listed here is acknowledged and dropped without state change, and adding
/// a new handled kind is a visible code change rather than a stringly-typed
/// branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventKind {
    /// Payment captured; credits must be granted.
    PaymentCaptured,
    /// Payment authorized ahead of capture; treated as captured.
    PaymentAuthorized,
    /// Order fully paid; treated as captured.
    OrderPaid,
    /// Payment failed; order is closed without credit.
    PaymentFailed,
    /// Any event type this deployment does not handle.
    Unrecognized(String),
}

impl ProviderEventKind {
    /// Parse event kind from the provider's type string.
    pub fn parse(s: &str) -> Self {
        match s {
            "payment.captured" => Self::PaymentCaptured,
            "payment.authorized" => Self::PaymentAuthorized,
            "order.paid" => Self::OrderPaid,
            "payment.failed" => Self::PaymentFailed,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Returns true for kinds that settle the order as paid.
    pub fn settles_order(&self) -> bool {
        matches!(
            self,
            Self::PaymentCaptured | Self::PaymentAuthorized | Self::OrderPaid
        )
    }
}

impl ProviderEvent {
    /// Parses an event from the raw webhook body.
    ///
    /// # Errors
    ///
    /// - `ParseError` for malformed JSON
    /// - `MissingEventId` when the provider omits the event id, which
    ///   would defeat deduplication
    pub fn from_slice(raw: &[u8]) -> Result<Self, WebhookError> {
        let event: ProviderEvent =
            serde_json::from_slice(raw).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        if event.id.is_empty() {
            return Err(WebhookError::MissingEventId);
        }
        Ok(event)
    }

    /// Parse the event type into a known enum variant.
    pub fn kind(&self) -> ProviderEventKind {
        ProviderEventKind::parse(&self.event)
    }

    /// Payment id reported by the event, if any.
    pub fn payment_id(&self) -> Option<&str> {
        self.payload.payment.as_ref().map(|p| p.entity.id.as_str())
    }

    /// Provider order id the event refers to.
    ///
    /// Payment entities carry their parent order id; order entities are
    /// the order. The payment entity wins when both are present.
    pub fn provider_order_id(&self) -> Option<&str> {
        self.payload
            .payment
            .as_ref()
            .and_then(|p| p.entity.order_id.as_deref())
            .or_else(|| self.payload.order.as_ref().map(|o| o.entity.id.as_str()))
    }

    /// Amount the event reports, in minor units.
    pub fn reported_amount(&self) -> Option<i64> {
        self.payload
            .payment
            .as_ref()
            .map(|p| p.entity.amount)
            .or_else(|| self.payload.order.as_ref().map(|o| o.entity.amount))
    }

    /// Deployment scope tag embedded in provider metadata.
    pub fn scope_tag(&self) -> Option<&str> {
        self.payload
            .payment
            .as_ref()
            .and_then(|p| p.entity.notes.website_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn captured_body(event_id: &str, amount: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": event_id,
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_1",
                        "amount": amount,
                        "order_id": "order_1",
                        "notes": { "website_id": "site_1" }
                    }
                }
            }
        }))
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_captured_payment_event() {
        let event = ProviderEvent::from_slice(&captured_body("evt_1", 2000)).unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.kind(), ProviderEventKind::PaymentCaptured);
        assert_eq!(event.payment_id(), Some("pay_1"));
        assert_eq!(event.provider_order_id(), Some("order_1"));
        assert_eq!(event.reported_amount(), Some(2000));
        assert_eq!(event.scope_tag(), Some("site_1"));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = ProviderEvent::from_slice(b"not json");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn rejects_missing_event_id() {
        let body = serde_json::to_vec(&json!({
            "event": "payment.captured",
            "payload": {}
        }))
        .unwrap();

        let result = ProviderEvent::from_slice(&body);
        assert!(matches!(result, Err(WebhookError::MissingEventId)));
    }

    #[test]
    fn order_paid_event_falls_back_to_order_entity() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_2",
            "event": "order.paid",
            "payload": {
                "order": {
                    "entity": { "id": "order_2", "amount": 5000, "receipt": "rcpt_2" }
                }
            }
        }))
        .unwrap();

        let event = ProviderEvent::from_slice(&body).unwrap();
        assert_eq!(event.kind(), ProviderEventKind::OrderPaid);
        assert_eq!(event.provider_order_id(), Some("order_2"));
        assert_eq!(event.reported_amount(), Some(5000));
        assert_eq!(event.payment_id(), None);
        assert_eq!(event.scope_tag(), None);
    }

    #[test]
    fn payment_entity_wins_over_order_entity() {
        let body = serde_json::to_vec(&json!({
            "id": "evt_3",
            "event": "order.paid",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_3",
                        "amount": 1500,
                        "order_id": "order_3",
                        "notes": {}
                    }
                },
                "order": {
                    "entity": { "id": "order_3", "amount": 1500 }
                }
            }
        }))
        .unwrap();

        let event = ProviderEvent::from_slice(&body).unwrap();
        assert_eq!(event.payment_id(), Some("pay_3"));
        assert_eq!(event.provider_order_id(), Some("order_3"));
    }

    // ══════════════════════════════════════════════════════════════
    // Event Kind Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn known_kinds_parse_exactly() {
        assert_eq!(
            ProviderEventKind::parse("payment.captured"),
            ProviderEventKind::PaymentCaptured
        );
        assert_eq!(
            ProviderEventKind::parse("payment.authorized"),
            ProviderEventKind::PaymentAuthorized
        );
        assert_eq!(
            ProviderEventKind::parse("order.paid"),
            ProviderEventKind::OrderPaid
        );
        assert_eq!(
            ProviderEventKind::parse("payment.failed"),
            ProviderEventKind::PaymentFailed
        );
    }

    #[test]
    fn unknown_kinds_fall_into_default_ignore_arm() {
        let kind = ProviderEventKind::parse("refund.created");
        assert_eq!(
            kind,
            ProviderEventKind::Unrecognized("refund.created".to_string())
        );
        assert!(!kind.settles_order());
    }

    #[test]
    fn settling_kinds_are_the_capture_family() {
        assert!(ProviderEventKind::PaymentCaptured.settles_order());
        assert!(ProviderEventKind::PaymentAuthorized.settles_order());
        assert!(ProviderEventKind::OrderPaid.settles_order());
        assert!(!ProviderEventKind::PaymentFailed.settles_order());
    }
}
