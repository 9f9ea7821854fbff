//! HandleProviderWebhookHandler - Command handler for provider webhook deliveries.
//!
//! The full inbound pipeline: signature verification over the raw body,
//! payload parsing, the event-marker admission gate, reconciliation, and
//! the terminal marker transition. The provider delivers at-least-once;
//! this pipeline makes delivery appear exactly-once to side effects.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{ProviderEvent, ReconcileOutcome, Reconciler, WebhookError, WebhookVerifier};
use crate::ports::{Admission, EventMarkerRepository, EventMarkerStatus};

/// Command to handle a provider webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    /// Raw webhook body, exactly as received on the wire.
    pub payload: Vec<u8>,
    /// Hex HMAC digest from the provider's signature header.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleProviderWebhookResult {
    /// This delivery won admission and was reconciled.
    Reconciled(ReconcileOutcome),
    /// Another delivery of the same event already holds the marker;
    /// acknowledged without side effects.
    Duplicate,
}

/// Handler for processing provider webhook deliveries.
pub struct HandleProviderWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    event_markers: Arc<dyn EventMarkerRepository>,
    reconciler: Arc<Reconciler>,
}

impl HandleProviderWebhookHandler {
    pub fn new(
        verifier: Arc<WebhookVerifier>,
        event_markers: Arc<dyn EventMarkerRepository>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            verifier,
            event_markers,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleProviderWebhookCommand,
    ) -> Result<HandleProviderWebhookResult, WebhookError> {
        // 1. Verify the signature over the exact received bytes.
        if !self.verifier.verify(&cmd.payload, &cmd.signature) {
            warn!("webhook signature verification failed");
            return Err(WebhookError::InvalidSignature);
        }

        // 2. Parse the event.
        let event = ProviderEvent::from_slice(&cmd.payload)?;

        // A capture-family event without a payment entity cannot form its
        // idempotency key; reject before admission so the marker slot
        // stays free for a well-formed redelivery.
        if event.kind().settles_order() && event.payment_id().is_none() {
            return Err(WebhookError::MissingField("payload.payment"));
        }

        let payload_json: serde_json::Value = serde_json::from_slice(&cmd.payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        // 3. Admission gate: exactly one delivery per event id proceeds.
        match self.event_markers.admit(&event.id, payload_json).await? {
            Admission::Admitted => {}
            Admission::AlreadyHandled => {
                info!(event_id = %event.id, "duplicate webhook delivery acknowledged");
                return Ok(HandleProviderWebhookResult::Duplicate);
            }
        }

        // 4. Reconcile, then record the terminal status as the final
        // action. On failure the marker records `error` and the 500
        // response makes the provider retry into the idempotent path.
        match self.reconciler.reconcile(&event, Some(&cmd.signature)).await {
            Ok(outcome) => {
                self.event_markers
                    .finish(&event.id, outcome.marker_status())
                    .await?;
                Ok(HandleProviderWebhookResult::Reconciled(outcome))
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "reconciliation failed");
                if let Err(finish_err) = self
                    .event_markers
                    .finish(&event.id, EventMarkerStatus::Error)
                    .await
                {
                    warn!(event_id = %event.id, error = %finish_err, "failed to record error marker");
                }
                Err(WebhookError::from(e))
            }
        }
    }
}
