//! EventMarkerRepository port - the webhook admission gate.
//!
//! The provider delivers webhooks at-least-once and may deliver the same
//! event concurrently. An EventMarker row is created exactly once per event
//! id; the creation itself is the admission gate. Exactly one concurrent
//! caller observes `Admitted`, every other caller observes
//! `AlreadyHandled` and must respond success without re-executing side
//! effects.
//!
//! No other lock exists: the uniqueness constraint on `event_id` IS the
//! lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::foundation::{DomainError, StateMachine, ValidationError};

/// Terminal and in-flight statuses of an event marker.
///
/// A marker starts in `Processing` and moves monotonically to exactly one
/// terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMarkerStatus {
    /// Admitted; reconciliation in flight.
    Processing,
    /// Out of scope for this deployment or unrecognized event type.
    Ignored,
    /// Event references an order this deployment never created.
    NoMatchingOrder,
    /// Reported amount differs from the stored order amount.
    AmountMismatch,
    /// Reconciliation completed.
    Processed,
    /// Reconciliation failed mid-flight; the provider will retry.
    Error,
}

impl EventMarkerStatus {
    /// Stable string form used in persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventMarkerStatus::Processing => "processing",
            EventMarkerStatus::Ignored => "ignored",
            EventMarkerStatus::NoMatchingOrder => "no_matching_order",
            EventMarkerStatus::AmountMismatch => "amount_mismatch",
            EventMarkerStatus::Processed => "processed",
            EventMarkerStatus::Error => "error",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "processing" => Ok(EventMarkerStatus::Processing),
            "ignored" => Ok(EventMarkerStatus::Ignored),
            "no_matching_order" => Ok(EventMarkerStatus::NoMatchingOrder),
            "amount_mismatch" => Ok(EventMarkerStatus::AmountMismatch),
            "processed" => Ok(EventMarkerStatus::Processed),
            "error" => Ok(EventMarkerStatus::Error),
            _ => Err(ValidationError::invalid_format("event_marker_status", s)),
        }
    }
}

impl StateMachine for EventMarkerStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EventMarkerStatus::*;
        // Processing moves to any terminal status, exactly once.
        matches!(self, Processing) && !matches!(target, Processing)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EventMarkerStatus::*;
        match self {
            Processing => vec![Ignored, NoMatchingOrder, AmountMismatch, Processed, Error],
            _ => vec![],
        }
    }
}

/// Deduplication record for one provider event.
#[derive(Debug, Clone)]
pub struct EventMarker {
    /// Provider-assigned event id, globally unique per provider account.
    pub event_id: String,

    /// Current status.
    pub status: EventMarkerStatus,

    /// Original event payload, kept for debugging and auditing.
    pub payload: serde_json::Value,

    /// When the marker was created (event admitted).
    pub created_at: DateTime<Utc>,

    /// When the marker was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Result of attempting to admit an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Marker was created; this caller owns the event.
    Admitted,
    /// Marker already exists; another caller is handling or has handled
    /// the event.
    AlreadyHandled,
}

/// Port for the event deduplication store.
///
/// Implementations must use a uniqueness constraint on `event_id` so
/// concurrent admissions race safely; `admit` must be a single atomic
/// "insert, report conflict" operation, never check-then-insert.
#[async_trait]
pub trait EventMarkerRepository: Send + Sync {
    /// Attempt to admit an event by creating its marker in `Processing`.
    async fn admit(
        &self,
        event_id: &str,
        payload: serde_json::Value,
    ) -> Result<Admission, DomainError>;

    /// Transition the marker to a terminal status.
    async fn finish(
        &self,
        event_id: &str,
        status: EventMarkerStatus,
    ) -> Result<(), DomainError>;

    /// Find a marker by its event id.
    async fn find(&self, event_id: &str) -> Result<Option<EventMarker>, DomainError>;
}
