//! Append-only credit ledger entries.
//!
//! Every balance change is a LedgerEntry; the `credits` column on the user
//! row is a cached projection and must always equal the running sum of the
//! user's entries. Entries are never mutated or deleted.

use crate::domain::foundation::{LedgerEntryId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Credits granted for a captured payment.
    Purchase,

    /// Credits consumed by a generation run.
    Debit,

    /// Compensating entry for a failed downstream operation.
    Refund,

    /// Manual correction by an operator.
    AdminAdjustment,
}

impl LedgerEntryKind {
    /// Stable string form used in persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::Purchase => "purchase",
            LedgerEntryKind::Debit => "debit",
            LedgerEntryKind::Refund => "refund",
            LedgerEntryKind::AdminAdjustment => "admin_adjustment",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "purchase" => Ok(LedgerEntryKind::Purchase),
            "debit" => Ok(LedgerEntryKind::Debit),
            "refund" => Ok(LedgerEntryKind::Refund),
            "admin_adjustment" => Ok(LedgerEntryKind::AdminAdjustment),
            _ => Err(ValidationError::invalid_format("ledger_kind", s)),
        }
    }
}

/// One immutable balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,

    /// User whose balance changed.
    pub user_id: UserId,

    /// Signed credit change.
    pub delta: i64,

    /// Category of the change.
    pub kind: LedgerEntryKind,

    /// Human-readable explanation.
    pub reason: String,

    /// At most one entry may exist per non-null key.
    pub idempotency_key: Option<String>,

    /// When the entry was appended.
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// Creates a new ledger entry.
    pub fn new(
        user_id: UserId,
        delta: i64,
        kind: LedgerEntryKind,
        reason: impl Into<String>,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            user_id,
            delta,
            kind,
            reason: reason.into(),
            idempotency_key,
            created_at: Timestamp::now(),
        }
    }
}

/// Idempotency key for crediting a captured provider payment.
///
/// One key per provider payment id means a redelivered capture event can
/// never double-credit.
pub fn provider_key(payment_id: &str) -> String {
    format!("provider:{}", payment_id)
}

/// Idempotency key for a generation-run debit.
pub fn usage_key(request_id: &str) -> String {
    format!("usage:{}", request_id)
}

/// Idempotency key for the compensating refund of a generation run.
///
/// Distinct from [`usage_key`] so the refund of a debited request is its
/// own once-only operation.
pub fn refund_key(request_id: &str) -> String {
    format!("refund:{}", request_id)
}
