//! CreditLedger port - atomic balance changes with idempotency keys.
//!
//! The generation pipeline consumes credits through this port; the
//! reconciliation path grants them through `OrderRepository::settle_paid`.
//! Every operation that writes must couple the ledger append and the
//! cached-balance update in one transaction, with the idempotency-key
//! check inside the same transaction - a separate check-then-append would
//! race with concurrent retries.

use async_trait::async_trait;

use crate::domain::billing::{LedgerEntryKind, LedgerError};
use crate::domain::foundation::UserId;

/// Inputs for a credit (balance increase).
#[derive(Debug, Clone)]
pub struct CreditCommand {
    pub user_id: UserId,
    /// Positive number of credits to grant.
    pub amount: i64,
    pub kind: LedgerEntryKind,
    pub reason: String,
    /// A repeated key makes the operation a no-op returning the current
    /// balance.
    pub idempotency_key: Option<String>,
}

/// Inputs for a debit (balance decrease).
#[derive(Debug, Clone)]
pub struct DebitCommand {
    pub user_id: UserId,
    /// Positive number of credits to consume.
    pub amount: i64,
    pub reason: String,
    /// A repeated key makes the operation a no-op returning the current
    /// balance.
    pub idempotency_key: Option<String>,
}

/// Port for the append-only credit ledger.
///
/// Implementations must guarantee that for any non-null idempotency key at
/// most one ledger entry ever exists, and that `users.credits` always
/// equals the running sum of the user's entries.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Grant credits. Returns the balance after the operation.
    async fn credit(&self, cmd: CreditCommand) -> Result<i64, LedgerError>;

    /// Consume credits. Returns the balance after the operation.
    ///
    /// The balance check and the decrement are one atomic step; under
    /// concurrent debits the sum of successful debits never exceeds the
    /// starting balance.
    ///
    /// # Errors
    ///
    /// `LedgerError::InsufficientCredits` when the balance is lower than
    /// `cmd.amount`; no entry is written.
    async fn debit(&self, cmd: DebitCommand) -> Result<i64, LedgerError>;

    /// Current cached balance.
    async fn balance(&self, user_id: UserId) -> Result<i64, LedgerError>;

    /// True if an entry with this idempotency key exists.
    async fn exists_by_key(&self, idempotency_key: &str) -> Result<bool, LedgerError>;
}
