//! CreditCreditsHandler - Command handler for granting credits outside
//! the reconciliation path.
//!
//! Used for operator adjustments and service-level compensations. The
//! webhook settlement never goes through here; its crediting lives inside
//! the settlement transaction.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{LedgerEntryKind, LedgerError};
use crate::domain::foundation::UserId;
use crate::ports::{CreditCommand, CreditLedger};

/// Command to grant credits.
#[derive(Debug, Clone)]
pub struct CreditCreditsCommand {
    pub user_id: UserId,
    /// Credits to grant.
    pub amount: i64,
    /// Entry category; `Refund` for compensations, `AdminAdjustment` for
    /// operator corrections.
    pub kind: LedgerEntryKind,
    /// Human-readable reason recorded on the ledger entry.
    pub reason: String,
    /// Key tying the grant to its originating operation; replays are
    /// no-ops.
    pub idempotency_key: Option<String>,
}

/// Result of a credit grant.
#[derive(Debug, Clone)]
pub struct CreditCreditsResult {
    pub balance: i64,
}

/// Handler for granting credits.
pub struct CreditCreditsHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl CreditCreditsHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        cmd: CreditCreditsCommand,
    ) -> Result<CreditCreditsResult, LedgerError> {
        let balance = self
            .ledger
            .credit(CreditCommand {
                user_id: cmd.user_id,
                amount: cmd.amount,
                kind: cmd.kind,
                reason: cmd.reason,
                idempotency_key: cmd.idempotency_key,
            })
            .await?;

        info!(
            user_id = %cmd.user_id,
            amount = cmd.amount,
            kind = cmd.kind.as_str(),
            balance,
            "credits granted"
        );

        Ok(CreditCreditsResult { balance })
    }
}
