//! DebitCreditsHandler - Command handler for consuming generation credits.
//!
//! Consumed in-process by the generation pipeline: debit before the run,
//! and if the run fails after the debit committed, compensate with a
//! refund entry under a fresh idempotency key tied to the same request.
//! The compensation is an explicit corrective entry, not a rollback - the
//! original debit stays in the ledger.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{refund_key, usage_key, LedgerEntryKind, LedgerError};
use crate::domain::foundation::UserId;
use crate::ports::{CreditCommand, CreditLedger, DebitCommand};

/// Command to debit credits for a generation run.
#[derive(Debug, Clone)]
pub struct DebitCreditsCommand {
    pub user_id: UserId,
    /// Credits the run costs.
    pub amount: i64,
    /// Human-readable reason recorded on the ledger entry.
    pub reason: String,
    /// Id of the generation request; retries of the same request replay
    /// instead of double-debiting, and the compensating refund is keyed
    /// off it too.
    pub request_id: String,
}

/// Result of a debit.
#[derive(Debug, Clone)]
pub struct DebitCreditsResult {
    pub balance: i64,
}

/// Handler for consuming and compensating generation credits.
pub struct DebitCreditsHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl DebitCreditsHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    /// Debit credits for a generation run.
    ///
    /// # Errors
    ///
    /// `LedgerError::InsufficientCredits` when the balance cannot cover
    /// the run; nothing is written.
    pub async fn handle(&self, cmd: DebitCreditsCommand) -> Result<DebitCreditsResult, LedgerError> {
        let balance = self
            .ledger
            .debit(DebitCommand {
                user_id: cmd.user_id,
                amount: cmd.amount,
                reason: cmd.reason,
                idempotency_key: Some(usage_key(&cmd.request_id)),
            })
            .await?;

        info!(
            user_id = %cmd.user_id,
            request_id = %cmd.request_id,
            amount = cmd.amount,
            balance,
            "credits debited"
        );

        Ok(DebitCreditsResult { balance })
    }

    /// Compensate a committed debit after the downstream run failed.
    ///
    /// Idempotent per request id; replaying a compensation changes
    /// nothing.
    pub async fn refund(&self, cmd: DebitCreditsCommand) -> Result<DebitCreditsResult, LedgerError> {
        let balance = self
            .ledger
            .credit(CreditCommand {
                user_id: cmd.user_id,
                amount: cmd.amount,
                kind: LedgerEntryKind::Refund,
                reason: format!("Refund for failed request {}", cmd.request_id),
                idempotency_key: Some(refund_key(&cmd.request_id)),
            })
            .await?;

        warn!(
            user_id = %cmd.user_id,
            request_id = %cmd.request_id,
            amount = cmd.amount,
            balance,
            "debit compensated after downstream failure"
        );

        Ok(DebitCreditsResult { balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    /// In-memory ledger mirroring the Postgres semantics.
    struct MockLedger {
        balances: Mutex<HashMap<i64, i64>>,
        keys: Mutex<Vec<String>>,
    }

    impl MockLedger {
        fn with_balance(user_id: i64, balance: i64) -> Self {
            let ledger = Self {
                balances: Mutex::new(HashMap::new()),
                keys: Mutex::new(Vec::new()),
            };
            ledger.balances.lock().unwrap().insert(user_id, balance);
            ledger
        }

        fn entry_count(&self) -> usize {
            self.keys.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CreditLedger for MockLedger {
        async fn credit(&self, cmd: CreditCommand) -> Result<i64, LedgerError> {
            let mut balances = self.balances.lock().unwrap();
            let mut keys = self.keys.lock().unwrap();
            let balance = balances.get_mut(&cmd.user_id.as_i64()).ok_or(LedgerError::UserNotFound)?;

            if let Some(key) = &cmd.idempotency_key {
                if keys.contains(key) {
                    return Ok(*balance);
                }
                keys.push(key.clone());
            }
            *balance += cmd.amount;
            Ok(*balance)
        }

        async fn debit(&self, cmd: DebitCommand) -> Result<i64, LedgerError> {
            let mut balances = self.balances.lock().unwrap();
            let mut keys = self.keys.lock().unwrap();
            let balance = balances.get_mut(&cmd.user_id.as_i64()).ok_or(LedgerError::UserNotFound)?;

            if let Some(key) = &cmd.idempotency_key {
                if keys.contains(key) {
                    return Ok(*balance);
                }
            }
            if *balance < cmd.amount {
                return Err(LedgerError::InsufficientCredits {
                    available: *balance,
                    requested: cmd.amount,
                });
            }
            if let Some(key) = cmd.idempotency_key {
                keys.push(key);
            }
            *balance -= cmd.amount;
            Ok(*balance)
        }

        async fn balance(&self, user_id: UserId) -> Result<i64, LedgerError> {
            self.balances
                .lock()
                .unwrap()
                .get(&user_id.as_i64())
                .copied()
                .ok_or(LedgerError::UserNotFound)
        }

        async fn exists_by_key(&self, key: &str) -> Result<bool, LedgerError> {
            Ok(self.keys.lock().unwrap().iter().any(|k| k == key))
        }
    }

    fn cmd(amount: i64) -> DebitCreditsCommand {
        DebitCreditsCommand {
            user_id: UserId::new(20).unwrap(),
            amount,
            reason: "site generation".to_string(),
            request_id: "req_1".to_string(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Debit Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn debit_reduces_balance() {
        let ledger = Arc::new(MockLedger::with_balance(20, 10));
        let handler = DebitCreditsHandler::new(ledger);

        let result = handler.handle(cmd(3)).await.unwrap();
        assert_eq!(result.balance, 7);
    }

    #[tokio::test]
    async fn overdraw_fails_without_writing() {
        let ledger = Arc::new(MockLedger::with_balance(20, 5));
        let handler = DebitCreditsHandler::new(ledger.clone());

        let result = handler.handle(cmd(10)).await;

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientCredits {
                available: 5,
                requested: 10,
            })
        ));
        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(
            ledger.balance(UserId::new(20).unwrap()).await.unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn retried_debit_replays_instead_of_double_debiting() {
        let ledger = Arc::new(MockLedger::with_balance(20, 10));
        let handler = DebitCreditsHandler::new(ledger);

        handler.handle(cmd(3)).await.unwrap();
        let replay = handler.handle(cmd(3)).await.unwrap();

        assert_eq!(replay.balance, 7);
    }

    // ══════════════════════════════════════════════════════════════
    // Compensation Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn refund_restores_balance_once() {
        let ledger = Arc::new(MockLedger::with_balance(20, 10));
        let handler = DebitCreditsHandler::new(ledger);

        handler.handle(cmd(3)).await.unwrap();
        let refunded = handler.refund(cmd(3)).await.unwrap();
        assert_eq!(refunded.balance, 10);

        // Replayed compensation changes nothing.
        let replayed = handler.refund(cmd(3)).await.unwrap();
        assert_eq!(replayed.balance, 10);
    }
}
