//! GetBalanceHandler - Query handler for the cached credit balance.

use std::sync::Arc;

use crate::domain::billing::LedgerError;
use crate::domain::foundation::UserId;
use crate::ports::CreditLedger;

/// Query for a user's current balance.
#[derive(Debug, Clone)]
pub struct GetBalanceQuery {
    pub user_id: UserId,
}

/// Result of a balance query.
#[derive(Debug, Clone)]
pub struct GetBalanceResult {
    pub credits: i64,
}

/// Handler for balance queries.
pub struct GetBalanceHandler {
    ledger: Arc<dyn CreditLedger>,
}

impl GetBalanceHandler {
    pub fn new(ledger: Arc<dyn CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetBalanceQuery) -> Result<GetBalanceResult, LedgerError> {
        let credits = self.ledger.balance(query.user_id).await?;
        Ok(GetBalanceResult { credits })
    }
}
