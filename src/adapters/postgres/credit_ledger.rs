//! PostgreSQL implementation of CreditLedger.
//!
//! Every write couples the ledger append and the cached-balance update in
//! one transaction. Debits use a conditional decrement
//! (`WHERE credits >= amount`) so the balance check and the write are one
//! statement; a stale read-then-write would allow overdraft under
//! concurrent debits.

use crate::domain::billing::LedgerError;
use crate::domain::foundation::UserId;
use crate::ports::{CreditCommand, CreditLedger, DebitCommand};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the CreditLedger port.
pub struct PostgresCreditLedger {
    pool: PgPool,
}

impl PostgresCreditLedger {
    /// Creates a new PostgresCreditLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> LedgerError {
    LedgerError::Database(format!("{}: {}", context, e))
}

#[async_trait]
impl CreditLedger for PostgresCreditLedger {
    async fn credit(&self, cmd: CreditCommand) -> Result<i64, LedgerError> {
        if cmd.amount <= 0 {
            return Err(LedgerError::InvalidAmount(cmd.amount));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin credit", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, user_id, delta, kind, reason, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cmd.user_id.as_i64())
        .bind(cmd.amount)
        .bind(cmd.kind.as_str())
        .bind(&cmd.reason)
        .bind(&cmd.idempotency_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to append ledger entry", e))?
        .rows_affected();

        let balance = if inserted == 1 {
            let row: Option<(i64,)> = sqlx::query_as(
                "UPDATE users SET credits = credits + $2, updated_at = now() \
                 WHERE id = $1 RETURNING credits",
            )
            .bind(cmd.user_id.as_i64())
            .bind(cmd.amount)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to update cached balance", e))?;

            match row {
                Some((balance,)) => balance,
                // No user row: roll the entry back rather than orphan it.
                None => return Err(LedgerError::UserNotFound),
            }
        } else {
            // Replayed idempotency key: nothing changed, report the
            // current balance.
            self.fetch_balance(&mut tx, cmd.user_id).await?
        };

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit credit", e))?;

        Ok(balance)
    }

    async fn debit(&self, cmd: DebitCommand) -> Result<i64, LedgerError> {
        if cmd.amount <= 0 {
            return Err(LedgerError::InvalidAmount(cmd.amount));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin debit", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, user_id, delta, kind, reason, idempotency_key)
            VALUES ($1, $2, $3, 'debit', $4, $5)
            ON CONFLICT (idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cmd.user_id.as_i64())
        .bind(-cmd.amount)
        .bind(&cmd.reason)
        .bind(&cmd.idempotency_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to append ledger entry", e))?
        .rows_affected();

        if inserted == 0 {
            // Replayed idempotency key: the earlier attempt already
            // debited (or is doing so); report the current balance.
            let balance = self.fetch_balance(&mut tx, cmd.user_id).await?;
            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit debit", e))?;
            return Ok(balance);
        }

        // Check-then-decrement as one statement; concurrent debits
        // serialize on the user row and cannot jointly overdraw.
        let updated: Option<(i64,)> = sqlx::query_as(
            "UPDATE users SET credits = credits - $2, updated_at = now() \
             WHERE id = $1 AND credits >= $2 RETURNING credits",
        )
        .bind(cmd.user_id.as_i64())
        .bind(cmd.amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to decrement balance", e))?;

        match updated {
            Some((balance,)) => {
                tx.commit()
                    .await
                    .map_err(|e| db_error("Failed to commit debit", e))?;
                Ok(balance)
            }
            None => {
                let available: Option<(i64,)> =
                    sqlx::query_as("SELECT credits FROM users WHERE id = $1")
                        .bind(cmd.user_id.as_i64())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| db_error("Failed to read balance", e))?;

                // Dropping the transaction rolls back the ledger insert.
                match available {
                    None => Err(LedgerError::UserNotFound),
                    Some((available,)) => Err(LedgerError::InsufficientCredits {
                        available,
                        requested: cmd.amount,
                    }),
                }
            }
        }
    }

    async fn balance(&self, user_id: UserId) -> Result<i64, LedgerError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT credits FROM users WHERE id = $1")
            .bind(user_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read balance", e))?;

        match row {
            Some((balance,)) => Ok(balance),
            None => Err(LedgerError::UserNotFound),
        }
    }

    async fn exists_by_key(&self, idempotency_key: &str) -> Result<bool, LedgerError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM ledger_entries WHERE idempotency_key = $1)",
        )
        .bind(idempotency_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check idempotency key", e))?;

        Ok(exists)
    }
}

impl PostgresCreditLedger {
    async fn fetch_balance(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: UserId,
    ) -> Result<i64, LedgerError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT credits FROM users WHERE id = $1")
            .bind(user_id.as_i64())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("Failed to read balance", e))?;

        match row {
            Some((balance,)) => Ok(balance),
            None => Err(LedgerError::UserNotFound),
        }
    }
}
