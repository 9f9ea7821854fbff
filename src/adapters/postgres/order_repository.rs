//! PostgreSQL implementation of OrderRepository.
//!
//! Settlement runs as one transaction: the guarded order update, the
//! idempotency-keyed ledger insert, and the cached-balance bump either all
//! commit or none do. The partial unique index on
//! `ledger_entries.idempotency_key` is what makes a concurrent settlement
//! of the same payment safe.

use crate::domain::billing::{provider_key, Order, OrderStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{OrderRepository, OrderSettlement, SettleOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgresOrderRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_id: String,
    user_id: i64,
    amount: i64,
    credits_requested: i64,
    status: String,
    payment_id: Option<String>,
    provider_signature: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            order_id: row.order_id,
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            amount: row.amount,
            credits_requested: row.credits_requested,
            status: parse_status(&row.status)?,
            payment_id: row.payment_id,
            provider_signature: row.provider_signature,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<OrderStatus, DomainError> {
    match s {
        "created" => Ok(OrderStatus::Created),
        "paid" => Ok(OrderStatus::Paid),
        "failed" => Ok(OrderStatus::Failed),
        "refunded" => Ok(OrderStatus::Refunded),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid order status value: {}", s),
        )),
    }
}

fn status_to_string(status: &OrderStatus) -> &'static str {
    match status {
        OrderStatus::Created => "created",
        OrderStatus::Paid => "paid",
        OrderStatus::Failed => "failed",
        OrderStatus::Refunded => "refunded",
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

const ORDER_COLUMNS: &str = "id, order_id, user_id, amount, credits_requested, status, \
     payment_id, provider_signature, created_at, updated_at";

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_id, user_id, amount, credits_requested, status,
                payment_id, provider_signature, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(order.user_id.as_i64())
        .bind(order.amount)
        .bind(order.credits_requested)
        .bind(status_to_string(&order.status))
        .bind(&order.payment_id)
        .bind(&order.provider_signature)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("orders_order_id_key") {
                    return DomainError::new(
                        ErrorCode::OrderExists,
                        "Order already recorded for this provider order id",
                    );
                }
            }
            db_error("Failed to save order", e)
        })?;

        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE order_id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn record_provider_details(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_id = COALESCE(payment_id, $2),
                provider_signature = COALESCE(provider_signature, $3),
                updated_at = now()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .bind(signature)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record provider details", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::OrderNotFound, "Order not found"));
        }

        Ok(())
    }

    async fn mark_failed(&self, order_id: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = 'failed', updated_at = now()
            WHERE order_id = $1 AND status IN ('created', 'failed')
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark order failed", e))?;

        if result.rows_affected() == 0 {
            let status: Option<(String,)> =
                sqlx::query_as("SELECT status FROM orders WHERE order_id = $1")
                    .bind(order_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| db_error("Failed to read order status", e))?;

            return Err(match status {
                None => DomainError::new(ErrorCode::OrderNotFound, "Order not found"),
                Some((status,)) => DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!("Cannot fail order in status {}", status),
                ),
            });
        }

        Ok(())
    }

    async fn settle_paid(&self, settlement: OrderSettlement) -> Result<SettleOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin settlement", e))?;

        // Guarded transition: only created or already-paid orders settle.
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            UPDATE orders SET
                status = 'paid',
                payment_id = $2,
                provider_signature = COALESCE($3, provider_signature),
                updated_at = now()
            WHERE order_id = $1 AND status IN ('created', 'paid')
            RETURNING user_id, credits_requested
            "#,
        )
        .bind(&settlement.order_id)
        .bind(&settlement.payment_id)
        .bind(&settlement.signature)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to mark order paid", e))?;

        let Some((user_id, credits)) = row else {
            let status: Option<(String,)> =
                sqlx::query_as("SELECT status FROM orders WHERE order_id = $1")
                    .bind(&settlement.order_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("Failed to read order status", e))?;

            return Err(match status {
                None => DomainError::new(ErrorCode::OrderNotFound, "Order not found"),
                Some((status,)) => DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!("Cannot settle order in status {}", status),
                ),
            });
        };

        // The idempotency key is checked by the insert itself; a separate
        // existence check would race with concurrent settlements.
        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, user_id, delta, kind, reason, idempotency_key)
            VALUES ($1, $2, $3, 'purchase', $4, $5)
            ON CONFLICT (idempotency_key) WHERE idempotency_key IS NOT NULL DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(credits)
        .bind(&settlement.reason)
        .bind(provider_key(&settlement.payment_id))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to append ledger entry", e))?
        .rows_affected();

        let outcome = if inserted == 1 {
            let (balance,): (i64,) = sqlx::query_as(
                "UPDATE users SET credits = credits + $2, updated_at = now() \
                 WHERE id = $1 RETURNING credits",
            )
            .bind(user_id)
            .bind(credits)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to update cached balance", e))?;

            SettleOutcome::Credited { balance }
        } else {
            let (balance,): (i64,) = sqlx::query_as("SELECT credits FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to read cached balance", e))?;

            SettleOutcome::AlreadyCredited { balance }
        };

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit settlement", e))?;

        Ok(outcome)
    }
}
