//! PostgreSQL implementation of EventMarkerRepository.
//!
//! Admission is `INSERT ... ON CONFLICT DO NOTHING` against the primary
//! key on `event_id`. Exactly one concurrent caller inserts the row; the
//! others observe zero affected rows and report `AlreadyHandled`.

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Admission, EventMarker, EventMarkerRepository, EventMarkerStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the EventMarkerRepository port.
pub struct PostgresEventMarkerRepository {
    pool: PgPool,
}

impl PostgresEventMarkerRepository {
    /// Creates a new PostgresEventMarkerRepository with the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an event marker.
#[derive(Debug, sqlx::FromRow)]
struct EventMarkerRow {
    event_id: String,
    status: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventMarkerRow> for EventMarker {
    type Error = DomainError;

    fn try_from(row: EventMarkerRow) -> Result<Self, Self::Error> {
        let status = EventMarkerStatus::parse(&row.status).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
        })?;

        Ok(EventMarker {
            event_id: row.event_id,
            status,
            payload: row.payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl EventMarkerRepository for PostgresEventMarkerRepository {
    async fn admit(
        &self,
        event_id: &str,
        payload: serde_json::Value,
    ) -> Result<Admission, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO event_markers (event_id, status, payload)
            VALUES ($1, 'processing', $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to admit event", e))?
        .rows_affected();

        if inserted == 1 {
            Ok(Admission::Admitted)
        } else {
            Ok(Admission::AlreadyHandled)
        }
    }

    async fn finish(
        &self,
        event_id: &str,
        status: EventMarkerStatus,
    ) -> Result<(), DomainError> {
        // Guarded on 'processing' so a marker transitions to exactly one
        // terminal status.
        let result = sqlx::query(
            r#"
            UPDATE event_markers SET status = $2, updated_at = now()
            WHERE event_id = $1 AND status = 'processing'
            "#,
        )
        .bind(event_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to finish event marker", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Event marker {} is missing or already terminal", event_id),
            ));
        }

        Ok(())
    }

    async fn find(&self, event_id: &str) -> Result<Option<EventMarker>, DomainError> {
        let row: Option<EventMarkerRow> = sqlx::query_as(
            "SELECT event_id, status, payload, created_at, updated_at \
             FROM event_markers WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find event marker", e))?;

        row.map(EventMarker::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marker_row_converts_with_known_status() {
        let now = Utc::now();
        let row = EventMarkerRow {
            event_id: "evt_1".to_string(),
            status: "processing".to_string(),
            payload: json!({"id": "evt_1"}),
            created_at: now,
            updated_at: now,
        };

        let marker = EventMarker::try_from(row).unwrap();
        assert_eq!(marker.event_id, "evt_1");
        assert_eq!(marker.status, EventMarkerStatus::Processing);
    }

    #[test]
    fn marker_row_rejects_unknown_status() {
        let now = Utc::now();
        let row = EventMarkerRow {
            event_id: "evt_1".to_string(),
            status: "finished".to_string(),
            payload: json!({}),
            created_at: now,
            updated_at: now,
        };

        assert!(EventMarker::try_from(row).is_err());
    }
}
