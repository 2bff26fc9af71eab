//! PostgreSQL implementation of WebhookEventRepository.
//!
//! The subscription_events table is the append-only processing ledger.
//! A unique index on stripe_event_id makes the insert the atomic claim on
//! an event id: when two deliveries race, exactly one insert wins and the
//! loser observes `SaveResult::AlreadyExists`.

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::ports::{SaveResult, SubscriptionEventRecord, WebhookEventRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the WebhookEventRepository port.
pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    /// Creates a new PostgresWebhookEventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a processed webhook event.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionEventRow {
    stripe_event_id: String,
    event_type: String,
    subscription_id: Option<Uuid>,
    processed_at: DateTime<Utc>,
    processing_failed: bool,
    error_message: Option<String>,
    payload: serde_json::Value,
}

impl From<SubscriptionEventRow> for SubscriptionEventRecord {
    fn from(row: SubscriptionEventRow) -> Self {
        Self {
            event_id: row.stripe_event_id,
            event_type: row.event_type,
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            processed_at: Timestamp::from_datetime(row.processed_at),
            processing_failed: row.processing_failed,
            error_message: row.error_message,
            payload: row.payload,
        }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<SubscriptionEventRecord>, DomainError> {
        let row: Option<SubscriptionEventRow> = sqlx::query_as(
            r#"
            SELECT stripe_event_id, event_type, subscription_id, processed_at,
                   processing_failed, error_message, payload
            FROM subscription_events
            WHERE stripe_event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find event: {}", e))
        })?;

        Ok(row.map(SubscriptionEventRecord::from))
    }

    async fn save(&self, record: SubscriptionEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscription_events (
                id, stripe_event_id, event_type, subscription_id, processed_at,
                processing_failed, error_message, payload
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (stripe_event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.subscription_id.map(|id| *id.as_uuid()))
        .bind(record.processed_at.as_datetime())
        .bind(record.processing_failed)
        .bind(&record.error_message)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save event: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Ok(SaveResult::AlreadyExists);
        }

        Ok(SaveResult::Inserted)
    }
}
