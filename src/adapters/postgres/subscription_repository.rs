//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Subscription rows are keyed by the provider subscription id; the UUID
//! primary key exists for foreign keys from notifications and event records.

use crate::domain::billing::{Subscription, SubscriptionPatch, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the SubscriptionRepository port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a new PostgresSubscriptionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    stripe_subscription_id: String,
    stripe_price_id: String,
    stripe_product_id: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    canceled_at: Option<DateTime<Utc>>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_price_id: row.stripe_price_id,
            stripe_product_id: row.stripe_product_id,
            status: parse_status(&row.status)?,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            trial_start: row.trial_start.map(Timestamp::from_datetime),
            trial_end: row.trial_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Parses the stored status column. The adapter only writes values produced
/// by `SubscriptionStatus::as_str`, so anything else is a corrupt row, not
/// an unknown provider vocabulary word.
fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "active" => Ok(SubscriptionStatus::Active),
        "trialing" => Ok(SubscriptionStatus::Trialing),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "canceled" => Ok(SubscriptionStatus::Canceled),
        "incomplete" => Ok(SubscriptionStatus::Incomplete),
        "paused" => Ok(SubscriptionStatus::Paused),
        _ => Err(DomainError::new(
            ErrorCode::DataCorruption,
            format!("Invalid status value: {}", s),
        )),
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_external_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, stripe_subscription_id, stripe_price_id, stripe_product_id,
                   status, current_period_start, current_period_end, cancel_at_period_end,
                   canceled_at, trial_start, trial_end, created_at, updated_at
            FROM subscriptions
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find subscription: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(&self, patch: &SubscriptionPatch) -> Result<Subscription, DomainError> {
        let insert_id = SubscriptionId::new();
        let now = Timestamp::now();

        // On conflict the provider-owned columns are overwritten wholesale;
        // user_id and created_at keep their original values so a subscription
        // is never re-homed by a later webhook.
        let row: SubscriptionRow = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_subscription_id, stripe_price_id, stripe_product_id,
                status, current_period_start, current_period_end, cancel_at_period_end,
                canceled_at, trial_start, trial_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            ON CONFLICT (stripe_subscription_id) DO UPDATE SET
                stripe_price_id = EXCLUDED.stripe_price_id,
                stripe_product_id = EXCLUDED.stripe_product_id,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                canceled_at = EXCLUDED.canceled_at,
                trial_start = EXCLUDED.trial_start,
                trial_end = EXCLUDED.trial_end,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, stripe_subscription_id, stripe_price_id, stripe_product_id,
                      status, current_period_start, current_period_end, cancel_at_period_end,
                      canceled_at, trial_start, trial_end, created_at, updated_at
            "#,
        )
        .bind(insert_id.as_uuid())
        .bind(patch.user_id.as_uuid())
        .bind(&patch.stripe_subscription_id)
        .bind(&patch.stripe_price_id)
        .bind(&patch.stripe_product_id)
        .bind(patch.status.as_str())
        .bind(patch.current_period_start.map(|t| *t.as_datetime()))
        .bind(patch.current_period_end.map(|t| *t.as_datetime()))
        .bind(patch.cancel_at_period_end)
        .bind(patch.canceled_at.map(|t| *t.as_datetime()))
        .bind(patch.trial_start.map(|t| *t.as_datetime()))
        .bind(patch.trial_end.map(|t| *t.as_datetime()))
        .bind(now.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to upsert subscription: {}", e))
        })?;

        Subscription::try_from(row)
    }

    async fn set_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<Option<Subscription>, DomainError> {
        let now = Timestamp::now();

        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            UPDATE subscriptions SET
                status = $2,
                updated_at = $3
            WHERE stripe_subscription_id = $1
            RETURNING id, user_id, stripe_subscription_id, stripe_price_id, stripe_product_id,
                      status, current_period_start, current_period_end, cancel_at_period_end,
                      canceled_at, trial_start, trial_end, created_at, updated_at
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(status.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update subscription status: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_accepts_every_stored_value() {
        assert_eq!(parse_status("active").unwrap(), SubscriptionStatus::Active);
        assert_eq!(parse_status("trialing").unwrap(), SubscriptionStatus::Trialing);
        assert_eq!(parse_status("past_due").unwrap(), SubscriptionStatus::PastDue);
        assert_eq!(parse_status("canceled").unwrap(), SubscriptionStatus::Canceled);
        assert_eq!(parse_status("incomplete").unwrap(), SubscriptionStatus::Incomplete);
        assert_eq!(parse_status("paused").unwrap(), SubscriptionStatus::Paused);
    }

    #[test]
    fn parse_status_rejects_unknown_value() {
        let err = parse_status("unpaid").unwrap_err();
        assert_eq!(err.code, ErrorCode::DataCorruption);
        assert!(err.message.contains("unpaid"));
    }

    #[test]
    fn status_round_trips_through_storage_representation() {
        let all = [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Paused,
        ];
        for status in all {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
    }
}
