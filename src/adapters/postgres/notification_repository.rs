//! PostgreSQL implementation of NotificationRepository.
//!
//! Inserts user-facing notification rows produced during webhook
//! processing. Rows start unread; the delivery surface that marks them
//! read lives outside this service.

use crate::domain::billing::NotificationDraft;
use crate::domain::foundation::{DomainError, ErrorCode, NotificationId, Timestamp};
use crate::ports::NotificationRepository;
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of the NotificationRepository port.
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    /// Creates a new PostgresNotificationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create(&self, draft: &NotificationDraft) -> Result<(), DomainError> {
        let id = NotificationId::new();
        let now = Timestamp::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, changes, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(draft.user_id.as_uuid())
        .bind(draft.kind.as_str())
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(&draft.changes)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to create notification: {}", e),
            )
        })?;

        Ok(())
    }
}
