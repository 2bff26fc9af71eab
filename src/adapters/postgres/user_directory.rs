//! PostgreSQL implementation of UserDirectory.
//!
//! Read-only lookups against the users table. Webhook processing never
//! creates or modifies user accounts; it only resolves which account a
//! provider event belongs to.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::UserDirectory;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the UserDirectory port.
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a new PostgresUserDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn user_exists(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to check user: {}", e))
        })?;

        Ok(exists)
    }

    async fn find_by_customer_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM users
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(stripe_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to look up customer: {}", e),
            )
        })?;

        Ok(row.map(|(id,)| UserId::from_uuid(id)))
    }
}
