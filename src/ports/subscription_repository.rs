//! Subscription repository port (write side).
//!
//! Defines the contract for persisting the local projection of provider
//! subscription state. Implementations handle the actual database operations.
//!
//! # Design
//!
//! - **Keyed by external id**: every write is addressed by the provider's
//!   subscription id, which is unique and immutable once set
//! - **Upsert semantics**: lifecycle events update in place; an update that
//!   arrives before the create synthesizes the row
//! - **Last write wins**: no version check; the provider is ground truth and
//!   offers its own resync path for lost deliveries

use async_trait::async_trait;

use crate::domain::billing::{Subscription, SubscriptionPatch, SubscriptionStatus};
use crate::domain::foundation::DomainError;

/// Repository port for subscription projection persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by the provider's subscription id.
    ///
    /// Returns `None` if no row exists for that external id.
    async fn find_by_external_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Insert or overwrite the row for the patch's external id.
    ///
    /// Creates the row when absent, otherwise overwrites every field carried
    /// by the patch. Returns the persisted row.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn upsert(&self, patch: &SubscriptionPatch) -> Result<Subscription, DomainError>;

    /// Update only the status of an existing row.
    ///
    /// Returns `None` when no row exists for that external id; callers decide
    /// whether that is an error.
    async fn set_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<Option<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
