//! User directory port - read-only lookups against the user table.
//!
//! Webhook events must resolve to a local user before a subscription row can
//! be created. Resolution tries explicit metadata on the event first, then a
//! lookup by the provider's customer id.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Port for resolving local users during webhook processing.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Check whether a user with this id exists.
    ///
    /// Used to validate a user id claimed by event metadata before trusting it.
    async fn user_exists(&self, user_id: &UserId) -> Result<bool, DomainError>;

    /// Find the user linked to the provider's customer id.
    ///
    /// Returns `None` when no user carries that customer id.
    async fn find_by_customer_id(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserId>, DomainError>;
}
