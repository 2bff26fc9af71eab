//! Notification repository port.
//!
//! Notifications are produced as side effects of the trial-ending and
//! payment-failed handlers. A write failure here must never fail the
//! surrounding event: the processor logs it and moves on.

use async_trait::async_trait;

use crate::domain::billing::NotificationDraft;
use crate::domain::foundation::DomainError;

/// Port for creating user-facing notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a notification for a user.
    ///
    /// The implementation assigns the id, unread flag, and creation timestamp.
    async fn create(&self, draft: &NotificationDraft) -> Result<(), DomainError>;
}
