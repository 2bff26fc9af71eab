//! User notifications emitted by webhook handlers.
//!
//! Only two lifecycle moments produce notifications: an approaching trial end
//! and a failed payment. Deduplication rides on event idempotency - each
//! external event is processed once, so each qualifying event yields exactly
//! one draft.

use crate::domain::foundation::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Closed set of notification types this service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TrialEnding,
    PaymentFailed,
}

impl NotificationKind {
    /// Storage representation of the type tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrialEnding => "trial_ending",
            Self::PaymentFailed => "payment_failed",
        }
    }
}

/// A notification ready for persistence.
///
/// The repository assigns the id, the unread flag, and the creation
/// timestamp; handlers only decide content.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// What changed, keyed by the originating provider object ids.
    pub changes: serde_json::Value,
}

impl NotificationDraft {
    /// Draft for an approaching trial end.
    pub fn trial_ending(
        user_id: UserId,
        stripe_subscription_id: &str,
        trial_end: Option<Timestamp>,
    ) -> Self {
        let body = match trial_end {
            Some(ts) => format!(
                "Your Crawlready trial ends on {}. Add a payment method to keep your scans running.",
                ts.as_datetime().format("%Y-%m-%d")
            ),
            None => {
                "Your Crawlready trial is ending soon. Add a payment method to keep your scans running."
                    .to_string()
            }
        };
        Self {
            user_id,
            kind: NotificationKind::TrialEnding,
            title: "Your trial is ending soon".to_string(),
            body,
            changes: json!({
                "stripe_subscription_id": stripe_subscription_id,
                "trial_end": trial_end,
            }),
        }
    }

    /// Draft for a failed payment.
    pub fn payment_failed(
        user_id: UserId,
        stripe_subscription_id: &str,
        stripe_invoice_id: Option<&str>,
    ) -> Self {
        Self {
            user_id,
            kind: NotificationKind::PaymentFailed,
            title: "Payment failed".to_string(),
            body: "We could not collect your latest payment. Update your payment method to keep your Crawlready subscription active."
                .to_string(),
            changes: json!({
                "stripe_subscription_id": stripe_subscription_id,
                "stripe_invoice_id": stripe_invoice_id,
            }),
        }
    }
}
