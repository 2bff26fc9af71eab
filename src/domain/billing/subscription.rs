//! Subscription aggregate - local projection of a provider subscription.
//!
//! Each row mirrors one subscription at the billing provider. The provider,
//! not this service, owns the lifecycle: every field here is overwritten from
//! webhook payloads and never edited locally.
//!
//! # Design Decisions
//!
//! - **One current subscription per user**: access control reads at most one
//!   row per user; the schema does not model parallel active subscriptions
//! - **Fail-secure**: an unknown provider status maps to `Incomplete`, which
//!   grants no access
//! - **Never deleted**: cancellation is a status transition, not a row delete

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a subscription, mirrored from the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    Paused,
}

impl SubscriptionStatus {
    /// Maps a provider status string onto the local vocabulary.
    ///
    /// Total by construction: provider statuses outside the local vocabulary
    /// collapse onto the nearest non-granting state (`incomplete_expired` to
    /// `Incomplete`, `unpaid` to `PastDue`), and anything unrecognized maps
    /// to `Incomplete` so a new provider status never grants access.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::Incomplete,
            "unpaid" => Self::PastDue,
            "paused" => Self::Paused,
            _ => Self::Incomplete,
        }
    }

    /// Storage representation, also used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::Paused => "paused",
        }
    }

    /// Whether this status grants access to paid features.
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Subscription aggregate - one user's mirrored provider subscription.
///
/// # Invariants
///
/// - `stripe_subscription_id` is unique across all rows and immutable once set
/// - `user_id` is required; a subscription without a resolvable user is never
///   persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this row.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Provider subscription id (`sub_...`).
    pub stripe_subscription_id: String,

    /// Provider price id for the subscribed plan.
    pub stripe_price_id: String,

    /// Provider product id, when the price carries one.
    pub stripe_product_id: Option<String>,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// Start of the current billing period, when the provider sent one.
    pub current_period_start: Option<Timestamp>,

    /// End of the current billing period, when the provider sent one.
    pub current_period_end: Option<Timestamp>,

    /// Whether the provider will cancel at the end of the current period.
    pub cancel_at_period_end: bool,

    /// When the subscription was canceled (if canceled).
    pub canceled_at: Option<Timestamp>,

    /// Trial window start, for trialing subscriptions.
    pub trial_start: Option<Timestamp>,

    /// Trial window end, for trialing subscriptions.
    pub trial_end: Option<Timestamp>,

    /// When the local row was created.
    pub created_at: Timestamp,

    /// When the local row was last overwritten.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Whether this subscription currently grants access to paid features.
    pub fn has_access(&self) -> bool {
        self.status.grants_access()
    }
}

/// Overwrite payload produced by event handlers and applied by the reconciler.
///
/// Carries every provider-owned field of [`Subscription`]. The repository
/// upserts by `stripe_subscription_id`: an existing row is overwritten
/// field-for-field (last write wins, no merge), a missing row is created.
/// The latter path is what makes update-before-create event ordering safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPatch {
    pub user_id: UserId,
    pub stripe_subscription_id: String,
    pub stripe_price_id: String,
    pub stripe_product_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub trial_start: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription_with_status(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new(),
            stripe_subscription_id: "sub_test".to_string(),
            stripe_price_id: "price_test".to_string(),
            stripe_product_id: None,
            status,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            canceled_at: None,
            trial_start: None,
            trial_end: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn from_provider_maps_known_statuses() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("trialing"),
            SubscriptionStatus::Trialing
        );
        assert_eq!(
            SubscriptionStatus::from_provider("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("canceled"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete"),
            SubscriptionStatus::Incomplete
        );
        assert_eq!(
            SubscriptionStatus::from_provider("paused"),
            SubscriptionStatus::Paused
        );
    }

    #[test]
    fn from_provider_collapses_out_of_vocabulary_statuses() {
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::Incomplete
        );
        assert_eq!(
            SubscriptionStatus::from_provider("unpaid"),
            SubscriptionStatus::PastDue
        );
    }

    #[test]
    fn from_provider_defaults_unknown_to_incomplete() {
        assert_eq!(
            SubscriptionStatus::from_provider("some_future_status"),
            SubscriptionStatus::Incomplete
        );
        assert_eq!(
            SubscriptionStatus::from_provider(""),
            SubscriptionStatus::Incomplete
        );
    }

    #[test]
    fn unknown_status_never_grants_access() {
        assert!(!SubscriptionStatus::from_provider("whatever_comes_next").grants_access());
    }

    #[test]
    fn as_str_roundtrips_through_from_provider() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Paused,
        ] {
            assert_eq!(SubscriptionStatus::from_provider(status.as_str()), status);
        }
    }

    #[test]
    fn access_granted_only_for_active_and_trialing() {
        assert!(subscription_with_status(SubscriptionStatus::Active).has_access());
        assert!(subscription_with_status(SubscriptionStatus::Trialing).has_access());
        assert!(!subscription_with_status(SubscriptionStatus::PastDue).has_access());
        assert!(!subscription_with_status(SubscriptionStatus::Canceled).has_access());
        assert!(!subscription_with_status(SubscriptionStatus::Incomplete).has_access());
        assert!(!subscription_with_status(SubscriptionStatus::Paused).has_access());
    }

    #[test]
    fn status_serializes_in_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
    }
}
