//! Provider wire shapes for the entities carried in `data.object`.
//!
//! Stripe has shipped several envelope layouts for the same entities across
//! API versions. Every shape that varies by version is absorbed behind a
//! single accessor here, so handlers never inspect raw JSON:
//!
//! - invoice -> subscription linkage: flat `subscription` field on older
//!   versions, `parent.subscription_details.subscription` on newer ones
//! - subscription items: flat `items: [...]` on newer versions, wrapped
//!   `items: {data: [...]}` list container on older ones
//! - billing period: item-level `current_period_start/end` on newer
//!   versions, subscription-level fields of the same name on older ones

use serde::Deserialize;
use std::collections::HashMap;

/// Subscription entity as delivered in `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    /// Provider subscription id (`sub_...`).
    pub id: String,

    /// Provider customer id (`cus_...`).
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider status string; mapped onto the local vocabulary later.
    #[serde(default)]
    pub status: Option<String>,

    /// Subscribed items in either of the two wire layouts.
    #[serde(default)]
    pub items: Option<SubscriptionItems>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    #[serde(default)]
    pub canceled_at: Option<i64>,

    #[serde(default)]
    pub trial_start: Option<i64>,

    #[serde(default)]
    pub trial_end: Option<i64>,

    // Billing period at the subscription level (older API versions only).
    #[serde(default)]
    pub current_period_start: Option<i64>,

    #[serde(default)]
    pub current_period_end: Option<i64>,

    /// Free-form metadata; checkout flows stash the local user id here.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Items container in either wire layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionItems {
    /// Newer API: `items: [...]`.
    Flat(Vec<SubscriptionItem>),
    /// Older API: `items: {data: [...]}`.
    Wrapped { data: Vec<SubscriptionItem> },
}

/// One subscribed item.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<PriceObject>,

    // Billing period at the item level (newer API versions).
    #[serde(default)]
    pub current_period_start: Option<i64>,

    #[serde(default)]
    pub current_period_end: Option<i64>,
}

/// Price attached to a subscription item.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceObject {
    pub id: String,

    #[serde(default)]
    pub product: Option<String>,
}

impl SubscriptionObject {
    /// First subscribed item, regardless of which items layout was sent.
    ///
    /// Crawlready subscriptions are single-item; the first item carries the
    /// plan.
    pub fn first_item(&self) -> Option<&SubscriptionItem> {
        match &self.items {
            Some(SubscriptionItems::Flat(items)) => items.first(),
            Some(SubscriptionItems::Wrapped { data }) => data.first(),
            None => None,
        }
    }

    /// Billing period as `(start, end)` Unix seconds.
    ///
    /// Item-level fields win; the subscription-level fields are the older
    /// API's layout and only consulted when the item carries none. Either
    /// side may be absent, in which case the local row keeps null periods.
    pub fn billing_period(&self) -> (Option<i64>, Option<i64>) {
        if let Some(item) = self.first_item() {
            if item.current_period_start.is_some() || item.current_period_end.is_some() {
                return (item.current_period_start, item.current_period_end);
            }
        }
        (self.current_period_start, self.current_period_end)
    }

    /// Local user id stashed in metadata by the checkout flow.
    ///
    /// Checks `user_id` first, then the camel-cased `userId` some older
    /// checkout sessions wrote.
    pub fn user_id_from_metadata(&self) -> Option<&str> {
        self.metadata
            .get("user_id")
            .or_else(|| self.metadata.get("userId"))
            .map(String::as_str)
    }
}

/// Invoice entity as delivered in `invoice.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    /// Provider invoice id (`in_...`).
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    // Subscription linkage, flat field (older API versions).
    #[serde(default)]
    pub subscription: Option<String>,

    // Subscription linkage, nested under parent (newer API versions).
    #[serde(default)]
    pub parent: Option<InvoiceParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<SubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<String>,
}

impl InvoiceObject {
    /// Provider subscription id this invoice bills, from whichever linkage
    /// path the API version used.
    pub fn subscription_id(&self) -> Option<&str> {
        if let Some(id) = self.subscription.as_deref() {
            return Some(id);
        }
        self.parent
            .as_ref()
            .and_then(|p| p.subscription_details.as_ref())
            .and_then(|d| d.subscription.as_deref())
    }
}
