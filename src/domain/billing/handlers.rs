//! Pure per-event-type webhook handlers.
//!
//! Each handler is a pure function of the verified event payload plus the
//! currently persisted state, returning the proposed subscription change and
//! any notifications to emit. Persistence and notification writes happen in
//! the processor after a handler returns, which keeps every branch here
//! testable without mocks.

use super::notification::NotificationDraft;
use super::stripe_event::{StripeEvent, StripeEventType};
use super::stripe_objects::{InvoiceObject, SubscriptionObject};
use super::subscription::{Subscription, SubscriptionPatch, SubscriptionStatus};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{Timestamp, UserId};

/// Persisted state relevant to one event, loaded before dispatch.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    /// Existing subscription row for the event's external subscription id.
    pub subscription: Option<Subscription>,
    /// User resolved from event metadata or the customer directory.
    pub resolved_user: Option<UserId>,
}

/// A handler's proposed mutation of subscription state.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionChange {
    /// Overwrite the row for this external id with the provider's view,
    /// creating it if it does not exist yet.
    Reconcile(SubscriptionPatch),
    /// Update only the status of an existing row.
    SetStatus {
        stripe_subscription_id: String,
        status: SubscriptionStatus,
    },
}

/// What a handler wants done once it returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
    pub change: Option<SubscriptionChange>,
    pub notifications: Vec<NotificationDraft>,
}

/// Handles the customer.subscription.* family.
///
/// Lifecycle events (created/updated/deleted/paused/resumed) reconcile the
/// local row to the provider's payload. A deletion forces `canceled` status
/// regardless of what the payload claims. Trial-will-end is informational:
/// it emits a notification and leaves status untouched.
///
/// # Errors
///
/// - `NonRetryable` when no local user can be linked to the subscription
/// - `MissingField` when the payload lacks data required to build the row
pub fn handle_subscription_event(
    event: &StripeEvent,
    object: &SubscriptionObject,
    ctx: &EventContext,
) -> Result<HandlerOutput, WebhookError> {
    match event.parsed_type() {
        StripeEventType::CustomerSubscriptionCreated
        | StripeEventType::CustomerSubscriptionUpdated
        | StripeEventType::CustomerSubscriptionPaused
        | StripeEventType::CustomerSubscriptionResumed => {
            let patch = build_patch(event, object, ctx, false)?;
            Ok(HandlerOutput {
                change: Some(SubscriptionChange::Reconcile(patch)),
                notifications: vec![],
            })
        }
        StripeEventType::CustomerSubscriptionDeleted => {
            let patch = build_patch(event, object, ctx, true)?;
            Ok(HandlerOutput {
                change: Some(SubscriptionChange::Reconcile(patch)),
                notifications: vec![],
            })
        }
        StripeEventType::CustomerSubscriptionTrialWillEnd => trial_will_end(object, ctx),
        _ => Ok(HandlerOutput::default()),
    }
}

/// Handles invoice.paid: any status recovers to `active`.
///
/// Invoices without a known local subscription are acknowledged without
/// effect; the subscription-level events carry the full state and will
/// create the row when they arrive.
pub fn handle_invoice_paid(_invoice: &InvoiceObject, ctx: &EventContext) -> HandlerOutput {
    let Some(subscription) = &ctx.subscription else {
        return HandlerOutput::default();
    };
    HandlerOutput {
        change: Some(SubscriptionChange::SetStatus {
            stripe_subscription_id: subscription.stripe_subscription_id.clone(),
            status: SubscriptionStatus::Active,
        }),
        notifications: vec![],
    }
}

/// Handles invoice.payment_failed: notification only.
///
/// Status is never changed here. The provider reports dunning state through
/// customer.subscription.updated, and deriving `past_due` from the invoice
/// event would race with it.
pub fn handle_invoice_payment_failed(
    invoice: &InvoiceObject,
    ctx: &EventContext,
) -> HandlerOutput {
    let Some(subscription) = &ctx.subscription else {
        return HandlerOutput::default();
    };
    HandlerOutput {
        change: None,
        notifications: vec![NotificationDraft::payment_failed(
            subscription.user_id,
            &subscription.stripe_subscription_id,
            Some(&invoice.id),
        )],
    }
}

/// Builds the full-row overwrite from the provider's payload.
///
/// There is no field-level merge: the incoming event is authoritative, and
/// absent optional fields overwrite with null. The one exception is the
/// owning user, which is fixed at row creation and never re-homed by a
/// webhook.
fn build_patch(
    event: &StripeEvent,
    object: &SubscriptionObject,
    ctx: &EventContext,
    deleted: bool,
) -> Result<SubscriptionPatch, WebhookError> {
    let user_id = resolve_owner(object, ctx)?;

    let price = object
        .first_item()
        .and_then(|item| item.price.as_ref())
        .ok_or(WebhookError::MissingField("data.object.items"))?;

    let status = if deleted {
        SubscriptionStatus::Canceled
    } else {
        object
            .status
            .as_deref()
            .map(SubscriptionStatus::from_provider)
            .ok_or(WebhookError::MissingField("data.object.status"))?
    };

    let (period_start, period_end) = object.billing_period();

    // A deletion payload does not always carry canceled_at; fall back to
    // the event's own timestamp.
    let canceled_at = if deleted {
        object
            .canceled_at
            .or_else(|| (event.created > 0).then_some(event.created))
    } else {
        object.canceled_at
    };

    Ok(SubscriptionPatch {
        user_id,
        stripe_subscription_id: object.id.clone(),
        stripe_price_id: price.id.clone(),
        stripe_product_id: price.product.clone(),
        status,
        current_period_start: period_start.and_then(Timestamp::from_unix_secs),
        current_period_end: period_end.and_then(Timestamp::from_unix_secs),
        cancel_at_period_end: object.cancel_at_period_end,
        canceled_at: canceled_at.and_then(Timestamp::from_unix_secs),
        trial_start: object.trial_start.and_then(Timestamp::from_unix_secs),
        trial_end: object.trial_end.and_then(Timestamp::from_unix_secs),
    })
}

/// Resolves which local user owns the subscription.
///
/// An existing row's owner always wins. For new rows the processor has
/// already tried event metadata and the customer directory; if neither
/// produced a user, the account simply is not linked and retrying the
/// delivery cannot fix that.
fn resolve_owner(object: &SubscriptionObject, ctx: &EventContext) -> Result<UserId, WebhookError> {
    if let Some(existing) = &ctx.subscription {
        return Ok(existing.user_id);
    }
    ctx.resolved_user.ok_or_else(|| WebhookError::NonRetryable {
        reason: match &object.customer {
            Some(customer) => format!("no user found for customer {}", customer),
            None => format!("no user found for subscription {}", object.id),
        },
    })
}

fn trial_will_end(
    object: &SubscriptionObject,
    ctx: &EventContext,
) -> Result<HandlerOutput, WebhookError> {
    let user_id = match &ctx.subscription {
        Some(subscription) => subscription.user_id,
        None => ctx.resolved_user.ok_or_else(|| WebhookError::NonRetryable {
            reason: format!("no user found for subscription {}", object.id),
        })?,
    };

    let trial_end = object
        .trial_end
        .and_then(Timestamp::from_unix_secs)
        .or_else(|| ctx.subscription.as_ref().and_then(|s| s.trial_end));

    Ok(HandlerOutput {
        change: None,
        notifications: vec![NotificationDraft::trial_ending(
            user_id,
            &object.id,
            trial_end,
        )],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::notification::NotificationKind;
    use crate::domain::billing::stripe_event::StripeEventBuilder;
    use crate::domain::foundation::SubscriptionId;
    use serde_json::json;

    // ══════════════════════════════════════════════════════════════
    // Test Helpers
    // ══════════════════════════════════════════════════════════════

    fn subscription_object(value: serde_json::Value) -> SubscriptionObject {
        serde_json::from_value(value).unwrap()
    }

    fn invoice_object(value: serde_json::Value) -> InvoiceObject {
        serde_json::from_value(value).unwrap()
    }

    fn existing_subscription(user_id: UserId) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            id: SubscriptionId::new(),
            user_id,
            stripe_subscription_id: "sub_existing".to_string(),
            stripe_price_id: "price_old".to_string(),
            stripe_product_id: Some("prod_old".to_string()),
            status: SubscriptionStatus::Active,
            current_period_start: Timestamp::from_unix_secs(100),
            current_period_end: Timestamp::from_unix_secs(200),
            cancel_at_period_end: false,
            canceled_at: None,
            trial_start: None,
            trial_end: Timestamp::from_unix_secs(5000),
            created_at: now,
            updated_at: now,
        }
    }

    fn context_with_user(user_id: UserId) -> EventContext {
        EventContext {
            subscription: None,
            resolved_user: Some(user_id),
        }
    }

    fn created_event(object: serde_json::Value) -> StripeEvent {
        StripeEventBuilder::new()
            .event_type("customer.subscription.created")
            .object(object)
            .build()
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Created Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn created_builds_row_from_provider_payload() {
        let user_id = UserId::new();
        let object_json = json!({
            "id": "sub_1",
            "status": "trialing",
            "customer": "cus_1",
            "items": [{
                "price": {"id": "price_1", "product": "prod_1"},
                "current_period_start": 1000,
                "current_period_end": 2000
            }],
            "trial_end": 5000
        });
        let event = created_event(object_json.clone());
        let object = subscription_object(object_json);

        let output =
            handle_subscription_event(&event, &object, &context_with_user(user_id)).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.user_id, user_id);
        assert_eq!(patch.stripe_subscription_id, "sub_1");
        assert_eq!(patch.stripe_price_id, "price_1");
        assert_eq!(patch.stripe_product_id, Some("prod_1".to_string()));
        assert_eq!(patch.status, SubscriptionStatus::Trialing);
        assert_eq!(patch.current_period_start, Timestamp::from_unix_secs(1000));
        assert_eq!(patch.current_period_end, Timestamp::from_unix_secs(2000));
        assert_eq!(patch.trial_end, Timestamp::from_unix_secs(5000));
        assert!(output.notifications.is_empty());
    }

    #[test]
    fn created_copies_unknown_status_as_incomplete() {
        let object_json = json!({
            "id": "sub_1",
            "status": "some_future_status",
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = created_event(object_json.clone());
        let object = subscription_object(object_json);

        let output =
            handle_subscription_event(&event, &object, &context_with_user(UserId::new())).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.status, SubscriptionStatus::Incomplete);
    }

    #[test]
    fn created_without_items_is_missing_field() {
        let object_json = json!({"id": "sub_1", "status": "active"});
        let event = created_event(object_json.clone());
        let object = subscription_object(object_json);

        let result = handle_subscription_event(&event, &object, &context_with_user(UserId::new()));

        assert!(matches!(
            result,
            Err(WebhookError::MissingField("data.object.items"))
        ));
    }

    #[test]
    fn created_without_status_is_missing_field() {
        let object_json = json!({"id": "sub_1", "items": [{"price": {"id": "price_1"}}]});
        let event = created_event(object_json.clone());
        let object = subscription_object(object_json);

        let result = handle_subscription_event(&event, &object, &context_with_user(UserId::new()));

        assert!(matches!(
            result,
            Err(WebhookError::MissingField("data.object.status"))
        ));
    }

    #[test]
    fn created_without_any_user_linkage_is_non_retryable() {
        let object_json = json!({
            "id": "sub_1",
            "status": "active",
            "customer": "cus_unlinked",
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = created_event(object_json.clone());
        let object = subscription_object(object_json);

        let result = handle_subscription_event(&event, &object, &EventContext::default());

        match result {
            Err(WebhookError::NonRetryable { reason }) => {
                assert!(reason.contains("no user found"));
                assert!(reason.contains("cus_unlinked"));
            }
            other => panic!("expected non-retryable error, got {:?}", other),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Updated Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn updated_keeps_existing_owner() {
        let owner = UserId::new();
        let other_user = UserId::new();
        let object_json = json!({
            "id": "sub_existing",
            "status": "past_due",
            "items": [{"price": {"id": "price_new"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.updated")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(owner)),
            resolved_user: Some(other_user),
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.user_id, owner);
        assert_eq!(patch.status, SubscriptionStatus::PastDue);
        assert_eq!(patch.stripe_price_id, "price_new");
    }

    #[test]
    fn updated_overwrites_absent_periods_with_null() {
        let object_json = json!({
            "id": "sub_existing",
            "status": "active",
            "items": [{"price": {"id": "price_new"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.updated")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(UserId::new())),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert!(patch.current_period_start.is_none());
        assert!(patch.current_period_end.is_none());
        assert!(patch.trial_end.is_none());
    }

    #[test]
    fn updated_without_row_synthesizes_from_payload() {
        let user_id = UserId::new();
        let object_json = json!({
            "id": "sub_never_seen",
            "status": "active",
            "customer": "cus_1",
            "items": [{
                "price": {"id": "price_1", "product": "prod_1"},
                "current_period_start": 7000,
                "current_period_end": 8000
            }]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.updated")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);

        let output =
            handle_subscription_event(&event, &object, &context_with_user(user_id)).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.stripe_subscription_id, "sub_never_seen");
        assert_eq!(patch.user_id, user_id);
        assert_eq!(patch.current_period_start, Timestamp::from_unix_secs(7000));
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Deleted Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn deleted_forces_canceled_status() {
        let object_json = json!({
            "id": "sub_existing",
            "status": "active",
            "canceled_at": 9000,
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.deleted")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(UserId::new())),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.status, SubscriptionStatus::Canceled);
        assert_eq!(patch.canceled_at, Timestamp::from_unix_secs(9000));
    }

    #[test]
    fn deleted_without_canceled_at_uses_event_timestamp() {
        let object_json = json!({
            "id": "sub_existing",
            "status": "active",
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.deleted")
            .created(4242)
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(UserId::new())),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.canceled_at, Timestamp::from_unix_secs(4242));
    }

    // ══════════════════════════════════════════════════════════════
    // Pause / Resume Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn paused_reconciles_to_paused_status() {
        let object_json = json!({
            "id": "sub_existing",
            "status": "paused",
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.paused")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(UserId::new())),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.status, SubscriptionStatus::Paused);
    }

    #[test]
    fn resumed_reconciles_to_provider_status() {
        let object_json = json!({
            "id": "sub_existing",
            "status": "active",
            "items": [{"price": {"id": "price_1"}}]
        });
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.resumed")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(UserId::new())),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        let Some(SubscriptionChange::Reconcile(patch)) = output.change else {
            panic!("expected reconcile change");
        };
        assert_eq!(patch.status, SubscriptionStatus::Active);
    }

    // ══════════════════════════════════════════════════════════════
    // Trial Will End Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn trial_will_end_emits_notification_without_status_change() {
        let user_id = UserId::new();
        let object_json = json!({"id": "sub_existing", "trial_end": 5000});
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.trial_will_end")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);
        let ctx = EventContext {
            subscription: Some(existing_subscription(user_id)),
            resolved_user: None,
        };

        let output = handle_subscription_event(&event, &object, &ctx).unwrap();

        assert!(output.change.is_none());
        assert_eq!(output.notifications.len(), 1);
        let draft = &output.notifications[0];
        assert_eq!(draft.kind, NotificationKind::TrialEnding);
        assert_eq!(draft.user_id, user_id);
        assert_eq!(draft.changes["stripe_subscription_id"], "sub_existing");
    }

    #[test]
    fn trial_will_end_without_linkage_is_non_retryable() {
        let object_json = json!({"id": "sub_unknown", "trial_end": 5000});
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.trial_will_end")
            .object(object_json.clone())
            .build();
        let object = subscription_object(object_json);

        let result = handle_subscription_event(&event, &object, &EventContext::default());

        match result {
            Err(WebhookError::NonRetryable { reason }) => {
                assert!(reason.contains("no user found"));
            }
            other => panic!("expected non-retryable error, got {:?}", other),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Paid Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_paid_recovers_subscription_to_active() {
        let mut subscription = existing_subscription(UserId::new());
        subscription.status = SubscriptionStatus::PastDue;
        let invoice = invoice_object(json!({
            "id": "in_1",
            "subscription": "sub_existing"
        }));
        let ctx = EventContext {
            subscription: Some(subscription),
            resolved_user: None,
        };

        let output = handle_invoice_paid(&invoice, &ctx);

        assert_eq!(
            output.change,
            Some(SubscriptionChange::SetStatus {
                stripe_subscription_id: "sub_existing".to_string(),
                status: SubscriptionStatus::Active,
            })
        );
        assert!(output.notifications.is_empty());
    }

    #[test]
    fn invoice_paid_for_unknown_subscription_is_noop() {
        let invoice = invoice_object(json!({"id": "in_1", "subscription": "sub_unknown"}));

        let output = handle_invoice_paid(&invoice, &EventContext::default());

        assert_eq!(output, HandlerOutput::default());
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Payment Failed Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn payment_failed_emits_notification_without_status_change() {
        let user_id = UserId::new();
        let invoice = invoice_object(json!({
            "id": "in_failed",
            "subscription": "sub_existing"
        }));
        let ctx = EventContext {
            subscription: Some(existing_subscription(user_id)),
            resolved_user: None,
        };

        let output = handle_invoice_payment_failed(&invoice, &ctx);

        assert!(output.change.is_none());
        assert_eq!(output.notifications.len(), 1);
        let draft = &output.notifications[0];
        assert_eq!(draft.kind, NotificationKind::PaymentFailed);
        assert_eq!(draft.user_id, user_id);
        assert_eq!(draft.changes["stripe_subscription_id"], "sub_existing");
        assert_eq!(draft.changes["stripe_invoice_id"], "in_failed");
    }

    #[test]
    fn payment_failed_for_unknown_subscription_is_noop() {
        let invoice = invoice_object(json!({"id": "in_1", "subscription": "sub_unknown"}));

        let output = handle_invoice_payment_failed(&invoice, &EventContext::default());

        assert_eq!(output, HandlerOutput::default());
    }
}
