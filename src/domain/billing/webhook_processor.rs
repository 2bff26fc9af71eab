//! Webhook event processor.
//!
//! Orchestrates one verified event through the idempotency guard, the pure
//! per-type handlers, side-effect application, and the audit log. The audit
//! record is written only after the handler completes: a crash mid-handler
//! leaves the event id unclaimed, and the provider's redelivery retries it.
//!
//! Retryable failures propagate as errors without writing an audit record,
//! so redelivery is not short-circuited by the idempotency guard.

use std::sync::Arc;

use super::handlers::{self, EventContext, HandlerOutput, SubscriptionChange};
use super::stripe_event::{StripeEvent, StripeEventType};
use super::stripe_objects::{InvoiceObject, SubscriptionObject};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::ports::{
    NotificationRepository, SaveResult, SubscriptionEventRecord, SubscriptionRepository,
    UserDirectory, WebhookEventRepository,
};

/// Outcome of processing one verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Event was processed and its effects applied.
    Processed,
    /// Event id was already recorded; no additional effect was applied.
    AlreadyProcessed,
    /// Handler failed in a way redelivery cannot fix; the failure was
    /// recorded and the event acknowledged.
    FailedNonRetryable { reason: String },
}

/// Processes verified webhook events against the local stores.
pub struct WebhookProcessor {
    subscriptions: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationRepository>,
    events: Arc<dyn WebhookEventRepository>,
}

impl WebhookProcessor {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationRepository>,
        events: Arc<dyn WebhookEventRepository>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            notifications,
            events,
        }
    }

    /// Processes one verified event.
    ///
    /// # Errors
    ///
    /// Returns an error only for retryable failures; the boundary layer maps
    /// those to a 5xx response so the provider redelivers. Everything else -
    /// including non-retryable handler failures - resolves to an outcome and
    /// a 2xx acknowledgement.
    pub async fn process(&self, event: &StripeEvent) -> Result<ProcessOutcome, WebhookError> {
        if self.events.find_by_event_id(&event.id).await?.is_some() {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Duplicate webhook delivery skipped"
            );
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        match event.parsed_type() {
            StripeEventType::CustomerSubscriptionCreated
            | StripeEventType::CustomerSubscriptionUpdated
            | StripeEventType::CustomerSubscriptionDeleted
            | StripeEventType::CustomerSubscriptionPaused
            | StripeEventType::CustomerSubscriptionResumed
            | StripeEventType::CustomerSubscriptionTrialWillEnd => {
                self.process_subscription_event(event).await
            }
            StripeEventType::InvoicePaid => self.process_invoice_paid(event).await,
            StripeEventType::InvoicePaymentFailed => {
                self.process_invoice_payment_failed(event).await
            }
            StripeEventType::CustomerCreated => {
                // Nothing to reconcile; the customer id is linked to a user
                // during checkout, outside the webhook path.
                self.record_processed(event, None).await
            }
            StripeEventType::Unrecognized => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Unrecognized webhook event type acknowledged"
                );
                self.record_processed(event, None).await
            }
        }
    }

    async fn process_subscription_event(
        &self,
        event: &StripeEvent,
    ) -> Result<ProcessOutcome, WebhookError> {
        let object: SubscriptionObject = match event.deserialize_object() {
            Ok(object) => object,
            Err(e) => {
                let error = WebhookError::NonRetryable {
                    reason: format!("malformed subscription object: {}", e),
                };
                return self.record_failure(event, None, &error).await;
            }
        };

        let existing = self.subscriptions.find_by_external_id(&object.id).await?;
        let resolved_user = match &existing {
            Some(_) => None,
            None => self.resolve_user(&object).await?,
        };
        let correlated = existing.as_ref().map(|s| s.id);
        let ctx = EventContext {
            subscription: existing,
            resolved_user,
        };

        match handlers::handle_subscription_event(event, &object, &ctx) {
            Ok(output) => self.apply(event, output, correlated).await,
            Err(error) if error.is_retryable() => Err(error),
            Err(error) => self.record_failure(event, correlated, &error).await,
        }
    }

    async fn process_invoice_paid(
        &self,
        event: &StripeEvent,
    ) -> Result<ProcessOutcome, WebhookError> {
        let invoice: InvoiceObject = match event.deserialize_object() {
            Ok(invoice) => invoice,
            Err(e) => {
                let error = WebhookError::NonRetryable {
                    reason: format!("malformed invoice object: {}", e),
                };
                return self.record_failure(event, None, &error).await;
            }
        };

        let ctx = self.invoice_context(event, &invoice).await?;
        let correlated = ctx.subscription.as_ref().map(|s| s.id);
        let output = handlers::handle_invoice_paid(&invoice, &ctx);
        self.apply(event, output, correlated).await
    }

    async fn process_invoice_payment_failed(
        &self,
        event: &StripeEvent,
    ) -> Result<ProcessOutcome, WebhookError> {
        let invoice: InvoiceObject = match event.deserialize_object() {
            Ok(invoice) => invoice,
            Err(e) => {
                let error = WebhookError::NonRetryable {
                    reason: format!("malformed invoice object: {}", e),
                };
                return self.record_failure(event, None, &error).await;
            }
        };

        let ctx = self.invoice_context(event, &invoice).await?;
        let correlated = ctx.subscription.as_ref().map(|s| s.id);
        let output = handlers::handle_invoice_payment_failed(&invoice, &ctx);
        self.apply(event, output, correlated).await
    }

    /// Loads the subscription an invoice refers to, if any.
    ///
    /// Invoices without a resolvable subscription are acknowledged without
    /// effect; the subscription-level events carry the full state.
    async fn invoice_context(
        &self,
        event: &StripeEvent,
        invoice: &InvoiceObject,
    ) -> Result<EventContext, WebhookError> {
        let subscription = match invoice.subscription_id() {
            Some(subscription_id) => {
                let found = self
                    .subscriptions
                    .find_by_external_id(subscription_id)
                    .await?;
                if found.is_none() {
                    tracing::info!(
                        event_id = %event.id,
                        invoice_id = %invoice.id,
                        stripe_subscription_id = %subscription_id,
                        "Invoice references an unknown subscription; acknowledged"
                    );
                }
                found
            }
            None => {
                tracing::debug!(
                    event_id = %event.id,
                    invoice_id = %invoice.id,
                    "Invoice carries no subscription linkage"
                );
                None
            }
        };

        Ok(EventContext {
            subscription,
            resolved_user: None,
        })
    }

    /// Resolves the local user for a subscription with no existing row.
    ///
    /// Order: explicit metadata user id (validated against the user table),
    /// then lookup by the provider's customer id.
    async fn resolve_user(
        &self,
        object: &SubscriptionObject,
    ) -> Result<Option<UserId>, WebhookError> {
        if let Some(claimed) = object.user_id_from_metadata() {
            match claimed.parse::<UserId>() {
                Ok(user_id) => {
                    if self.users.user_exists(&user_id).await? {
                        return Ok(Some(user_id));
                    }
                    tracing::warn!(
                        stripe_subscription_id = %object.id,
                        claimed_user_id = %user_id,
                        "Metadata names a user that does not exist"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        stripe_subscription_id = %object.id,
                        "Metadata carries an unparseable user id"
                    );
                }
            }
        }

        match &object.customer {
            Some(customer) => Ok(self.users.find_by_customer_id(customer).await?),
            None => Ok(None),
        }
    }

    /// Applies a handler's proposed change and notifications, then records
    /// the event as processed.
    async fn apply(
        &self,
        event: &StripeEvent,
        output: HandlerOutput,
        correlated: Option<SubscriptionId>,
    ) -> Result<ProcessOutcome, WebhookError> {
        let changed = match output.change {
            Some(SubscriptionChange::Reconcile(patch)) => {
                let row = self.subscriptions.upsert(&patch).await?;
                tracing::info!(
                    event_id = %event.id,
                    stripe_subscription_id = %row.stripe_subscription_id,
                    status = row.status.as_str(),
                    "Subscription reconciled from webhook"
                );
                Some(row.id)
            }
            Some(SubscriptionChange::SetStatus {
                stripe_subscription_id,
                status,
            }) => {
                let updated = self
                    .subscriptions
                    .set_status(&stripe_subscription_id, status)
                    .await?;
                match updated {
                    Some(row) => {
                        tracing::info!(
                            event_id = %event.id,
                            stripe_subscription_id = %row.stripe_subscription_id,
                            status = status.as_str(),
                            "Subscription status updated from webhook"
                        );
                        Some(row.id)
                    }
                    None => {
                        tracing::warn!(
                            event_id = %event.id,
                            stripe_subscription_id = %stripe_subscription_id,
                            "Status update targeted a missing subscription row"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        // Notification writes are non-fatal: a failure here must not turn a
        // processed event into a redelivery.
        for draft in &output.notifications {
            if let Err(error) = self.notifications.create(draft).await {
                tracing::warn!(
                    event_id = %event.id,
                    user_id = %draft.user_id,
                    error = %error,
                    "Failed to write notification"
                );
            }
        }

        self.record_processed(event, changed.or(correlated)).await
    }

    async fn record_processed(
        &self,
        event: &StripeEvent,
        subscription_id: Option<SubscriptionId>,
    ) -> Result<ProcessOutcome, WebhookError> {
        let record = SubscriptionEventRecord::processed(
            &event.id,
            &event.event_type,
            subscription_id,
            event_payload(event),
        );
        match self.events.save(record).await? {
            SaveResult::Inserted => Ok(ProcessOutcome::Processed),
            SaveResult::AlreadyExists => Ok(ProcessOutcome::AlreadyProcessed),
        }
    }

    async fn record_failure(
        &self,
        event: &StripeEvent,
        subscription_id: Option<SubscriptionId>,
        error: &WebhookError,
    ) -> Result<ProcessOutcome, WebhookError> {
        tracing::warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            error = %error,
            "Webhook handler failed; acknowledging without retry"
        );
        let record = SubscriptionEventRecord::failed(
            &event.id,
            &event.event_type,
            subscription_id,
            error.to_string(),
            event_payload(event),
        );
        match self.events.save(record).await? {
            SaveResult::Inserted => Ok(ProcessOutcome::FailedNonRetryable {
                reason: error.to_string(),
            }),
            SaveResult::AlreadyExists => Ok(ProcessOutcome::AlreadyProcessed),
        }
    }
}

fn event_payload(event: &StripeEvent) -> serde_json::Value {
    serde_json::to_value(event).unwrap_or(serde_json::Value::Null)
}
