//! ProcessStripeWebhookHandler - Command handler for inbound billing webhooks.
//!
//! Order matters here: the raw bytes are verified before anything about the
//! payload is trusted, then the livemode guard runs, and only then does the
//! event reach the processor and its idempotency guard.

use std::sync::Arc;

use crate::domain::billing::{
    ProcessOutcome, StripeWebhookVerifier, WebhookError, WebhookProcessor,
};

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessStripeWebhookCommand {
    /// Raw request body, byte-exact as received. Any re-encoding before
    /// verification breaks the signature.
    pub payload: Vec<u8>,
    /// Value of the Stripe-Signature header.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStripeWebhookResult {
    /// Event processed and effects applied.
    Processed,
    /// Event id seen before; nothing reapplied.
    Duplicate,
    /// Handler failed non-retryably; recorded and acknowledged so the
    /// provider stops redelivering.
    AcknowledgedFailure { reason: String },
}

/// Handler for processing billing provider webhooks.
pub struct ProcessStripeWebhookHandler {
    verifier: Arc<StripeWebhookVerifier>,
    processor: Arc<WebhookProcessor>,
    require_livemode: bool,
}

impl ProcessStripeWebhookHandler {
    pub fn new(
        verifier: Arc<StripeWebhookVerifier>,
        processor: Arc<WebhookProcessor>,
        require_livemode: bool,
    ) -> Self {
        Self {
            verifier,
            processor,
            require_livemode,
        }
    }

    /// Verifies and processes one delivery.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` / `TimestampOutOfRange` / `InvalidTimestamp` /
    ///   `ParseError` when the payload fails verification (mapped to 400)
    /// - `LivemodeRequired` when a test event reaches a live deployment
    /// - `Retryable` / retryable `Storage` failures (mapped to 5xx so the
    ///   provider redelivers)
    pub async fn handle(
        &self,
        cmd: ProcessStripeWebhookCommand,
    ) -> Result<ProcessStripeWebhookResult, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)?;

        if self.require_livemode && !event.is_live() {
            tracing::warn!(
                event_id = %event.id,
                "Rejected test mode event in production"
            );
            return Err(WebhookError::LivemodeRequired);
        }

        let outcome = self.processor.process(&event).await?;
        Ok(match outcome {
            ProcessOutcome::Processed => ProcessStripeWebhookResult::Processed,
            ProcessOutcome::AlreadyProcessed => ProcessStripeWebhookResult::Duplicate,
            ProcessOutcome::FailedNonRetryable { reason } => {
                ProcessStripeWebhookResult::AcknowledgedFailure { reason }
            }
        })
    }
}
