//! HTTP handlers for billing webhook endpoints.
//!
//! These handlers connect Axum routes to application layer command handlers.
//! The webhook body is read as raw bytes: signature verification covers the
//! exact payload Stripe sent, so nothing may re-encode it first.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    ProcessStripeWebhookCommand, ProcessStripeWebhookHandler, ProcessStripeWebhookResult,
};
use crate::domain::billing::{StripeWebhookVerifier, WebhookError, WebhookProcessor};

use super::dto::{ErrorResponse, WebhookAckResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all webhook dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub verifier: Arc<StripeWebhookVerifier>,
    pub processor: Arc<WebhookProcessor>,
    pub require_livemode: bool,
}

impl BillingAppState {
    /// Create the webhook command handler on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessStripeWebhookHandler {
        ProcessStripeWebhookHandler::new(
            self.verifier.clone(),
            self.processor.clone(),
            self.require_livemode,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Handle Stripe webhook events
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookError::ParseError("missing Stripe-Signature header".to_string())
        })?;

    let handler = state.webhook_handler();
    let cmd = ProcessStripeWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let result = handler.handle(cmd).await?;

    let ack = match result {
        ProcessStripeWebhookResult::Processed => WebhookAckResponse::processed(),
        ProcessStripeWebhookResult::Duplicate => WebhookAckResponse::duplicate(),
        ProcessStripeWebhookResult::AcknowledgedFailure { .. } => {
            WebhookAckResponse::acknowledged_failure()
        }
    };

    Ok((StatusCode::OK, Json(ack)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
///
/// The status code drives Stripe's redelivery: 400 for requests that fail
/// verification, 500 for transient failures worth retrying, and 200 for
/// non-retryable failures that were recorded and acknowledged.
pub struct BillingApiError(WebhookError);

impl From<WebhookError> for BillingApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        // Non-retryable failures classified into 200 still acknowledge the
        // delivery; the failure lives in the processing record, not the
        // response.
        if status == StatusCode::OK {
            return (status, Json(WebhookAckResponse::acknowledged_failure())).into_response();
        }

        let error_code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "INVALID_PAYLOAD",
            WebhookError::LivemodeRequired => "LIVEMODE_REQUIRED",
            WebhookError::MissingField(_) | WebhookError::NonRetryable { .. } => {
                "PROCESSING_FAILED"
            }
            WebhookError::Retryable { .. } | WebhookError::Storage(_) => "PROCESSING_ERROR",
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
