//! HTTP DTOs (Data Transfer Objects) for billing webhook endpoints.
//!
//! These types define the JSON response structure for the webhook API.
//! Webhook requests carry no DTO: the body must stay raw bytes until the
//! signature is verified.

use serde::Serialize;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement body returned for accepted webhook deliveries.
///
/// Every 200 response carries `received: true`. The optional markers tell
/// the operator (not Stripe, which only reads the status code) whether the
/// delivery was a duplicate or a recorded non-retryable failure.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
}

impl WebhookAckResponse {
    /// Event processed and effects applied.
    pub fn processed() -> Self {
        Self {
            received: true,
            duplicate: None,
            processed: None,
        }
    }

    /// Event id already seen; nothing reapplied.
    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: Some(true),
            processed: None,
        }
    }

    /// Non-retryable failure recorded and acknowledged.
    pub fn acknowledged_failure() -> Self {
        Self {
            received: true,
            duplicate: None,
            processed: Some(false),
        }
    }
}

/// Error response for rejected webhook requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
