//! Webhook error types for Stripe webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics. Retryability
//! drives the response code: a retryable failure returns 5xx so the
//! provider redelivers, a non-retryable one is acknowledged with 200 and
//! recorded in the audit log.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Message fragments that mark an untagged storage failure as transient.
const TRANSIENT_PATTERNS: &[&str] = &[
    "connection",
    "timeout",
    "socket",
    "network",
    "deadlock",
    "pool",
    "too many connections",
];

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the payload or the signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Test-mode event rejected because live mode is required.
    #[error("Test mode event rejected")]
    LivemodeRequired,

    /// Required field missing from the event payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Failure that will not succeed on redelivery (unlinked user,
    /// malformed linkage). Acknowledged and recorded, never retried.
    #[error("{reason}")]
    NonRetryable { reason: String },

    /// Failure explicitly marked as transient; the provider should
    /// redeliver.
    #[error("{reason}")]
    Retryable { reason: String },

    /// Untagged persistence failure; retryability is decided from the
    /// message.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    ///
    /// Explicit tags win in both directions. Untagged storage failures are
    /// matched against known transient-infrastructure message fragments.
    /// Everything else defaults to non-retryable: an unanticipated bug must
    /// not put the provider into an infinite redelivery loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::Retryable { .. } => true,
            WebhookError::NonRetryable { .. } => false,
            WebhookError::Storage(message) => {
                let message = message.to_lowercase();
                TRANSIENT_PATTERNS.iter().any(|p| message.contains(p))
            }
            _ => false,
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Verification failures reject the request outright
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::LivemodeRequired => StatusCode::BAD_REQUEST,

            // Non-retryable processing failures are acknowledged; the
            // audit row carries the failure annotation
            WebhookError::MissingField(_) | WebhookError::NonRetryable { .. } => StatusCode::OK,

            // Transient failures ask the provider to redeliver
            WebhookError::Retryable { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            WebhookError::Storage(_) => {
                if self.is_retryable() {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::OK
                }
            }
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    // ══════════════════════════════════════════════════════════════
    // Error Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_displays_correctly() {
        let err = WebhookError::InvalidSignature;
        assert_eq!(format!("{}", err), "Invalid signature");
    }

    #[test]
    fn timestamp_out_of_range_displays_correctly() {
        let err = WebhookError::TimestampOutOfRange;
        assert_eq!(format!("{}", err), "Timestamp out of range");
    }

    #[test]
    fn parse_error_displays_message() {
        let err = WebhookError::ParseError("invalid JSON".to_string());
        assert_eq!(format!("{}", err), "Parse error: invalid JSON");
    }

    #[test]
    fn missing_field_displays_field_name() {
        let err = WebhookError::MissingField("price");
        assert_eq!(format!("{}", err), "Missing field: price");
    }

    #[test]
    fn non_retryable_displays_reason() {
        let err = WebhookError::NonRetryable {
            reason: "no user found for customer cus_123".to_string(),
        };
        assert_eq!(format!("{}", err), "no user found for customer cus_123");
    }

    #[test]
    fn storage_displays_message() {
        let err = WebhookError::Storage("insert failed".to_string());
        assert_eq!(format!("{}", err), "Storage error: insert failed");
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn explicit_retryable_tag_is_retryable() {
        let err = WebhookError::Retryable {
            reason: "anything".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn explicit_non_retryable_tag_wins_over_message_content() {
        // Even a transient-looking message stays non-retryable when tagged
        let err = WebhookError::NonRetryable {
            reason: "connection to user record failed permanently".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn storage_with_transient_message_is_retryable() {
        for message in [
            "connection refused",
            "Connection reset by peer",
            "statement timeout",
            "socket closed",
            "network unreachable",
            "deadlock detected",
            "pool exhausted",
            "FATAL: too many connections",
        ] {
            let err = WebhookError::Storage(message.to_string());
            assert!(err.is_retryable(), "expected retryable for: {}", message);
        }
    }

    #[test]
    fn storage_with_permanent_message_is_not_retryable() {
        for message in [
            "duplicate key value violates unique constraint",
            "null value in column user_id",
            "invalid input syntax for type uuid",
        ] {
            let err = WebhookError::Storage(message.to_string());
            assert!(!err.is_retryable(), "expected non-retryable for: {}", message);
        }
    }

    #[test]
    fn verification_errors_are_not_retryable() {
        assert!(!WebhookError::InvalidSignature.is_retryable());
        assert!(!WebhookError::TimestampOutOfRange.is_retryable());
        assert!(!WebhookError::InvalidTimestamp.is_retryable());
        assert!(!WebhookError::ParseError("bad json".to_string()).is_retryable());
        assert!(!WebhookError::LivemodeRequired.is_retryable());
    }

    #[test]
    fn missing_field_is_not_retryable() {
        let err = WebhookError::MissingField("items");
        assert!(!err.is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_returns_bad_request() {
        let err = WebhookError::InvalidSignature;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn timestamp_errors_return_bad_request() {
        assert_eq!(
            WebhookError::TimestampOutOfRange.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidTimestamp.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn parse_error_returns_bad_request() {
        let err = WebhookError::ParseError("syntax error".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn livemode_required_returns_bad_request() {
        let err = WebhookError::LivemodeRequired;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_retryable_failures_are_acknowledged_with_ok() {
        let err = WebhookError::NonRetryable {
            reason: "no user found".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::OK);

        let err = WebhookError::MissingField("price");
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    #[test]
    fn retryable_failures_return_internal_error() {
        let err = WebhookError::Retryable {
            reason: "database unavailable".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = WebhookError::Storage("connection refused".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn permanent_storage_failure_is_acknowledged() {
        let err = WebhookError::Storage("unique constraint violated".to_string());
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    // ══════════════════════════════════════════════════════════════
    // Conversion Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn domain_error_converts_to_storage() {
        let domain_err = DomainError::new(ErrorCode::DatabaseError, "connection refused");
        let err: WebhookError = domain_err.into();

        assert!(matches!(err, WebhookError::Storage(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_error_with_permanent_message_stays_non_retryable() {
        let domain_err = DomainError::new(ErrorCode::DatabaseError, "invalid input syntax");
        let err: WebhookError = domain_err.into();

        assert!(!err.is_retryable());
    }
}
