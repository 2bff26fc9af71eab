//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Stripe webhook configuration.
///
/// This service only consumes webhooks, so the sole credential is the
/// endpoint signing secret. There is no API key: reconciliation works
/// entirely from event payloads and never calls back into Stripe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Reject test-mode events. Enabled in production deployments so a
    /// misconfigured test endpoint cannot mutate live subscription state.
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::WebhookSecretFormat);
        }
        Ok(())
    }
}
