//! Payment provider configuration (Razorpay)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Minimum length accepted for the webhook signing secret.
const MIN_SECRET_LEN: usize = 16;

/// Payment provider configuration.
///
/// The same provider account may serve several SiteSmith deployments, so
/// every deployment carries a `website_id` used to filter webhook events
/// that belong to a different site.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Razorpay key id (public half of the API credentials).
    pub razorpay_key_id: String,

    /// Shared secret used to verify webhook and checkout signatures.
    pub razorpay_webhook_secret: SecretString,

    /// Scope tag identifying this deployment in provider metadata.
    pub website_id: String,
}

impl PaymentConfig {
    /// Check if using Razorpay test mode
    pub fn is_test_mode(&self) -> bool {
        self.razorpay_key_id.starts_with("rzp_test_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.razorpay_key_id.is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_KEY_ID"));
        }
        if self.razorpay_webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("RAZORPAY_WEBHOOK_SECRET"));
        }
        if self.razorpay_webhook_secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ValidationError::WebhookSecretTooShort);
        }
        if self.website_id.is_empty() {
            return Err(ValidationError::MissingWebsiteId);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str, secret: &str, website: &str) -> PaymentConfig {
        PaymentConfig {
            razorpay_key_id: key.to_string(),
            razorpay_webhook_secret: SecretString::new(secret.to_string()),
            website_id: website.to_string(),
        }
    }

    #[test]
    fn test_is_test_mode() {
        let cfg = config("rzp_test_abc", "whsec_0123456789abcdef", "site_1");
        assert!(cfg.is_test_mode());

        let cfg = config("rzp_live_abc", "whsec_0123456789abcdef", "site_1");
        assert!(!cfg.is_test_mode());
    }

    #[test]
    fn test_validation_accepts_complete_config() {
        let cfg = config("rzp_test_abc", "whsec_0123456789abcdef", "site_1");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_key_id() {
        let cfg = config("", "whsec_0123456789abcdef", "site_1");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_short_secret() {
        let cfg = config("rzp_test_abc", "short", "site_1");
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::WebhookSecretTooShort)
        ));
    }

    #[test]
    fn test_validation_missing_website_id() {
        let cfg = config("rzp_test_abc", "whsec_0123456789abcdef", "");
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::MissingWebsiteId)
        ));
    }
}
