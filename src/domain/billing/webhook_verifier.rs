//! Payment provider signature verification.
//!
//! Implements verification of webhook deliveries and client-submitted
//! payment confirmations using HMAC-SHA256 with constant-time comparison.
//!
//! The webhook digest covers the exact bytes received on the wire. The
//! HTTP layer hands the captured body over before any JSON parsing;
//! re-serializing a parsed value here would invalidate the signature.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Verifier for provider webhook deliveries.
///
/// The provider sends a hex-encoded HMAC-SHA256 digest of the raw request
/// body in the signature header.
pub struct WebhookVerifier {
    /// Shared secret configured in the provider dashboard.
    secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies a webhook delivery against its signature header.
    ///
    /// Returns `false` on any mismatch or malformed signature; never
    /// panics or propagates hashing errors past this boundary.
    pub fn verify(&self, raw_body: &[u8], signature_hex: &str) -> bool {
        let Ok(provided) = hex::decode(signature_hex) else {
            return false;
        };
        let expected = hmac_sha256(self.secret.expose_secret().as_bytes(), raw_body);
        constant_time_compare(&expected, &provided)
    }
}

/// Verifier for client-submitted payment confirmations.
///
/// The provider's checkout flow hands the client a signature over the
/// canonical string `"{order_id}|{payment_id}"`; the client forwards it to
/// the verify endpoint.
pub struct ClientConfirmationVerifier {
    secret: SecretString,
}

impl ClientConfirmationVerifier {
    /// Creates a new verifier with the given secret.
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies a client confirmation for the given order and payment.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
        let Ok(provided) = hex::decode(signature_hex) else {
            return false;
        };
        let canonical = format!("{}|{}", order_id, payment_id);
        let expected = hmac_sha256(self.secret.expose_secret().as_bytes(), canonical.as_bytes());
        constant_time_compare(&expected, &provided)
    }
}

/// Computes HMAC-SHA256 of the payload with the given key.
fn hmac_sha256(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex webhook signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, payload: &[u8]) -> String {
    hex::encode(hmac_sha256(secret.as_bytes(), payload))
}

/// Computes the hex client-confirmation signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_confirmation(secret: &str, order_id: &str, payment_id: &str) -> String {
    let canonical = format!("{}|{}", order_id, payment_id);
    hex::encode(hmac_sha256(secret.as_bytes(), canonical.as_bytes()))
}
