// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request signature verification for the Events API.
//!
//! Slack signs `v0:{timestamp}:{body}` with HMAC-SHA256 under the app's signing
//! secret and sends `v0={hex}` in `X-Slack-Signature`. slack-morphism's
//! verifier does the comparison in constant time and rejects timestamps more
//! than five minutes from now.

use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use slack_morphism::prelude::SlackSigningSecret;
use slack_morphism::signature_verifier::{
    SlackEventAbsentSignatureError, SlackEventSignatureVerifier,
    SlackEventSignatureVerifierError,
};

pub const SIGNATURE_HEADER: &str = SlackEventSignatureVerifier::SLACK_SIGNED_HASH_HEADER;
pub const TIMESTAMP_HEADER: &str = SlackEventSignatureVerifier::SLACK_SIGNED_TIMESTAMP;

/// Checks request signatures against the configured signing secret.
pub struct SignatureVerifier {
    inner: SlackEventSignatureVerifier,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        let secret = SlackSigningSecret(secret.expose_secret().to_string());
        Self {
            inner: SlackEventSignatureVerifier::new(&secret),
        }
    }

    /// Verifies `signature` for `body` sent at `timestamp` (unix seconds).
    pub fn verify(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<(), SlackEventSignatureVerifierError> {
        // A non-UTF-8 body cannot match anything Slack signed.
        let body = String::from_utf8_lossy(body);
        self.inner.verify(signature, &body, timestamp)
    }

    /// Verifies a request from its headers; missing headers are an error.
    pub fn verify_request(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), SlackEventSignatureVerifierError> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        match (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER)) {
            (Some(ts), Some(signature)) => self.verify(ts, signature, body),
            _ => Err(SlackEventSignatureVerifierError::AbsentSignatureError(
                SlackEventAbsentSignatureError::new(),
            )),
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Signs like Slack does, for tests that need a fresh valid request.
#[cfg(test)]
pub(crate) fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};

    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}
