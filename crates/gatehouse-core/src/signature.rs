//! # Webhook Signature Verification
//!
//! GitHub signs every delivery with the shared webhook secret:
//!
//! - `X-Hub-Signature-256: sha256=<hex>` (HMAC-SHA256, preferred)
//! - `X-Hub-Signature: sha1=<hex>` (HMAC-SHA1, legacy)
//!
//! [`HmacSignatureVerifier`] checks the SHA-256 header when present and falls
//! back to the SHA-1 header otherwise. Digest comparison is constant-time.
//! Verification runs against the raw body bytes, before any parsing.

use crate::webhook::WebhookRequest;
use async_trait::async_trait;
use hmac::{digest::KeyInit, Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

// ============================================================================
// Secret
// ============================================================================

/// Shared webhook secret. Wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<REDACTED>)")
    }
}

// ============================================================================
// Collaborator Interface
// ============================================================================

/// Decides whether a delivery is authentic
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// `true` when the request carries a valid signature for its raw body
    async fn verify(&self, request: &WebhookRequest) -> bool;
}

// ============================================================================
// Implementations
// ============================================================================

/// Verifies GitHub HMAC signatures with a shared secret
#[derive(Debug, Clone)]
pub struct HmacSignatureVerifier {
    secret: WebhookSecret,
}

impl HmacSignatureVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Check a body against a signature header value.
    ///
    /// `header` is `sha256=<hex>` or `sha1=<hex>`. Unknown prefixes and
    /// non-hex digests never verify.
    pub fn verify_signature(&self, body: &[u8], header: &str) -> bool {
        let Some((algorithm, hex_digest)) = header.split_once('=') else {
            return false;
        };

        let Ok(expected) = hex::decode(hex_digest) else {
            debug!(algorithm, "Signature is not valid hex");
            return false;
        };

        match algorithm {
            "sha256" => digest_matches::<HmacSha256>(self.secret.as_bytes(), body, &expected),
            "sha1" => digest_matches::<HmacSha1>(self.secret.as_bytes(), body, &expected),
            other => {
                debug!(algorithm = other, "Unsupported signature algorithm");
                false
            }
        }
    }
}

fn digest_matches<M: Mac + KeyInit>(secret: &[u8], body: &[u8], expected: &[u8]) -> bool {
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(expected).is_ok()
}

/// Checks `X-Hub-Signature-256` when present and `X-Hub-Signature` (sha1)
/// only when it is absent. A present but failing sha256 header rejects the
/// delivery even if the sha1 header would verify.
#[async_trait]
impl SignatureVerifier for HmacSignatureVerifier {
    async fn verify(&self, request: &WebhookRequest) -> bool {
        let header = request
            .headers
            .signature_256
            .as_deref()
            .or(request.headers.signature_sha1.as_deref());

        match header {
            Some(header) => self.verify_signature(&request.body, header),
            None => {
                debug!(route = %request.route, "Request carries no signature header");
                false
            }
        }
    }
}

/// Accepts every request. Only for local development with signatures disabled.
#[derive(Debug, Clone, Default)]
pub struct AcceptAllVerifier;

impl AcceptAllVerifier {
    pub fn new() -> Self {
        warn!("Webhook signature verification is disabled; every delivery will be accepted");
        Self
    }
}

#[async_trait]
impl SignatureVerifier for AcceptAllVerifier {
    async fn verify(&self, _request: &WebhookRequest) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
