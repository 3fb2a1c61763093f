//! Slack request signature verification
//!
//! Slack signs every request with HMAC-SHA256 over `v0:{timestamp}:{body}`
//! and sends the result as `X-Slack-Signature: v0=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Header carrying the request timestamp (unix seconds)
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
/// Maximum accepted age of a signed request
pub const MAX_SKEW_SECS: i64 = 60 * 5;

const VERSION: &str = "v0";

/// Signature verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing signature headers")]
    MissingHeaders,
    #[error("Invalid request timestamp")]
    InvalidTimestamp,
    #[error("Request timestamp outside the allowed window")]
    Expired,
    #[error("Signature mismatch")]
    Mismatch,
    #[error("Signing secret unusable as an HMAC key")]
    InvalidKey,
}

/// Verifies signed Slack requests
#[derive(Debug, Clone)]
pub struct SlackVerifier {
    signing_secret: String,
}

impl SlackVerifier {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Verification is skipped when no secret is configured
    pub fn is_enabled(&self) -> bool {
        !self.signing_secret.is_empty()
    }

    /// Compute the `v0=<hex>` signature for a request
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(timestamp, body)?;
        Ok(format!(
            "{}={}",
            VERSION,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Check a request's headers against its raw body
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => return Err(SignatureError::MissingHeaders),
        };

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if now.abs_diff(sent_at) > MAX_SKEW_SECS.unsigned_abs() {
            return Err(SignatureError::Expired);
        }

        let provided = signature
            .strip_prefix("v0=")
            .and_then(|h| hex::decode(h).ok())
            .ok_or(SignatureError::Mismatch)?;

        self.mac(timestamp, body)?
            .verify_slice(&provided)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// HMAC over `v0:{timestamp}:{body}`
    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<Hmac<Sha256>, SignatureError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_531_420_618;

    // Example from Slack's request verification guide
    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &str = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const SIGNATURE: &str =
        "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    #[test]
    fn test_sign_matches_reference() {
        let verifier = SlackVerifier::new(SECRET);
        assert_eq!(
            verifier.sign("1531420618", BODY.as_bytes()).as_deref(),
            Ok(SIGNATURE)
        );
    }

    #[test]
    fn test_verify_accepts_valid_request() {
        let verifier = SlackVerifier::new(SECRET);
        assert_eq!(
            verifier.verify(Some("1531420618"), Some(SIGNATURE), BODY.as_bytes(), NOW),
            Ok(())
        );
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let verifier = SlackVerifier::new(SECRET);
        assert_eq!(
            verifier.verify(Some("1531420618"), Some(SIGNATURE), b"token=other", NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier.verify(Some("1531420618"), Some("v0=zz"), BODY.as_bytes(), NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_stale_or_missing() {
        let verifier = SlackVerifier::new(SECRET);
        assert_eq!(
            verifier.verify(Some("1531420618"), Some(SIGNATURE), BODY.as_bytes(), NOW + 301),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verifier.verify(None, Some(SIGNATURE), BODY.as_bytes(), NOW),
            Err(SignatureError::MissingHeaders)
        );
        assert_eq!(
            verifier.verify(Some("soon"), Some(SIGNATURE), BODY.as_bytes(), NOW),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_long_secret_signs_and_verifies() {
        let verifier = SlackVerifier::new("k".repeat(200));
        let signature = verifier.sign("1531420618", b"body").unwrap();
        assert_eq!(
            verifier.verify(Some("1531420618"), Some(&signature), b"body", NOW),
            Ok(())
        );
    }

    #[test]
    fn test_verify_rejects_extreme_timestamps() {
        let verifier = SlackVerifier::new(SECRET);
        for timestamp in ["-9223372036854775808", "9223372036854775807"] {
            assert_eq!(
                verifier.verify(Some(timestamp), Some("v0=00"), b"x", NOW),
                Err(SignatureError::Expired),
                "timestamp {timestamp}"
            );
        }
        assert_eq!(
            verifier.verify(Some("0"), Some("v0=00"), b"x", i64::MIN),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_empty_secret_disables_verification() {
        let verifier = SlackVerifier::new("");
        assert!(!verifier.is_enabled());
        assert_eq!(verifier.verify(None, None, b"anything", NOW), Ok(()));
    }
}
