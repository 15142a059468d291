//! Webhook signature verification.
//!
//! Deliveries carry a `Stripe-Signature` header of the form
//! `t={unix_ts},v1={hex_hmac}[,v1={hex_hmac}...]`. The signed content is
//! `"{t}.{raw body}"`, keyed with the endpoint secret (`whsec_...`).
//!
//! Two independent checks must both pass:
//! - the timestamp is within the tolerance of the receiver's clock (replay bound);
//! - at least one `v1` digest matches one of the configured secrets.
//!
//! # Example
//!
//! ```rust
//! use stripe_gateway::webhooks::{SignatureVerifier, signature_header};
//!
//! let payload = br#"{"id":"evt_1","type":"invoice.paid"}"#;
//! let header = signature_header(payload, "whsec_test", 1_700_000_000)?;
//!
//! let verifier = SignatureVerifier::new("whsec_test")?;
//! verifier.verify_at(payload, &header, 1_700_000_030)?;
//! # Ok::<(), stripe_gateway::webhooks::SignatureError>(())
//! ```

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::{Choice, ConstantTimeEq};

type HmacSha256 = Hmac<Sha256>;

/// Required prefix of webhook signing secrets.
pub const SECRET_PREFIX: &str = "whsec_";

/// Default accepted clock skew, in seconds.
pub const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// The only scheme used for verification; other schemes are ignored.
const EXPECTED_SCHEME: &str = "v1";

/// Signature verification failures, split by cause so operators can tell
/// attacks from misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("no signature matches the expected digest")]
    SignatureMismatch,

    #[error("timestamp outside tolerance ({age_seconds} seconds from now)")]
    StaleTimestamp { age_seconds: i64 },

    #[error("webhook secret must start with 'whsec_'")]
    InvalidSecretFormat,
}

impl SignatureError {
    /// Whether the error points at local configuration rather than the request.
    #[must_use]
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::InvalidSecretFormat)
    }
}

fn malformed(reason: &str) -> SignatureError {
    SignatureError::MalformedSignature(reason.to_string())
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// `(scheme, digest)` pairs in header order, unknown schemes included.
    pub signatures: Vec<(String, String)>,
}

impl SignatureHeader {
    /// Parse a raw header value.
    ///
    /// # Errors
    ///
    /// [`SignatureError::MalformedSignature`] if an item is not `key=value`,
    /// the timestamp is missing, repeated or non-numeric, or there is no `v1` entry.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| malformed("expected comma-separated key=value items"))?;

            match key {
                "t" => {
                    if timestamp.is_some() {
                        return Err(malformed("duplicate timestamp"));
                    }
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| malformed("non-numeric timestamp"))?,
                    );
                }
                scheme => signatures.push((scheme.to_string(), value.to_string())),
            }
        }

        let timestamp = timestamp.ok_or_else(|| malformed("missing timestamp"))?;
        if !signatures.iter().any(|(scheme, _)| scheme == EXPECTED_SCHEME) {
            return Err(malformed("no v1 signature"));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }

    /// Digests under the `v1` scheme.
    pub fn v1_signatures(&self) -> impl Iterator<Item = &str> {
        self.signatures
            .iter()
            .filter(|(scheme, _)| scheme == EXPECTED_SCHEME)
            .map(|(_, digest)| digest.as_str())
    }
}

impl FromStr for SignatureHeader {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check a secret has the required literal prefix and a non-empty remainder.
pub fn validate_secret(secret: &str) -> Result<(), SignatureError> {
    match secret.strip_prefix(SECRET_PREFIX) {
        Some(rest) if !rest.is_empty() => Ok(()),
        _ => Err(SignatureError::InvalidSecretFormat),
    }
}

/// Hex-encoded HMAC-SHA256 of `"{timestamp}.{payload}"`.
///
/// # Errors
///
/// [`SignatureError::InvalidSecretFormat`] if the secret cannot key the MAC.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecretFormat)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a valid header value for `payload`, as the sender would.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    Ok(format!(
        "t={},{}={}",
        timestamp,
        EXPECTED_SCHEME,
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Verify one delivery against a single secret.
///
/// Checks, in order: secret format, header syntax, timestamp, digest.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: i64,
) -> Result<(), SignatureError> {
    validate_secret(secret)?;
    let parsed = SignatureHeader::parse(header)?;
    check(payload, &parsed, &[secret], tolerance_seconds, now)
}

fn check(
    payload: &[u8],
    header: &SignatureHeader,
    secrets: &[&str],
    tolerance_seconds: u64,
    now: i64,
) -> Result<(), SignatureError> {
    let age_seconds = now.saturating_sub(header.timestamp);
    if age_seconds.unsigned_abs() > tolerance_seconds {
        return Err(SignatureError::StaleTimestamp { age_seconds });
    }

    // Every candidate is compared; no early exit on the first match.
    let mut matched = Choice::from(0);
    for secret in secrets {
        let expected = compute_signature(secret, header.timestamp, payload)?;
        for candidate in header.v1_signatures() {
            matched |= digest_eq(expected.as_bytes(), candidate.as_bytes());
        }
    }

    if bool::from(matched) {
        Ok(())
    } else {
        Err(SignatureError::SignatureMismatch)
    }
}

/// Constant-time over the digest; only the (public) length short-circuits.
fn digest_eq(expected: &[u8], provided: &[u8]) -> Choice {
    if expected.len() != provided.len() {
        return Choice::from(0);
    }
    expected.ct_eq(provided)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Verifier bound to one or more secrets.
///
/// Holding several secrets supports rotation: during the overlap window a
/// delivery signed with either secret is accepted.
#[derive(Clone)]
pub struct SignatureVerifier {
    secrets: Vec<SecretString>,
    tolerance_seconds: u64,
}

impl SignatureVerifier {
    /// Create a verifier for `secret` with the default tolerance.
    ///
    /// # Errors
    ///
    /// [`SignatureError::InvalidSecretFormat`] if the secret lacks the `whsec_` prefix.
    pub fn new(secret: impl Into<String>) -> Result<Self, SignatureError> {
        Ok(Self {
            secrets: vec![checked_secret(secret.into())?],
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        })
    }

    /// Also accept signatures made with `secret`.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Result<Self, SignatureError> {
        self.secrets.push(checked_secret(secret.into())?);
        Ok(self)
    }

    #[must_use]
    pub fn with_tolerance(mut self, seconds: u64) -> Self {
        self.tolerance_seconds = seconds;
        self
    }

    #[must_use]
    pub fn tolerance_seconds(&self) -> u64 {
        self.tolerance_seconds
    }

    /// Verify against the system clock.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, unix_now())
    }

    /// Verify against an explicit `now` (unix seconds).
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let parsed = SignatureHeader::parse(header)?;
        let secrets: Vec<&str> = self.secrets.iter().map(|s| s.expose_secret()).collect();

        let result = check(payload, &parsed, &secrets, self.tolerance_seconds, now);
        if let Err(ref e) = result {
            tracing::debug!(
                target: "stripe_gateway::webhooks",
                error = %e,
                timestamp = parsed.timestamp,
                "Webhook signature verification failed"
            );
        }
        result
    }
}

fn checked_secret(secret: String) -> Result<SecretString, SignatureError> {
    validate_secret(&secret)?;
    Ok(SecretString::from(secret))
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secrets", &self.secrets.len())
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const T: i64 = 1_700_000_000;

    /// Reference digest, computed independently of `compute_signature`.
    fn reference_digest(secret: &str, signed: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    // ============ header parsing ============

    #[test]
    fn test_parse_header() {
        let header = SignatureHeader::parse("t=1234567890,v1=abc123,v0=old,v1=def456").unwrap();
        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.signatures.len(), 3);
        assert_eq!(header.v1_signatures().collect::<Vec<_>>(), vec!["abc123", "def456"]);
    }

    #[test]
    fn test_parse_header_tolerates_spaces() {
        let header: SignatureHeader = "t=5, v1=aa".parse().unwrap();
        assert_eq!(header.timestamp, 5);
        assert_eq!(header.v1_signatures().next(), Some("aa"));
    }

    #[test]
    fn test_parse_header_malformed() {
        for header in [
            "",
            "invalid",
            "v1=abc",
            "t=abc,v1=abc",
            "t=1,v0=abc",
            "t=1,t=2,v1=abc",
            "t=1,v1=abc,garbage",
        ] {
            assert!(
                matches!(
                    SignatureHeader::parse(header),
                    Err(SignatureError::MalformedSignature(_))
                ),
                "header {header:?} should be malformed"
            );
        }
    }

    // ============ secret format ============

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("whsec_test").is_ok());
        assert_eq!(validate_secret("whsec_"), Err(SignatureError::InvalidSecretFormat));
        assert_eq!(validate_secret("sk_test_abc"), Err(SignatureError::InvalidSecretFormat));
        assert_eq!(validate_secret(""), Err(SignatureError::InvalidSecretFormat));
    }

    #[test]
    fn test_invalid_secret_checked_before_header() {
        let result = verify(b"{}", "garbage", "not-a-secret", 300, T);
        assert_eq!(result, Err(SignatureError::InvalidSecretFormat));
        assert!(SignatureVerifier::new("secret").is_err());
        assert!(SignatureError::InvalidSecretFormat.is_misconfiguration());
    }

    // ============ digest ============

    #[test]
    fn test_compute_signature_matches_reference() {
        let expected = reference_digest(SECRET, "1700000000.{}");
        assert_eq!(compute_signature(SECRET, T, b"{}").unwrap(), expected);
    }

    #[test]
    fn test_compute_signature_accepts_any_key_length() {
        let long_secret = format!("whsec_{}", "k".repeat(512));
        let digest = compute_signature(&long_secret, T, b"{}").unwrap();
        assert_eq!(digest, reference_digest(&long_secret, "1700000000.{}"));
        assert_eq!(digest.len(), 64);

        let header = signature_header(b"{}", &long_secret, T).unwrap();
        assert_eq!(verify(b"{}", &header, &long_secret, 300, T), Ok(()));
    }

    #[test]
    fn test_known_payload_scenario() {
        let digest = reference_digest(SECRET, "1700000000.{}");
        let header = format!("t=1700000000,v1={digest}");

        assert_eq!(verify(b"{}", &header, SECRET, 300, T), Ok(()));
        assert_eq!(verify(b"{}", &header, SECRET, 300, T + 299), Ok(()));
        assert_eq!(verify(b"{}", &header, SECRET, 300, T - 120), Ok(()));
    }

    #[test]
    fn test_wrong_digest_is_mismatch() {
        let header = format!("t={T},v1={}", "0".repeat(64));
        assert_eq!(
            verify(b"{}", &header, SECRET, 300, T),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_modified_payload_is_mismatch() {
        let header = signature_header(b"original", SECRET, T).unwrap();
        assert_eq!(
            verify(b"modified", &header, SECRET, 300, T),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_secret_is_mismatch() {
        let header = signature_header(b"{}", "whsec_other", T).unwrap();
        assert_eq!(
            verify(b"{}", &header, SECRET, 300, T),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_non_hex_digest_is_mismatch() {
        assert_eq!(
            verify(b"{}", "t=1700000000,v1=not-hex", SECRET, 300, T),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_binary_payload() {
        let payload: &[u8] = &[0x00, 0x01, 0xff, 0xfe, 0x80];
        let header = signature_header(payload, SECRET, T).unwrap();
        assert_eq!(verify(payload, &header, SECRET, 300, T), Ok(()));
    }

    // ============ timestamp ============

    #[test]
    fn test_tolerance_boundary() {
        let header = signature_header(b"{}", SECRET, T).unwrap();

        assert_eq!(verify(b"{}", &header, SECRET, 300, T + 300), Ok(()));
        assert_eq!(
            verify(b"{}", &header, SECRET, 300, T + 301),
            Err(SignatureError::StaleTimestamp { age_seconds: 301 })
        );
    }

    #[test]
    fn test_future_timestamp_outside_tolerance() {
        let header = signature_header(b"{}", SECRET, T).unwrap();
        assert_eq!(
            verify(b"{}", &header, SECRET, 300, T - 301),
            Err(SignatureError::StaleTimestamp { age_seconds: -301 })
        );
    }

    #[test]
    fn test_stale_wins_over_bad_digest() {
        let header = format!("t={T},v1={}", "0".repeat(64));
        assert!(matches!(
            verify(b"{}", &header, SECRET, 300, T + 10_000),
            Err(SignatureError::StaleTimestamp { .. })
        ));
    }

    // ============ multiple signatures and rotation ============

    #[test]
    fn test_any_v1_signature_may_match() {
        let good = compute_signature(SECRET, T, b"{}").unwrap();
        let header = format!("t={T},v1={},v1={good}", "f".repeat(64));
        assert_eq!(verify(b"{}", &header, SECRET, 300, T), Ok(()));
    }

    #[test]
    fn test_unknown_scheme_ignored() {
        let good = compute_signature(SECRET, T, b"{}").unwrap();
        let header = format!("t={T},v0={good},v9=whatever");
        // Only a v0 copy of the right digest: there is no v1 entry at all.
        assert!(matches!(
            verify(b"{}", &header, SECRET, 300, T),
            Err(SignatureError::MalformedSignature(_))
        ));

        let header = format!("t={T},v9=whatever,v1={good}");
        assert_eq!(verify(b"{}", &header, SECRET, 300, T), Ok(()));
    }

    #[test]
    fn test_verifier_accepts_rotated_secret() {
        let verifier = SignatureVerifier::new("whsec_new")
            .unwrap()
            .with_secret("whsec_old")
            .unwrap();

        let old = signature_header(b"{}", "whsec_old", T).unwrap();
        let new = signature_header(b"{}", "whsec_new", T).unwrap();
        let other = signature_header(b"{}", "whsec_other", T).unwrap();

        assert_eq!(verifier.verify_at(b"{}", &old, T), Ok(()));
        assert_eq!(verifier.verify_at(b"{}", &new, T), Ok(()));
        assert_eq!(
            verifier.verify_at(b"{}", &other, T),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_verifier_tolerance() {
        let verifier = SignatureVerifier::new(SECRET).unwrap().with_tolerance(10);
        let header = signature_header(b"{}", SECRET, T).unwrap();

        assert_eq!(verifier.tolerance_seconds(), 10);
        assert_eq!(verifier.verify_at(b"{}", &header, T + 10), Ok(()));
        assert!(matches!(
            verifier.verify_at(b"{}", &header, T + 11),
            Err(SignatureError::StaleTimestamp { age_seconds: 11 })
        ));
    }

    #[test]
    fn test_verifier_uses_system_clock() {
        let now = unix_now();
        let verifier = SignatureVerifier::new(SECRET).unwrap();
        let header = signature_header(b"payload", SECRET, now).unwrap();
        assert_eq!(verifier.verify(b"payload", &header), Ok(()));
    }

    #[test]
    fn test_verifier_debug_hides_secrets() {
        let verifier = SignatureVerifier::new("whsec_supersecret").unwrap();
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains("supersecret"));
    }
}
