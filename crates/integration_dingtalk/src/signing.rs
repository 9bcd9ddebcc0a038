//! Webhook request signing
//!
//! Robots with "additional signature" enabled expect two extra query
//! parameters on every request:
//!
//! - `timestamp`: epoch seconds followed by a literal `000`
//! - `sign`: `urlencode(base64(hmac_sha256(secret, timestamp + "\n" + secret)))`
//!
//! The timestamp is not a true millisecond value. The receiving service
//! validates the signature against this exact string, so it must not be
//! replaced by `Utc::now().timestamp_millis()`.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
#[cfg(test)]
use mockall::automock;
use sha2::Sha256;

use crate::error::DingTalkError;

type HmacSha256 = Hmac<Sha256>;

/// Source of the current time used for signing
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now_epoch_secs(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Signature query parameters for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// `<epoch-seconds>000`
    pub timestamp: String,
    /// Percent-encoded base64 HMAC
    pub sign: String,
}

impl Signature {
    /// Sign for the given instant
    pub fn at(epoch_secs: i64, secret: &str) -> Result<Self, DingTalkError> {
        let timestamp = timestamp_from_secs(epoch_secs);
        let sign = compute_sign(&timestamp, secret)?;
        Ok(Self { timestamp, sign })
    }

    /// Sign for the current instant of `clock`
    pub fn now(clock: &dyn Clock, secret: &str) -> Result<Self, DingTalkError> {
        Self::at(clock.now_epoch_secs(), secret)
    }

    /// Query string fragment appended after `access_token`
    #[must_use]
    pub fn query_suffix(&self) -> String {
        format!("&sign={}&timestamp={}", self.sign, self.timestamp)
    }
}

/// Timestamp string expected by the webhook
#[must_use]
pub fn timestamp_from_secs(epoch_secs: i64) -> String {
    format!("{epoch_secs}000")
}

/// Input of the HMAC
#[must_use]
pub fn string_to_sign(timestamp: &str, secret: &str) -> String {
    format!("{timestamp}\n{secret}")
}

/// Compute the percent-encoded signature for `timestamp`
///
/// Any secret is a valid key, including an empty one.
pub fn compute_sign(timestamp: &str, secret: &str) -> Result<String, DingTalkError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DingTalkError::Signing(e.to_string()))?;
    mac.update(string_to_sign(timestamp, secret).as_bytes());
    let raw = mac.finalize().into_bytes();

    let encoded = STANDARD.encode(raw);
    Ok(urlencoding::encode(&encoded).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXED_SECS: i64 = 1_700_000_000;

    #[test]
    fn any_key_length_is_accepted() {
        assert!(compute_sign("1700000000000", "").is_ok());
        assert!(compute_sign("1700000000000", &"k".repeat(4096)).is_ok());
    }

    #[test]
    fn timestamp_appends_literal_zeros() {
        assert_eq!(timestamp_from_secs(FIXED_SECS), "1700000000000");
        assert_eq!(timestamp_from_secs(0), "0000");
    }

    #[test]
    fn string_to_sign_joins_with_newline() {
        assert_eq!(string_to_sign("1700000000000", "abc"), "1700000000000\nabc");
    }

    #[test]
    fn sign_matches_fixture() {
        let sign = compute_sign("1700000000000", "abc").unwrap();
        assert_eq!(sign, "op8PfVzJL3l7ytCWjPLUMemWOtOBySrLOe22d7A7me4%3D");
    }

    #[test]
    fn sign_percent_encodes_base64_alphabet() {
        // base64: 9jsdOlHATMQNZHhG31/lr2x+/iawu+MfGR781hp5SVU=
        let sign = compute_sign("1700000000000", "SEC4").unwrap();
        assert_eq!(
            sign,
            "9jsdOlHATMQNZHhG31%2Flr2x%2B%2Fiawu%2BMfGR781hp5SVU%3D"
        );
    }

    #[test]
    fn signature_at_fixed_clock() {
        let signature = Signature::now(&FixedClock(FIXED_SECS), "abc").unwrap();
        assert_eq!(signature.timestamp, "1700000000000");
        assert_eq!(
            signature.sign,
            "op8PfVzJL3l7ytCWjPLUMemWOtOBySrLOe22d7A7me4%3D"
        );
    }

    #[test]
    fn signature_uses_clock_once() {
        let mut clock = MockClock::new();
        clock
            .expect_now_epoch_secs()
            .times(1)
            .return_const(FIXED_SECS);

        let signature = Signature::now(&clock, "SEC4").unwrap();
        assert_eq!(signature.timestamp, "1700000000000");
    }

    #[test]
    fn query_suffix_order() {
        let signature = Signature::at(FIXED_SECS, "abc").unwrap();
        assert_eq!(
            signature.query_suffix(),
            "&sign=op8PfVzJL3l7ytCWjPLUMemWOtOBySrLOe22d7A7me4%3D&timestamp=1700000000000"
        );
    }

    #[test]
    fn different_secrets_give_different_signs() {
        let a = compute_sign("1700000000000", "abc").unwrap();
        let b = compute_sign("1700000000000", "abd").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn system_clock_is_after_fixture() {
        assert!(SystemClock.now_epoch_secs() > FIXED_SECS);
    }
}
