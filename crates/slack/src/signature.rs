//! Slack request signing (`X-Slack-Signature`) for the HTTP Events API.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older (or newer) than this are treated as replays.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix time")]
    InvalidTimestamp(String),
    #[error("request timestamp is outside the allowed window")]
    Stale,
    #[error("signature does not match")]
    Mismatch,
    #[error("signing secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// The `v0=`-prefixed signature Slack would send for this request.
pub fn expected_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<String, SignatureError> {
    let mac = signing_mac(signing_secret, timestamp, body)?;
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Checks `v0=HMAC_SHA256(secret, "v0:{timestamp}:{body}")` against the
/// header value and rejects timestamps outside [`MAX_CLOCK_SKEW_SECS`].
pub fn verify(
    signing_secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
    let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

    let sent_at = timestamp
        .trim()
        .parse::<i64>()
        .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;
    if (now_unix - sent_at).abs() > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::Stale);
    }

    let provided = signature.trim().strip_prefix("v0=").ok_or(SignatureError::Mismatch)?;
    let provided = hex::decode(provided).map_err(|_| SignatureError::Mismatch)?;

    signing_mac(signing_secret, timestamp, body)?
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

fn signing_mac(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::{expected_signature, verify, SignatureError, MAX_CLOCK_SKEW_SECS};

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &[u8] = b"token=xyz&team_id=T1&command=%2Fhi&user_id=U1&channel_id=C1";

    #[test]
    fn accepts_a_correctly_signed_request() {
        let signature = expected_signature(SECRET, "1531420618", BODY).expect("sign");
        assert!(signature.starts_with("v0="));
        assert_eq!(verify(SECRET, Some("1531420618"), Some(&signature), BODY, 1531420618), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = expected_signature(SECRET, "1531420618", BODY).expect("sign");
        assert_eq!(
            verify(SECRET, Some("1531420618"), Some(&signature), b"command=%2Fhelp", 1531420618),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let signature = expected_signature("another-secret", "1531420618", BODY).expect("sign");
        assert_eq!(
            verify(SECRET, Some("1531420618"), Some(&signature), BODY, 1531420618),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_replayed_timestamps() {
        let signature = expected_signature(SECRET, "1531420618", BODY).expect("sign");
        let later = 1531420618 + MAX_CLOCK_SKEW_SECS + 1;
        assert_eq!(
            verify(SECRET, Some("1531420618"), Some(&signature), BODY, later),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn signing_matches_slack_documented_example() {
        let secret = "8f742231b10e8888abcd99yyyzzz85a5";
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow\
            &channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner\
            &command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com\
            %2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN\
            &trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let signature = expected_signature(secret, "1531420618", body).expect("sign");

        assert_eq!(
            signature,
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
        assert_eq!(verify(secret, Some("1531420618"), Some(&signature), body, 1531420700), Ok(()));
        assert_eq!(
            verify(secret, Some("1531420618"), Some("v0=a2114d57"), body, 1531420700),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn missing_headers_are_reported() {
        assert_eq!(
            verify(SECRET, None, Some("v0=00"), BODY, 0),
            Err(SignatureError::MissingHeader("x-slack-request-timestamp"))
        );
        assert_eq!(
            verify(SECRET, Some("10"), None, BODY, 10),
            Err(SignatureError::MissingHeader("x-slack-signature"))
        );
        assert!(matches!(
            verify(SECRET, Some("soon"), Some("v0=00"), BODY, 10),
            Err(SignatureError::InvalidTimestamp(_))
        ));
    }
}
