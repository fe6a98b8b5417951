//! Webhook signature verification.
//!
//! The processor signs every webhook delivery with HMAC-SHA256. The signature header has the form
//! `t=<unix timestamp>,v1=<hex mac>[,v1=...]` and the signed payload is `"{timestamp}.{raw body}"`.
//! Verification recomputes the MAC with the endpoint's signing secret and additionally rejects events whose
//! timestamp is further than a configured tolerance from the current time, which bounds the replay window.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature of the raw webhook payload.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("No timestamp found in signature header")]
    MissingTimestamp,
    #[error("No v1 signature found in signature header")]
    MissingSignature,
    #[error("Signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("Signature does not match payload")]
    SignatureMismatch,
    #[error("Event timestamp is outside the accepted tolerance")]
    TimestampOutOfTolerance,
}

/// Compute the hex-encoded HMAC for `payload` at `timestamp`, i.e. the value a `v1=` entry should carry.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    to_hex(&mac.finalize().into_bytes())
}

/// Build a signature header for `payload`, as the processor would. Primarily for tests and local tooling.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign_payload(secret, timestamp, payload))
}

/// Verify `header` against `payload`.
///
/// `now` is the current unix timestamp; events older (or newer) than `tolerance_secs` are rejected.
/// A tolerance of zero disables the timestamp check.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let (timestamp, signatures) = parse_header(header)?;
    if tolerance_secs > 0 && (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let expected = sign_payload(secret, timestamp, payload);
    if signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
        Ok(())
    } else {
        Err(SignatureError::SignatureMismatch)
    }
}

/// Split the header into its timestamp and the list of `v1` signatures. Unknown schemes (`v0=` etc.) are ignored.
fn parse_header(header: &str) -> Result<(i64, Vec<&str>), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| SignatureError::MalformedHeader(format!("missing '=' in '{part}'")))?;
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|e| SignatureError::MalformedHeader(format!("bad timestamp: {e}")))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    Ok((timestamp, signatures))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}
