// teamseat-service/src/utils/signature.rs
//! Verification of signed billing webhook deliveries.
//!
//! The signature header looks like `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`
//! where each `v1` is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the shared
//! webhook secret.
use crate::models::ServiceError;
use hmac::{Hmac, Mac};
use log::{debug, warn};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Option<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => timestamp = value.parse().ok(),
            (Some("v1"), Some(value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    Some(SignatureHeader {
        timestamp: timestamp?,
        signatures,
    })
}

// Sign `payload` the way the billing provider does
#[cfg(test)]
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// Check a delivery's signature header against the raw body.
///
/// `now` is the current unix time; deliveries older or newer than
/// `tolerance_secs` are rejected even when the MAC matches.
pub fn verify(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), ServiceError> {
    let header = header.ok_or_else(|| {
        warn!("❌ Webhook delivery without signature header");
        ServiceError::Unauthorized("Missing signature".to_string())
    })?;

    let parsed = parse_header(header).ok_or_else(|| {
        warn!("❌ Webhook signature header has no timestamp");
        ServiceError::Unauthorized("Malformed signature".to_string())
    })?;

    // The header is untrusted; any timestamp must compare without overflow
    let outside = now
        .checked_sub(parsed.timestamp)
        .and_then(i64::checked_abs)
        .map_or(true, |age| age > tolerance_secs);
    if outside {
        warn!(
            "❌ Webhook timestamp outside tolerance: t={} now={}",
            parsed.timestamp, now
        );
        return Err(ServiceError::Unauthorized("Signature timestamp outside tolerance".to_string()));
    }

    for candidate in &parsed.signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| ServiceError::InternalServerError)?;
        mac.update(parsed.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(candidate).is_ok() {
            debug!("Webhook signature verified");
            return Ok(());
        }
    }

    warn!("❌ Webhook signature mismatch");
    Err(ServiceError::Unauthorized("Signature mismatch".to_string()))
}
