//! Time-based one-time passwords (RFC 6238)
//!
//! HMAC-SHA1, 6 digits, 30 second step; the same parameters every common
//! authenticator app assumes when scanning an `otpauth://totp/` URI.
//! Secrets are 160 random bits stored as unpadded base32.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Digits per code
pub const DIGITS: u32 = 6;

/// Step length in seconds
pub const STEP_SECS: u64 = 30;

/// Secret length in bytes (160 bits, RFC 4226 recommendation)
const SECRET_BYTES: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("OTP secret is not valid base32")]
    InvalidSecret,

    #[error("HMAC key rejected")]
    InvalidKey,
}

/// Generate a fresh base32 secret
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes)
}

/// Decode a base32 secret, tolerating lowercase, spaces and `=` padding
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| TotpError::InvalidSecret)
}

/// HOTP value for one counter (RFC 4226 dynamic truncation)
pub fn hotp(key: &[u8], counter: u64) -> Result<u32, TotpError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| TotpError::InvalidKey)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    Ok(binary % 10u32.pow(DIGITS))
}

/// Zero-padded code for the step containing `unix_secs`
pub fn code_at(key: &[u8], unix_secs: u64) -> Result<String, TotpError> {
    let value = hotp(key, unix_secs / STEP_SECS)?;
    Ok(format!("{:0width$}", value, width = DIGITS as usize))
}

/// Check `code` against the current step and `skew` steps either side
///
/// Anything other than exactly six ASCII digits is rejected without
/// computing a single HMAC.
pub fn verify(secret: &str, code: &str, unix_secs: u64, skew: u8) -> Result<bool, TotpError> {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let key = decode_secret(secret)?;
    let current = (unix_secs / STEP_SECS) as i64;
    let skew = skew as i64;

    for counter in (current - skew)..=(current + skew) {
        if counter < 0 {
            continue;
        }
        let expected = hotp(&key, counter as u64)?;
        if format!("{:0width$}", expected, width = DIGITS as usize) == code {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `otpauth://totp/<issuer>:<account>?secret=<secret>&issuer=<issuer>`
pub fn provisioning_uri(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}",
        issuer, account, secret, issuer
    )
}
