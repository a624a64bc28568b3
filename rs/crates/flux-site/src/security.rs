use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use flux_runtime::{ContextProvider, RequestContext, Services};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Cookie naming the signed-in demo user.
pub const USER_COOKIE: &str = "flux_user";

/// Random URL-safe token of `len` bytes, base64url encoded.
pub fn generate_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of a value, hex-encoded.
pub fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    format!("{:x}", digest)
}

/// HMAC-SHA256 signer over a process key.
///
/// Lets a form carry its own proof (CSRF token, captcha answer) so a
/// submission verifies without the instance that rendered it.
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    pub fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self { mac: HmacSha256::new_from_slice(key)? })
    }

    /// Signer over a fresh random key. Tokens do not survive a restart.
    pub fn random() -> Result<Self, InvalidLength> {
        let mut key = [0u8; 32];
        rand::thread_rng().fill(&mut key);
        Self::new(&key)
    }

    fn keyed(&self, purpose: &str, value: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(purpose.as_bytes());
        mac.update(&[0]);
        mac.update(value.as_bytes());
        mac
    }

    /// Signature of `value`, scoped to `purpose`, base64url encoded.
    pub fn sign(&self, purpose: &str, value: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.keyed(purpose, value).finalize().into_bytes())
    }

    /// Constant-time check of a signature produced by [`Signer::sign`].
    pub fn verify(&self, purpose: &str, value: &str, signature: &str) -> bool {
        match URL_SAFE_NO_PAD.decode(signature) {
            Ok(bytes) => self.keyed(purpose, value).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    /// CSRF token for `subject` (the user id, or empty):
    /// `<issued unix secs>.<nonce>.<signature>`.
    pub fn issue_csrf(&self, subject: &str, now: DateTime<Utc>) -> String {
        let claim = format!("{}.{}", now.timestamp(), generate_token(9));
        let signature = self.sign("csrf", &format!("{}|{}", subject, claim));
        format!("{}.{}", claim, signature)
    }

    /// Whether `token` was issued for `subject` no longer than `max_age` ago.
    pub fn verify_csrf(&self, token: &str, subject: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
        let Some((claim, signature)) = token.rsplit_once('.') else {
            return false;
        };
        let Some(issued) = claim.split_once('.').and_then(|(ts, _)| ts.parse::<i64>().ok()) else {
            return false;
        };
        let age = now.timestamp() - issued;
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        (0..=max_age).contains(&age) && self.verify("csrf", &format!("{}|{}", subject, claim), signature)
    }
}

/// Read the user id from the `flux_user` cookie.
pub fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == USER_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds request contexts over the site services, with the cookie user.
pub struct CookieContext {
    services: Arc<Services>,
}

impl CookieContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

impl ContextProvider for CookieContext {
    fn context(&self, headers: &HeaderMap) -> RequestContext {
        let ctx = RequestContext::new(Arc::clone(&self.services));
        match user_from_headers(headers) {
            Some(user_id) => ctx.with_user(user_id),
            None => ctx,
        }
    }
}
