//! Mini-app init-data verification.
//!
//! Clients send the URL-encoded init data they received from the messenger
//! as `Authorization: tma <init data>`. The data carries a `hash` field,
//! the hex HMAC-SHA256 of the remaining fields sorted and joined with `\n`.

use std::collections::BTreeMap;

use axum::extract::{Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use notedeck_core::{Error, Result};

use crate::{ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix of the `Authorization` header value.
pub const AUTH_SCHEME: &str = "tma ";

/// Checks init-data signatures against one bot token.
///
/// Three key derivations are accepted, matching what deployed clients sign
/// with: SHA-256 of the token, the raw token, and HMAC-SHA256 keyed by the
/// token over the string `WebAppData`.
#[derive(Clone)]
pub struct InitDataVerifier {
    keys: Vec<Vec<u8>>,
}

impl InitDataVerifier {
    pub fn new(bot_token: &str) -> Result<Self> {
        let mut web_app = new_mac(bot_token.as_bytes())?;
        web_app.update(b"WebAppData");

        Ok(Self {
            keys: vec![
                Sha256::digest(bot_token.as_bytes()).to_vec(),
                bot_token.as_bytes().to_vec(),
                web_app.finalize().into_bytes().to_vec(),
            ],
        })
    }

    /// Verify URL-encoded init data. Fails with `Error::Unauthorized`.
    pub fn verify(&self, init_data: &str) -> Result<()> {
        let (check_string, hash) = data_check_string(init_data)?;
        let expected = hex::decode(hash.trim())
            .map_err(|_| Error::Unauthorized("hash is not hex encoded".to_string()))?;

        for key in &self.keys {
            let mut mac = new_mac(key)?;
            mac.update(check_string.as_bytes());
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }
        Err(Error::Unauthorized(
            "init data signature mismatch".to_string(),
        ))
    }
}

fn new_mac(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|e| Error::Internal(format!("hmac key: {}", e)))
}

/// Split init data into the string that was signed and the claimed hash.
///
/// Keys are decoded, the first occurrence of a repeated key wins, `hash` is
/// removed, and the `key=value` lines are sorted bytewise.
pub fn data_check_string(init_data: &str) -> Result<(String, String)> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for pair in init_data.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.entry(decode(key)?).or_insert(decode(value)?);
    }

    let hash = fields
        .remove("hash")
        .ok_or_else(|| Error::Unauthorized("hash not found in init data".to_string()))?;

    let mut lines: Vec<String> = fields
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    lines.sort();
    Ok((lines.join("\n"), hash))
}

fn decode(component: &str) -> Result<String> {
    urlencoding::decode(&component.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|e| Error::Unauthorized(format!("malformed init data: {}", e)))
}

/// Reject mutating requests without valid init data when auth is enforced.
pub async fn require_init_data(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let Some(verifier) = state.auth.as_deref() else {
        return Ok(next.run(request).await);
    };

    let method = request.method();
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let init_data = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(AUTH_SCHEME))
        .ok_or_else(|| {
            ApiError::Unauthorized("expected 'Authorization: tma <init data>'".to_string())
        })?;

    if let Err(e) = verifier.verify(init_data) {
        debug!(
            subsystem = "api",
            component = "auth",
            method = %request.method(),
            path = %request.uri().path(),
            error = %e,
            "Rejected init data"
        );
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:test-token";

    fn sign(key: &[u8], check_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(key).unwrap();
        mac.update(check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_check_string_sorted_without_hash() {
        let (check, hash) =
            data_check_string("user=%7B%22id%22%3A1%7D&auth_date=1700000000&hash=abc").unwrap();
        assert_eq!(check, "auth_date=1700000000\nuser={\"id\":1}");
        assert_eq!(hash, "abc");
    }

    #[test]
    fn test_check_string_sorts_whole_lines() {
        // "a0=" sorts before "a=" bytewise even though key "a" < "a0".
        let (check, _) = data_check_string("a=1&a0=2&hash=x").unwrap();
        assert_eq!(check, "a0=2\na=1");
    }

    #[test]
    fn test_missing_hash_rejected() {
        let err = data_check_string("auth_date=1").unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_accepts_sha256_token_key() {
        let key = Sha256::digest(TOKEN.as_bytes());
        let hash = sign(&key, "auth_date=1\nquery_id=q");
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        verifier
            .verify(&format!("query_id=q&auth_date=1&hash={}", hash))
            .unwrap();
    }

    #[test]
    fn test_accepts_raw_token_key() {
        let hash = sign(TOKEN.as_bytes(), "auth_date=1");
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        verifier.verify(&format!("auth_date=1&hash={}", hash)).unwrap();
    }

    #[test]
    fn test_accepts_web_app_data_key() {
        let mut secret = HmacSha256::new_from_slice(TOKEN.as_bytes()).unwrap();
        secret.update(b"WebAppData");
        let secret = secret.finalize().into_bytes();
        let hash = sign(&secret, "auth_date=1");

        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        verifier.verify(&format!("auth_date=1&hash={}", hash)).unwrap();
    }

    #[test]
    fn test_rejects_tampered_data() {
        let hash = sign(TOKEN.as_bytes(), "auth_date=1");
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        let err = verifier
            .verify(&format!("auth_date=2&hash={}", hash))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_rejects_other_token() {
        let hash = sign(b"other-token", "auth_date=1");
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        assert!(verifier.verify(&format!("auth_date=1&hash={}", hash)).is_err());
    }
}
