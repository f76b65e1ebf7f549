//! HS256 bearer token signing and verification.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::Serialize;
use thiserror::Error;

use warden_core::Credentials;

/// Raised when issuance is attempted with an empty payload or secret.
/// This is a caller bug, not a runtime condition.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("payload and secret must both be provided")]
    InvalidIssueRequest,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Serialize)]
struct SignedClaims<'a> {
    #[serde(flatten)]
    credentials: &'a Credentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Signs and verifies bearer tokens. Algorithm is fixed to HMAC-SHA256.
///
/// Tokens come in two lifecycle classes:
/// - *durable* (`expires_in` absent): no `iat`, no `exp`; valid until
///   explicitly invalidated;
/// - *ephemeral* (`expires_in` in seconds): carries `iat`/`exp` and dies on
///   its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenCodec;

impl TokenCodec {
    pub fn new() -> Self {
        Self
    }

    /// Mint a signed token for `credentials`.
    pub fn issue(
        &self,
        credentials: &Credentials,
        secret: &str,
        expires_in: Option<u64>,
    ) -> Result<String, IssueError> {
        if credentials.user_id.is_empty() || secret.is_empty() {
            return Err(IssueError::InvalidIssueRequest);
        }

        let (iat, exp) = match expires_in {
            Some(seconds) => {
                let now = Utc::now().timestamp();
                (Some(now), Some(now + seconds as i64))
            }
            None => (None, None),
        };

        let claims = SignedClaims {
            credentials,
            iat,
            exp,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?)
    }

    /// Verify `token` against `secret` and return its claims.
    ///
    /// Never escalates: a bad signature, a malformed token, or an expired one
    /// (unless `ignore_expiration`) all come back as `None`, which callers
    /// must treat as "unauthenticated".
    pub fn decode(
        &self,
        token: &str,
        secret: &str,
        ignore_expiration: bool,
    ) -> Option<Credentials> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = !ignore_expiration;

        decode::<Credentials>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .ok()
        .map(|data| data.claims)
    }

    /// Read the claims of `token` **without** verifying its signature.
    ///
    /// Only used to learn which role (and therefore which verify secret) the
    /// token claims to carry; the token must always be passed through
    /// [`TokenCodec::decode`] before it is trusted.
    pub fn peek(&self, token: &str) -> Option<Credentials> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        decode::<Credentials>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::Role;

    const SECRET: &str = "test-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new()
    }

    fn creds() -> Credentials {
        Credentials::new("u-42", Role::User).with_claim("shopId", json!("s-1"))
    }

    #[test]
    fn durable_round_trip_preserves_payload() {
        let token = codec().issue(&creds(), SECRET, None).unwrap();
        let decoded = codec().decode(&token, SECRET, false).unwrap();
        assert_eq!(decoded, creds());
    }

    #[test]
    fn durable_token_carries_no_timestamps() {
        let token = codec().issue(&creds(), SECRET, None).unwrap();
        let decoded = codec().decode(&token, SECRET, false).unwrap();
        assert!(!decoded.extra.contains_key("iat"));
        assert!(!decoded.extra.contains_key("exp"));
    }

    #[test]
    fn ephemeral_token_carries_expiry() {
        let token = codec().issue(&creds(), SECRET, Some(3600)).unwrap();
        let decoded = codec().decode(&token, SECRET, false).unwrap();
        assert!(decoded.extra.contains_key("iat"));
        assert!(decoded.extra.contains_key("exp"));
    }

    #[test]
    fn wrong_secret_yields_no_credentials() {
        let token = codec().issue(&creds(), SECRET, None).unwrap();
        assert!(codec().decode(&token, "other-secret", false).is_none());
    }

    #[test]
    fn tampered_token_yields_no_credentials() {
        let token = codec().issue(&creds(), SECRET, None).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = "eyJ1c2VySWQiOiJoYXgifQ";
        parts[1] = forged_payload;
        let tampered = parts.join(".");
        assert!(codec().decode(&tampered, SECRET, false).is_none());
    }

    #[test]
    fn malformed_token_yields_no_credentials() {
        assert!(codec().decode("not-a-token", SECRET, false).is_none());
    }

    #[test]
    fn expired_token_respected_unless_ignored() {
        // An already-expired token: exp in the past.
        let credentials = creds();
        let now = Utc::now().timestamp();
        let claims = SignedClaims {
            credentials: &credentials,
            iat: Some(now - 7200),
            exp: Some(now - 3600),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(codec().decode(&token, SECRET, false).is_none());
        assert!(codec().decode(&token, SECRET, true).is_some());
    }

    #[test]
    fn empty_payload_or_secret_is_rejected() {
        let no_user = Credentials::new("", Role::User);
        assert!(matches!(
            codec().issue(&no_user, SECRET, None),
            Err(IssueError::InvalidIssueRequest)
        ));
        assert!(matches!(
            codec().issue(&creds(), "", None),
            Err(IssueError::InvalidIssueRequest)
        ));
    }

    #[test]
    fn peek_reads_claims_without_verification() {
        let token = codec().issue(&creds(), SECRET, None).unwrap();
        let peeked = codec().peek(&token).unwrap();
        assert_eq!(peeked.role, Some(Role::User));
        assert_eq!(peeked.user_id, "u-42");
    }
}
