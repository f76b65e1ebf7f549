//! Per-user memoization of durable tokens.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

use warden_core::{Credentials, Role};

use crate::codec::{IssueError, TokenCodec};
use crate::secrets::{Direction, SecretResolutionError, SecretResolver};

#[derive(Debug, Error)]
pub enum TokenCacheError {
    #[error(transparent)]
    Secret(#[from] SecretResolutionError),

    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error("payload does not form valid credentials: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Issues tokens and memoizes the durable ones per `user_id`.
///
/// The cache is process-local and unbounded; it is emptied only by a process
/// restart (secret rotation implies a restart). Repeated calls for the same
/// user return the identical token string instead of minting a fresh one;
/// this is memoization, not refresh.
///
/// Concurrent calls for the same user may both mint; the last insert wins.
/// That is fine: the tokens are interchangeable proofs of the same claims.
pub struct TokenCache {
    resolver: SecretResolver,
    codec: TokenCodec,
    durable: Mutex<HashMap<String, String>>,
}

impl TokenCache {
    pub fn new(resolver: SecretResolver, codec: TokenCodec) -> Self {
        Self {
            resolver,
            codec,
            durable: Mutex::new(HashMap::new()),
        }
    }

    /// Return a token for `user_id`, minting one if needed.
    ///
    /// `user_id` and `role` seed the claims; entries in `payload` are merged
    /// on top (shallow merge, caller-supplied values win on key collision). When a
    /// durable token is already cached for `user_id` it is returned as-is,
    /// ignoring the payload and role passed in. Tokens issued with
    /// `expires_in` never touch the cache.
    pub fn get_token(
        &self,
        user_id: &str,
        role: Role,
        payload: Map<String, Value>,
        expires_in: Option<u64>,
    ) -> Result<String, TokenCacheError> {
        if let Some(token) = self.durable.lock().expect("token cache poisoned").get(user_id) {
            return Ok(token.clone());
        }

        let mut claims = Map::new();
        claims.insert("userId".to_string(), Value::String(user_id.to_string()));
        claims.insert("role".to_string(), Value::String(role.as_str().to_string()));
        for (key, value) in payload {
            claims.insert(key, value);
        }
        let credentials: Credentials = serde_json::from_value(Value::Object(claims))?;

        let secret = self.resolver.resolve(role, Direction::Issue)?;
        let token = self.codec.issue(&credentials, secret, expires_in)?;

        if expires_in.is_none() {
            self.durable
                .lock()
                .expect("token cache poisoned")
                .insert(user_id.to_string(), token.clone());
        }

        Ok(token)
    }
}
