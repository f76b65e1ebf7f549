//! Sales-partner entity lookup.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use warden_core::{PartnerApiConfig, Role};
use warden_token::{TokenCache, TokenCacheError};

/// Service identity used to authorize partner lookups.
const SERVICE_USER_ID: &str = "superUser";

#[derive(Debug, Error)]
pub enum PartnerLookupError {
    #[error("partner lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("partner lookup returned status {0}")]
    Status(u16),

    #[error("could not mint service token: {0}")]
    ServiceToken(#[from] TokenCacheError),
}

/// Resolves a partner user id to the partner entity it represents.
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Value, PartnerLookupError>;
}

/// [`PartnerDirectory`] backed by the booking service's HTTP API.
///
/// Lookups are authorized with a durable super-user token minted once and
/// memoized by the shared [`TokenCache`].
pub struct HttpPartnerDirectory {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenCache>,
}

impl HttpPartnerDirectory {
    pub fn new(config: &PartnerApiConfig, tokens: Arc<TokenCache>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl PartnerDirectory for HttpPartnerDirectory {
    async fn fetch(&self, user_id: &str) -> Result<Value, PartnerLookupError> {
        let token = self
            .tokens
            .get_token(SERVICE_USER_ID, Role::SuperUser, Map::new(), None)?;

        let url = format!("{}/booking/sales-partner/{user_id}", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PartnerLookupError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}
