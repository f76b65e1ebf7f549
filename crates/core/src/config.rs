//! Configuration surface for the authorization stack.
//!
//! One `AuthConfig` is built at process start by the composition root and
//! handed (by reference or `Arc`) to every component. Nothing here is
//! mutable after construction; runtime state transitions (e.g. the
//! invalidation store disabling itself) live in the components themselves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Per-role signing material: either one secret for both directions, or a
/// distinct `{ issue, verify }` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretSet {
    Single(String),
    Pair { issue: String, verify: String },
}

/// Invalidation (blacklist) store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// When false, every store operation is a successful no-op.
    pub enabled: bool,
    /// Redis endpoint, e.g. `redis://127.0.0.1:6379`.
    pub endpoint: String,
    /// Optional logical database index.
    pub db: Option<i64>,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "redis://127.0.0.1:6379".to_string(),
            db: None,
        }
    }
}

/// Upstream service hosting the sales-partner directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerApiConfig {
    /// Base URL prepended to the partner lookup path.
    pub base_url: String,
}

/// Top-level configuration for the authorization stack.
///
/// # Invariants
/// - Every role referenced by an issued or verified token must resolve to a
///   secret in `secrets`; there is deliberately no fallback default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secrets: HashMap<Role, SecretSet>,
    pub blacklist: BlacklistConfig,
    pub partner_api: PartnerApiConfig,
}

impl AuthConfig {
    /// Convenience constructor for the common "one shared secret per role"
    /// shape used by dev/test environments.
    pub fn with_single_secrets<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        Self {
            secrets: secrets
                .into_iter()
                .map(|(role, secret)| (role, SecretSet::Single(secret.into())))
                .collect(),
            ..Default::default()
        }
    }
}
