//! Decoded token payload (request-scoped caller identity).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Role;

/// Claims carried by a verified token.
///
/// Produced by token verification, consumed read-only by the authorization
/// checks. Never persisted; lives for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Role tag. Absent on legacy sales-partner tokens (see
    /// [`Credentials::acts_as_sales_partner`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Caller-supplied extra claims, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role: Some(role),
            extra: Map::new(),
        }
    }

    /// Add an extra claim (builder-style, mostly for issuance and tests).
    pub fn with_claim(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Legacy compatibility rule: early sales-partner tokens were issued
    /// without a role tag, and partner ids are exactly 4 characters long.
    /// A credential is treated as a sales partner when it carries the
    /// explicit role, or when the role is absent and the id length matches.
    ///
    /// Kept behind this named predicate so the length heuristic can be
    /// retired in one place once the old tokens have aged out.
    pub fn acts_as_sales_partner(&self) -> bool {
        match self.role {
            Some(Role::SalesPartner) => true,
            Some(_) => false,
            None => self.user_id.len() == 4,
        }
    }
}
