//! Closed role set driving secret selection and authorization.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Actor category carried in every issued token.
///
/// The set is closed on purpose: adding a role is a compile-time change so
/// that every per-role branch (secret selection, self-access, partner
/// substitution) is forced through an exhaustive match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    Collaborator,
    SalesPartner,
    SuperUser,
}

impl Role {
    /// Every known role, in declaration order.
    pub const ALL: [Role; 4] = [
        Role::User,
        Role::Collaborator,
        Role::SalesPartner,
        Role::SuperUser,
    ];

    /// Wire name of the role (the value found in token payloads and config).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Collaborator => "collaborator",
            Role::SalesPartner => "salesPartner",
            Role::SuperUser => "superUser",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "collaborator" => Ok(Role::Collaborator),
            "salesPartner" => Ok(Role::SalesPartner),
            "superUser" => Ok(Role::SuperUser),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }
}
