//! Role → secret resolution.

use std::collections::HashMap;

use thiserror::Error;

use warden_core::{AuthConfig, Role, SecretSet};

/// Whether a secret is needed to mint a token or to check one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Issue,
    Verify,
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Issue => f.write_str("issue"),
            Direction::Verify => f.write_str("verify"),
        }
    }
}

/// Raised when a role has no configured secret for the requested direction.
///
/// This is always fatal to the current operation; there is no default secret
/// to fall back to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no {direction} secret configured for role {role}")]
pub struct SecretResolutionError {
    pub role: Role,
    pub direction: Direction,
}

/// Read-mostly map from role to signing material, shared across requests.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    secrets: HashMap<Role, SecretSet>,
}

impl SecretResolver {
    pub fn new(secrets: HashMap<Role, SecretSet>) -> Self {
        Self { secrets }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secrets.clone())
    }

    /// Resolve the secret for `role` in the given direction.
    ///
    /// A role configured with a single secret serves both directions; a
    /// `{ issue, verify }` pair returns the matching side.
    pub fn resolve(
        &self,
        role: Role,
        direction: Direction,
    ) -> Result<&str, SecretResolutionError> {
        match self.secrets.get(&role) {
            Some(SecretSet::Single(secret)) => Ok(secret),
            Some(SecretSet::Pair { issue, verify }) => match direction {
                Direction::Issue => Ok(issue),
                Direction::Verify => Ok(verify),
            },
            None => Err(SecretResolutionError { role, direction }),
        }
    }
}
