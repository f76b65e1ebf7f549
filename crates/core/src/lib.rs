//! `warden-core` — shared access-control primitives.
//!
//! This crate contains the **pure** pieces of the authorization model: the
//! closed role set, decoded token credentials, and the configuration surface.
//! No I/O, no framework types.

pub mod config;
pub mod credentials;
pub mod role;

pub use config::{AuthConfig, BlacklistConfig, PartnerApiConfig, SecretSet};
pub use credentials::Credentials;
pub use role::{Role, UnknownRoleError};
