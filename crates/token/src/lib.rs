//! `warden-token` — token issuance and verification.
//!
//! Three pieces, smallest first: [`SecretResolver`] maps a role and direction
//! to signing material, [`TokenCodec`] signs/verifies HS256 bearer tokens,
//! and [`TokenCache`] memoizes durable (non-expiring) tokens per user.

pub mod cache;
pub mod codec;
pub mod secrets;

pub use cache::{TokenCache, TokenCacheError};
pub use codec::{IssueError, TokenCodec};
pub use secrets::{Direction, SecretResolutionError, SecretResolver};
