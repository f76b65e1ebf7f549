//! `warden-store` — token/actor invalidation (blacklist) records.
//!
//! The blacklist lets a still-valid token or a whole actor be forced out
//! ahead of its natural expiry. It is backed by any TTL-capable key/value
//! store through the minimal [`TtlStore`] trait; a Redis implementation and
//! an in-memory one (dev/test) are provided.
//!
//! The store is deliberately **fail-open**: if the backend is disabled or
//! unreachable, checks report "valid" rather than locking every user out.

pub mod blacklist;
pub mod redis_store;
pub mod ttl;

pub use blacklist::{InvalidationError, InvalidationStore};
pub use redis_store::RedisTtlStore;
pub use ttl::{MemoryTtlStore, StoreError, TtlStore};
