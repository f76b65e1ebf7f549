//! Token/actor invalidation records.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use warden_core::{BlacklistConfig, Role};

use crate::redis_store::RedisTtlStore;
use crate::ttl::{StoreError, TtlStore};

const TOKEN_KEY: &str = "token:blacklist:token:";
const ACTOR_KEY: &str = "token:blacklist:actor:";

#[derive(Debug, Error)]
pub enum InvalidationError {
    /// A caller tried to (in)validate an empty token or actor id.
    #[error("token or actor key must not be empty")]
    EmptyKey,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Records explicitly invalidated tokens and actors.
///
/// A marker under `token:blacklist:token:<token>` or
/// `token:blacklist:actor:<role>:<id>` means "treat as invalid", optionally
/// until a TTL runs out. No marker means valid; not-found is never an error.
///
/// # Degraded mode
/// The store starts `enabled` (with a backend) or `disabled` (without one).
/// On the first connection-level backend error it trips into a permanent
/// disabled state for the rest of the process lifetime: all checks report
/// valid, all writes succeed as no-ops, and nothing retries. Recovery is a
/// process restart. The transition is one-way and logged exactly once.
pub struct InvalidationStore {
    backend: Option<Box<dyn TtlStore>>,
    tripped: AtomicBool,
}

impl InvalidationStore {
    /// A store with no backend: every operation is a successful no-op.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            tripped: AtomicBool::new(false),
        }
    }

    pub fn new(backend: impl TtlStore + 'static) -> Self {
        Self {
            backend: Some(Box::new(backend)),
            tripped: AtomicBool::new(false),
        }
    }

    /// Build from configuration: a Redis-backed store when enabled, a no-op
    /// store otherwise. Failing to reach Redis at startup is an error here,
    /// not a silent degrade; degrading is reserved for failures after boot.
    pub async fn from_config(config: &BlacklistConfig) -> Result<Self, StoreError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let backend = RedisTtlStore::connect(&config.endpoint, config.db).await?;
        Ok(Self::new(backend))
    }

    /// Whether checks are currently consulting the backend.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some() && !self.tripped.load(Ordering::Relaxed)
    }

    fn active(&self) -> Option<&dyn TtlStore> {
        if self.tripped.load(Ordering::Relaxed) {
            return None;
        }
        self.backend.as_deref()
    }

    fn trip(&self, err: &StoreError) {
        if !self.tripped.swap(true, Ordering::Relaxed) {
            tracing::error!(
                error = %err,
                "invalidation store unreachable; blacklist checks disabled until restart"
            );
        }
    }

    /// Mark `token` invalid, optionally only for `expire_in` seconds.
    pub async fn invalidate(
        &self,
        token: &str,
        expire_in: Option<u64>,
    ) -> Result<(), InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(());
        };
        if token.is_empty() {
            return Err(InvalidationError::EmptyKey);
        }
        self.write(store.set(&token_key(token), expire_in).await)
    }

    /// Clear the marker for `token`. Idempotent: clearing an already-valid
    /// token succeeds.
    pub async fn mark_valid(&self, token: &str) -> Result<(), InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(());
        };
        if token.is_empty() {
            return Err(InvalidationError::EmptyKey);
        }
        self.write(store.del(&token_key(token)).await)
    }

    /// Mark every token of `role:id` invalid (forced logout of an actor).
    pub async fn invalidate_actor(
        &self,
        role: Role,
        id: &str,
        expire_in: Option<u64>,
    ) -> Result<(), InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(());
        };
        if id.is_empty() {
            return Err(InvalidationError::EmptyKey);
        }
        self.write(store.set(&actor_key(role, id), expire_in).await)
    }

    pub async fn mark_actor_valid(&self, role: Role, id: &str) -> Result<(), InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(());
        };
        if id.is_empty() {
            return Err(InvalidationError::EmptyKey);
        }
        self.write(store.del(&actor_key(role, id)).await)
    }

    /// `true` when no marker exists for `token` (or the store is degraded).
    pub async fn is_token_valid(&self, token: &str) -> Result<bool, InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(true);
        };
        self.read(store.exists(&token_key(token)).await)
    }

    /// `true` when no marker exists for `role:id` (or the store is degraded).
    pub async fn is_actor_valid(&self, role: Role, id: &str) -> Result<bool, InvalidationError> {
        let Some(store) = self.active() else {
            return Ok(true);
        };
        self.read(store.exists(&actor_key(role, id)).await)
    }

    fn write(&self, result: Result<(), StoreError>) -> Result<(), InvalidationError> {
        match result {
            Ok(()) => Ok(()),
            Err(err @ StoreError::Unavailable(_)) => {
                self.trip(&err);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read(&self, result: Result<bool, StoreError>) -> Result<bool, InvalidationError> {
        match result {
            Ok(found) => Ok(!found),
            Err(err @ StoreError::Unavailable(_)) => {
                self.trip(&err);
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn token_key(token: &str) -> String {
    format!("{TOKEN_KEY}{token}")
}

fn actor_key(role: Role, id: &str) -> String {
    format!("{ACTOR_KEY}{role}:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::ttl::MemoryTtlStore;

    #[tokio::test]
    async fn invalidate_then_mark_valid_round_trip() {
        let store = InvalidationStore::new(MemoryTtlStore::new());

        assert!(store.is_token_valid("tok").await.unwrap());
        store.invalidate("tok", None).await.unwrap();
        assert!(!store.is_token_valid("tok").await.unwrap());
        store.mark_valid("tok").await.unwrap();
        assert!(store.is_token_valid("tok").await.unwrap());
    }

    #[tokio::test]
    async fn mark_valid_is_idempotent() {
        let store = InvalidationStore::new(MemoryTtlStore::new());
        store.mark_valid("never-blacklisted").await.unwrap();
        assert!(store.is_token_valid("never-blacklisted").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_marker_expires() {
        let store = InvalidationStore::new(MemoryTtlStore::new());
        store.invalidate("tok", Some(30)).await.unwrap();
        assert!(!store.is_token_valid("tok").await.unwrap());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.is_token_valid("tok").await.unwrap());
    }

    #[tokio::test]
    async fn actor_invalidation_is_keyed_by_role_and_id() {
        let store = InvalidationStore::new(MemoryTtlStore::new());
        store
            .invalidate_actor(Role::User, "u-1", None)
            .await
            .unwrap();

        assert!(!store.is_actor_valid(Role::User, "u-1").await.unwrap());
        // A different role with the same id is a different actor.
        assert!(
            store
                .is_actor_valid(Role::Collaborator, "u-1")
                .await
                .unwrap()
        );

        store.mark_actor_valid(Role::User, "u-1").await.unwrap();
        assert!(store.is_actor_valid(Role::User, "u-1").await.unwrap());
    }

    #[tokio::test]
    async fn empty_keys_are_rejected_when_enabled() {
        let store = InvalidationStore::new(MemoryTtlStore::new());
        assert!(matches!(
            store.invalidate("", None).await,
            Err(InvalidationError::EmptyKey)
        ));
        assert!(matches!(
            store.invalidate_actor(Role::User, "", None).await,
            Err(InvalidationError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn from_config_disabled_builds_a_no_op_store() {
        let store = InvalidationStore::from_config(&BlacklistConfig::default())
            .await
            .unwrap();
        assert!(!store.is_enabled());
    }

    #[tokio::test]
    async fn disabled_store_is_a_successful_no_op() {
        let store = InvalidationStore::disabled();

        store.invalidate("tok", None).await.unwrap();
        store.mark_valid("tok").await.unwrap();
        assert!(store.is_token_valid("tok").await.unwrap());
        assert!(store.is_actor_valid(Role::User, "u-1").await.unwrap());
        // Even an empty token succeeds; the disabled check comes first.
        store.invalidate("", None).await.unwrap();
    }

    /// Backend that fails with a connection error and counts calls.
    #[derive(Default)]
    struct DownStore {
        calls: std::sync::Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TtlStore for DownStore {
        async fn set(&self, _key: &str, _ttl: Option<u64>) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn del(&self, _key: &str) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn connection_error_trips_fail_open_permanently() {
        let backend = DownStore::default();
        let calls = backend.calls.clone();
        let store = InvalidationStore::new(backend);
        assert!(store.is_enabled());

        // First call hits the backend, fails open, and trips the store.
        assert!(store.is_token_valid("tok").await.unwrap());
        assert!(!store.is_enabled());

        // Subsequent calls never reach the backend again.
        store.invalidate("tok", None).await.unwrap();
        assert!(store.is_token_valid("tok").await.unwrap());
        assert!(store.is_actor_valid(Role::User, "u-1").await.unwrap());

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    /// Backend that fails with a command-level error.
    struct BrokenStore;

    #[async_trait]
    impl TtlStore for BrokenStore {
        async fn set(&self, _key: &str, _ttl: Option<u64>) -> Result<(), StoreError> {
            Err(StoreError::Command("WRONGTYPE".to_string()))
        }

        async fn del(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Command("WRONGTYPE".to_string()))
        }

        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Command("WRONGTYPE".to_string()))
        }
    }

    #[tokio::test]
    async fn command_errors_surface_without_tripping() {
        let store = InvalidationStore::new(BrokenStore);
        assert!(store.invalidate("tok", None).await.is_err());
        // A command error is not a connection failure; the store stays on.
        assert!(store.is_enabled());
    }
}
