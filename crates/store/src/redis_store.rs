//! Redis-backed [`TtlStore`].

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::ttl::{StoreError, TtlStore};

/// Marker value written for every blacklist key.
const MARKER: i64 = 1;

/// [`TtlStore`] over a shared Redis connection manager.
///
/// The manager multiplexes one connection and is cheap to clone per command.
/// Reconnection is *not* attempted here; the owning `InvalidationStore`
/// decides what an unavailable backend means.
#[derive(Clone)]
pub struct RedisTtlStore {
    conn: ConnectionManager,
}

impl RedisTtlStore {
    /// Connect to `endpoint` (e.g. `redis://127.0.0.1:6379`), optionally
    /// selecting a logical database.
    pub async fn connect(endpoint: &str, db: Option<i64>) -> Result<Self, StoreError> {
        let client = redis::Client::open(endpoint)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if let Some(db) = db {
            redis::cmd("SELECT")
                .arg(db)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(classify)?;
        }

        Ok(Self { conn })
    }
}

fn classify(err: redis::RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

#[async_trait]
impl TtlStore for RedisTtlStore {
    async fn set(&self, key: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(MARKER);
        if let Some(secs) = ttl_seconds {
            cmd.arg("EX").arg(secs);
        }
        cmd.query_async::<_, ()>(&mut conn).await.map_err(classify)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(classify)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let found: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(found > 0)
    }
}
