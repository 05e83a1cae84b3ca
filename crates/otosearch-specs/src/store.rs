//! Keyed store for specification records.
//!
//! Records live in Redis as JSON values under a `cars:` prefix. The
//! store is optional at runtime: a miss, an unconfigured client or an
//! unreachable server all degrade to the label-derived fallback record
//! and never fail a request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use otosearch_core::{Error, Result};

use crate::record::{fallback_record, sanitize_key, SpecRecord};

const KEY_PREFIX: &str = "cars:";

/// Point-lookup store for specification records. Implementations are
/// shared read-only across requests; only the seeding tool writes.
#[async_trait]
pub trait SpecStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Fetch the record for a sanitized key. `Ok(None)` is the normal
    /// absent case, not an error.
    async fn get(&self, key: &str) -> Result<Option<SpecRecord>>;

    /// Upsert a record under a sanitized key.
    async fn put(&self, key: &str, record: &SpecRecord) -> Result<()>;
}

/// Redis-backed store.
pub struct RedisSpecStore {
    conn: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisSpecStore {
    pub async fn new(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::Store(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url).await
    }

    fn record_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl SpecStore for RedisSpecStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<SpecRecord>> {
        let mut conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .get(Self::record_key(key))
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        match raw {
            Some(json) => {
                let record = serde_json::from_str(&json)
                    .map_err(|e| Error::Store(format!("corrupt record for {}: {}", key, e)))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, record: &SpecRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.lock().await;
        conn.set::<_, _, ()>(Self::record_key(key), json)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}

/// In-memory store, used by tests and local development without Redis.
#[derive(Default)]
pub struct MemorySpecStore {
    records: RwLock<HashMap<String, SpecRecord>>,
}

impl MemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SpecStore for MemorySpecStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<SpecRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, record: &SpecRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}

/// Resolve the specification for a raw predicted label.
///
/// Total and deterministic: a store hit returns the stored record (and
/// `true`); a miss, an absent client or a store error all fall back to
/// the label-derived record (and `false`). Never returns an error.
pub async fn lookup(store: Option<&dyn SpecStore>, raw_label: &str) -> (SpecRecord, bool) {
    let key = sanitize_key(raw_label);

    if let Some(store) = store {
        match store.get(&key).await {
            Ok(Some(mut record)) => {
                if record.model.is_empty() {
                    record.model = raw_label.trim().to_string();
                }
                if record.id.is_empty() {
                    record.id = key;
                }
                return (record, true);
            }
            Ok(None) => debug!("no spec record for '{}'", key),
            Err(e) => warn!("spec store lookup failed for '{}': {}", key, e),
        }
    }

    (fallback_record(raw_label), false)
}
