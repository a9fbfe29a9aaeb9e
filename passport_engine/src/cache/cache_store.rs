use std::collections::HashMap;

use log::*;

use crate::{
    cache::{MemoryStore, RedisStore},
    traits::{CacheError, KeyValueStore},
};

pub const MEMORY_STORE_URL: &str = "memory://";

/// The cache backend selected by configuration. `memory://` selects the in-process store, anything else is handed to
/// the Redis client.
#[derive(Debug, Clone)]
pub enum CacheStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl CacheStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        if url.starts_with(MEMORY_STORE_URL) {
            warn!("🧠️ Using the in-process cache. Sessions are lost on restart and not shared between instances.");
            return Ok(Self::Memory(MemoryStore::new()));
        }
        Ok(Self::Redis(RedisStore::connect(url).await?))
    }
}

impl From<MemoryStore> for CacheStore {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl KeyValueStore for CacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Self::Redis(s) => s.get(key).await,
            Self::Memory(s) => s.get(key).await,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError> {
        match self {
            Self::Redis(s) => s.set_ex(key, value, ttl).await,
            Self::Memory(s) => s.set_ex(key, value, ttl).await,
        }
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::Redis(s) => s.del(key).await,
            Self::Memory(s) => s.del(key).await,
        }
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        match self {
            Self::Redis(s) => s.hgetall(key).await,
            Self::Memory(s) => s.hgetall(key).await,
        }
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<HashMap<String, String>, CacheError> {
        match self {
            Self::Redis(s) => s.hmget(key, fields).await,
            Self::Memory(s) => s.hmget(key, fields).await,
        }
    }

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError> {
        match self {
            Self::Redis(s) => s.hset_multiple(key, entries).await,
            Self::Memory(s) => s.hset_multiple(key, entries).await,
        }
    }

    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> Result<bool, CacheError> {
        match self {
            Self::Redis(s) => s.hset_if_exists(key, field, value).await,
            Self::Memory(s) => s.hset_if_exists(key, field, value).await,
        }
    }

    async fn expire(&self, key: &str, ttl: i64) -> Result<bool, CacheError> {
        match self {
            Self::Redis(s) => s.expire(key, ttl).await,
            Self::Memory(s) => s.expire(key, ttl).await,
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        match self {
            Self::Redis(s) => s.ttl(key).await,
            Self::Memory(s) => s.ttl(key).await,
        }
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        match self {
            Self::Redis(s) => s.sismember(key, member).await,
            Self::Memory(s) => s.sismember(key, member).await,
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        match self {
            Self::Redis(s) => s.sadd(key, member).await,
            Self::Memory(s) => s.sadd(key, member).await,
        }
    }
}
