use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    BackendError(String),
    #[error("Could not encode value for the cache: {0}")]
    EncodeError(String),
    #[error("Could not decode cached value: {0}")]
    DecodeError(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::BackendError(e.to_string())
    }
}

/// The string-keyed key-value operations the passport cache needs. Redis is the production backend.
///
/// TTLs are in seconds. `ttl` follows Redis conventions: `-2` when the key does not exist and `-1` when the key has no
/// expiry.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Returns every field of the hash. A missing key yields an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    /// Returns the requested hash fields that are present. Missing fields are simply absent from the map.
    async fn hmget(&self, key: &str, fields: &[String]) -> Result<HashMap<String, String>, CacheError>;

    async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError>;

    /// Sets a single hash field, but only if the hash already exists. Returns whether the field was written.
    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> Result<bool, CacheError>;

    async fn expire(&self, key: &str, ttl: i64) -> Result<bool, CacheError>;

    async fn ttl(&self, key: &str) -> Result<i64, CacheError>;

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError>;
}
