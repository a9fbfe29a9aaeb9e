//! An in-process [`KeyValueStore`] with Redis-like expiry semantics, backed by a moka cache.
//!
//! The server uses it when the cache URL is `memory://`, which is handy for local development. Tests use it as a
//! stand-in for Redis.
//!
//! Every entry carries its own deadline. Moka evicts the entry when the deadline passes, and `ttl` is answered from the
//! stored deadline. Read-modify-write operations go through moka's per-key compute API, so concurrent updates to the
//! same key are serialised.
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug},
    future::ready,
    time::{Duration, Instant},
};

use moka::{
    future::Cache,
    ops::compute::{CompResult, Op},
    Expiry,
};

use crate::traits::{CacheError, KeyValueStore};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self { value, expires_at: None }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|t| t.saturating_duration_since(now))
    }
}

/// Entries live until their own deadline. Reads never extend it.
struct EntryDeadline;

impl Expiry<String, Entry> for EntryDeadline {
    fn expire_after_create(&self, _key: &String, entry: &Entry, created_at: Instant) -> Option<Duration> {
        entry.remaining(created_at)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.remaining(updated_at)
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Entry>,
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore({} keys)", self.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::BackendError(format!("WRONGTYPE Operation against key {key} holding the wrong kind of value"))
}

impl MemoryStore {
    pub fn new() -> Self {
        let entries = Cache::builder().expire_after(EntryDeadline).build();
        Self { entries }
    }

    /// The number of live keys.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Runs `f` against the live entry for `key` and applies the returned operation atomically.
    async fn compute<F>(&self, key: &str, f: F) -> Result<CompResult<String, Entry>, CacheError>
    where F: FnOnce(Option<Entry>) -> Result<Op<Entry>, CacheError> {
        self.entries
            .entry(key.to_string())
            .and_try_compute_with(|current| ready(f(current.map(|e| e.into_value()))))
            .await
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.entries.get(key).await.map(|e| e.value) {
            None => Ok(None),
            Some(Value::Text(v)) => Ok(Some(v)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError> {
        let entry = Entry {
            value: Value::Text(value.to_string()),
            expires_at: Some(Instant::now() + Duration::from_secs(ttl)),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        match self.entries.get(key).await.map(|e| e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(h)) => Ok(h),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<HashMap<String, String>, CacheError> {
        let mut hash = self.hgetall(key).await?;
        Ok(fields.iter().filter_map(|f| hash.remove_entry(f)).collect())
    }

    async fn hset_multiple(&self, key: &str, values: &[(String, String)]) -> Result<(), CacheError> {
        self.compute(key, |current| {
            let mut entry = current.unwrap_or_else(|| Entry::persistent(Value::Hash(HashMap::new())));
            match &mut entry.value {
                Value::Hash(h) => h.extend(values.iter().cloned()),
                _ => return Err(wrong_type(key)),
            }
            Ok(Op::Put(entry))
        })
        .await?;
        Ok(())
    }

    async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> Result<bool, CacheError> {
        let result = self
            .compute(key, |current| {
                let Some(mut entry) = current else {
                    return Ok(Op::Nop);
                };
                match &mut entry.value {
                    Value::Hash(h) => h.insert(field.to_string(), value.to_string()),
                    _ => return Err(wrong_type(key)),
                };
                Ok(Op::Put(entry))
            })
            .await?;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn expire(&self, key: &str, ttl: i64) -> Result<bool, CacheError> {
        let result = self
            .compute(key, |current| {
                let op = match current {
                    None => Op::Nop,
                    Some(_) if ttl <= 0 => Op::Remove,
                    Some(mut entry) => {
                        entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl.unsigned_abs()));
                        Op::Put(entry)
                    },
                };
                Ok(op)
            })
            .await?;
        Ok(matches!(result, CompResult::ReplacedWith(_) | CompResult::Removed(_)))
    }

    async fn ttl(&self, key: &str) -> Result<i64, CacheError> {
        let ttl = match self.entries.get(key).await {
            None => -2,
            Some(entry) => match entry.remaining(Instant::now()) {
                None => -1,
                Some(remaining) => i64::try_from(remaining.as_secs()).unwrap_or(i64::MAX),
            },
        };
        Ok(ttl)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        match self.entries.get(key).await.map(|e| e.value) {
            None => Ok(false),
            Some(Value::Set(s)) => Ok(s.contains(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let result = self
            .compute(key, |current| {
                let mut entry = current.unwrap_or_else(|| Entry::persistent(Value::Set(HashSet::new())));
                let added = match &mut entry.value {
                    Value::Set(s) => s.insert(member.to_string()),
                    _ => return Err(wrong_type(key)),
                };
                Ok(if added { Op::Put(entry) } else { Op::Nop })
            })
            .await?;
        Ok(matches!(result, CompResult::Inserted(_) | CompResult::ReplacedWith(_)))
    }
}
