//! Cache-aside access to users and their access tokens.
//!
//! The relational store is always the source of truth. Everything written here is a view that may be evicted at any
//! time; a read that misses falls back to the repository and repopulates the cache.
use std::fmt::Debug;

use chrono::NaiveDate;
use log::*;
use passport_common::helpers::{today, unix_now};

use crate::{
    cache::{
        codec::{user_from_hash, user_to_hash},
        keys,
    },
    db_types::{Fields, User, UserScope},
    traits::{CacheError, KeyValueStore, UserApiError, UserManagement},
};

/// How long a cached user hash lives.
pub const USER_TTL: i64 = 30 * 24 * 3600;
/// How long a daily login set lives.
pub const LOGIN_USERS_TTL: i64 = 2 * 24 * 3600;
/// Extra lifetime given to a token index on top of the stored expiry.
pub const TOKEN_GRACE: i64 = 60;
/// A cached token with less than this many seconds left is extended.
pub const REFRESH_THRESHOLD: i64 = 1800;
pub const REFRESH_TTL: i64 = 3600;
pub const MIS_TOKEN_TTL: i64 = 7 * 24 * 3600;
/// Added to the admin token lifetime when the user asked to stay signed in.
pub const MIS_KEEP_EXTRA: i64 = 30 * 24 * 3600;

fn decode_user_id(raw: &str) -> Result<i64, CacheError> {
    raw.parse::<i64>().map_err(|e| CacheError::DecodeError(format!("user id '{raw}': {e}")))
}

/// Adds `user_id` to the set of users seen on `date`. The set's TTL is only set by the call that adds the member.
pub async fn record_daily_login<C: KeyValueStore>(store: &C, user_id: i64, date: NaiveDate) -> Result<(), CacheError> {
    let key = keys::login_users(date);
    let member = user_id.to_string();
    if store.sismember(&key, &member).await? {
        return Ok(());
    }
    if store.sadd(&key, &member).await? {
        store.expire(&key, LOGIN_USERS_TTL).await?;
        trace!("🧠️ Recorded login for user {user_id} on {date}");
    }
    Ok(())
}

/// Pairs a user repository with a key-value store and keeps the two consistent.
pub struct UserCache<B, C> {
    db: B,
    store: C,
}

impl<B: Debug, C: Debug> Debug for UserCache<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserCache ({:?}, {:?})", self.db, self.store)
    }
}

impl<B, C> UserCache<B, C>
where
    B: UserManagement,
    C: KeyValueStore,
{
    pub fn new(db: B, store: C) -> Self {
        Self { db, store }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Returns the user with the given id, restricted to `fields` when the entry is served from the cache.
    ///
    /// On a miss the whole live row is read from the repository and written back to the cache.
    pub async fn get_user_by_id(&self, id: i64, fields: &Fields) -> Result<User, UserApiError> {
        let key = keys::user_by_id(id);
        let cached = match fields.columns() {
            None => self.store.hgetall(&key).await?,
            Some(columns) => {
                let mut columns = columns.to_vec();
                if !columns.iter().any(|c| c == "id") {
                    columns.push("id".to_string());
                }
                self.store.hmget(&key, &columns).await?
            },
        };
        if let Some(user) = user_from_hash(&cached)? {
            trace!("🧠️ Cache hit for user {id}");
            return Ok(user);
        }
        let user = self.db.fetch_user_by_id(id, &Fields::All).await?.ok_or(UserApiError::UserNotFound)?;
        let user = User { pwd: String::new(), ..user };
        self.store.hset_multiple(&key, &user_to_hash(&user)).await?;
        self.store.expire(&key, USER_TTL).await?;
        debug!("🧠️ Cached user {id}");
        Ok(user)
    }

    /// Resolves an end-user access token to a user, extending the token when it is about to run out, and records the
    /// user in today's login set.
    pub async fn check_user_access_token(&self, token: &str, fields: &Fields) -> Result<User, UserApiError> {
        if token.is_empty() {
            return Err(UserApiError::TokenInvalid);
        }
        let user_id = self.resolve_access_token(token).await?;
        let user = self.get_user_by_id(user_id, fields).await?;
        record_daily_login(&self.store, user_id, today()).await?;
        Ok(user)
    }

    async fn resolve_access_token(&self, token: &str) -> Result<i64, UserApiError> {
        let key = keys::access_token(token);
        if let Some(raw) = self.store.get(&key).await? {
            let user_id = decode_user_id(&raw)?;
            let ttl = self.store.ttl(&key).await?;
            if ttl > 0 && ttl < REFRESH_THRESHOLD {
                self.extend_access_token(&key, user_id).await?;
            }
            return Ok(user_id);
        }
        let fields = Fields::only(&["id", "expire_time"]);
        let user = self
            .db
            .fetch_user_by_access_token(token, &fields, UserScope::Active)
            .await?
            .ok_or(UserApiError::TokenInvalid)?;
        let now = unix_now();
        if user.expire_time < now {
            debug!("🧠️ Access token for user {} expired at {}", user.id, user.expire_time);
            return Err(UserApiError::TokenInvalid);
        }
        let ttl = user.expire_time - now + TOKEN_GRACE;
        self.store.set_ex(&key, &user.id.to_string(), ttl.unsigned_abs()).await?;
        trace!("🧠️ Cached access token for user {} for {ttl}s", user.id);
        Ok(user.id)
    }

    async fn extend_access_token(&self, token_key: &str, user_id: i64) -> Result<(), CacheError> {
        let expire_time = unix_now() + REFRESH_TTL;
        let user_key = keys::user_by_id(user_id);
        self.store.hset_if_exists(&user_key, "expire_time", &expire_time.to_string()).await?;
        self.store.expire(token_key, REFRESH_TTL).await?;
        debug!("🧠️ Extended access token for user {user_id}");
        Ok(())
    }

    /// Resolves an administrative token to a user id. There is no repository fallback: an unknown token is invalid.
    pub async fn check_mis_user_access_token(&self, token: &str) -> Result<i64, UserApiError> {
        if token.is_empty() {
            return Err(UserApiError::TokenInvalid);
        }
        let raw = self.store.get(&keys::mis_access_token(token)).await?.ok_or(UserApiError::TokenInvalid)?;
        Ok(decode_user_id(&raw)?)
    }

    /// Starts a new administrative session for `user_id` and ends the previous one, if any. Returns the lifetime of
    /// the new token in seconds.
    pub async fn start_mis_session(&self, user_id: i64, token: &str, keep: bool) -> Result<i64, CacheError> {
        let ttl = if keep { MIS_TOKEN_TTL + MIS_KEEP_EXTRA } else { MIS_TOKEN_TTL };
        let session_key = keys::mis_user_session(user_id);
        let previous = self.store.get(&session_key).await?;
        self.store.set_ex(&keys::mis_access_token(token), &user_id.to_string(), ttl.unsigned_abs()).await?;
        self.store.set_ex(&session_key, token, ttl.unsigned_abs()).await?;
        if let Some(previous) = previous.filter(|p| p != token) {
            self.store.del(&keys::mis_access_token(&previous)).await?;
            debug!("🧠️ Ended previous admin session for user {user_id}");
        }
        Ok(ttl)
    }

    pub async fn evict_user(&self, user_id: i64) -> Result<(), CacheError> {
        self.store.del(&keys::user_by_id(user_id)).await?;
        trace!("🧠️ Evicted user {user_id}");
        Ok(())
    }

    pub async fn del_access_token(&self, token: String) -> Result<(), CacheError> {
        self.store.del(&keys::access_token(&token)).await
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use mockall::{mock, predicate::eq};

    use super::*;
    use crate::{
        cache::MemoryStore,
        db_types::{MisUser, UserUpdate, UserUpdateCondition, WeChatProfile},
        traits::RegistrationOutcome,
    };

    mock! {
        pub Store {}
        impl KeyValueStore for Store {
            async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
            async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), CacheError>;
            async fn del(&self, key: &str) -> Result<(), CacheError>;
            async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;
            async fn hmget(&self, key: &str, fields: &[String]) -> Result<HashMap<String, String>, CacheError>;
            async fn hset_multiple(&self, key: &str, entries: &[(String, String)]) -> Result<(), CacheError>;
            async fn hset_if_exists(&self, key: &str, field: &str, value: &str) -> Result<bool, CacheError>;
            async fn expire(&self, key: &str, ttl: i64) -> Result<bool, CacheError>;
            async fn ttl(&self, key: &str) -> Result<i64, CacheError>;
            async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError>;
            async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError>;
        }
    }

    mock! {
        pub UserDb {}
        impl UserManagement for UserDb {
            async fn fetch_user_by_id(&self, id: i64, fields: &Fields) -> Result<Option<User>, UserApiError>;
            async fn fetch_user_by_access_token(&self, token: &str, fields: &Fields, scope: UserScope) -> Result<Option<User>, UserApiError>;
            async fn fetch_user_by_union_id(&self, union_id: &str, fields: &Fields, scope: UserScope) -> Result<Option<User>, UserApiError>;
            async fn fetch_user_by_phone(&self, phone: &str, fields: &Fields) -> Result<Option<User>, UserApiError>;
            async fn fetch_user_by_phone_and_password(&self, phone: &str, password_hash: &str, fields: &Fields) -> Result<Option<User>, UserApiError>;
            async fn fetch_mis_user(&self, user_id: i64) -> Result<Option<MisUser>, UserApiError>;
            async fn is_agent_admin(&self, user_id: i64, agent_id: i64) -> Result<bool, UserApiError>;
            async fn is_brand_member(&self, user_id: i64, brand_id: i64) -> Result<bool, UserApiError>;
            async fn update_user(&self, condition: UserUpdateCondition, update: UserUpdate) -> Result<u64, UserApiError>;
            async fn register_wechat_user(&self, profile: &WeChatProfile) -> Result<RegistrationOutcome, UserApiError>;
        }
    }

    fn user_42(expire_time: i64) -> User {
        User {
            id: 42,
            phone: "13800000042".into(),
            pwd: "hash".into(),
            access_token: "tok42".into(),
            expire_time,
            status: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn daily_login_is_recorded_once() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut store = MockStore::new();
        let mut seen = false;
        store.expect_sismember().with(eq("XPASSPORT:USER:LOGIN_USERS:2024-01-01"), eq("42")).times(2).returning(
            move |_, _| {
                let was_seen = seen;
                seen = true;
                Ok(was_seen)
            },
        );
        store
            .expect_sadd()
            .with(eq("XPASSPORT:USER:LOGIN_USERS:2024-01-01"), eq("42"))
            .times(1)
            .returning(|_, _| Ok(true));
        store
            .expect_expire()
            .with(eq("XPASSPORT:USER:LOGIN_USERS:2024-01-01"), eq(LOGIN_USERS_TTL))
            .times(1)
            .returning(|_, _| Ok(true));
        record_daily_login(&store, 42, date).await.unwrap();
        record_daily_login(&store, 42, date).await.unwrap();
    }

    #[tokio::test]
    async fn daily_login_set_contents() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = MemoryStore::new();
        record_daily_login(&store, 42, date).await.unwrap();
        record_daily_login(&store, 42, date).await.unwrap();
        let key = keys::login_users(date);
        assert!(store.sismember(&key, "42").await.unwrap());
        assert!(!store.sadd(&key, "42").await.unwrap());
        let ttl = store.ttl(&key).await.unwrap();
        assert!(ttl > LOGIN_USERS_TTL - 5 && ttl <= LOGIN_USERS_TTL);
    }

    #[tokio::test]
    async fn user_miss_populates_cache_without_password() {
        let mut db = MockUserDb::new();
        db.expect_fetch_user_by_id().times(1).returning(|_, _| Ok(Some(user_42(1_000))));
        let cache = UserCache::new(db, MemoryStore::new());
        let user = cache.get_user_by_id(42, &Fields::All).await.unwrap();
        assert_eq!(user.id, 42);
        assert!(user.pwd.is_empty());
        let ttl = cache.store().ttl("XPASSPORT:USER:UID:42").await.unwrap();
        assert!(ttl > USER_TTL - 5 && ttl <= USER_TTL);
        // Second read is served from the cache. The mock would panic on a second repository call.
        let phone_only = cache.get_user_by_id(42, &Fields::only(&["phone"])).await.unwrap();
        assert_eq!(phone_only.phone, "13800000042");
        assert_eq!(phone_only.access_token, "");
    }

    #[tokio::test]
    async fn unknown_user_is_not_cached() {
        let mut db = MockUserDb::new();
        db.expect_fetch_user_by_id().returning(|_, _| Ok(None));
        let cache = UserCache::new(db, MemoryStore::new());
        let err = cache.get_user_by_id(7, &Fields::All).await.unwrap_err();
        assert!(matches!(err, UserApiError::UserNotFound));
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_uncached() {
        let mut db = MockUserDb::new();
        db.expect_fetch_user_by_access_token().returning(|_, _, _| Ok(Some(user_42(unix_now() - 10))));
        let cache = UserCache::new(db, MemoryStore::new());
        let err = cache.check_user_access_token("tok42", &Fields::All).await.unwrap_err();
        assert!(matches!(err, UserApiError::TokenInvalid));
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn fresh_token_is_indexed_with_grace() {
        let expire_time = unix_now() + 1000;
        let mut db = MockUserDb::new();
        db.expect_fetch_user_by_access_token()
            .withf(|token, _, scope| token == "tok42" && *scope == UserScope::Active)
            .times(1)
            .returning(move |_, _, _| Ok(Some(user_42(expire_time))));
        db.expect_fetch_user_by_id().times(1).returning(move |_, _| Ok(Some(user_42(expire_time))));
        let cache = UserCache::new(db, MemoryStore::new());
        let user = cache.check_user_access_token("tok42", &Fields::All).await.unwrap();
        assert_eq!(user.id, 42);
        let ttl = cache.store().ttl("XPASSPORT:USER:ACCESS_TOKEN2ID:tok42").await.unwrap();
        assert!(ttl > 1000 + TOKEN_GRACE - 5 && ttl <= 1000 + TOKEN_GRACE, "ttl was {ttl}");
        let again = cache.check_user_access_token("tok42", &Fields::All).await.unwrap();
        assert_eq!(again.id, 42);
        assert!(cache.store().sismember(&keys::login_users(today()), "42").await.unwrap());
    }

    #[tokio::test]
    async fn token_near_expiry_is_extended() {
        let db = MockUserDb::new();
        let mut store = MockStore::new();
        store.expect_get().with(eq("XPASSPORT:USER:ACCESS_TOKEN2ID:tok42")).returning(|_| Ok(Some("42".into())));
        store.expect_ttl().returning(|_| Ok(100));
        store
            .expect_hset_if_exists()
            .withf(|key, field, _| key == "XPASSPORT:USER:UID:42" && field == "expire_time")
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_expire()
            .with(eq("XPASSPORT:USER:ACCESS_TOKEN2ID:tok42"), eq(REFRESH_TTL))
            .times(1)
            .returning(|_, _| Ok(true));
        store
            .expect_hgetall()
            .returning(|_| Ok(HashMap::from([("id".to_string(), "42".to_string())])));
        store.expect_sismember().returning(|_, _| Ok(true));
        let cache = UserCache::new(db, store);
        let user = cache.check_user_access_token("tok42", &Fields::All).await.unwrap();
        assert_eq!(user.id, 42);
    }

    #[tokio::test]
    async fn failed_extension_is_reported() {
        let db = MockUserDb::new();
        let mut store = MockStore::new();
        store.expect_get().returning(|_| Ok(Some("42".into())));
        store.expect_ttl().returning(|_| Ok(100));
        store.expect_hset_if_exists().returning(|_, _, _| Err(CacheError::BackendError("connection reset".into())));
        store.expect_expire().never();
        let cache = UserCache::new(db, store);
        let err = cache.check_user_access_token("tok42", &Fields::All).await.unwrap_err();
        assert!(matches!(err, UserApiError::CacheError(CacheError::BackendError(_))));
    }

    #[tokio::test]
    async fn mis_sessions_rotate() {
        let cache = UserCache::new(MockUserDb::new(), MemoryStore::new());
        assert!(matches!(cache.check_mis_user_access_token("a").await, Err(UserApiError::TokenInvalid)));
        let ttl = cache.start_mis_session(5, "a", false).await.unwrap();
        assert_eq!(ttl, MIS_TOKEN_TTL);
        assert_eq!(cache.check_mis_user_access_token("a").await.unwrap(), 5);
        let ttl = cache.start_mis_session(5, "b", true).await.unwrap();
        assert_eq!(ttl, MIS_TOKEN_TTL + MIS_KEEP_EXTRA);
        assert_eq!(cache.check_mis_user_access_token("b").await.unwrap(), 5);
        assert!(matches!(cache.check_mis_user_access_token("a").await, Err(UserApiError::TokenInvalid)));
    }
}
