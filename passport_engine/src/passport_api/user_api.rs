//! Login, token checks and WeChat account binding for end users and administrators.
use std::fmt::Debug;

use log::*;
use passport_common::helpers::unix_now;

use crate::{
    cache::UserCache,
    db_types::{Fields, User, UserScope, UserUpdate, UserUpdateCondition, WeChatProfile},
    helpers::{do_cache_op_with_retry, generate_access_token, hash_password, RetryPolicy},
    passport_api::user_objects::{login_user_fields, mis_user_fields, MisLoginResult, UserPhone, WxLoginResult},
    traits::{CacheError, KeyValueStore, UserApiError, UserManagement},
};

/// Lifetime of a token issued by a WeChat H5 login.
pub const WX_H5_TOKEN_TTL: i64 = 30 * 24 * 3600;

/// `UserApi` is the usecase layer for users. It owns the [`UserCache`] that keeps the repository and the key-value
/// store consistent, and retries cache invalidation according to its [`RetryPolicy`].
pub struct UserApi<B, C> {
    cache: UserCache<B, C>,
    retry: RetryPolicy,
    oss_domains: Vec<String>,
}

impl<B: Debug, C: Debug> Debug for UserApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi ({:?})", self.cache)
    }
}

impl<B, C> UserApi<B, C>
where
    B: UserManagement,
    C: KeyValueStore,
{
    pub fn new(db: B, store: C) -> Self {
        Self { cache: UserCache::new(db, store), retry: RetryPolicy::default(), oss_domains: Vec::new() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Avatars hosted on these domains were uploaded by the user and are never replaced by the WeChat head image.
    pub fn with_oss_domains(mut self, domains: Vec<String>) -> Self {
        self.oss_domains = domains;
        self
    }

    pub fn db(&self) -> &B {
        self.cache.db()
    }

    pub fn cache(&self) -> &UserCache<B, C> {
        &self.cache
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<User, UserApiError> {
        self.cache.get_user_by_id(id, &Fields::All).await
    }

    pub async fn check_b_user_login(&self, token: &str) -> Result<User, UserApiError> {
        self.cache.check_user_access_token(token, &login_user_fields()).await
    }

    /// Checks the token and, when `brand_id` is non-zero, that the user belongs to the brand.
    pub async fn check_c_user_login(&self, token: &str, brand_id: i64) -> Result<User, UserApiError> {
        let user = self.cache.check_user_access_token(token, &login_user_fields()).await?;
        if brand_id != 0 && !self.db().is_brand_member(user.id, brand_id).await? {
            return Err(UserApiError::UserNotRelatedToBrand(brand_id));
        }
        Ok(user)
    }

    pub async fn check_b_user_agent_login(&self, token: &str, agent_id: i64) -> Result<User, UserApiError> {
        let user = self.check_b_user_login(token).await?;
        if !self.db().is_agent_admin(user.id, agent_id).await? {
            let reason = format!("User {} is not an administrator of agent {agent_id}", user.id);
            return Err(UserApiError::PermissionDenied(reason));
        }
        Ok(user)
    }

    pub async fn check_mis_user_login(&self, token: &str) -> Result<User, UserApiError> {
        let user_id = self.cache.check_mis_user_access_token(token).await?;
        let user = self.cache.get_user_by_id(user_id, &mis_user_fields()).await?;
        self.db().fetch_mis_user(user.id).await?.ok_or(UserApiError::MisUserNotFound)?;
        Ok(user)
    }

    /// Removes the token from the cache index. The token itself stays valid in the repository until it expires.
    pub async fn b_logout(&self, token: &str) -> Result<(), UserApiError> {
        self.del_access_token(token.to_string()).await?;
        debug!("🔐️ Access token logged out");
        Ok(())
    }

    /// Validates the token and drops the user's cached entry so that the next read picks up fresh data.
    pub async fn b_set_login_info(&self, token: &str) -> Result<User, UserApiError> {
        let user = self.check_b_user_login(token).await?;
        self.evict_user(user.id).await;
        Ok(user)
    }

    pub async fn mis_login(&self, phone: &str, password: &str, keep: bool) -> Result<MisLoginResult, UserApiError> {
        let fields = Fields::only(&["id", "name", "real_name", "avatar_url"]);
        let user = self
            .db()
            .fetch_user_by_phone_and_password(phone, &hash_password(password), &fields)
            .await?
            .ok_or(UserApiError::PasswordIncorrect)?;
        self.db().fetch_mis_user(user.id).await?.ok_or(UserApiError::MisUserNotFound)?;
        let access_token = generate_access_token();
        let ttl = self.cache.start_mis_session(user.id, &access_token, keep).await?;
        info!("🔐️ Administrator {} logged in", user.id);
        Ok(MisLoginResult {
            user_id: user.id,
            access_token,
            name: user.name,
            real_name: user.real_name,
            avatar_url: user.avatar_url,
            expire_time: unix_now() + ttl,
        })
    }

    /// Logs a registered WeChat user in. A new token is issued when the stored one has expired, and the profile's
    /// head image and nickname are copied onto the user.
    pub async fn login_wx_h5(&self, profile: &WeChatProfile) -> Result<WxLoginResult, UserApiError> {
        let user = self
            .db()
            .fetch_user_by_union_id(&profile.union_id, &Fields::All, UserScope::Active)
            .await?
            .ok_or(UserApiError::WeChatUserNotRegistered)?;
        let now = unix_now();
        let mut update = UserUpdate { last_login_time: Some(now), increment_login_times: true, ..Default::default() };
        let mut result = WxLoginResult {
            user_id: user.id,
            access_token: user.access_token.clone(),
            expire_time: user.expire_time,
            phone: user.phone.clone(),
            nickname: user.nickname.clone(),
            headimgurl: user.headimgurl.clone(),
            avatar_url: user.avatar_url.clone(),
        };
        let mut stale_token = None;
        if user.expire_time < now {
            result.access_token = generate_access_token();
            result.expire_time = now + WX_H5_TOKEN_TTL;
            update.access_token = Some(result.access_token.clone());
            update.expire_time = Some(result.expire_time);
            stale_token = Some(user.access_token.clone()).filter(|t| !t.is_empty());
        }
        if !profile.headimgurl.is_empty() {
            result.headimgurl = profile.headimgurl.clone();
            update.headimgurl = Some(profile.headimgurl.clone());
            if !self.is_uploaded_avatar(&user.avatar_url) {
                result.avatar_url = profile.headimgurl.clone();
                update.avatar_url = Some(profile.headimgurl.clone());
            }
        }
        if !profile.nickname.is_empty() {
            result.nickname = profile.nickname.clone();
            update.nickname = Some(profile.nickname.clone());
        }
        self.db().update_user(UserUpdateCondition::by_id(user.id), update).await?;
        if let Some(token) = stale_token {
            if let Err(e) = self.del_access_token(token).await {
                error!("🧠️ Could not remove the expired token of user {} from the cache. {e}", user.id);
            }
        }
        self.evict_user(user.id).await;
        info!("🔐️ WeChat user {} logged in", user.id);
        Ok(result)
    }

    pub async fn get_user_by_union_id(&self, union_id: &str) -> Result<UserPhone, UserApiError> {
        let fields = Fields::only(&["id", "phone"]);
        let user = self.db().fetch_user_by_union_id(union_id, &fields, UserScope::Active).await?;
        user.map(UserPhone::from).ok_or(UserApiError::UserNotFound)
    }

    /// Resolves (registering if necessary) the user for a WeChat profile. See
    /// [`UserManagement::register_wechat_user`] for the rules.
    pub async fn register_c_user_by_wechat_user(&self, profile: &WeChatProfile) -> Result<User, UserApiError> {
        let outcome = self.db().register_wechat_user(profile).await?;
        if let Some(user_id) = outcome.stale_user_id() {
            self.evict_user(user_id).await;
        }
        Ok(outcome.into_user())
    }

    /// Binds `phone` to the WeChat user. Users that already have a phone number are left as they are.
    pub async fn bind_phone_for_wechat_c_user(&self, union_id: &str, phone: &str) -> Result<(), UserApiError> {
        let user = self.bindable_user(union_id, phone).await?;
        let condition = UserUpdateCondition::by_id(user.id).without_phone().not_deleted();
        let rows = self.db().update_user(condition, UserUpdate::default().with_phone(phone)).await?;
        debug!("🔐️ Bound phone to user {}. {rows} rows affected", user.id);
        self.evict_user(user.id).await;
        Ok(())
    }

    /// Like [`Self::bind_phone_for_wechat_c_user`], but also fills in the name, sex, birthday and signature.
    pub async fn bind_additional_info_for_wechat_c_user(&self, profile: &WeChatProfile) -> Result<(), UserApiError> {
        let user = self.bindable_user(&profile.union_id, &profile.phone).await?;
        let update = UserUpdate {
            phone: Some(profile.phone.clone()).filter(|p| !p.is_empty()),
            name: Some(profile.name.clone()),
            sex: Some(profile.sex),
            birthday: Some(profile.birthday),
            person_signature: Some(profile.person_signature.clone()),
            ..Default::default()
        };
        let condition = UserUpdateCondition::by_id(user.id).without_phone().not_deleted();
        let rows = self.db().update_user(condition, update).await?;
        debug!("🔐️ Bound additional info to user {}. {rows} rows affected", user.id);
        self.evict_user(user.id).await;
        Ok(())
    }

    /// Detaches the WeChat account from the user holding the token and expires the token. An unknown token is a
    /// no-op. Cache failures are returned so that the client can retry.
    pub async fn unbind_wechat_c_user(&self, token: &str) -> Result<(), UserApiError> {
        if token.is_empty() {
            return Err(UserApiError::TokenInvalid);
        }
        let fields = Fields::only(&["id"]);
        let Some(user) = self.db().fetch_user_by_access_token(token, &fields, UserScope::Any).await? else {
            debug!("🔐️ Nothing to unbind for the presented token");
            return Ok(());
        };
        let update = UserUpdate::default().with_union_id(None).with_expire_time(unix_now() - 10);
        self.db().update_user(UserUpdateCondition::by_id(user.id), update).await?;
        let (_, result) = do_cache_op_with_retry(&self.retry, user.id, |id| self.cache.evict_user(id)).await;
        result?;
        self.del_access_token(token.to_string()).await?;
        info!("🔐️ Unbound WeChat account from user {}", user.id);
        Ok(())
    }

    pub async fn get_user_by_access_token(&self, token: &str) -> Result<User, UserApiError> {
        let user = self.db().fetch_user_by_access_token(token, &Fields::All, UserScope::Active).await?;
        user.ok_or(UserApiError::UserNotFound)
    }

    pub async fn get_user_by_phone(&self, phone: &str) -> Result<User, UserApiError> {
        self.db().fetch_user_by_phone(phone, &Fields::All).await?.ok_or(UserApiError::UserNotFound)
    }

    /// The user a phone number may be bound to: it must exist, and no other live user may hold the phone.
    async fn bindable_user(&self, union_id: &str, phone: &str) -> Result<User, UserApiError> {
        let fields = Fields::only(&["id", "unionid", "phone"]);
        let user = self.db().fetch_user_by_union_id(union_id, &fields, UserScope::Any).await?;
        let user = user.ok_or(UserApiError::UserNotFound)?;
        if !phone.is_empty() {
            if let Some(holder) = self.db().fetch_user_by_phone(phone, &Fields::only(&["id"])).await? {
                if holder.id != user.id {
                    return Err(UserApiError::PhoneBoundToOtherWeChatUser);
                }
            }
        }
        Ok(user)
    }

    fn is_uploaded_avatar(&self, avatar_url: &str) -> bool {
        !avatar_url.is_empty() && self.oss_domains.iter().any(|d| !d.is_empty() && avatar_url.contains(d.as_str()))
    }

    async fn del_access_token(&self, token: String) -> Result<(), CacheError> {
        let (_, result) = do_cache_op_with_retry(&self.retry, token, |t| self.cache.del_access_token(t)).await;
        result
    }

    /// Best-effort eviction after a committed write. Exhausting the retries is logged, not returned.
    async fn evict_user(&self, user_id: i64) {
        let (attempts, result) = do_cache_op_with_retry(&self.retry, user_id, |id| self.cache.evict_user(id)).await;
        if let Err(e) = result {
            error!("🧠️ Could not evict user {user_id} from the cache after {attempts} attempts. {e}");
        }
    }
}
