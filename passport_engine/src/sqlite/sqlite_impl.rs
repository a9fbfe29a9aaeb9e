//! `SqliteDatabase` is a concrete implementation of a passport backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{brands, new_pool, users, wallets};
use crate::{
    db_types::{
        Brand,
        BrandApp,
        BrandExpire,
        BrandMpExpire,
        BrandUnimini,
        BrandUser,
        Fields,
        MisUser,
        User,
        UserScope,
        UserUpdate,
        UserUpdateCondition,
        Wallet,
        WeChatProfile,
        BRAND_EXPIRE_STATUS_NORMAL,
    },
    traits::{
        data_objects::{BalanceExpression, RecordFilter, RegistrationOutcome},
        BrandApiError,
        BrandManagement,
        PassportDatabase,
        UserApiError,
        UserManagement,
        WalletApiError,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PassportDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("🗃️ Connection pool for {} closed", self.url);
    }
}

impl UserManagement for SqliteDatabase {
    async fn fetch_user_by_id(&self, id: i64, fields: &Fields) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_id(id, fields, &mut conn).await
    }

    async fn fetch_user_by_access_token(
        &self,
        token: &str,
        fields: &Fields,
        scope: UserScope,
    ) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_access_token(token, fields, scope, &mut conn).await
    }

    async fn fetch_user_by_union_id(
        &self,
        union_id: &str,
        fields: &Fields,
        scope: UserScope,
    ) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_union_id(union_id, fields, scope, &mut conn).await
    }

    async fn fetch_user_by_phone(&self, phone: &str, fields: &Fields) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_phone(phone, fields, &mut conn).await
    }

    async fn fetch_user_by_phone_and_password(
        &self,
        phone: &str,
        password_hash: &str,
        fields: &Fields,
    ) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_phone_and_password(phone, password_hash, fields, &mut conn).await
    }

    async fn fetch_mis_user(&self, user_id: i64) -> Result<Option<MisUser>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_mis_user(user_id, &mut conn).await
    }

    async fn is_agent_admin(&self, user_id: i64, agent_id: i64) -> Result<bool, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::is_agent_admin(user_id, agent_id, &mut conn).await
    }

    async fn is_brand_member(&self, user_id: i64, brand_id: i64) -> Result<bool, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::is_brand_member(user_id, brand_id, &mut conn).await
    }

    async fn update_user(&self, condition: UserUpdateCondition, update: UserUpdate) -> Result<u64, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        users::update_user(condition, update, &mut conn).await
    }

    /// The whole lookup-then-write sequence runs in one transaction. If any step fails, the transaction is dropped
    /// without being committed and SQLite rolls it back.
    async fn register_wechat_user(&self, profile: &WeChatProfile) -> Result<RegistrationOutcome, UserApiError> {
        let mut tx = self.pool.begin().await?;
        let outcome = users::register_wechat_user(profile, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Registration for union id {} committed", profile.union_id);
        Ok(outcome)
    }
}

impl BrandManagement for SqliteDatabase {
    async fn fetch_brand(&self, brand_id: i64) -> Result<Option<Brand>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand(brand_id, &mut conn).await
    }

    async fn fetch_brands(&self, brand_ids: &[i64]) -> Result<Vec<Brand>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brands(brand_ids, &mut conn).await
    }

    async fn fetch_brands_created_by(&self, user_id: i64) -> Result<Vec<Brand>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brands_created_by(user_id, &mut conn).await
    }

    async fn fetch_brand_users_for_user(&self, user_id: i64) -> Result<Vec<BrandUser>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_users_for_user(user_id, &mut conn).await
    }

    async fn fetch_brand_user(&self, brand_id: i64, user_id: i64) -> Result<Option<BrandUser>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_user(brand_id, user_id, &mut conn).await
    }

    async fn insert_brand_user(&self, brand_id: i64, user_id: i64) -> Result<BrandUser, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::insert_brand_user(brand_id, user_id, &mut conn).await
    }

    async fn fetch_brand_expire(&self, brand_id: i64) -> Result<Option<BrandExpire>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_expire(brand_id, &mut conn).await
    }

    async fn fetch_brand_expires(&self, brand_ids: &[i64]) -> Result<Vec<BrandExpire>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_expires(brand_ids, &mut conn).await
    }

    async fn fetch_normal_expire_brand_ids(&self) -> Result<Vec<i64>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_ids_with_expire_status(BRAND_EXPIRE_STATUS_NORMAL, &mut conn).await
    }

    async fn fetch_brand_unimini(&self, brand_id: i64) -> Result<Option<BrandUnimini>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_unimini(brand_id, &mut conn).await
    }

    async fn fetch_brand_mp_expire(&self, brand_id: i64) -> Result<Option<BrandMpExpire>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_mp_expire(brand_id, &mut conn).await
    }

    async fn fetch_brand_app(&self, brand_id: i64) -> Result<Option<BrandApp>, BrandApiError> {
        let mut conn = self.pool.acquire().await?;
        brands::fetch_brand_app(brand_id, &mut conn).await
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_wallets(&self, fields: &Fields, filter: &RecordFilter) -> Result<Vec<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallets(fields, filter, None, &mut conn).await
    }

    async fn fetch_wallet(&self, fields: &Fields, filter: &RecordFilter) -> Result<Option<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let wallets = wallets::fetch_wallets(fields, filter, Some(1), &mut conn).await?;
        Ok(wallets.into_iter().next())
    }

    async fn fetch_wallet_by_id(&self, id: i64) -> Result<Option<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::fetch_wallet_by_id(id, &mut conn).await
    }

    async fn apply_balance_expression(&self, id: i64, expr: &BalanceExpression) -> Result<u64, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::apply_balance_expression(id, expr, &mut conn).await
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }
}
