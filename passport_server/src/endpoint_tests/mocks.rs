use mockall::mock;
use passport_engine::{
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
    },
    traits::{
        BalanceExpression,
        BrandApiError,
        BrandManagement,
        RecordFilter,
        RegistrationOutcome,
        UserApiError,
        UserManagement,
        WalletApiError,
        WalletManagement,
    },
};

mock! {
    pub UserManager {}
    impl UserManagement for UserManager {
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

mock! {
    pub BrandManager {}
    impl BrandManagement for BrandManager {
        async fn fetch_brand(&self, brand_id: i64) -> Result<Option<Brand>, BrandApiError>;
        async fn fetch_brands(&self, brand_ids: &[i64]) -> Result<Vec<Brand>, BrandApiError>;
        async fn fetch_brands_created_by(&self, user_id: i64) -> Result<Vec<Brand>, BrandApiError>;
        async fn fetch_brand_users_for_user(&self, user_id: i64) -> Result<Vec<BrandUser>, BrandApiError>;
        async fn fetch_brand_user(&self, brand_id: i64, user_id: i64) -> Result<Option<BrandUser>, BrandApiError>;
        async fn insert_brand_user(&self, brand_id: i64, user_id: i64) -> Result<BrandUser, BrandApiError>;
        async fn fetch_brand_expire(&self, brand_id: i64) -> Result<Option<BrandExpire>, BrandApiError>;
        async fn fetch_brand_expires(&self, brand_ids: &[i64]) -> Result<Vec<BrandExpire>, BrandApiError>;
        async fn fetch_normal_expire_brand_ids(&self) -> Result<Vec<i64>, BrandApiError>;
        async fn fetch_brand_unimini(&self, brand_id: i64) -> Result<Option<BrandUnimini>, BrandApiError>;
        async fn fetch_brand_mp_expire(&self, brand_id: i64) -> Result<Option<BrandMpExpire>, BrandApiError>;
        async fn fetch_brand_app(&self, brand_id: i64) -> Result<Option<BrandApp>, BrandApiError>;
    }
}

mock! {
    pub WalletManager {}
    impl WalletManagement for WalletManager {
        async fn fetch_wallets(&self, fields: &Fields, filter: &RecordFilter) -> Result<Vec<Wallet>, WalletApiError>;
        async fn fetch_wallet(&self, fields: &Fields, filter: &RecordFilter) -> Result<Option<Wallet>, WalletApiError>;
        async fn fetch_wallet_by_id(&self, id: i64) -> Result<Option<Wallet>, WalletApiError>;
        async fn apply_balance_expression(&self, id: i64, expr: &BalanceExpression) -> Result<u64, WalletApiError>;
    }
}
