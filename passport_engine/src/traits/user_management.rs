use thiserror::Error;

use crate::{
    db_types::{Fields, MisUser, QueryError, User, UserScope, UserUpdate, UserUpdateCondition, WeChatProfile},
    traits::{data_objects::RegistrationOutcome, CacheError},
};

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),
    #[error("The user does not exist")]
    UserNotFound,
    #[error("The user already exists")]
    UserAlreadyExists,
    #[error("The administrative account does not exist")]
    MisUserNotFound,
    #[error("The access token is invalid or has expired")]
    TokenInvalid,
    #[error("The password is incorrect")]
    PasswordIncorrect,
    #[error("Permission denied. {0}")]
    PermissionDenied(String),
    #[error("The user is not related to brand {0}")]
    UserNotRelatedToBrand(i64),
    #[error("The WeChat user is not registered")]
    WeChatUserNotRegistered,
    #[error("The phone number is already bound to another WeChat user")]
    PhoneBoundToOtherWeChatUser,
    #[error("{0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for UserApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return UserApiError::UserAlreadyExists;
            }
        }
        UserApiError::DatabaseError(e.to_string())
    }
}

impl From<QueryError> for UserApiError {
    fn from(e: QueryError) -> Self {
        UserApiError::ValidationError(e.to_string())
    }
}

/// The `UserManagement` trait defines the repository behaviour for users and the relations that authorize them.
///
/// Every read takes an explicit [`Fields`] selection, and every write an explicit [`UserUpdateCondition`].
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Fetches a live user by id.
    async fn fetch_user_by_id(&self, id: i64, fields: &Fields) -> Result<Option<User>, UserApiError>;

    async fn fetch_user_by_access_token(
        &self,
        token: &str,
        fields: &Fields,
        scope: UserScope,
    ) -> Result<Option<User>, UserApiError>;

    async fn fetch_user_by_union_id(
        &self,
        union_id: &str,
        fields: &Fields,
        scope: UserScope,
    ) -> Result<Option<User>, UserApiError>;

    /// Fetches the live user that owns the phone number.
    async fn fetch_user_by_phone(&self, phone: &str, fields: &Fields) -> Result<Option<User>, UserApiError>;

    /// Fetches the live user with the given phone number and password hash.
    async fn fetch_user_by_phone_and_password(
        &self,
        phone: &str,
        password_hash: &str,
        fields: &Fields,
    ) -> Result<Option<User>, UserApiError>;

    async fn fetch_mis_user(&self, user_id: i64) -> Result<Option<MisUser>, UserApiError>;

    async fn is_agent_admin(&self, user_id: i64, agent_id: i64) -> Result<bool, UserApiError>;

    async fn is_brand_member(&self, user_id: i64, brand_id: i64) -> Result<bool, UserApiError>;

    /// Applies the change set to the row matched by `condition`. Returns the number of rows affected, which is zero
    /// when the guard in the condition did not hold.
    async fn update_user(&self, condition: UserUpdateCondition, update: UserUpdate) -> Result<u64, UserApiError>;

    /// Resolves a user from a WeChat profile in a single atomic transaction:
    /// * an existing user with the union id is returned unchanged,
    /// * otherwise the live phone-only user that owns `profile.phone` gets the union id bound to it,
    /// * otherwise a new user is created.
    ///
    /// If the phone already belongs to a user with a different union id, [`UserApiError::PhoneBoundToOtherWeChatUser`]
    /// is returned and nothing is written.
    async fn register_wechat_user(&self, profile: &WeChatProfile) -> Result<RegistrationOutcome, UserApiError>;
}
