use thiserror::Error;

use crate::db_types::{Brand, BrandApp, BrandExpire, BrandMpExpire, BrandUnimini, BrandUser};

#[derive(Debug, Clone, Error)]
pub enum BrandApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Brand {0} does not exist")]
    BrandNotFound(i64),
    #[error("The lease for brand {0} has expired")]
    BrandExpired(i64),
    #[error("The unimini service is not open for brand {0}")]
    UniminiNotOpen(i64),
    #[error("The unimini service for brand {0} has expired")]
    UniminiExpired(i64),
    #[error("The mini program of brand {0} is not authorized")]
    MiniProgramUnauthorized(i64),
    #[error("Payments are not open for the mini program of brand {0}")]
    MiniProgramNotOpenPay(i64),
    #[error("The requested data was not found. {0}")]
    DataNotFound(String),
}

impl From<sqlx::Error> for BrandApiError {
    fn from(e: sqlx::Error) -> Self {
        BrandApiError::DatabaseError(e.to_string())
    }
}

/// The `BrandManagement` trait defines the repository behaviour for brands, their memberships and their lease
/// records.
#[allow(async_fn_in_trait)]
pub trait BrandManagement {
    async fn fetch_brand(&self, brand_id: i64) -> Result<Option<Brand>, BrandApiError>;

    /// Fetches the brands with the given ids. Unknown ids are skipped.
    async fn fetch_brands(&self, brand_ids: &[i64]) -> Result<Vec<Brand>, BrandApiError>;

    /// Fetches the live brands created by the user.
    async fn fetch_brands_created_by(&self, user_id: i64) -> Result<Vec<Brand>, BrandApiError>;

    async fn fetch_brand_users_for_user(&self, user_id: i64) -> Result<Vec<BrandUser>, BrandApiError>;

    async fn fetch_brand_user(&self, brand_id: i64, user_id: i64) -> Result<Option<BrandUser>, BrandApiError>;

    /// Relates the user to the brand. This call is idempotent and returns the relation.
    async fn insert_brand_user(&self, brand_id: i64, user_id: i64) -> Result<BrandUser, BrandApiError>;

    async fn fetch_brand_expire(&self, brand_id: i64) -> Result<Option<BrandExpire>, BrandApiError>;

    async fn fetch_brand_expires(&self, brand_ids: &[i64]) -> Result<Vec<BrandExpire>, BrandApiError>;

    /// The ids of all brands whose lease is in the normal state.
    async fn fetch_normal_expire_brand_ids(&self) -> Result<Vec<i64>, BrandApiError>;

    async fn fetch_brand_unimini(&self, brand_id: i64) -> Result<Option<BrandUnimini>, BrandApiError>;

    async fn fetch_brand_mp_expire(&self, brand_id: i64) -> Result<Option<BrandMpExpire>, BrandApiError>;

    async fn fetch_brand_app(&self, brand_id: i64) -> Result<Option<BrandApp>, BrandApiError>;
}
