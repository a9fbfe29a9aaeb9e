//! Brands, brand membership and the leases that gate a brand's services.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use passport_common::helpers::unix_now;

use crate::{
    db_types::{
        Brand,
        BrandApp,
        BrandExpire,
        BrandFullInfo,
        BrandLeaseInfo,
        BrandMpExpire,
        BrandUnimini,
        BrandUser,
    },
    traits::{BrandApiError, BrandManagement},
};

pub struct BrandApi<B> {
    db: B,
}

impl<B: Debug> Debug for BrandApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BrandApi ({:?})", self.db)
    }
}

impl<B> BrandApi<B>
where B: BrandManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn get_brand_by_id(&self, brand_id: i64) -> Result<Brand, BrandApiError> {
        self.db.fetch_brand(brand_id).await?.ok_or(BrandApiError::BrandNotFound(brand_id))
    }

    pub async fn get_brand_users_by_user_id(&self, user_id: i64) -> Result<Vec<BrandUser>, BrandApiError> {
        self.db.fetch_brand_users_for_user(user_id).await
    }

    pub async fn batch_get_brands_by_ids(&self, brand_ids: &[i64]) -> Result<Vec<Brand>, BrandApiError> {
        if brand_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.db.fetch_brands(brand_ids).await
    }

    pub async fn get_brand_expire_by_brand_id(&self, brand_id: i64) -> Result<BrandExpire, BrandApiError> {
        self.db
            .fetch_brand_expire(brand_id)
            .await?
            .ok_or_else(|| BrandApiError::DataNotFound(format!("No lease record for brand {brand_id}")))
    }

    pub async fn batch_get_brand_expires(&self, brand_ids: &[i64]) -> Result<Vec<BrandExpire>, BrandApiError> {
        if brand_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.db.fetch_brand_expires(brand_ids).await
    }

    /// Every brand the user is a member of, each with its lease record when one exists.
    pub async fn get_brand_base_and_lease_info_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Vec<BrandLeaseInfo>, BrandApiError> {
        let memberships = self.get_brand_users_by_user_id(user_id).await?;
        let brand_ids = memberships.iter().map(|m| m.brand_id).collect::<Vec<_>>();
        let brands = self.batch_get_brands_by_ids(&brand_ids).await?;
        let mut expires = self
            .batch_get_brand_expires(&brand_ids)
            .await?
            .into_iter()
            .map(|e| (e.brand_id, e))
            .collect::<HashMap<_, _>>();
        trace!("Found {} brands for user {user_id}", brands.len());
        let info = brands
            .into_iter()
            .map(|brand| {
                let expire = expires.remove(&brand.id);
                BrandLeaseInfo { brand, expire }
            })
            .collect();
        Ok(info)
    }

    /// The live brands created by the user.
    pub async fn get_create_valid_brands_by_user_id(&self, user_id: i64) -> Result<Vec<Brand>, BrandApiError> {
        self.db.fetch_brands_created_by(user_id).await
    }

    pub async fn get_all_normal_expire_brand_ids(&self) -> Result<Vec<i64>, BrandApiError> {
        self.db.fetch_normal_expire_brand_ids().await
    }

    pub async fn check_c_user_brand_relation(&self, brand_id: i64, user_id: i64) -> Result<bool, BrandApiError> {
        Ok(self.db.fetch_brand_user(brand_id, user_id).await?.is_some())
    }

    /// Relates the user to the brand. Calling this for an existing relation returns the relation unchanged.
    pub async fn add_brand_user_relation(&self, brand_id: i64, user_id: i64) -> Result<BrandUser, BrandApiError> {
        let relation = self.db.insert_brand_user(brand_id, user_id).await?;
        debug!("🗃️ User {user_id} is related to brand {brand_id}");
        Ok(relation)
    }

    pub async fn get_unimini_expire_by_brand_id(&self, brand_id: i64) -> Result<BrandUnimini, BrandApiError> {
        self.db.fetch_brand_unimini(brand_id).await?.ok_or(BrandApiError::UniminiNotOpen(brand_id))
    }

    /// Succeeds if both the brand lease and the brand's unimini service are current.
    pub async fn check_unimini_expire(&self, brand_id: i64) -> Result<(), BrandApiError> {
        let now = unix_now();
        let lease = self.db.fetch_brand_expire(brand_id).await?.ok_or(BrandApiError::BrandNotFound(brand_id))?;
        if lease.expire_time < now {
            return Err(BrandApiError::BrandExpired(brand_id));
        }
        let unimini = self.get_unimini_expire_by_brand_id(brand_id).await?;
        if unimini.expire_time < now {
            return Err(BrandApiError::UniminiExpired(brand_id));
        }
        Ok(())
    }

    pub async fn get_brand_full_info(&self, brand_id: i64) -> Result<BrandFullInfo, BrandApiError> {
        let brand = self.get_brand_by_id(brand_id).await?;
        let expire = self.db.fetch_brand_expire(brand_id).await?;
        let unimini = self.db.fetch_brand_unimini(brand_id).await?;
        let mp_expire = self.db.fetch_brand_mp_expire(brand_id).await?;
        let app = self.db.fetch_brand_app(brand_id).await?;
        Ok(BrandFullInfo { brand, expire, unimini, mp_expire, app })
    }

    pub async fn get_brand_mp_expire_by_brand_id(&self, brand_id: i64) -> Result<BrandMpExpire, BrandApiError> {
        self.db
            .fetch_brand_mp_expire(brand_id)
            .await?
            .ok_or_else(|| BrandApiError::DataNotFound(format!("No mini program lease for brand {brand_id}")))
    }

    pub async fn get_brand_app_by_brand_id(&self, brand_id: i64) -> Result<BrandApp, BrandApiError> {
        self.db
            .fetch_brand_app(brand_id)
            .await?
            .ok_or_else(|| BrandApiError::DataNotFound(format!("No mini program for brand {brand_id}")))
    }

    /// Succeeds if the brand's mini program is authorized and can take payments.
    pub async fn check_brand_app_ready(&self, brand_id: i64) -> Result<BrandApp, BrandApiError> {
        let app = self.db.fetch_brand_app(brand_id).await?.ok_or(BrandApiError::MiniProgramUnauthorized(brand_id))?;
        if !app.authed {
            return Err(BrandApiError::MiniProgramUnauthorized(brand_id));
        }
        if !app.pay_authed {
            return Err(BrandApiError::MiniProgramNotOpenPay(brand_id));
        }
        Ok(app)
    }
}
