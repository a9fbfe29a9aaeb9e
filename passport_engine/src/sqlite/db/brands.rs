use log::*;
use passport_common::helpers::unix_now;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Brand, BrandApp, BrandExpire, BrandMpExpire, BrandUnimini, BrandUser, RecordStatus},
    traits::BrandApiError,
};

pub async fn fetch_brand(brand_id: i64, conn: &mut SqliteConnection) -> Result<Option<Brand>, BrandApiError> {
    let brand = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
        .bind(brand_id)
        .fetch_optional(conn)
        .await?;
    Ok(brand)
}

pub async fn fetch_brands(brand_ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Brand>, BrandApiError> {
    if brand_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM brands WHERE id IN (");
    let mut ids = builder.separated(", ");
    for id in brand_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY id");
    let brands = builder.build_query_as::<Brand>().fetch_all(conn).await?;
    Ok(brands)
}

pub async fn fetch_brands_created_by(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Brand>, BrandApiError> {
    let brands =
        sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE create_user_id = $1 AND status <> $2 ORDER BY id")
            .bind(user_id)
            .bind(RecordStatus::Deleted.value())
            .fetch_all(conn)
            .await?;
    Ok(brands)
}

pub async fn fetch_brand_users_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<BrandUser>, BrandApiError> {
    let relations =
        sqlx::query_as::<_, BrandUser>("SELECT * FROM brand_users WHERE user_id = $1 AND status = $2 ORDER BY id")
            .bind(user_id)
            .bind(RecordStatus::Ok.value())
            .fetch_all(conn)
            .await?;
    Ok(relations)
}

pub async fn fetch_brand_user(
    brand_id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<BrandUser>, BrandApiError> {
    let relation = sqlx::query_as::<_, BrandUser>(
        "SELECT * FROM brand_users WHERE brand_id = $1 AND user_id = $2 AND status = $3",
    )
    .bind(brand_id)
    .bind(user_id)
    .bind(RecordStatus::Ok.value())
    .fetch_optional(conn)
    .await?;
    Ok(relation)
}

/// Relates the user to the brand, reviving a deleted relation if there is one.
pub async fn insert_brand_user(
    brand_id: i64,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<BrandUser, BrandApiError> {
    let relation = sqlx::query_as::<_, BrandUser>(
        r#"
        INSERT INTO brand_users (brand_id, user_id, status, create_time) VALUES ($1, $2, $3, $4)
        ON CONFLICT (brand_id, user_id) DO UPDATE SET status = excluded.status
        RETURNING *"#,
    )
    .bind(brand_id)
    .bind(user_id)
    .bind(RecordStatus::Ok.value())
    .bind(unix_now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User #{user_id} is related to brand #{brand_id}");
    Ok(relation)
}

pub async fn fetch_brand_expire(
    brand_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<BrandExpire>, BrandApiError> {
    let expire = sqlx::query_as::<_, BrandExpire>("SELECT * FROM brand_expires WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_optional(conn)
        .await?;
    Ok(expire)
}

pub async fn fetch_brand_expires(
    brand_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<BrandExpire>, BrandApiError> {
    if brand_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM brand_expires WHERE brand_id IN (");
    let mut ids = builder.separated(", ");
    for id in brand_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY brand_id");
    let expires = builder.build_query_as::<BrandExpire>().fetch_all(conn).await?;
    Ok(expires)
}

pub async fn fetch_brand_ids_with_expire_status(
    status: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, BrandApiError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT brand_id FROM brand_expires WHERE status = $1 ORDER BY brand_id")
        .bind(status)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

pub async fn fetch_brand_unimini(
    brand_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<BrandUnimini>, BrandApiError> {
    let unimini = sqlx::query_as::<_, BrandUnimini>("SELECT * FROM brand_uniminis WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_optional(conn)
        .await?;
    Ok(unimini)
}

pub async fn fetch_brand_mp_expire(
    brand_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<BrandMpExpire>, BrandApiError> {
    let expire = sqlx::query_as::<_, BrandMpExpire>("SELECT * FROM brand_mp_expires WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_optional(conn)
        .await?;
    Ok(expire)
}

pub async fn fetch_brand_app(brand_id: i64, conn: &mut SqliteConnection) -> Result<Option<BrandApp>, BrandApiError> {
    let app = sqlx::query_as::<_, BrandApp>("SELECT * FROM brand_apps WHERE brand_id = $1")
        .bind(brand_id)
        .fetch_optional(conn)
        .await?;
    Ok(app)
}
