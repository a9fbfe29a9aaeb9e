use passport_engine::{db_types::User, SqliteDatabase};

pub async fn insert_user(db: &SqliteDatabase, user: &User) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (phone, pwd, unionid, nickname, avatar_url, access_token, expire_time, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&user.phone)
    .bind(&user.pwd)
    .bind(&user.union_id)
    .bind(&user.nickname)
    .bind(&user.avatar_url)
    .bind(&user.access_token)
    .bind(user.expire_time)
    .bind(user.status)
    .fetch_all(db.pool())
    .await
    .expect("Error inserting user")[0]
}

pub async fn count_users(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(db.pool()).await.expect("Error counting users")
}

pub async fn exec(db: &SqliteDatabase, sql: &str) {
    sqlx::query(sql).execute(db.pool()).await.expect("Error seeding data");
}
