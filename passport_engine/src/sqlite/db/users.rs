use log::*;
use passport_common::helpers::unix_now;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        Fields,
        MisUser,
        RecordStatus,
        User,
        UserScope,
        UserUpdate,
        UserUpdateCondition,
        WeChatProfile,
        USER_COLUMNS,
    },
    traits::{data_objects::RegistrationOutcome, UserApiError},
};

fn select_users<'a>(fields: &Fields) -> Result<QueryBuilder<'a, Sqlite>, UserApiError> {
    let columns = fields.select_list(&USER_COLUMNS)?;
    Ok(QueryBuilder::new(format!("SELECT {columns} FROM users WHERE ")))
}

async fn fetch_one_user(
    mut builder: QueryBuilder<'_, Sqlite>,
    scope: UserScope,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    if scope == UserScope::Active {
        builder.push(" AND status = ").push_bind(RecordStatus::Ok.value());
    }
    builder.push(" ORDER BY id LIMIT 1");
    let user = builder.build_query_as::<User>().fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_id(
    id: i64,
    fields: &Fields,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    let mut builder = select_users(fields)?;
    builder.push("id = ").push_bind(id);
    fetch_one_user(builder, UserScope::Active, conn).await
}

pub async fn fetch_user_by_access_token(
    token: &str,
    fields: &Fields,
    scope: UserScope,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    if token.is_empty() {
        return Ok(None);
    }
    let mut builder = select_users(fields)?;
    builder.push("access_token = ").push_bind(token.to_string());
    fetch_one_user(builder, scope, conn).await
}

pub async fn fetch_user_by_union_id(
    union_id: &str,
    fields: &Fields,
    scope: UserScope,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    if union_id.is_empty() {
        return Ok(None);
    }
    let mut builder = select_users(fields)?;
    builder.push("unionid = ").push_bind(union_id.to_string());
    fetch_one_user(builder, scope, conn).await
}

pub async fn fetch_user_by_phone(
    phone: &str,
    fields: &Fields,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    if phone.is_empty() {
        return Ok(None);
    }
    let mut builder = select_users(fields)?;
    builder.push("phone = ").push_bind(phone.to_string());
    fetch_one_user(builder, UserScope::Active, conn).await
}

pub async fn fetch_user_by_phone_and_password(
    phone: &str,
    password_hash: &str,
    fields: &Fields,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, UserApiError> {
    if phone.is_empty() {
        return Ok(None);
    }
    let mut builder = select_users(fields)?;
    builder.push("phone = ").push_bind(phone.to_string()).push(" AND pwd = ").push_bind(password_hash.to_string());
    fetch_one_user(builder, UserScope::Active, conn).await
}

pub async fn fetch_mis_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<MisUser>, UserApiError> {
    let mis_user = sqlx::query_as::<_, MisUser>("SELECT * FROM mis_users WHERE user_id = $1 AND status = $2")
        .bind(user_id)
        .bind(RecordStatus::Ok.value())
        .fetch_optional(conn)
        .await?;
    Ok(mis_user)
}

pub async fn is_agent_admin(user_id: i64, agent_id: i64, conn: &mut SqliteConnection) -> Result<bool, UserApiError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM agent_admins WHERE user_id = $1 AND agent_id = $2 AND status = $3",
    )
    .bind(user_id)
    .bind(agent_id)
    .bind(RecordStatus::Ok.value())
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn is_brand_member(user_id: i64, brand_id: i64, conn: &mut SqliteConnection) -> Result<bool, UserApiError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM brand_users WHERE user_id = $1 AND brand_id = $2 AND status = $3",
    )
    .bind(user_id)
    .bind(brand_id)
    .bind(RecordStatus::Ok.value())
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

/// Writes the change set to the row identified by the condition. `update_time` is always refreshed.
pub async fn update_user(
    condition: UserUpdateCondition,
    update: UserUpdate,
    conn: &mut SqliteConnection,
) -> Result<u64, UserApiError> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET update_time = ");
    builder.push_bind(unix_now());
    if let Some(phone) = update.phone {
        builder.push(", phone = ").push_bind(phone);
    }
    match update.union_id {
        Some(Some(union_id)) => {
            builder.push(", unionid = ").push_bind(union_id);
        },
        Some(None) => {
            builder.push(", unionid = NULL");
        },
        None => {},
    }
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(nickname) = update.nickname {
        builder.push(", nickname = ").push_bind(nickname);
    }
    if let Some(url) = update.headimgurl {
        builder.push(", headimgurl = ").push_bind(url);
    }
    if let Some(url) = update.avatar_url {
        builder.push(", avatar_url = ").push_bind(url);
    }
    if let Some(sex) = update.sex {
        builder.push(", sex = ").push_bind(sex);
    }
    if let Some(birthday) = update.birthday {
        builder.push(", birthday = ").push_bind(birthday);
    }
    if let Some(signature) = update.person_signature {
        builder.push(", person_signature = ").push_bind(signature);
    }
    if let Some(token) = update.access_token {
        builder.push(", access_token = ").push_bind(token);
    }
    if let Some(expire_time) = update.expire_time {
        builder.push(", expire_time = ").push_bind(expire_time);
    }
    if let Some(t) = update.last_login_time {
        builder.push(", last_login_time = ").push_bind(t);
    }
    if update.increment_login_times {
        builder.push(", login_times = login_times + 1");
    }
    builder.push(" WHERE id = ").push_bind(condition.id);
    if condition.require_empty_union_id {
        builder.push(" AND (unionid IS NULL OR unionid = '')");
    }
    if condition.require_empty_phone {
        builder.push(" AND phone = ''");
    }
    if condition.exclude_deleted {
        builder.push(" AND status <> ").push_bind(RecordStatus::Deleted.value());
    }
    let rows = builder.build().execute(conn).await?.rows_affected();
    trace!("🗃️ Updated user #{}: {rows} rows affected", condition.id);
    Ok(rows)
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Creates a user from a WeChat profile. Empty `name` and `real_name` take the nickname and an empty `avatar_url`
/// takes the WeChat head image.
pub async fn insert_user(profile: &WeChatProfile, conn: &mut SqliteConnection) -> Result<User, UserApiError> {
    let now = unix_now();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            unionid, phone, nickname, name, real_name, headimgurl, avatar_url, sex, status, create_time, update_time
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *"#,
    )
    .bind(&profile.union_id)
    .bind(&profile.phone)
    .bind(&profile.nickname)
    .bind(or_fallback(&profile.name, &profile.nickname))
    .bind(or_fallback(&profile.real_name, &profile.nickname))
    .bind(&profile.headimgurl)
    .bind(or_fallback(&profile.avatar_url, &profile.headimgurl))
    .bind(profile.sex)
    .bind(RecordStatus::Ok.value())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Created user #{} for union id {}", user.id, profile.union_id);
    Ok(user)
}

/// Resolves a user from a WeChat profile. This is not atomic on its own: run it inside a transaction and pass
/// `&mut tx` as the connection.
pub async fn register_wechat_user(
    profile: &WeChatProfile,
    conn: &mut SqliteConnection,
) -> Result<RegistrationOutcome, UserApiError> {
    if let Some(user) = fetch_user_by_union_id(&profile.union_id, &Fields::All, UserScope::Active, conn).await? {
        trace!("🗃️ Union id {} already belongs to user #{}", profile.union_id, user.id);
        return Ok(RegistrationOutcome::Existing(user));
    }
    if let Some(phone_user) = fetch_user_by_phone(&profile.phone, &Fields::All, conn).await? {
        if phone_user.has_union_id() {
            debug!(
                "🗃️ Phone of user #{} is already bound to another union id. Refusing to bind {}",
                phone_user.id, profile.union_id
            );
            return Err(UserApiError::PhoneBoundToOtherWeChatUser);
        }
        let mut update = UserUpdate::default().with_union_id(Some(profile.union_id.clone()));
        if !profile.nickname.is_empty() {
            update = update.with_nickname(profile.nickname.as_str());
        }
        if !profile.headimgurl.is_empty() {
            update = update.with_headimgurl(profile.headimgurl.as_str());
        }
        let condition = UserUpdateCondition::by_id(phone_user.id).without_union_id();
        if update_user(condition, update, conn).await? == 0 {
            return Err(UserApiError::PhoneBoundToOtherWeChatUser);
        }
        let user = fetch_user_by_id(phone_user.id, &Fields::All, conn).await?.ok_or(UserApiError::UserNotFound)?;
        debug!("🗃️ Bound union id {} to existing user #{}", profile.union_id, user.id);
        return Ok(RegistrationOutcome::BoundToPhoneUser(user));
    }
    let user = insert_user(profile, conn).await?;
    Ok(RegistrationOutcome::Created(user))
}
