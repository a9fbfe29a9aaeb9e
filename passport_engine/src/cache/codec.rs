//! Conversion between [`User`] rows and the field map stored in the `UID:<id>` hash.
//!
//! Field names are the table's column names. The password hash is never cached.
use std::collections::HashMap;

use crate::{db_types::User, traits::CacheError};

pub const CACHED_USER_FIELDS: [&str; 18] = [
    "id",
    "phone",
    "unionid",
    "name",
    "real_name",
    "nickname",
    "sex",
    "headimgurl",
    "avatar_url",
    "birthday",
    "person_signature",
    "access_token",
    "expire_time",
    "login_times",
    "last_login_time",
    "status",
    "create_time",
    "update_time",
];

pub fn user_to_hash(user: &User) -> Vec<(String, String)> {
    let fields = [
        ("id", user.id.to_string()),
        ("phone", user.phone.clone()),
        ("unionid", user.union_id.clone().unwrap_or_default()),
        ("name", user.name.clone()),
        ("real_name", user.real_name.clone()),
        ("nickname", user.nickname.clone()),
        ("sex", user.sex.to_string()),
        ("headimgurl", user.headimgurl.clone()),
        ("avatar_url", user.avatar_url.clone()),
        ("birthday", user.birthday.to_string()),
        ("person_signature", user.person_signature.clone()),
        ("access_token", user.access_token.clone()),
        ("expire_time", user.expire_time.to_string()),
        ("login_times", user.login_times.to_string()),
        ("last_login_time", user.last_login_time.to_string()),
        ("status", user.status.to_string()),
        ("create_time", user.create_time.to_string()),
        ("update_time", user.update_time.to_string()),
    ];
    fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn int_field(map: &HashMap<String, String>, field: &str) -> Result<i64, CacheError> {
    match map.get(field) {
        None => Ok(0),
        Some(v) if v.is_empty() => Ok(0),
        Some(v) => v.parse().map_err(|e| CacheError::DecodeError(format!("user field {field}='{v}': {e}"))),
    }
}

fn text_field(map: &HashMap<String, String>, field: &str) -> String {
    map.get(field).cloned().unwrap_or_default()
}

/// Rebuilds a user from a (possibly partial) cached hash. Fields that were not requested keep their default values.
///
/// Returns `None` if the hash carries no `id`, i.e. there is no usable entry.
pub fn user_from_hash(map: &HashMap<String, String>) -> Result<Option<User>, CacheError> {
    if !map.contains_key("id") {
        return Ok(None);
    }
    let union_id = map.get("unionid").filter(|u| !u.is_empty()).cloned();
    let user = User {
        id: int_field(map, "id")?,
        phone: text_field(map, "phone"),
        pwd: String::new(),
        union_id,
        name: text_field(map, "name"),
        real_name: text_field(map, "real_name"),
        nickname: text_field(map, "nickname"),
        sex: int_field(map, "sex")?,
        headimgurl: text_field(map, "headimgurl"),
        avatar_url: text_field(map, "avatar_url"),
        birthday: int_field(map, "birthday")?,
        person_signature: text_field(map, "person_signature"),
        access_token: text_field(map, "access_token"),
        expire_time: int_field(map, "expire_time")?,
        login_times: int_field(map, "login_times")?,
        last_login_time: int_field(map, "last_login_time")?,
        status: int_field(map, "status")?,
        create_time: int_field(map, "create_time")?,
        update_time: int_field(map, "update_time")?,
    };
    Ok(Some(user))
}
