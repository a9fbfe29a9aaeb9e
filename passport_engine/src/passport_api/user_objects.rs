use serde::{Deserialize, Serialize};

use crate::db_types::{Fields, User};

/// The columns resolved for a user who presents an access token.
pub const LOGIN_USER_FIELDS: [&str; 8] =
    ["id", "phone", "name", "sex", "unionid", "headimgurl", "nickname", "birthday"];

/// The columns resolved for an administrator who presents an access token.
pub const MIS_USER_FIELDS: [&str; 7] = ["id", "phone", "name", "sex", "unionid", "headimgurl", "nickname"];

pub fn login_user_fields() -> Fields {
    Fields::only(&LOGIN_USER_FIELDS)
}

pub fn mis_user_fields() -> Fields {
    Fields::only(&MIS_USER_FIELDS)
}

/// The result of a WeChat H5 login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxLoginResult {
    pub user_id: i64,
    pub access_token: String,
    pub expire_time: i64,
    pub phone: String,
    pub nickname: String,
    pub headimgurl: String,
    pub avatar_url: String,
}

/// The result of an administrative login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisLoginResult {
    pub user_id: i64,
    pub access_token: String,
    pub name: String,
    pub real_name: String,
    pub avatar_url: String,
    pub expire_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPhone {
    pub id: i64,
    pub phone: String,
}

impl From<User> for UserPhone {
    fn from(user: User) -> Self {
        Self { id: user.id, phone: user.phone }
    }
}
