//! Cache key derivation. These keys are shared with other services and must not change.
use chrono::NaiveDate;

pub const USER_PREFIX: &str = "XPASSPORT:USER";

pub fn user_by_id(user_id: i64) -> String {
    format!("{USER_PREFIX}:UID:{user_id}")
}

pub fn access_token(token: &str) -> String {
    format!("{USER_PREFIX}:ACCESS_TOKEN2ID:{token}")
}

pub fn mis_access_token(token: &str) -> String {
    format!("{USER_PREFIX}:MIS_ACCESS_TOKEN2ID:{token}")
}

pub fn login_users(date: NaiveDate) -> String {
    format!("{USER_PREFIX}:LOGIN_USERS:{}", date.format("%Y-%m-%d"))
}

pub fn mis_user_session(user_id: i64) -> String {
    format!("{USER_PREFIX}:MIS_UID_SESSION:{user_id}")
}
