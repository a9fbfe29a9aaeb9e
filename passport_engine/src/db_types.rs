use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

//--------------------------------------     RecordStatus       ------------------------------------------------------
/// Soft-delete marker shared by users, brands and their relations. Rows are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Ok,
    Deleted,
}

impl RecordStatus {
    pub fn value(self) -> i64 {
        match self {
            RecordStatus::Ok => 1,
            RecordStatus::Deleted => -1,
        }
    }
}

/// Whether a lookup should only consider live rows, or deleted ones too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    Active,
    Any,
}

//--------------------------------------     QueryError       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Invalid condition '{0}'")]
    InvalidCondition(String),
    #[error("A condition is required")]
    EmptyCondition,
    #[error("Invalid expression '{0}'")]
    InvalidExpression(String),
}

//--------------------------------------     Fields       ------------------------------------------------------------
/// An explicit column selection for repository reads.
///
/// `Fields::All` selects every column. `Fields::Only` selects a subset, which is validated against the table's column
/// whitelist before it is ever written into a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    #[default]
    All,
    Only(Vec<String>),
}

impl Fields {
    pub fn only(columns: &[&str]) -> Self {
        Fields::Only(columns.iter().map(|c| c.to_string()).collect())
    }

    /// Parses `*` (or an empty string) as all columns, and a comma-separated list as a subset.
    pub fn parse(list: &str, allowed: &[&str]) -> Result<Self, QueryError> {
        let list = list.trim();
        if list.is_empty() || list == "*" {
            return Ok(Fields::All);
        }
        let columns = list.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect::<Vec<_>>();
        let fields = Fields::Only(columns);
        fields.validate(allowed)?;
        Ok(fields)
    }

    pub fn columns(&self) -> Option<&[String]> {
        match self {
            Fields::All => None,
            Fields::Only(cols) => Some(cols.as_slice()),
        }
    }

    pub fn validate(&self, allowed: &[&str]) -> Result<(), QueryError> {
        if let Fields::Only(cols) = self {
            if cols.is_empty() {
                return Err(QueryError::UnknownColumn(String::new()));
            }
            if let Some(bad) = cols.iter().find(|c| !allowed.contains(&c.as_str())) {
                return Err(QueryError::UnknownColumn(bad.clone()));
            }
        }
        Ok(())
    }

    /// The validated column list, ready to be used in a `SELECT` clause.
    pub fn select_list(&self, allowed: &[&str]) -> Result<String, QueryError> {
        self.validate(allowed)?;
        Ok(match self {
            Fields::All => "*".to_string(),
            Fields::Only(cols) => cols.join(", "),
        })
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fields::All => write!(f, "*"),
            Fields::Only(cols) => write!(f, "{}", cols.join(",")),
        }
    }
}

//--------------------------------------     User       --------------------------------------------------------------
pub const USER_COLUMNS: [&str; 19] = [
    "id",
    "phone",
    "pwd",
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

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(default)]
pub struct User {
    pub id: i64,
    pub phone: String,
    #[serde(skip)]
    pub pwd: String,
    #[sqlx(rename = "unionid")]
    #[serde(rename = "unionid")]
    pub union_id: Option<String>,
    pub name: String,
    pub real_name: String,
    pub nickname: String,
    pub sex: i64,
    pub headimgurl: String,
    pub avatar_url: String,
    pub birthday: i64,
    pub person_signature: String,
    pub access_token: String,
    pub expire_time: i64,
    pub login_times: i64,
    pub last_login_time: i64,
    pub status: i64,
    pub create_time: i64,
    pub update_time: i64,
}

impl User {
    pub fn has_union_id(&self) -> bool {
        self.union_id.as_ref().map(|u| !u.is_empty()).unwrap_or(false)
    }
}

/// The profile supplied by the WeChat login flow. It is used to register, log in and bind users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeChatProfile {
    #[serde(rename = "unionid")]
    pub union_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub sex: i64,
    #[serde(default)]
    pub birthday: i64,
    #[serde(default)]
    pub person_signature: String,
}

/// A typed change set for a user row. Only the `Some` fields are written. `update_time` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub phone: Option<String>,
    /// `Some(None)` clears the union id.
    pub union_id: Option<Option<String>>,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub headimgurl: Option<String>,
    pub avatar_url: Option<String>,
    pub sex: Option<i64>,
    pub birthday: Option<i64>,
    pub person_signature: Option<String>,
    pub access_token: Option<String>,
    pub expire_time: Option<i64>,
    pub last_login_time: Option<i64>,
    pub increment_login_times: bool,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self == &UserUpdate::default()
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_union_id(mut self, union_id: Option<String>) -> Self {
        self.union_id = Some(union_id);
        self
    }

    pub fn with_nickname<S: Into<String>>(mut self, nickname: S) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_headimgurl<S: Into<String>>(mut self, url: S) -> Self {
        self.headimgurl = Some(url.into());
        self
    }

    pub fn with_expire_time(mut self, expire_time: i64) -> Self {
        self.expire_time = Some(expire_time);
        self
    }
}

/// The WHERE clause of a user update. It always pins the row id, so a user update can never touch the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserUpdateCondition {
    pub id: i64,
    pub require_empty_union_id: bool,
    pub require_empty_phone: bool,
    pub exclude_deleted: bool,
}

impl UserUpdateCondition {
    pub fn by_id(id: i64) -> Self {
        Self { id, require_empty_union_id: false, require_empty_phone: false, exclude_deleted: false }
    }

    pub fn without_union_id(mut self) -> Self {
        self.require_empty_union_id = true;
        self
    }

    pub fn without_phone(mut self) -> Self {
        self.require_empty_phone = true;
        self
    }

    pub fn not_deleted(mut self) -> Self {
        self.exclude_deleted = true;
        self
    }
}

//--------------------------------------     MisUser / AgentAdmin       ----------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(default)]
pub struct MisUser {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub status: i64,
    pub create_time: i64,
    pub update_time: i64,
}

//--------------------------------------     Brands       ------------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(default)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub logo: String,
    pub db_name: String,
    pub create_user_id: i64,
    pub status: i64,
    pub create_time: i64,
    pub update_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BrandUser {
    pub id: i64,
    pub brand_id: i64,
    pub user_id: i64,
    pub status: i64,
    pub create_time: i64,
}

/// The lease record of a brand. `BrandMpExpire` has the same shape for the mini-program lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BrandExpire {
    pub id: i64,
    pub brand_id: i64,
    pub status: i64,
    pub level: i64,
    pub expire_time: i64,
    pub last_sign_time: i64,
}

pub type BrandMpExpire = BrandExpire;

/// `BrandExpire.status` of a lease in good standing.
pub const BRAND_EXPIRE_STATUS_NORMAL: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BrandUnimini {
    pub id: i64,
    pub brand_id: i64,
    pub expire_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BrandApp {
    pub id: i64,
    pub brand_id: i64,
    pub appid: String,
    pub authed: bool,
    pub pay_authed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandLeaseInfo {
    pub brand: Brand,
    pub expire: Option<BrandExpire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandFullInfo {
    pub brand: Brand,
    pub expire: Option<BrandExpire>,
    pub unimini: Option<BrandUnimini>,
    pub mp_expire: Option<BrandMpExpire>,
    pub app: Option<BrandApp>,
}

//--------------------------------------     Wallet       ------------------------------------------------------------
pub const WALLET_COLUMNS: [&str; 7] = ["id", "user_id", "brand_id", "balance", "status", "create_time", "update_time"];

/// A balance record. `balance` is held in minor currency units.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[sqlx(default)]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,
    pub brand_id: i64,
    pub balance: i64,
    pub status: i64,
    pub create_time: i64,
    pub update_time: i64,
}
