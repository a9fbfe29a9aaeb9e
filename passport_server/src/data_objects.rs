//! Request and response bodies of the HTTP API, and the response envelope that wraps them.
use actix_web::HttpResponse;
use passport_engine::db_types::{User, WeChatProfile};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::middleware::current_request_id;

pub const SUCCESS_CODE: u32 = 200;

//--------------------------------------------   Envelopes   ----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u32,
    pub message: String,
    pub data: T,
    pub request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { code: SUCCESS_CODE, message: "Success".to_string(), data, request_id: current_request_id() }
    }

    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Self::success(data))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub request_id: String,
}

//--------------------------------------------   Validation   ---------------------------------------------------------
/// Phone numbers are exactly 11 ASCII digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 11 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("must be 11 digits".into()))
    }
}

fn validate_optional_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.is_empty() {
        return Ok(());
    }
    validate_phone(phone)
}

//--------------------------------------------   Users   --------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PhoneQuery {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WxLoginRequest {
    #[validate(length(min = 1, message = "unionid is required"))]
    pub unionid: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub headimgurl: String,
}

impl From<WxLoginRequest> for WeChatProfile {
    fn from(req: WxLoginRequest) -> Self {
        WeChatProfile {
            union_id: req.unionid,
            nickname: req.nickname,
            headimgurl: req.headimgurl,
            ..Default::default()
        }
    }
}

/// The WeChat profile sent on registration and when binding additional information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WxProfileRequest {
    #[validate(length(min = 1, message = "unionid is required"))]
    pub unionid: String,
    #[validate(custom(function = "validate_optional_phone"))]
    pub phone: String,
    #[validate(length(max = 64))]
    pub nickname: String,
    #[validate(length(max = 64))]
    pub name: String,
    pub headimgurl: String,
    pub avatar_url: String,
    #[validate(range(min = 0, max = 2))]
    pub sex: i64,
    pub birthday: i64,
    #[validate(length(max = 255))]
    pub person_signature: String,
}

impl From<WxProfileRequest> for WeChatProfile {
    fn from(req: WxProfileRequest) -> Self {
        WeChatProfile {
            union_id: req.unionid,
            phone: req.phone,
            nickname: req.nickname,
            name: req.name,
            real_name: String::default(),
            headimgurl: req.headimgurl,
            avatar_url: req.avatar_url,
            sex: req.sex,
            birthday: req.birthday,
            person_signature: req.person_signature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BindPhoneRequest {
    #[validate(length(min = 1, message = "unionid is required"))]
    pub unionid: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MisLoginRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "pwd is required"))]
    pub pwd: String,
    /// Non-zero keeps the session for longer.
    #[serde(default)]
    pub keep: u8,
}

/// The profile of the user presenting an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub sex: i64,
    pub unionid: String,
    pub nickname: String,
    pub headimgurl: String,
    pub birthday: i64,
}

impl From<User> for UserInfoResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            name: user.name,
            sex: user.sex,
            unionid: user.union_id.unwrap_or_default(),
            nickname: user.nickname,
            headimgurl: user.headimgurl,
            birthday: user.birthday,
        }
    }
}

/// The user summary returned to internal services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerUserResponse {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub headimgurl: String,
}

impl From<User> for InnerUserResponse {
    fn from(user: User) -> Self {
        Self { id: user.id, phone: user.phone, name: user.name, headimgurl: user.headimgurl }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserIdQuery {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

//--------------------------------------------   Brands   -------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrandQuery {
    #[validate(range(min = 1))]
    pub brand_id: i64,
}

//--------------------------------------------   Wallets   ------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WalletCondQuery {
    #[serde(default = "all_fields")]
    pub fields: String,
    #[validate(length(min = 1, message = "conds is required"))]
    pub conds: String,
}

fn all_fields() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WalletIdQuery {
    #[validate(range(min = 1))]
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WalletEditRequest {
    #[validate(range(min = 1))]
    pub id: i64,
    /// A `balance + N` or `balance - N` expression.
    #[validate(length(min = 1, message = "balance is required"))]
    pub balance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEditResponse {
    pub rows_affected: u64,
}
