use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use log::*;
use passport_engine::traits::{BrandApiError, CacheError, UserApiError, WalletApiError};
use thiserror::Error;

use crate::{data_objects::ErrorResponse, middleware::current_request_id};

/// The domain error codes reported in the `code` field of the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Internal,
    Validation,
    DataNotFound,
    PermissionDenied,
    TokenInvalid,
    PasswordIncorrect,
    Database,
    Cache,
    Encode,
    Decode,
    UserNotFound,
    UserAlreadyExists,
    UserNotRelatedToBrand,
    WeChatUserNotRegistered,
    PhoneBoundToOtherWeChatUser,
    BrandNotFound,
    UniminiNotOpen,
    BrandExpired,
    UniminiExpired,
    MiniProgramUnauthorized,
    MiniProgramNotOpenPay,
    MisUserNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            Self::Internal => 100001,
            Self::Validation => 100002,
            Self::DataNotFound => 100003,
            Self::PermissionDenied => 100004,
            Self::TokenInvalid => 100005,
            Self::PasswordIncorrect => 100006,
            Self::Database => 100101,
            Self::Cache => 100102,
            Self::Encode => 100103,
            Self::Decode => 100104,
            Self::UserNotFound => 110001,
            Self::UserAlreadyExists => 110002,
            Self::UserNotRelatedToBrand => 110003,
            Self::WeChatUserNotRegistered => 110004,
            Self::PhoneBoundToOtherWeChatUser => 110005,
            Self::BrandNotFound => 110006,
            Self::UniminiNotOpen => 110007,
            Self::BrandExpired => 110008,
            Self::UniminiExpired => 110009,
            Self::MiniProgramUnauthorized => 110010,
            Self::MiniProgramNotOpenPay => 110011,
            Self::MisUserNotFound => 110012,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal | Self::Database | Self::Cache | Self::Encode | Self::Decode => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            Self::Validation | Self::UserAlreadyExists => StatusCode::BAD_REQUEST,
            Self::DataNotFound |
            Self::UserNotFound |
            Self::WeChatUserNotRegistered |
            Self::BrandNotFound |
            Self::MisUserNotFound => StatusCode::NOT_FOUND,
            Self::TokenInvalid | Self::PasswordIncorrect => StatusCode::UNAUTHORIZED,
            Self::PhoneBoundToOtherWeChatUser => StatusCode::CONFLICT,
            Self::PermissionDenied |
            Self::UserNotRelatedToBrand |
            Self::UniminiNotOpen |
            Self::BrandExpired |
            Self::UniminiExpired |
            Self::MiniProgramUnauthorized |
            Self::MiniProgramNotOpenPay => StatusCode::FORBIDDEN,
        }
    }

    /// The message shown to clients. Internal details never end up here.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Internal => "Internal server error",
            Self::Validation => "Invalid params",
            Self::DataNotFound => "Data not found",
            Self::PermissionDenied => "Permission denied",
            Self::TokenInvalid => "Invalid token",
            Self::PasswordIncorrect => "Incorrect password",
            Self::Database => "Database error",
            Self::Cache => "Cache error",
            Self::Encode => "Encode error",
            Self::Decode => "Decode error",
            Self::UserNotFound => "User not found",
            Self::UserAlreadyExists => "User already exists",
            Self::UserNotRelatedToBrand => "User is not related to the brand",
            Self::WeChatUserNotRegistered => "WeChat user is not registered",
            Self::PhoneBoundToOtherWeChatUser => "The phone number is bound to another WeChat user",
            Self::BrandNotFound => "Brand not found",
            Self::UniminiNotOpen => "Unimini is not open for this brand",
            Self::BrandExpired => "The brand has expired",
            Self::UniminiExpired => "Unimini has expired for this brand",
            Self::MiniProgramUnauthorized => "The mini program is not authorized",
            Self::MiniProgramNotOpenPay => "Payments are not open for the mini program",
            Self::MisUserNotFound => "Administrator not found",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Invalid params ({0})")]
    ValidationError(String),
    #[error("The access token is missing or invalid")]
    TokenInvalid,
    #[error("A request handler panicked")]
    HandlerPanic,
    #[error("{0}")]
    UserError(#[from] UserApiError),
    #[error("{0}")]
    BrandError(#[from] BrandApiError),
    #[error("{0}")]
    WalletError(#[from] WalletApiError),
}

impl From<CacheError> for ServerError {
    fn from(e: CacheError) -> Self {
        Self::UserError(UserApiError::CacheError(e))
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::ValidationError(e.to_string().replace('\n', "; "))
    }
}

fn cache_error_code(e: &CacheError) -> ErrorCode {
    match e {
        CacheError::BackendError(_) => ErrorCode::Cache,
        CacheError::EncodeError(_) => ErrorCode::Encode,
        CacheError::DecodeError(_) => ErrorCode::Decode,
    }
}

impl ServerError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                ErrorCode::Internal
            },
            Self::HandlerPanic => ErrorCode::Internal,
            Self::ValidationError(_) => ErrorCode::Validation,
            Self::TokenInvalid => ErrorCode::TokenInvalid,
            Self::UserError(e) => match e {
                UserApiError::DatabaseError(_) => ErrorCode::Database,
                UserApiError::CacheError(e) => cache_error_code(e),
                UserApiError::UserNotFound => ErrorCode::UserNotFound,
                UserApiError::UserAlreadyExists => ErrorCode::UserAlreadyExists,
                UserApiError::MisUserNotFound => ErrorCode::MisUserNotFound,
                UserApiError::TokenInvalid => ErrorCode::TokenInvalid,
                UserApiError::PasswordIncorrect => ErrorCode::PasswordIncorrect,
                UserApiError::PermissionDenied(_) => ErrorCode::PermissionDenied,
                UserApiError::UserNotRelatedToBrand(_) => ErrorCode::UserNotRelatedToBrand,
                UserApiError::WeChatUserNotRegistered => ErrorCode::WeChatUserNotRegistered,
                UserApiError::PhoneBoundToOtherWeChatUser => ErrorCode::PhoneBoundToOtherWeChatUser,
                UserApiError::ValidationError(_) => ErrorCode::Validation,
            },
            Self::BrandError(e) => match e {
                BrandApiError::DatabaseError(_) => ErrorCode::Database,
                BrandApiError::BrandNotFound(_) => ErrorCode::BrandNotFound,
                BrandApiError::BrandExpired(_) => ErrorCode::BrandExpired,
                BrandApiError::UniminiNotOpen(_) => ErrorCode::UniminiNotOpen,
                BrandApiError::UniminiExpired(_) => ErrorCode::UniminiExpired,
                BrandApiError::MiniProgramUnauthorized(_) => ErrorCode::MiniProgramUnauthorized,
                BrandApiError::MiniProgramNotOpenPay(_) => ErrorCode::MiniProgramNotOpenPay,
                BrandApiError::DataNotFound(_) => ErrorCode::DataNotFound,
            },
            Self::WalletError(e) => match e {
                WalletApiError::DatabaseError(_) => ErrorCode::Database,
                WalletApiError::WalletNotFound(_) | WalletApiError::NoMatchingWallet => ErrorCode::DataNotFound,
                WalletApiError::QueryError(_) => ErrorCode::Validation,
            },
        }
    }

    /// The client-facing message. Validation failures carry their details; everything else uses the code's message.
    pub fn public_message(&self) -> String {
        match self {
            Self::ValidationError(details) => format!("Invalid params ({details})"),
            Self::UserError(UserApiError::ValidationError(details)) => format!("Invalid params ({details})"),
            Self::WalletError(WalletApiError::QueryError(e)) => format!("Invalid params ({e})"),
            _ => self.error_code().message().to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        self.error_code().status()
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.error_code();
        let request_id = current_request_id();
        let reference = if code.status().is_server_error() {
            error!("💻️ Request failed with an internal error. {self}");
            Some(request_id.clone())
        } else {
            debug!("💻️ Request failed. {self}");
            None
        };
        let body = ErrorResponse { code: code.code(), message: self.public_message(), reference, request_id };
        HttpResponse::build(code.status()).json(body)
    }
}
