//! Credentials and client metadata carried in request headers.
//!
//! End users and administrators present the token issued at login in the `X-Access-Token` header. The token is
//! opaque to the delivery layer; handlers resolve it to a user through the `UserApi` checks. Clients also describe
//! themselves with `X-OS` and `X-Version`, which are only logged.
use std::{
    convert::Infallible,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::ServerError;

pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";
pub const OS_HEADER: &str = "X-OS";
pub const VERSION_HEADER: &str = "X-Version";

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

/// The access token presented by the caller. Extraction fails with an invalid-token error when the header is missing
/// or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for AccessToken {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match header_value(req, ACCESS_TOKEN_HEADER) {
            Some(token) => Ok(AccessToken(token.to_string())),
            None => {
                debug!("🔐️ No access token in request to {}", req.path());
                Err(ServerError::TokenInvalid)
            },
        };
        ready(result)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub os: String,
    pub version: String,
}

impl FromRequest for RequestMeta {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let os = header_value(req, OS_HEADER).unwrap_or("unknown").to_string();
        let version = header_value(req, VERSION_HEADER).unwrap_or("unknown").to_string();
        ready(Ok(RequestMeta { os, version }))
    }
}
