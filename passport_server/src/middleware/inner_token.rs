//! Shared-secret guard for the internal endpoints.
//!
//! Services inside the deployment call the `/_inner` endpoints with the configured inner token in the `X-Token`
//! header. Requests without it, or with the wrong token, are rejected with an invalid-token error before they reach a
//! handler. An empty configured token rejects every request.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use passport_common::Secret;

use crate::errors::ServerError;

pub const INNER_TOKEN_HEADER: &str = "X-Token";

pub struct InnerTokenMiddlewareFactory {
    token: Secret<String>,
}

impl InnerTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        InnerTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for InnerTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = InnerTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(InnerTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct InnerTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S> InnerTokenMiddlewareService<S> {
    fn is_authorized(&self, req: &ServiceRequest) -> bool {
        if self.token.reveal().is_empty() {
            return false;
        }
        req.headers()
            .get(INNER_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|presented| self.token.matches(&presented.to_string()))
            .unwrap_or(false)
    }
}

impl<S, B> Service<ServiceRequest> for InnerTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorized = self.is_authorized(&req);
        Box::pin(async move {
            if authorized {
                trace!("🔐️ Inner token check for {} ✅️", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Invalid inner token presented for {}. Denying access.", req.path());
                Err(ServerError::TokenInvalid.into())
            }
        })
    }
}
