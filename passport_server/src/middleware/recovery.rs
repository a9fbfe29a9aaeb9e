//! Turns a panicking handler into an internal-error response instead of a dropped connection.
use std::{
    any::Any,
    backtrace::Backtrace,
    future::{ready, Ready},
    panic::AssertUnwindSafe,
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    ResponseError,
};
use futures::{future::LocalBoxFuture, FutureExt};
use log::error;

use crate::errors::ServerError;

pub struct RecoveryMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for RecoveryMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = RecoveryMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoveryMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct RecoveryMiddlewareService<S> {
    service: Rc<S>,
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

impl<S, B> Service<ServiceRequest> for RecoveryMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let http_req = req.request().clone();
        Box::pin(async move {
            // Calling the service inside the guarded future also catches panics raised before the first await
            match AssertUnwindSafe(async move { service.call(req).await }).catch_unwind().await {
                Ok(res) => res.map(ServiceResponse::map_into_left_body),
                Err(panic) => {
                    error!(
                        "💻️ Handler for {} {} panicked. {}\n{}",
                        http_req.method(),
                        http_req.path(),
                        panic_message(panic.as_ref()),
                        Backtrace::force_capture()
                    );
                    let res = ServerError::HandlerPanic.error_response();
                    Ok(ServiceResponse::new(http_req, res).map_into_right_body())
                },
            }
        })
    }
}
