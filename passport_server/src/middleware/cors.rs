//! CORS policy for the browser-facing H5 clients. Any origin may call the API; preflight requests are answered by the
//! middleware and never reach a handler.
//!
//! Wrap it outside [`RequestIdMiddlewareFactory`](super::RequestIdMiddlewareFactory). That middleware renders
//! errors into responses, so error envelopes carry the CORS headers too.
use actix_cors::Cors;
use actix_web::http::{header, Method};

use super::{INNER_TOKEN_HEADER, REQUEST_ID_HEADER};
use crate::auth::{ACCESS_TOKEN_HEADER, OS_HEADER, VERSION_HEADER};

const PREFLIGHT_MAX_AGE: usize = 3600;

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([
            header::CONTENT_TYPE.as_str(),
            ACCESS_TOKEN_HEADER,
            INNER_TOKEN_HEADER,
            OS_HEADER,
            VERSION_HEADER,
            REQUEST_ID_HEADER,
        ])
        .expose_headers([REQUEST_ID_HEADER])
        .max_age(PREFLIGHT_MAX_AGE)
}

#[cfg(test)]
mod test {
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use passport_common::Secret;

    use super::*;
    use crate::middleware::{InnerTokenMiddlewareFactory, RequestIdMiddlewareFactory};

    const ORIGIN: &str = "https://h5.example.com";

    #[actix_web::test]
    async fn preflight_and_simple_requests() {
        let app = App::new()
            .wrap(cors())
            .route("/v1/user/info", web::get().to(|| async { HttpResponse::Ok().finish() }));
        let app = test::init_service(app).await;
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/v1/user/info")
            .insert_header((header::ORIGIN, ORIGIN))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "GET"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        let methods = res.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap();
        assert!(methods.contains("POST"), "{methods}");

        let req = test::TestRequest::get().uri("/v1/user/info").insert_header((header::ORIGIN, ORIGIN)).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        let exposed = res.headers().get(header::ACCESS_CONTROL_EXPOSE_HEADERS).unwrap().to_str().unwrap();
        assert!(exposed.eq_ignore_ascii_case(REQUEST_ID_HEADER), "{exposed}");
    }

    #[actix_web::test]
    async fn middleware_errors_keep_cors_headers() {
        let inner = web::scope("/_inner/v1")
            .wrap(InnerTokenMiddlewareFactory::new(Secret::new("inner-secret".to_string())))
            .route("/user/get", web::get().to(|| async { HttpResponse::Ok().finish() }));
        let app = App::new().wrap(RequestIdMiddlewareFactory).wrap(cors()).service(inner);
        let app = test::init_service(app).await;
        let req =
            test::TestRequest::get().uri("/_inner/v1/user/get").insert_header((header::ORIGIN, ORIGIN)).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }
}
