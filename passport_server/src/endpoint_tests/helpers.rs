use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use passport_common::helpers::unix_now;
use passport_engine::db_types::User;
use serde_json::Value;

use super::mocks::MockUserManager;
use crate::{middleware::RequestIdMiddlewareFactory, routes::extractor_config};

/// Sends `req` to an app set up by `configure` and returns the status and the JSON envelope.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().wrap(RequestIdMiddlewareFactory).configure(extractor_config).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::call_service(&service, req.to_request()).await.into_parts();
    let status = res.status();
    let body = res.into_body().try_into_bytes().unwrap();
    let json = serde_json::from_slice(&body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {body:?}"));
    (status, json)
}

pub fn user_7() -> User {
    User {
        id: 7,
        phone: "13800000007".into(),
        pwd: "hash".into(),
        union_id: Some("wx-7".into()),
        name: "Seven".into(),
        nickname: "seven".into(),
        headimgurl: "https://wx.example.com/7.png".into(),
        access_token: "tok-7".into(),
        expire_time: unix_now() + 3600,
        status: 1,
        ..Default::default()
    }
}

/// Resolves `tok-7` to user 7 from the repository, as on a cold cache.
pub fn expect_token_for_user_7(db: &mut MockUserManager) {
    db.expect_fetch_user_by_access_token()
        .withf(|token, _, _| token == "tok-7")
        .returning(|_, _, _| Ok(Some(User { id: 7, expire_time: unix_now() + 3600, ..Default::default() })));
    db.expect_fetch_user_by_id().withf(|id, _| *id == 7).returning(|_, _| Ok(Some(user_7())));
}

pub fn assert_error(status: StatusCode, body: &Value, expected_status: StatusCode, code: u64) {
    assert_eq!(status, expected_status, "unexpected status for {body}");
    assert_eq!(body["code"], code, "unexpected code in {body}");
    assert!(body["data"].is_null());
    assert!(!body["request_id"].as_str().unwrap().is_empty());
}
