use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use passport_common::helpers::unix_now;
use passport_engine::{cache::MemoryStore, db_types::User, UserApi};
use serde_json::json;

use super::{
    helpers::{assert_error, expect_token_for_user_7, send, user_7},
    mocks::MockUserManager,
};
use crate::routes::{
    LogoutRoute,
    MisInfoRoute,
    MisLoginRoute,
    UserByPhoneRoute,
    UserInfoRoute,
    WxBindPhoneRoute,
    WxLoginRoute,
    WxRegisterRoute,
    WxUnbindRoute,
};

fn configure(db: MockUserManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = UserApi::new(db, MemoryStore::new());
        cfg.service(UserByPhoneRoute::<MockUserManager, MemoryStore>::new())
            .service(WxLoginRoute::<MockUserManager, MemoryStore>::new())
            .service(WxRegisterRoute::<MockUserManager, MemoryStore>::new())
            .service(WxBindPhoneRoute::<MockUserManager, MemoryStore>::new())
            .service(WxUnbindRoute::<MockUserManager, MemoryStore>::new())
            .service(LogoutRoute::<MockUserManager, MemoryStore>::new())
            .service(UserInfoRoute::<MockUserManager, MemoryStore>::new())
            .service(MisLoginRoute::<MockUserManager, MemoryStore>::new())
            .service(MisInfoRoute::<MockUserManager, MemoryStore>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn user_info_without_a_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send(TestRequest::get().uri("/user/info"), configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100005);
    assert_eq!(body["message"], "Invalid token");
}

#[actix_web::test]
async fn user_info_hides_credentials() {
    let mut db = MockUserManager::new();
    expect_token_for_user_7(&mut db);
    let req = TestRequest::get().uri("/user/info").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["id"], 7);
    assert_eq!(body["data"]["phone"], "13800000007");
    assert_eq!(body["data"]["unionid"], "wx-7");
    assert!(body["data"].get("access_token").is_none());
    assert!(body["data"].get("pwd").is_none());
}

#[actix_web::test]
async fn expired_tokens_are_rejected() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_access_token()
        .returning(|_, _, _| Ok(Some(User { id: 7, expire_time: unix_now() - 10, ..Default::default() })));
    db.expect_fetch_user_by_id().never();
    let req = TestRequest::get().uri("/user/info").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(db)).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100005);
}

#[actix_web::test]
async fn phone_lookup_is_validated() {
    let (status, body) =
        send(TestRequest::get().uri("/user/phone?phone=12345"), configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid params ("));

    let (status, body) = send(TestRequest::get().uri("/user/phone"), configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
}

#[actix_web::test]
async fn phone_lookup() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_phone().withf(|phone, _| phone == "13800000007").returning(|_, _| Ok(Some(user_7())));
    let (status, body) = send(TestRequest::get().uri("/user/phone?phone=13800000007"), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Seven");
    assert!(body["data"].get("access_token").is_none());
}

#[actix_web::test]
async fn unknown_phones_are_not_found() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_phone().returning(|_, _| Ok(None));
    let (status, body) = send(TestRequest::get().uri("/user/phone?phone=13900000000"), configure(db)).await;
    assert_error(status, &body, StatusCode::NOT_FOUND, 110001);
}

#[actix_web::test]
async fn wechat_login_requires_registration() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_union_id().returning(|_, _, _| Ok(None));
    db.expect_update_user().never();
    let req = TestRequest::post().uri("/user/wxh5/login").set_json(json!({"unionid": "wx-404"}));
    let (status, body) = send(req, configure(db)).await;
    assert_error(status, &body, StatusCode::NOT_FOUND, 110004);
}

#[actix_web::test]
async fn wechat_login_issues_a_fresh_token() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_union_id()
        .withf(|union_id, _, _| union_id == "wx-7")
        .returning(|_, _, _| Ok(Some(User { expire_time: unix_now() - 1, ..user_7() })));
    db.expect_update_user()
        .withf(|cond, update| {
            cond.id == 7 && update.access_token.is_some() && update.nickname.as_deref() == Some("new")
        })
        .times(1)
        .returning(|_, _| Ok(1));
    let req = TestRequest::post()
        .uri("/user/wxh5/login")
        .insert_header(("X-OS", "android"))
        .set_json(json!({"unionid": "wx-7", "nickname": "new"}));
    let (status, body) = send(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], 7);
    assert_eq!(body["data"]["nickname"], "new");
    let token = body["data"]["access_token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_ne!(token, "tok-7");
    assert!(body["data"]["expire_time"].as_i64().unwrap() > unix_now());
}

#[actix_web::test]
async fn malformed_bodies_are_validation_errors() {
    let req = TestRequest::post()
        .uri("/user/wxh5/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let (status, body) = send(req, configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);

    let req = TestRequest::post().uri("/user/wxh5/register").set_json(json!({"unionid": "", "sex": 9}));
    let (status, body) = send(req, configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
}

#[actix_web::test]
async fn binding_a_phone_held_by_someone_else() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_union_id().returning(|_, _, _| Ok(Some(user_7())));
    db.expect_fetch_user_by_phone().returning(|_, _| Ok(Some(User { id: 8, ..Default::default() })));
    db.expect_update_user().never();
    let req = TestRequest::post()
        .uri("/user/wxh5/bind_phone")
        .set_json(json!({"unionid": "wx-7", "phone": "13800000008"}));
    let (status, body) = send(req, configure(db)).await;
    assert_error(status, &body, StatusCode::CONFLICT, 110005);
}

#[actix_web::test]
async fn unbinding_an_unknown_token_is_a_no_op() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_access_token().returning(|_, _, _| Ok(None));
    db.expect_update_user().never();
    let req = TestRequest::post().uri("/user/wxh5/unbind").insert_header(("X-Access-Token", "gone"));
    let (status, body) = send(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn logout() {
    let req = TestRequest::post().uri("/user/logout").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(MockUserManager::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
}

#[actix_web::test]
async fn admin_login_with_a_wrong_password() {
    let mut db = MockUserManager::new();
    db.expect_fetch_user_by_phone_and_password().returning(|_, _, _| Ok(None));
    db.expect_fetch_mis_user().never();
    let req = TestRequest::post().uri("/mis/login").set_json(json!({"phone": "13800000007", "pwd": "nope"}));
    let (status, body) = send(req, configure(db)).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100006);
}

#[actix_web::test]
async fn admin_tokens_are_cache_only() {
    let req = TestRequest::get().uri("/mis/info").insert_header(("X-Access-Token", "never-issued"));
    let (status, body) = send(req, configure(MockUserManager::new())).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100005);
}
