use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use passport_common::Secret;
use passport_engine::{cache::MemoryStore, db_types::Wallet, UserApi, WalletApi};
use serde_json::json;

use super::{
    helpers::{assert_error, send, user_7},
    mocks::{MockUserManager, MockWalletManager},
};
use crate::{
    middleware::{InnerTokenMiddlewareFactory, INNER_TOKEN_HEADER},
    routes::{
        InnerUserGetRoute,
        WalletEditByIdExRoute,
        WalletGetByCondRoute,
        WalletGetSingleByCondRoute,
        WalletGetSingleByIdRoute,
    },
};

const INNER_TOKEN: &str = "inner-s3cret";

fn configure(users: MockUserManager, wallets: MockWalletManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let scope = web::scope("/_inner/v1")
            .wrap(InnerTokenMiddlewareFactory::new(Secret::new(INNER_TOKEN.to_string())))
            .service(InnerUserGetRoute::<MockUserManager, MemoryStore>::new())
            .service(WalletGetByCondRoute::<MockWalletManager>::new())
            .service(WalletGetSingleByCondRoute::<MockWalletManager>::new())
            .service(WalletGetSingleByIdRoute::<MockWalletManager>::new())
            .service(WalletEditByIdExRoute::<MockWalletManager>::new());
        cfg.service(scope)
            .app_data(web::Data::new(UserApi::new(users, MemoryStore::new())))
            .app_data(web::Data::new(WalletApi::new(wallets)));
    }
}

fn inner_get(uri: &str) -> TestRequest {
    TestRequest::get().uri(uri).insert_header((INNER_TOKEN_HEADER, INNER_TOKEN))
}

#[actix_web::test]
async fn the_inner_token_is_required() {
    let req = TestRequest::get().uri("/_inner/v1/user/get?user_id=7");
    let (status, body) = send(req, configure(MockUserManager::new(), MockWalletManager::new())).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100005);

    let req = TestRequest::get().uri("/_inner/v1/user/get?user_id=7").insert_header((INNER_TOKEN_HEADER, "guess"));
    let (status, body) = send(req, configure(MockUserManager::new(), MockWalletManager::new())).await;
    assert_error(status, &body, StatusCode::UNAUTHORIZED, 100005);
}

#[actix_web::test]
async fn inner_user_summary() {
    let mut users = MockUserManager::new();
    users.expect_fetch_user_by_id().withf(|id, _| *id == 7).times(1).returning(|_, _| Ok(Some(user_7())));
    let req = inner_get("/_inner/v1/user/get?user_id=7");
    let (status, body) = send(req, configure(users, MockWalletManager::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"id": 7, "phone": "13800000007", "name": "Seven", "headimgurl": "https://wx.example.com/7.png"})
    );
}

#[actix_web::test]
async fn wallet_searches() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallets().withf(|_, filter| filter.predicates().len() == 2).returning(|_, _| {
        Ok(vec![Wallet { id: 1, user_id: 7, brand_id: 2, balance: 300, ..Default::default() }])
    });
    let uri = "/_inner/v1/saas/walletgetbycond?fields=id,balance&conds=user_id%20%3D%207%20AND%20brand_id%20%3D%202";
    let (status, body) = send(inner_get(uri), configure(MockUserManager::new(), wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["balance"], 300);
}

#[actix_web::test]
async fn unsafe_conditions_are_rejected() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallet().never();
    let uri = "/_inner/v1/saas/walletgetsinglebycond?conds=user_id%20%3D%207%20OR%201%20%3D%201";
    let (status, body) = send(inner_get(uri), configure(MockUserManager::new(), wallets)).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
}

#[actix_web::test]
async fn missing_wallets_are_not_found() {
    let mut wallets = MockWalletManager::new();
    wallets.expect_fetch_wallet_by_id().returning(|_| Ok(None));
    let uri = "/_inner/v1/saas/walletgetsinglebyid?id=99";
    let (status, body) = send(inner_get(uri), configure(MockUserManager::new(), wallets)).await;
    assert_error(status, &body, StatusCode::NOT_FOUND, 100003);
}

#[actix_web::test]
async fn balance_edits() {
    let mut wallets = MockWalletManager::new();
    wallets
        .expect_apply_balance_expression()
        .withf(|id, expr| *id == 3 && expr.delta() == -50)
        .times(1)
        .returning(|_, _| Ok(1));
    let req = TestRequest::post()
        .uri("/_inner/v1/saas/walleteditbyidex")
        .insert_header((INNER_TOKEN_HEADER, INNER_TOKEN))
        .set_json(json!({"id": 3, "balance": "balance - 50"}));
    let (status, body) = send(req, configure(MockUserManager::new(), wallets)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rows_affected"], 1);

    let mut wallets = MockWalletManager::new();
    wallets.expect_apply_balance_expression().never();
    let req = TestRequest::post()
        .uri("/_inner/v1/saas/walleteditbyidex")
        .insert_header((INNER_TOKEN_HEADER, INNER_TOKEN))
        .set_json(json!({"id": 3, "balance": "balance * 2"}));
    let (status, body) = send(req, configure(MockUserManager::new(), wallets)).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
}
