use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use passport_common::helpers::unix_now;
use passport_engine::{
    cache::MemoryStore,
    db_types::{Brand, BrandExpire, BrandUnimini, BrandUser},
    BrandApi,
    UserApi,
};

use super::{
    helpers::{assert_error, expect_token_for_user_7, send},
    mocks::{MockBrandManager, MockUserManager},
};
use crate::routes::{BrandFullInfoRoute, BrandListRoute, BrandUniminiCheckRoute};

fn configure(users: MockUserManager, brands: MockBrandManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(BrandListRoute::<MockUserManager, MemoryStore, MockBrandManager>::new())
            .service(BrandFullInfoRoute::<MockUserManager, MemoryStore, MockBrandManager>::new())
            .service(BrandUniminiCheckRoute::<MockUserManager, MemoryStore, MockBrandManager>::new())
            .app_data(web::Data::new(UserApi::new(users, MemoryStore::new())))
            .app_data(web::Data::new(BrandApi::new(brands)));
    }
}

fn member_of(users: &mut MockUserManager, brand_id: i64, member: bool) {
    users
        .expect_is_brand_member()
        .withf(move |user, brand| *user == 7 && *brand == brand_id)
        .returning(move |_, _| Ok(member));
}

#[actix_web::test]
async fn brand_list_joins_leases() {
    let mut users = MockUserManager::new();
    expect_token_for_user_7(&mut users);
    let mut brands = MockBrandManager::new();
    brands.expect_fetch_brand_users_for_user().returning(|user_id| {
        let relation = |brand_id| BrandUser { id: brand_id, brand_id, user_id, status: 1, create_time: 0 };
        Ok(vec![relation(1), relation(2)])
    });
    brands.expect_fetch_brands().returning(|ids| {
        Ok(ids.iter().map(|id| Brand { id: *id, name: format!("brand-{id}"), ..Default::default() }).collect())
    });
    brands
        .expect_fetch_brand_expires()
        .returning(|_| Ok(vec![BrandExpire { brand_id: 1, expire_time: unix_now() + 60, ..Default::default() }]));
    let req = TestRequest::get().uri("/brand/list").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(users, brands)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["brand"]["name"], "brand-1");
    assert_eq!(list[0]["expire"]["brand_id"], 1);
    assert!(list[1]["expire"].is_null());
}

#[actix_web::test]
async fn full_info_requires_membership() {
    let mut users = MockUserManager::new();
    expect_token_for_user_7(&mut users);
    member_of(&mut users, 3, false);
    let mut brands = MockBrandManager::new();
    brands.expect_fetch_brand().never();
    let req = TestRequest::get().uri("/brand/full_info?brand_id=3").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(users, brands)).await;
    assert_error(status, &body, StatusCode::FORBIDDEN, 110003);
}

#[actix_web::test]
async fn unimini_checks() {
    let now = unix_now();
    for (unimini, code) in [(None, 110007), (Some(now - 1), 110009)] {
        let mut users = MockUserManager::new();
        expect_token_for_user_7(&mut users);
        member_of(&mut users, 5, true);
        let mut brands = MockBrandManager::new();
        brands
            .expect_fetch_brand_expire()
            .returning(move |brand_id| Ok(Some(BrandExpire { brand_id, expire_time: now + 60, ..Default::default() })));
        brands.expect_fetch_brand_unimini().returning(move |brand_id| {
            Ok(unimini.map(|expire_time| BrandUnimini { id: 1, brand_id, expire_time }))
        });
        let req =
            TestRequest::get().uri("/brand/unimini/check?brand_id=5").insert_header(("X-Access-Token", "tok-7"));
        let (status, body) = send(req, configure(users, brands)).await;
        assert_error(status, &body, StatusCode::FORBIDDEN, code);
    }
}

#[actix_web::test]
async fn unimini_is_open() {
    let now = unix_now();
    let mut users = MockUserManager::new();
    expect_token_for_user_7(&mut users);
    member_of(&mut users, 5, true);
    let mut brands = MockBrandManager::new();
    brands
        .expect_fetch_brand_expire()
        .returning(move |brand_id| Ok(Some(BrandExpire { brand_id, expire_time: now + 60, ..Default::default() })));
    brands
        .expect_fetch_brand_unimini()
        .returning(move |brand_id| Ok(Some(BrandUnimini { id: 1, brand_id, expire_time: now + 60 })));
    let req = TestRequest::get().uri("/brand/unimini/check?brand_id=5").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(users, brands)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
}

#[actix_web::test]
async fn brand_ids_are_validated() {
    let req = TestRequest::get().uri("/brand/full_info?brand_id=0").insert_header(("X-Access-Token", "tok-7"));
    let (status, body) = send(req, configure(MockUserManager::new(), MockBrandManager::new())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, 100002);
}
