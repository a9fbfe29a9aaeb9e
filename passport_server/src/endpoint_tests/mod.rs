mod brands;
mod helpers;
mod inner;
mod mocks;
mod users;

mod misc {
    use actix_web::{http::StatusCode, test::TestRequest};

    use super::helpers::send;
    use crate::routes::health;

    #[actix_web::test]
    async fn health_endpoint() {
        let (status, body) = send(TestRequest::get().uri("/system/healthcheck"), |cfg| {
            cfg.service(health);
        })
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "Success");
        assert_eq!(body["data"], "SUCCESS!");
    }

    #[actix_web::test]
    async fn envelope_echoes_the_request_id() {
        let req = TestRequest::get().uri("/system/healthcheck").insert_header(("X-Request-Id", "req-1"));
        let (_, body) = send(req, |cfg| {
            cfg.service(health);
        })
        .await;
        assert_eq!(body["request_id"], "req-1");
    }
}
