mod common;

use common::*;
use serde_json::{Value, json};
use std::sync::Arc;
use tokenpair::api;
use tokenpair::application_port::TokenService;
use tokenpair::domain_model::RefreshCredential;
use warp::Filter;
use warp::http::StatusCode;
use warp::http::header::SET_COOKIE;

fn app(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(token_service))
        .recover(api::v1::recover_error)
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("Responses should be JSON envelopes.")
}

fn cookies(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("Cookie header should be ASCII.").to_string())
        .collect()
}

#[tokio::test]
async fn login_returns_pair_and_cookies() {
    let h = harness();
    let filter = app(h.service.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .json(&json!({ "guid": "u1" }))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.body());
    assert_eq!(body["success"], true);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());

    let set = cookies(&response);
    assert_eq!(set.len(), 2);
    assert!(set.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(set.iter().any(|c| c.starts_with("refresh_token=") && c.contains("HttpOnly")));
    assert_eq!(h.store.sessions_for(&subject("u1")).len(), 1);
}

#[tokio::test]
async fn login_without_guid_is_bad_request() {
    let h = harness();
    let filter = app(h.service.clone());

    for payload in [json!({ "guid": "" }), json!({})] {
        let response = warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .json(&payload)
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response.body())["error"]["code"], "InvalidInput");
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn refresh_via_body_then_cookie() {
    let h = harness();
    let filter = app(h.service.clone());

    let login = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .json(&json!({ "guid": "u1" }))
        .reply(&filter)
        .await;
    let first = body_json(login.body())["data"]["refresh_token"]
        .as_str()
        .expect("Login should return a refresh token.")
        .to_string();

    let by_body = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .json(&json!({ "refresh_token": first }))
        .reply(&filter)
        .await;
    assert_eq!(by_body.status(), StatusCode::OK);
    let second = body_json(by_body.body())["data"]["refresh_token"]
        .as_str()
        .expect("Refresh should return a new refresh token.")
        .to_string();
    assert_ne!(first, second);

    let by_cookie = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .header("cookie", format!("refresh_token={}", second))
        .reply(&filter)
        .await;
    assert_eq!(by_cookie.status(), StatusCode::OK);

    let replay = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .json(&json!({ "refresh_token": first }))
        .reply(&filter)
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(replay.body())["error"]["code"], "Unauthenticated");
}

#[tokio::test]
async fn refresh_without_credential_is_unauthorized() {
    let h = harness();
    let filter = app(h.service.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_with_garbage_is_bad_request() {
    let h = harness();
    let filter = app(h.service.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .json(&json!({ "refresh_token": "garbage-not-base64!" }))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_requires_bearer_and_revokes() {
    let h = harness();
    let filter = app(h.service.clone());

    let anonymous = warp::test::request()
        .method("POST")
        .path("/api/v1/logout")
        .reply(&filter)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let login = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .json(&json!({ "guid": "u1" }))
        .reply(&filter)
        .await;
    let access = body_json(login.body())["data"]["access_token"]
        .as_str()
        .expect("Login should return an access token.")
        .to_string();

    let logout = warp::test::request()
        .method("POST")
        .path("/api/v1/logout")
        .header("authorization", format!("Bearer {}", access))
        .reply(&filter)
        .await;
    assert_eq!(logout.status(), StatusCode::OK);
    assert!(h.store.sessions_for(&subject("u1")).is_empty());
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let h = harness();
    let filter = app(h.service.clone());

    let health = warp::test::request()
        .method("GET")
        .path("/api/v1/health")
        .reply(&filter)
        .await;
    assert_eq!(health.status(), StatusCode::OK);

    let unknown = warp::test::request()
        .method("GET")
        .path("/api/v1/nope")
        .reply(&filter)
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_accepts_query_and_form() {
    let h = harness();
    let filter = app(h.service.clone());

    let by_query = warp::test::request()
        .method("POST")
        .path("/api/v1/login?guid=u1")
        .reply(&filter)
        .await;
    assert_eq!(by_query.status(), StatusCode::OK);
    assert_eq!(h.store.sessions_for(&subject("u1")).len(), 1);

    let by_form = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("guid=u2")
        .reply(&filter)
        .await;
    assert_eq!(by_form.status(), StatusCode::OK);
    assert_eq!(h.store.sessions_for(&subject("u2")).len(), 1);
}

#[tokio::test]
async fn unusable_login_requests_are_bad_requests() {
    let h = harness();
    let filter = app(h.service.clone());
    let oversized = json!({ "guid": "x".repeat(20 * 1024) });

    let too_large = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .json(&oversized)
        .reply(&filter)
        .await;
    let wrong_type = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .header("content-type", "text/plain")
        .body(r#"{"guid":"u1"}"#)
        .reply(&filter)
        .await;
    let no_length = warp::test::request()
        .method("POST")
        .path("/api/v1/login")
        .reply(&filter)
        .await;

    for response in [too_large, wrong_type, no_length] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response.body())["error"]["code"], "InvalidInput");
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn oversized_refresh_body_is_refused() {
    let h = harness();
    let filter = app(h.service.clone());
    let pair = h
        .service
        .issue_pair(&subject("u1"))
        .await
        .expect("Issue should succeed.");
    let padded = format!(
        r#"{{"refresh_token":"{}"{}}}"#,
        pair.refresh_token.0,
        " ".repeat(20 * 1024)
    );

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .header("content-type", "application/json")
        .body(padded)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let sessions = h.store.sessions_for(&subject("u1"));
    assert_eq!(sessions.len(), 1);
    assert_eq!(
        RefreshCredential::decode(&pair.refresh_token.0)
            .expect("Issued refresh token should decode.")
            .session_id,
        sessions[0].session_id
    );
}

#[tokio::test]
async fn logout_expires_token_cookies() {
    let h = harness();
    let filter = app(h.service.clone());
    let pair = h
        .service
        .issue_pair(&subject("u1"))
        .await
        .expect("Issue should succeed.");

    let response = warp::test::request()
        .method("POST")
        .path("/api/v1/logout")
        .header("authorization", format!("Bearer {}", pair.access_token.0))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set = cookies(&response);
    for name in ["access_token=;", "refresh_token=;"] {
        assert!(
            set.iter().any(|c| c.starts_with(name) && c.contains("Max-Age=0")),
            "{name} should be expired in {set:?}"
        );
    }
}
