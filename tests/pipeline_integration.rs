//! Authenticated pipeline integration tests using wiremock
//!
//! Covers the request interceptor (version rewrite, bearer header,
//! client-id injection) and the 401 refresh-and-replay flow end to end
//! against mock API and auth servers.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate::{AuthFailure, GatewayError};

use common::{config_for, memory_gateway, seed_token, token_body};

// ---------------------------------------------------------------------------
// Request interceptor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_is_versioned_and_carries_bearer_and_client_id() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/widgets"))
        .and(header("Authorization", "Bearer T1"))
        .and(query_param("clientId", "42"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&api)
        .await;

    let config = config_for(&api.uri(), "http://127.0.0.1:9");
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "T1", "R1");
    gateway.tokens().set_client(&json!({"id": 42})).unwrap();

    let mut params = serde_json::Map::new();
    params.insert("page".to_string(), json!(2));
    let response = gateway
        .api()
        .get("/api/widgets", Some(params), None)
        .await
        .expect("request should succeed");

    assert_eq!(response.data(), Some(json!([{"id": 1}])));
}

#[tokio::test]
async fn test_unpinned_namespace_uses_latest_version() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/reports/daily"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 3})))
        .expect(1)
        .mount(&api)
        .await;

    let config = config_for(&api.uri(), "http://127.0.0.1:9");
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "T1", "R1");

    let response = gateway.api().get("/api/reports/daily", None, None).await.unwrap();
    assert_eq!(response.to_value(), json!({"total": 3, "statusMessage": ""}));
}

#[tokio::test]
async fn test_post_injects_client_id_into_body_without_overwriting() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/widgets"))
        .and(body_json(json!({"name": "w", "clientId": 42})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 10})))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/widgets"))
        .and(body_json(json!({"name": "x", "clientId": 7})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&api)
        .await;

    let config = config_for(&api.uri(), "http://127.0.0.1:9");
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "T1", "R1");
    gateway.tokens().set_client(&json!({"id": 42})).unwrap();

    gateway
        .api()
        .post("/api/widgets", Some(json!({"name": "w"})))
        .await
        .unwrap();
    gateway
        .api()
        .post("/api/widgets", Some(json!({"name": "x", "clientId": 7})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_token_sends_empty_bearer() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/public"))
        .and(header("Authorization", "Bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/public"))
        .and(header("Authorization", "Bearer "))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&api)
        .await;

    let config = config_for(&api.uri(), "http://127.0.0.1:9");
    let (gateway, _store) = memory_gateway(&config);

    let response = gateway.api().get("/api/public", None, None).await.unwrap();
    assert_eq!(response.data(), Some(json!([])));
}

// ---------------------------------------------------------------------------
// 401 refresh and replay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_401_triggers_one_refresh_and_one_replay() {
    let api = MockServer::start().await;
    let auth = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/widgets"))
        .and(header("Authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/widgets"))
        .and(header("Authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("NEW", "R2")))
        .expect(1)
        .mount(&auth)
        .await;

    let config = config_for(&api.uri(), &auth.uri());
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "OLD", "R1");

    let response = gateway.api().get("/api/widgets", None, None).await.unwrap();

    assert_eq!(response.data(), Some(json!([{"id": 1}])));
    assert_eq!(
        gateway.tokens().get_access_token().unwrap().as_deref(),
        Some("NEW")
    );
}

#[tokio::test]
async fn test_replay_401_surfaces_without_second_refresh() {
    let api = MockServer::start().await;
    let auth = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secure"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!("Unauthorized")))
        .expect(2)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("NEW", "R2")))
        .expect(1)
        .mount(&auth)
        .await;

    let config = config_for(&api.uri(), &auth.uri());
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "OLD", "R1");

    let err = gateway.api().get("/api/secure", None, None).await.unwrap_err();
    match err {
        GatewayError::Validation(messages) => assert_eq!(messages, vec!["Unauthorized"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_failure_is_reported_to_caller() {
    let api = MockServer::start().await;
    let auth = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secure"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&auth)
        .await;

    let config = config_for(&api.uri(), &auth.uri());
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "OLD", "R1");

    let err = gateway.api().get("/api/secure", None, None).await.unwrap_err();
    assert!(err.is_auth(AuthFailure::RefreshFailed));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let api = MockServer::start().await;
    let auth = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/widgets"))
        .and(header("Authorization", "Bearer OLD"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/widgets"))
        .and(header("Authorization", "Bearer NEW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("NEW", "R2")))
        .expect(1)
        .mount(&auth)
        .await;

    let config = config_for(&api.uri(), &auth.uri());
    let (gateway, store) = memory_gateway(&config);
    seed_token(store.as_ref(), "OLD", "R1");

    let calls = (0..4).map(|_| gateway.api().get("/api/widgets", None, None));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
}
