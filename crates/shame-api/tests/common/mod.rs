#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use shame_api::{AppState, AppStateInner, router};
use shame_db::Database;
use shame_engine::GameConfig;

pub const TEST_SECRET: &str = "integration-secret";

/// Router over a fresh in-memory database.
pub fn create_test_app() -> (Router, AppState) {
    let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
    let state = AppStateInner::new(db, TEST_SECRET.into(), GameConfig::default());
    (router(state.clone()), state)
}

/// Sends one request and returns the status and JSON body (`Null` when empty).
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub struct Account {
    pub id: String,
    pub token: String,
}

pub async fn register(app: &Router, name: &str) -> Account {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "sleepyhead",
            "display_name": name,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    Account {
        id: body["user_id"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

/// Makes two registered accounts friends through the request flow.
pub async fn befriend(app: &Router, a: &Account, b: &Account) {
    let (status, request) = call(
        app,
        Method::POST,
        "/friends/requests",
        Some(&a.token),
        Some(json!({ "to_user_id": b.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/friends/requests/{}/accept", request["id"].as_str().unwrap());
    let (status, _) = call(app, Method::POST, &uri, Some(&b.token), None).await;
    assert_eq!(status, StatusCode::OK);
}
