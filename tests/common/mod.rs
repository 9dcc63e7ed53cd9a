use std::str::FromStr;

use axum::{
    body::{to_bytes, Body},
    extract::FromRef,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use sweetshop::{
    app::build_app,
    auth::{jwt::JwtKeys, password::hash_password, repo_types::NewUser},
    sweets::repo_types::{Sweet, SweetFields},
    AppState,
};
use tower::ServiceExt;

/// App over in-memory stores plus the state for direct inspection.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, AppState) {
    let state = AppState::fake();
    (build_app(state.clone()), state)
}

/// Inserts a user and returns an access token for it.
#[allow(dead_code)]
pub async fn user_token(state: &AppState, username: &str, is_staff: bool) -> String {
    let user = state
        .users
        .create(NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: hash_password("password123").unwrap(),
            is_staff,
        })
        .await
        .unwrap();
    JwtKeys::from_ref(state).sign_access(user.id).unwrap()
}

#[allow(dead_code)]
pub async fn seed_sweet(state: &AppState, name: &str, category: &str, price: &str, qty: i32) -> Sweet {
    state
        .sweets
        .create(SweetFields {
            name: name.into(),
            category: category.into(),
            price: Decimal::from_str(price).unwrap(),
            quantity_in_stock: qty,
        })
        .await
        .unwrap()
}

/// The three sweets most tests start from.
#[allow(dead_code)]
pub async fn seed_catalog(state: &AppState) -> Vec<Sweet> {
    vec![
        seed_sweet(state, "Chocolate Bar", "Chocolate", "2.00", 50).await,
        seed_sweet(state, "Gummy Bear", "Gummy", "1.50", 100).await,
        seed_sweet(state, "Jelly Beans", "Gummy", "1.00", 120).await,
    ]
}

#[allow(dead_code)]
pub async fn stock_of(state: &AppState, id: i64) -> Option<i32> {
    state
        .sweets
        .get(id)
        .await
        .unwrap()
        .map(|s| s.quantity_in_stock)
}

/// Sends one request; returns status and parsed JSON body (`Null` when empty).
#[allow(dead_code)]
pub async fn send(
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
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Sends a raw body with an optional content type; returns status and JSON body.
#[allow(dead_code)]
pub async fn send_raw(
    app: &Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
