//! Registration, login and token endpoints over the full router.

use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{create_test_app, send, send_raw};

fn valid_registration() -> serde_json::Value {
    json!({
        "username": "testuser",
        "email": "testuser@example.com",
        "password": "testpassword123",
        "password_confirm": "testpassword123"
    })
}

#[tokio::test]
async fn user_can_register_successfully() {
    let (app, state) = create_test_app();

    let (status, body) = send(&app, Method::POST, "/auth/register/", None, Some(valid_registration())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["username"], "testuser");
    assert_eq!(body["user"]["email"], "testuser@example.com");
    assert_eq!(body["user"]["is_staff"], false);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
    assert!(state.users.find_by_username("testuser").await.unwrap().is_some());
}

#[tokio::test]
async fn registration_fails_with_invalid_data() {
    let (app, state) = create_test_app();
    let payload = json!({
        "username": "testuser2",
        "email": "invalid-email",
        "password": "short",
        "password_confirm": "different"
    });

    let (status, body) = send(&app, Method::POST, "/auth/register/", None, Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["password_confirm"], json!(["Passwords do not match."]));
    assert!(body["password"].is_array());
    assert!(body["email"].is_array());
    assert!(state.users.find_by_username("testuser2").await.unwrap().is_none());
}

#[tokio::test]
async fn registration_fails_with_missing_data() {
    let (app, _) = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register/",
        None,
        Some(json!({ "username": "testuser3" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["email", "password", "password_confirm"] {
        assert_eq!(body[field], json!(["This field is required."]), "{field}");
    }
}

#[tokio::test]
async fn registration_fails_with_existing_username() {
    let (app, _) = create_test_app();
    let (status, _) = send(&app, Method::POST, "/auth/register/", None, Some(valid_registration())).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut again = valid_registration();
    again["email"] = json!("another@example.com");
    let (status, body) = send(&app, Method::POST, "/auth/register/", None, Some(again)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"], json!(["A user with that username already exists."]));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _) = create_test_app();
    let (status, body) = send_raw(
        &app,
        "/auth/login/",
        Some("application/json"),
        r#"{"username": "testuser", "password": "#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn login_without_json_body_reports_each_field() {
    let (app, _) = create_test_app();
    let required = json!(["This field is required."]);

    for (content_type, raw) in [
        (None, ""),
        (Some("application/json"), ""),
        (Some("application/x-www-form-urlencoded"), "username=testuser"),
    ] {
        let (status, body) = send_raw(&app, "/auth/login/", content_type, raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{content_type:?}");
        assert_eq!(body["username"], required, "{content_type:?}");
        assert_eq!(body["password"], required, "{content_type:?}");
    }
}

#[tokio::test]
async fn register_without_body_reports_each_field() {
    let (app, _) = create_test_app();
    let (status, body) = send_raw(&app, "/auth/register/", None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["username", "email", "password", "password_confirm"] {
        assert_eq!(body[field], json!(["This field is required."]), "{field}");
    }
}

#[tokio::test]
async fn non_text_login_field_is_keyed_by_field() {
    let (app, _) = create_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": { "name": "x" }, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"], json!(["Not a valid string."]));
}

#[tokio::test]
async fn login_returns_tokens_and_user() {
    let (app, _) = create_test_app();
    send(&app, Method::POST, "/auth/register/", None, Some(valid_registration())).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "testuser", "password": "testpassword123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "testuser");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _) = create_test_app();
    send(&app, Method::POST, "/auth/register/", None, Some(valid_registration())).await;

    let wrong_password = send(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "testuser", "password": "not-the-password" })),
    )
    .await;
    let unknown_user = send(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "nobody", "password": "testpassword123" })),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password.1, json!({ "message": "Invalid credentials" }));
}

#[tokio::test]
async fn login_requires_both_fields() {
    let (app, _) = create_test_app();
    let (status, body) = send(&app, Method::POST, "/auth/login/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"], json!(["This field is required."]));
    assert_eq!(body["password"], json!(["This field is required."]));
}

#[tokio::test]
async fn refresh_and_me_round_out_the_session() {
    let (app, _) = create_test_app();
    let (_, registered) = send(&app, Method::POST, "/auth/register/", None, Some(valid_registration())).await;
    let refresh_token = registered["refresh_token"].as_str().unwrap().to_string();
    let access_token = registered["access_token"].as_str().unwrap().to_string();

    let (status, pair) = send(
        &app,
        Method::POST,
        "/auth/token/refresh/",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh_access = pair["access_token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/auth/me/", Some(fresh_access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "testuser");

    // An access token cannot be used as a refresh token
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/token/refresh/",
        None,
        Some(json!({ "refresh_token": access_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let (app, _) = create_test_app();
    let (status, body) = send(&app, Method::GET, "/auth/me/", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token not valid for any token type");
}
