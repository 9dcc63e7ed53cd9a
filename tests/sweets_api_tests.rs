//! Catalog and inventory endpoints over the full router.

use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{create_test_app, seed_catalog, seed_sweet, send, stock_of, user_token};

#[tokio::test]
async fn unauthenticated_access_is_rejected_everywhere() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let id = sweets[0].id;

    let cases = [
        (Method::GET, "/sweets/".to_string(), None),
        (
            Method::POST,
            "/sweets/".to_string(),
            Some(json!({ "name": "Taffy", "category": "Chewy", "price": "1.25", "quantity_in_stock": 50 })),
        ),
        (Method::GET, "/sweets/search/?search=Gummy".to_string(), None),
        (Method::GET, format!("/sweets/{id}/"), None),
        (Method::PUT, format!("/sweets/{id}/"), Some(json!({ "name": "New Chocolate Bar" }))),
        (Method::DELETE, format!("/sweets/{id}/"), None),
        (Method::POST, format!("/sweets/{id}/purchase/"), None),
        (Method::POST, format!("/sweets/{id}/restock/"), Some(json!({ "quantity": 10 }))),
    ];
    for (method, uri, body) in cases {
        let (status, json) = send(&app, method.clone(), &uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(json["detail"], "Authentication credentials were not provided.");
    }

    assert_eq!(state.sweets.list().await.unwrap().len(), 3);
    assert_eq!(stock_of(&state, id).await, Some(50));
}

#[tokio::test]
async fn authenticated_user_can_create_and_list() {
    let (app, state) = create_test_app();
    seed_catalog(&state).await;
    let token = user_token(&state, "regularuser", false).await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/sweets/",
        Some(&token),
        Some(json!({ "name": "Lollipop", "category": "Hard Candy", "price": "0.50", "quantity_in_stock": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Lollipop");
    assert_eq!(created["price"], "0.50");
    assert!(created["id"].is_i64());

    let (status, list) = send(&app, Method::GET, "/sweets/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn create_with_bad_fields_is_rejected() {
    let (app, state) = create_test_app();
    let token = user_token(&state, "regularuser", false).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/sweets/",
        Some(&token),
        Some(json!({ "name": "Lollipop", "price": "cheap", "quantity_in_stock": -3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["category"], json!(["This field is required."]));
    assert_eq!(body["price"], json!(["A valid number is required."]));
    assert!(body["quantity_in_stock"].is_array());
    assert!(state.sweets.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_by_name_category_and_miss() {
    let (app, state) = create_test_app();
    seed_catalog(&state).await;
    let token = user_token(&state, "regularuser", false).await;

    let (status, hits) = send(&app, Method::GET, "/sweets/search/?search=Chocolate", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["name"], "Chocolate Bar");

    let (_, hits) = send(&app, Method::GET, "/sweets/search/?search=Gummy", Some(&token), None).await;
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let (status, hits) = send(&app, Method::GET, "/sweets/search/?search=unknown", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(hits.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn retrieve_update_and_patch() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let token = user_token(&state, "regularuser", false).await;
    let uri = format!("/sweets/{}/", sweets[0].id);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "name": "New Chocolate Bar", "category": "Chocolate", "price": "2.00", "quantity_in_stock": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "New Chocolate Bar");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "price": "2.25" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "2.25");
    assert_eq!(body["name"], "New Chocolate Bar");

    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "2.25");

    let (status, body) = send(&app, Method::GET, "/sweets/9999/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not found.");

    let (status, _) = send(&app, Method::GET, "/sweets/abc/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_admin_can_delete() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let user = user_token(&state, "regularuser", false).await;
    let admin = user_token(&state, "admin", true).await;
    let uri = format!("/sweets/{}/", sweets[0].id);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You do not have permission to perform this action.");
    assert!(stock_of(&state, sweets[0].id).await.is_some());

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert!(stock_of(&state, sweets[0].id).await.is_none());
}

#[tokio::test]
async fn purchase_decrements_stock() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let token = user_token(&state, "regularuser", false).await;
    let uri = format!("/sweets/{}/purchase/", sweets[0].id);

    let (status, body) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity_in_stock"], 49);

    for _ in 0..4 {
        send(&app, Method::POST, &uri, Some(&token), None).await;
    }
    assert_eq!(stock_of(&state, sweets[0].id).await, Some(45));
}

#[tokio::test]
async fn purchase_with_zero_stock_fails() {
    let (app, state) = create_test_app();
    let token = user_token(&state, "regularuser", false).await;
    let sweet = seed_sweet(&state, "Lollipop", "Hard Candy", "0.50", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/sweets/{}/purchase/", sweet.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "This sweet is out of stock." }));
    assert_eq!(stock_of(&state, sweet.id).await, Some(0));

    let (status, _) = send(&app, Method::POST, "/sweets/777/purchase/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_can_restock() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let admin = user_token(&state, "admin", true).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/sweets/{}/restock/", sweets[0].id),
        Some(&admin),
        Some(json!({ "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity_in_stock"], 60);
    assert_eq!(stock_of(&state, sweets[0].id).await, Some(60));
}

#[tokio::test]
async fn non_admin_cannot_restock() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let user = user_token(&state, "regularuser", false).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/sweets/{}/restock/", sweets[0].id),
        Some(&user),
        Some(json!({ "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&state, sweets[0].id).await, Some(50));
}

#[tokio::test]
async fn restock_with_invalid_quantity_fails() {
    let (app, state) = create_test_app();
    let sweets = seed_catalog(&state).await;
    let admin = user_token(&state, "admin", true).await;
    let uri = format!("/sweets/{}/restock/", sweets[0].id);

    let cases = [
        (Some(json!({ "quantity": -5 })), "quantity must be a positive integer."),
        (Some(json!({ "quantity": 0 })), "quantity must be a positive integer."),
        (Some(json!({ "quantity": "abc" })), "quantity must be a valid integer."),
        (Some(json!({})), "quantity must be a valid integer."),
        (None, "quantity must be a valid integer."),
    ];
    for (body, expected) in cases {
        let (status, json) = send(&app, Method::POST, &uri, Some(&admin), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], expected);
    }
    assert_eq!(stock_of(&state, sweets[0].id).await, Some(50));

    let (status, _) = send(
        &app,
        Method::POST,
        "/sweets/4242/restock/",
        Some(&admin),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = create_test_app();
    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
