//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use doc_store::InMemoryDocumentStore;
use domain::Role;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (Router, Arc<api::AppState<InMemoryDocumentStore>>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let state = api::create_state(store, &api::config::Config::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
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
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Registers a user through the API and returns their access token.
async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": username, "password": "correct horse battery"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

/// Seeds an admin account directly and logs in through the API.
async fn admin_token(app: &Router, state: &api::AppState<InMemoryDocumentStore>) -> String {
    state
        .auth
        .create_user("admin", "admin password", Role::Admin)
        .await
        .unwrap();
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "admin", "password": "admin password"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

/// Creates a product and imports stock for it. Returns the product id.
async fn seed_product(app: &Router, admin: &str, name: &str, price_cents: i64, stock: u32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/products",
        Some(admin),
        Some(json!({"name": name, "description": "test product", "price": price_cents})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    if stock > 0 {
        let (status, _) = send(
            app,
            "PUT",
            &format!("/inventory/{id}/stock"),
            Some(admin),
            Some(json!({"quantity": stock, "type": "import"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

async fn stock_of(app: &Router, admin: &str, product_id: &str) -> u64 {
    let (status, body) = send(
        app,
        "GET",
        &format!("/inventory/{product_id}"),
        Some(admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["stock"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "commerce-api");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_and_refresh() {
    let (app, _) = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "ada", "password": "correct horse battery"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], "ada");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    let old_refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "ada", "password": "correct horse battery"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].as_str().is_some());

    // Rotation consumes the old refresh token.
    let (status, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({"refreshToken": old_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({"refreshToken": old_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let (app, _) = setup();
    register(&app, "ada").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "ada", "password": "wrong password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let (app, _) = setup();

    let (status, _) = send(&app, "GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        None,
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_writes_require_admin() {
    let (app, state) = setup();
    let user = register(&app, "ada").await;

    let draft = json!({"name": "Widget", "description": "d", "price": 1000});
    let (status, _) = send(&app, "POST", "/products", Some(&user), Some(draft.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app, &state).await;
    let (status, body) = send(&app, "POST", "/products", Some(&admin), Some(draft)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Catalog reads are public.
    let (status, body) = send(&app, "GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", &format!("/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Widget");
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let (app, _) = setup();
    let fake_id = uuid::Uuid::new_v4();

    let (status, _) = send(&app, "GET", &format!("/products/{fake_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_and_checkout_flow() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 10).await;

    let (status, body) = send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id, "quantity": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalAmount"], 2000);

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Flat shipping fee of 500 cents on top of the line totals.
    assert_eq!(body["data"]["totalAmount"], 2500);
    assert_eq!(body["data"]["status"], "pending");
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    assert_eq!(stock_of(&app, &admin, &product_id).await, 8);

    let (status, body) = send(&app, "GET", "/cart", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);

    let (status, body) = send(&app, "GET", "/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], order_id.as_str());

    let (status, body) = send(&app, "GET", &format!("/orders/{order_id}"), Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], order_id.as_str());
}

#[tokio::test]
async fn test_empty_cart_order_is_rejected() {
    let (app, _) = setup();
    let user = register(&app, "ada").await;

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_insufficient_stock_is_rejected() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 1).await;

    let (status, _) = send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id, "quantity": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(stock_of(&app, &admin, &product_id).await, 1);
}

#[tokio::test]
async fn test_cancel_restores_stock_once() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id, "quantity": 2})),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&app, &admin, &product_id).await, 3);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/cancel"),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(stock_of(&app, &admin, &product_id).await, 5);

    // Cancelled is terminal, a second cancel changes nothing.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/cancel"),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&app, &admin, &product_id).await, 5);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let other = register(&app, "bob").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id})),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", &format!("/orders/{order_id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", &format!("/orders/{order_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_updates_are_admin_only() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id})),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&user),
        Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({"status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({"status": "bogus"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_flow() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id})),
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&user),
        Some(json!({"shippingAddress": "1 Main St", "paymentMethod": "card"})),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let review = json!({
        "productId": product_id,
        "orderId": order_id,
        "rating": 5,
        "comment": "great",
    });

    // Not delivered yet.
    let (status, _) = send(&app, "POST", "/reviews", Some(&user), Some(review.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({"status": "delivered"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/reviews", Some(&user), Some(review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    // One review per (user, product, order).
    let (status, _) = send(&app, "POST", "/reviews", Some(&user), Some(review)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/products/{product_id}/reviews"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["rating"], 5);
}

#[tokio::test]
async fn test_cart_quantity_must_be_positive() {
    let (app, state) = setup();
    let admin = admin_token(&app, &state).await;
    let user = register(&app, "ada").await;
    let product_id = seed_product(&app, &admin, "Widget", 1000, 5).await;

    let (status, _) = send(
        &app,
        "POST",
        "/cart",
        Some(&user),
        Some(json!({"productId": product_id, "quantity": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
