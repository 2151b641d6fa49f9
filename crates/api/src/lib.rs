//! HTTP API server for the commerce backend.
//!
//! Wires the catalog, cart, inventory, checkout, review and auth
//! services behind an Axum router, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use auth::{AuthService, TokenSigner};
use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::{CheckoutService, FlatRateShipping};
use doc_store::DocumentStore;
use domain::{CartService, CatalogService, InventoryService, Money, ReviewService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub auth: AuthService<S>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub inventory: InventoryService<S>,
    pub reviews: ReviewService<S>,
    pub checkout: CheckoutService<S, FlatRateShipping>,
}

/// Builds the application state from a store and configuration.
pub fn create_state<S: DocumentStore>(store: Arc<S>, config: &Config) -> Arc<AppState<S>> {
    let signer = TokenSigner::new(
        &config.access_token_secret,
        &config.refresh_token_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    );
    let shipping = FlatRateShipping::new(Money::from_cents(config.shipping_fee_cents));

    Arc::new(AppState {
        auth: AuthService::new(store.clone(), signer),
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        inventory: InventoryService::new(store.clone()),
        reviews: ReviewService::new(store.clone()),
        checkout: CheckoutService::new(store, shipping),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register", post(routes::auth::register::<S>))
        .route("/auth/login", post(routes::auth::login::<S>))
        .route("/auth/refresh", post(routes::auth::refresh::<S>))
        .route("/auth/logout", post(routes::auth::logout::<S>))
        .route(
            "/products",
            get(routes::catalog::list_products::<S>).post(routes::catalog::create_product::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::catalog::get_product::<S>)
                .put(routes::catalog::update_product::<S>)
                .delete(routes::catalog::delete_product::<S>),
        )
        .route(
            "/products/{id}/reviews",
            get(routes::reviews::list_for_product::<S>),
        )
        .route(
            "/categories",
            get(routes::catalog::list_categories::<S>).post(routes::catalog::create_category::<S>),
        )
        .route("/categories/{id}", delete(routes::catalog::delete_category::<S>))
        .route(
            "/brands",
            get(routes::catalog::list_brands::<S>).post(routes::catalog::create_brand::<S>),
        )
        .route("/brands/{id}", delete(routes::catalog::delete_brand::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>)
                .post(routes::cart::add_item::<S>)
                .put(routes::cart::update_item::<S>),
        )
        .route("/cart/clear", delete(routes::cart::clear::<S>))
        .route("/cart/{productId}", delete(routes::cart::remove_item::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/reviews", post(routes::reviews::create::<S>))
        .route(
            "/reviews/{id}",
            put(routes::reviews::update::<S>).delete(routes::reviews::delete::<S>),
        )
        .route("/reviews/{id}/like", put(routes::reviews::like::<S>))
        .route("/inventory/{productId}", get(routes::inventory::get::<S>))
        .route(
            "/inventory/{productId}/stock",
            put(routes::inventory::update_stock::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
