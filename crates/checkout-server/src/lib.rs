//! # checkout-server
//!
//! Host commerce platform hooks for zero-total card validation, over HTTP.

pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    checkout_ajax, health_check, order_accepted, pre_checkout, render_widget, validate_card,
};
pub use crate::state::{AppState, ASSET_BASE};

/// Routes, static bundle and middleware
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Checkout page
        .route("/checkout/widget", post(render_widget))
        .route("/checkout/ajax", post(checkout_ajax))
        // Host platform hooks
        .route("/hooks/pre-checkout", post(pre_checkout))
        .route("/hooks/validate-card", post(validate_card))
        .route("/hooks/order-accepted", post(order_accepted))
        // WASM widget bundle
        .nest_service(ASSET_BASE, ServeDir::new("static"))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
