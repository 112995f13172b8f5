//! Eyewear storefront backend: OTP sign-in, carts, orders, Razorpay payments,
//! coupons and the seller back office.

pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod domain;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod otp;
pub mod routes;
pub mod schema;
pub mod services;
pub mod validation;

use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::app_state::AppState;

/// Builds the full application router, Swagger UI included.
pub fn app(state: AppState) -> Router {
    let (router, mut openapi) = routes::routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Eyewear Storefront API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
