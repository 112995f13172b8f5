pub mod auth;
pub mod carts;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod payments;
pub mod seller;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every route of the service, with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    auth::routes_with_openapi()
        .merge(carts::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(payments::routes_with_openapi())
        .merge(coupons::routes_with_openapi())
        .merge(seller::routes_with_openapi())
        .merge(health::routes_with_openapi())
}
