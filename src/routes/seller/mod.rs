//! Seller back-office routes. Every handler takes the [`Seller`] extractor,
//! so callers without the `seller` role get 403.
//!
//! [`Seller`]: crate::middleware::Seller

pub mod inventory;
pub mod orders;

use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, middleware};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/seller",
        orders::routes_with_openapi()
            .merge(inventory::routes_with_openapi())
            .route_layer(axum::middleware::from_fn(middleware::user_authorization)),
    )
}
