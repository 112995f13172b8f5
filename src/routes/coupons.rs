use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, Empty, StdResponse},
    app_state::AppState,
    domain::round_currency,
    extract::Json,
    middleware::{self, UserId},
    models::CreateCouponUsageEntity,
    services::coupons::{calculate_discount, check_eligibility},
};

/// Defines coupon routes (identity required).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(validate_coupon))
            .routes(utoipa_axum::routes!(apply_coupon))
            .route_layer(axum::middleware::from_fn(middleware::user_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct ValidateCouponReq {
    pub code: Option<String>,
    pub order_amount: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct CouponSummary {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ValidateCouponRes {
    pub coupon: CouponSummary,
    pub discount_amount: f64,
    pub final_amount: f64,
}

/// Check a coupon code against an order amount and compute the discount.
/// Nothing is recorded; see `/coupons/apply`.
#[utoipa::path(
    post,
    path = "/validate",
    tags = ["Coupons"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = ValidateCouponReq,
    responses(
        (status = 200, description = "Coupon applicable", body = ValidateCouponRes),
        (status = 400, description = "Coupon not applicable to this order"),
        (status = 404, description = "Unknown coupon code")
    )
)]
async fn validate_coupon(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<ValidateCouponReq>,
) -> Result<impl IntoResponse, AppError> {
    let code = body
        .code
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Coupon code is required".to_string()))?;
    let order_amount = body
        .order_amount
        .filter(|amount| amount.is_finite() && *amount > 0.0)
        .ok_or_else(|| AppError::BadRequest("Valid order amount is required".to_string()))?;

    let coupon = state
        .repo
        .find_coupon_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid coupon code".to_string()))?;

    let used = state.repo.count_coupon_usage(coupon.id, user_id).await?;
    check_eligibility(&coupon, order_amount, used, Utc::now())?;

    let discount_amount = calculate_discount(&coupon, order_amount);
    Ok(StdResponse::with_message(
        ValidateCouponRes {
            discount_amount,
            final_amount: round_currency(order_amount - discount_amount),
            coupon: CouponSummary {
                id: coupon.id,
                code: coupon.code,
                description: coupon.description,
                discount_type: coupon.discount_type,
                discount_value: coupon.discount_value,
            },
        },
        "Coupon applied successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct ApplyCouponReq {
    pub coupon_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub discount_amount: Option<f64>,
}

/// Record that the caller redeemed a coupon on an order.
#[utoipa::path(
    post,
    path = "/apply",
    tags = ["Coupons"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = ApplyCouponReq,
    responses(
        (status = 200, description = "Usage recorded", body = Empty),
        (status = 400, description = "Missing coupon, order or discount")
    )
)]
async fn apply_coupon(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<ApplyCouponReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(coupon_id), Some(order_id), Some(discount_amount)) = (
        body.coupon_id,
        body.order_id,
        body.discount_amount.filter(|d| *d > 0.0),
    ) else {
        return Err(AppError::BadRequest(
            "coupon_id, order_id, and discount_amount are required".to_string(),
        ));
    };

    state
        .repo
        .record_coupon_usage(CreateCouponUsageEntity {
            coupon_id,
            user_id,
            order_id,
            discount_amount,
        })
        .await?;

    // the usage row is authoritative; a stale counter is only logged
    if let Err(err) = state.repo.increment_coupon_usage(coupon_id).await {
        tracing::warn!(%coupon_id, error = %err, "Failed to update coupon usage count");
    }
    tracing::info!(%coupon_id, %order_id, discount_amount, "Coupon redeemed");

    Ok(StdResponse::with_message(
        Empty {},
        "Coupon applied successfully",
    ))
}
