use std::collections::HashMap;

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    db::OrderFilter,
    domain::{OrderSource, OrderStatus},
    extract::{Json, Path, Query},
    middleware::Seller,
    models::{OrderEntity, OrderItemEntity, UpdateOrderEntity},
    services::orders::OrderStats,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(list_orders))
        .routes(utoipa_axum::routes!(update_order_status))
}

#[derive(Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    /// Only orders in this status.
    pub status: Option<String>,
    /// Only orders from this channel (`customer` or `reseller`).
    pub source: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SellerOrder {
    #[serde(flatten)]
    pub order: OrderEntity,
    pub order_items: Vec<OrderItemEntity>,
}

#[derive(Serialize, ToSchema)]
pub struct ListOrdersRes {
    pub orders: Vec<SellerOrder>,
    pub stats: OrderStats,
}

/// List orders, newest first, with their items and summary statistics.
#[utoipa::path(
    get,
    path = "/orders",
    tags = ["Seller"],
    params(
        ("x-user-id" = Uuid, Header, description = "Seller's user ID"),
        ListOrdersQuery
    ),
    responses(
        (status = 200, description = "Orders with stats", body = ListOrdersRes),
        (status = 403, description = "Caller is not a seller")
    )
)]
async fn list_orders(
    State(state): State<AppState>,
    _seller: Seller,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = OrderFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        source: query
            .source
            .as_deref()
            .map(str::parse::<OrderSource>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
    };

    let orders = state.repo.list_orders(&filter).await?;
    let stats = OrderStats::from_orders(&orders);

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemEntity>> = HashMap::new();
    for item in state.repo.list_order_items(&order_ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let orders = orders
        .into_iter()
        .map(|order| SellerOrder {
            order_items: items_by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse::new(ListOrdersRes { orders, stats }))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateOrderStatusReq {
    pub status: Option<String>,
    /// Stored when the order is marked shipped.
    pub tracking_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateOrderStatusRes {
    pub order: OrderEntity,
}

fn invalid_status() -> AppError {
    let allowed: Vec<&str> = OrderStatus::SELLER_SETTABLE
        .iter()
        .map(|s| s.as_str())
        .collect();
    AppError::BadRequest(format!(
        "Invalid status. Must be one of: {}",
        allowed.join(", ")
    ))
}

/// Move an order to a new status. `shipped` stamps `shipped_at` (and the
/// tracking number when given); `delivered` stamps `delivered_at`.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    tags = ["Seller"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update"),
        ("x-user-id" = Uuid, Header, description = "Seller's user ID")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Status updated", body = UpdateOrderStatusRes),
        (status = 400, description = "Status not settable by sellers"),
        (status = 403, description = "Caller is not a seller"),
        (status = 404, description = "Order not found")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Seller(seller): Seller,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let status = body
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok())
        .filter(OrderStatus::is_seller_settable)
        .ok_or_else(invalid_status)?;

    let now = Utc::now();
    let mut changes = UpdateOrderEntity {
        status: Some(status.as_str().to_string()),
        ..Default::default()
    };
    match status {
        OrderStatus::Shipped => {
            changes.shipped_at = Some(now);
            changes.tracking_number = body
                .tracking_number
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
        }
        OrderStatus::Delivered => changes.delivered_at = Some(now),
        _ => {}
    }

    let order = state
        .repo
        .update_order(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    tracing::info!(
        seller_id = %seller.id,
        "Order #{} status updated to {}",
        order.order_number,
        status
    );

    Ok(StdResponse::with_message(
        UpdateOrderStatusRes { order },
        format!("Order status updated to {status}"),
    ))
}
