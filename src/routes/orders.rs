use std::collections::HashMap;

use axum::{Extension, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{MAX_LINE_QUANTITY, OrderSource, OrderStatus, PaymentStatus, StockAction},
    extract::{Json, Path},
    middleware::{self, UserId},
    models::{
        CreateOrderEntity, NewOrderItem, OrderEntity, OrderItemEntity, ProductEntity,
        UpdateOrderEntity,
    },
    services::orders::{
        REFUND_ETA, cancellation_note, reference_number, return_note, within_return_window,
    },
};

/// Defines the caller's order routes (identity required).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(cancel_order))
            .routes(utoipa_axum::routes!(return_order))
            .route_layer(axum::middleware::from_fn(middleware::user_authorization)),
    )
}

/// The caller's order, or 404 when it does not exist or belongs to someone else.
async fn find_own_order(
    state: &AppState,
    order_id: Uuid,
    user_id: Uuid,
) -> Result<OrderEntity, AppError> {
    state
        .repo
        .find_order(order_id)
        .await?
        .filter(|order| order.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Puts stock back for every line of a cancelled order. Failures are logged.
async fn restore_stock(state: &AppState, items: &[OrderItemEntity]) {
    for item in items {
        match state
            .repo
            .adjust_stock(item.product_id, StockAction::Add, item.quantity)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(product_id = %item.product_id, "Stock restoration skipped, product is gone")
            }
            Err(err) => {
                tracing::warn!(product_id = %item.product_id, error = %err, "Stock restoration failed")
            }
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct OrderItemReq {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    pub quantity: i32,
    /// Unit price charged; defaults to the catalogue price.
    pub price: Option<f64>,
    pub prescription_file: Option<Value>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateOrderReq {
    #[serde(default)]
    pub items: Vec<OrderItemReq>,
    pub subtotal: f64,
    pub tax: Option<f64>,
    pub total_amount: f64,
    pub shipping_address: Option<Value>,
    pub order_source: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateOrderRes {
    pub order_id: Uuid,
    pub order_number: String,
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

/// Place an order for the caller. Stock is checked for every line, then
/// decremented, and the caller's cart is emptied.
#[utoipa::path(
    post,
    path = "/create",
    tags = ["Orders"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Order placed", body = CreateOrderRes),
        (status = 400, description = "Missing data, invalid source or insufficient stock"),
        (status = 404, description = "Unknown product")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.items.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required order information".to_string(),
        ));
    }
    let shipping_address = body
        .shipping_address
        .filter(|address| !address.is_null())
        .ok_or_else(|| AppError::BadRequest("Shipping address is required".to_string()))?;
    let order_source = match body.order_source.as_deref() {
        None => OrderSource::default(),
        Some(source) => source.parse::<OrderSource>().map_err(|_| {
            AppError::BadRequest(
                "Invalid order source. Must be \"customer\" or \"reseller\"".to_string(),
            )
        })?,
    };
    if body.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::BadRequest(
            "Item quantity must be at least 1".to_string(),
        ));
    }
    if body.items.iter().any(|item| item.quantity > MAX_LINE_QUANTITY) {
        return Err(AppError::BadRequest(format!(
            "Item quantity cannot exceed {MAX_LINE_QUANTITY}"
        )));
    }

    let product_ids: Vec<Uuid> = body.items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, ProductEntity> = state
        .repo
        .find_products(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    // lines for the same product draw on the same stock
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for item in &body.items {
        let total = requested.entry(item.product_id).or_default();
        *total = total.checked_add(item.quantity).ok_or_else(|| {
            AppError::BadRequest("Requested quantity is too large".to_string())
        })?;
    }

    for item in &body.items {
        let Some(product) = products.get(&item.product_id) else {
            let label = item
                .product_name
                .clone()
                .unwrap_or_else(|| item.product_id.to_string());
            return Err(AppError::NotFound(format!("Product not found: {label}")));
        };
        if product.stock_quantity < requested[&item.product_id] {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}. Available: {}",
                product.name, product.stock_quantity
            )));
        }
    }

    let lines: Vec<NewOrderItem> = body
        .items
        .into_iter()
        .filter_map(|item| {
            let product = products.get(&item.product_id)?;
            Some(NewOrderItem {
                product_id: item.product_id,
                product_name: item.product_name.unwrap_or_else(|| product.name.clone()),
                product_image: item.product_image.or_else(|| product.featured_image.clone()),
                quantity: item.quantity,
                unit_price: item.price.unwrap_or(product.price),
                lens_prescription: item.prescription_file,
            })
        })
        .collect();

    let order_number = reference_number("ORD");
    let (order, items) = state
        .repo
        .create_order(
            CreateOrderEntity {
                order_number: order_number.clone(),
                user_id,
                order_source: order_source.as_str().to_string(),
                status: OrderStatus::Pending.as_str().to_string(),
                payment_status: PaymentStatus::Pending.as_str().to_string(),
                subtotal: body.subtotal,
                tax_amount: body.tax.unwrap_or(0.0),
                shipping_amount: 0.0,
                discount_amount: 0.0,
                total_amount: body.total_amount,
                shipping_address,
            },
            lines,
        )
        .await?;

    for (product_id, quantity) in requested {
        if let Err(err) = state
            .repo
            .adjust_stock(product_id, StockAction::Subtract, quantity)
            .await
        {
            tracing::warn!(%product_id, error = %err, "Stock update failed");
        }
    }

    if let Some(cart) = state.repo.find_cart(user_id).await? {
        state.repo.clear_cart(cart.id).await?;
    }

    tracing::info!(
        order_id = %order.id,
        %order_number,
        total = order.total_amount,
        items = items.len(),
        source = %order_source,
        "Order created"
    );

    Ok(StdResponse::with_message(
        CreateOrderRes {
            order_id: order.id,
            order_number,
            order,
            items,
        },
        "Order placed successfully",
    ))
}

#[derive(Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

#[derive(Serialize, ToSchema)]
pub struct GetOrderRes {
    pub order: OrderWithItems,
}

/// Fetch one of the caller's orders with its items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch"),
        ("x-user-id" = Uuid, Header, description = "Caller's user ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = GetOrderRes),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let order = find_own_order(&state, id, user_id).await?;
    let items = state.repo.list_order_items(&[order.id]).await?;

    Ok(StdResponse::new(GetOrderRes {
        order: OrderWithItems { order, items },
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct OrderActionReq {
    pub order_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct Refund {
    pub status: String,
    pub eta: String,
    pub amount: f64,
}

#[derive(Serialize, ToSchema)]
pub struct CancelOrderRes {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub refund: Option<Refund>,
}

/// Cancel one of the caller's orders while it is still pending, confirmed or
/// processing. Stock is restored and paid orders are marked refunded.
#[utoipa::path(
    post,
    path = "/cancel",
    tags = ["Orders"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = OrderActionReq,
    responses(
        (status = 200, description = "Order cancelled", body = CancelOrderRes),
        (status = 400, description = "Order is past the cancellable stage"),
        (status = 404, description = "Order not found")
    )
)]
async fn cancel_order(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<OrderActionReq>,
) -> Result<impl IntoResponse, AppError> {
    let order_id = body
        .order_id
        .ok_or_else(|| AppError::BadRequest("Order ID is required".to_string()))?;
    let order = find_own_order(&state, order_id, user_id).await?;

    let cancellable = order
        .status
        .parse::<OrderStatus>()
        .is_ok_and(|status| status.is_cancellable());
    if !cancellable {
        return Err(AppError::BadRequest(format!(
            "This order cannot be cancelled as it is already {}",
            order.status
        )));
    }

    let paid = order.payment_status == PaymentStatus::Paid.as_str();
    state
        .repo
        .update_order(
            order.id,
            UpdateOrderEntity {
                status: Some(OrderStatus::Cancelled.as_str().to_string()),
                payment_status: paid.then(|| PaymentStatus::Refunded.as_str().to_string()),
                admin_notes: Some(cancellation_note(body.reason.as_deref())),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let items = state.repo.list_order_items(&[order.id]).await?;
    restore_stock(&state, &items).await;

    let refund = paid.then(|| Refund {
        status: "initiated".to_string(),
        eta: REFUND_ETA.to_string(),
        amount: order.total_amount,
    });
    tracing::info!(order_id = %order.id, refund = refund.is_some(), "Order cancelled");

    Ok(StdResponse::with_message(
        CancelOrderRes {
            order_id: order.id,
            status: OrderStatus::Cancelled,
            refund,
        },
        "Order cancelled successfully",
    ))
}

#[derive(Serialize, ToSchema)]
pub struct ReturnOrderRes {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub return_auth_number: String,
    pub pickup_eta: String,
    pub refund_policy: String,
    pub refund_amount: f64,
}

/// Request a return for a delivered order within the return window.
#[utoipa::path(
    post,
    path = "/return",
    tags = ["Orders"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = OrderActionReq,
    responses(
        (status = 200, description = "Return accepted", body = ReturnOrderRes),
        (status = 400, description = "Order not delivered or return window expired"),
        (status = 404, description = "Order not found")
    )
)]
async fn return_order(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<OrderActionReq>,
) -> Result<impl IntoResponse, AppError> {
    let order_id = body
        .order_id
        .ok_or_else(|| AppError::BadRequest("Order ID is required".to_string()))?;
    let order = find_own_order(&state, order_id, user_id).await?;

    if order.status != OrderStatus::Delivered.as_str() {
        return Err(AppError::BadRequest(
            "This order cannot be returned as it has not been delivered yet".to_string(),
        ));
    }
    if !within_return_window(order.delivered_at, Utc::now()) {
        return Err(AppError::BadRequest(
            "Return window has expired. Returns are only accepted within 14 days of delivery"
                .to_string(),
        ));
    }

    let authorization = reference_number("RET");
    let paid = order.payment_status == PaymentStatus::Paid.as_str();
    state
        .repo
        .update_order(
            order.id,
            UpdateOrderEntity {
                status: Some(OrderStatus::Returned.as_str().to_string()),
                payment_status: paid.then(|| PaymentStatus::Refunded.as_str().to_string()),
                admin_notes: Some(return_note(body.reason.as_deref(), &authorization)),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    tracing::info!(order_id = %order.id, %authorization, "Return requested");

    Ok(StdResponse::with_message(
        ReturnOrderRes {
            order_id: order.id,
            status: OrderStatus::Returned,
            return_auth_number: authorization,
            pickup_eta: "Within 24-48 hours".to_string(),
            refund_policy: format!(
                "Refund will be initiated after product inspection ({REFUND_ETA})"
            ),
            refund_amount: order.total_amount,
        },
        "Return request submitted successfully",
    ))
}
