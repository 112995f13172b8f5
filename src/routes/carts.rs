use std::collections::HashMap;

use axum::{Extension, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, Empty, StdResponse},
    app_state::AppState,
    domain::{MAX_LINE_QUANTITY, round_currency},
    extract::{Json, Query},
    middleware::{self, UserId},
    models::{CartItemEntity, CreateCartItemEntity, ProductEntity},
};

/// Defines the caller's cart routes (identity required).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(add_to_cart))
            .routes(utoipa_axum::routes!(update_cart_item))
            .routes(utoipa_axum::routes!(remove_cart_item))
            .route_layer(axum::middleware::from_fn(middleware::user_authorization)),
    )
}

fn check_line_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "Quantity cannot exceed {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub featured_image: Option<String>,
    pub stock_quantity: i32,
    pub is_in_stock: bool,
}

impl From<ProductEntity> for ProductSummary {
    fn from(product: ProductEntity) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            featured_image: product.featured_image,
            is_in_stock: product.stock_quantity > 0,
            stock_quantity: product.stock_quantity,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItemEntity,
    pub product: Option<ProductSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    /// Sum of `(price + lens_price) * quantity` over all items.
    pub total_price: f64,
}

#[derive(Serialize, ToSchema)]
pub struct GetCartRes {
    pub cart: CartView,
}

/// Fetch the caller's cart, creating an empty one on first use.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Cart"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    responses(
        (status = 200, description = "Cart with items and product summaries", body = GetCartRes),
        (status = 401, description = "Missing user ID")
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.repo.get_or_create_cart(user_id).await?;
    let items = state.repo.list_cart_items(cart.id).await?;

    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let mut products: HashMap<Uuid, ProductEntity> = state
        .repo
        .find_products(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let total_price = round_currency(
        items
            .iter()
            .map(|item| (item.price + item.lens_price) * f64::from(item.quantity))
            .sum(),
    );
    let items = items
        .into_iter()
        .map(|item| CartItemView {
            product: products.remove(&item.product_id).map(ProductSummary::from),
            item,
        })
        .collect();

    Ok(StdResponse::new(GetCartRes {
        cart: CartView {
            id: cart.id,
            items,
            total_price,
        },
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct AddToCartReq {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub lens_type: Option<String>,
    pub lens_prescription: Option<Value>,
    pub lens_coating: Option<String>,
    pub lens_price: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct CartItemRes {
    pub item: CartItemEntity,
}

/// Add a product to the caller's cart. Adding a product already in the cart
/// increases that line's quantity, up to the per-line maximum.
#[utoipa::path(
    post,
    path = "/add",
    tags = ["Cart"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = AddToCartReq,
    responses(
        (status = 200, description = "Item added or merged", body = CartItemRes),
        (status = 400, description = "Missing product ID or quantity"),
        (status = 404, description = "Unknown product")
    )
)]
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<AddToCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(product_id), Some(quantity)) = (body.product_id, body.quantity.filter(|q| *q > 0))
    else {
        return Err(AppError::BadRequest(
            "Product ID and quantity required".to_string(),
        ));
    };
    check_line_quantity(quantity)?;

    let product = state
        .repo
        .find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let cart = state.repo.get_or_create_cart(user_id).await?;
    let item = state
        .repo
        .add_cart_item(CreateCartItemEntity {
            cart_id: cart.id,
            product_id,
            quantity,
            price: product.price,
            lens_type: body.lens_type,
            lens_prescription: body.lens_prescription,
            lens_coating: body.lens_coating,
            lens_price: body.lens_price.unwrap_or(0.0),
        })
        .await?;

    let message = if item.quantity > quantity {
        "Cart updated"
    } else {
        "Item added to cart"
    };
    tracing::info!(cart_id = %cart.id, %product_id, quantity = item.quantity, "{message}");
    Ok(StdResponse::with_message(CartItemRes { item }, message))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCartItemReq {
    pub item_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

/// Set the quantity of a line in the caller's cart.
#[utoipa::path(
    put,
    path = "/update",
    tags = ["Cart"],
    params(("x-user-id" = Uuid, Header, description = "Caller's user ID")),
    request_body = UpdateCartItemReq,
    responses(
        (status = 200, description = "Quantity updated", body = CartItemRes),
        (status = 400, description = "Missing item ID or quantity below 1"),
        (status = 404, description = "No such item in the caller's cart")
    )
)]
async fn update_cart_item(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<UpdateCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(item_id), Some(quantity)) = (body.item_id, body.quantity.filter(|q| *q >= 1)) else {
        return Err(AppError::BadRequest(
            "Valid item ID and quantity required".to_string(),
        ));
    };
    check_line_quantity(quantity)?;

    let not_found = || AppError::NotFound("Cart item not found".to_string());
    let cart = state.repo.find_cart(user_id).await?.ok_or_else(not_found)?;
    let item = state
        .repo
        .update_cart_item_quantity(cart.id, item_id, quantity)
        .await?
        .ok_or_else(not_found)?;

    Ok(StdResponse::with_message(CartItemRes { item }, "Cart updated"))
}

#[derive(Deserialize, IntoParams)]
pub struct RemoveCartItemQuery {
    pub item_id: Option<Uuid>,
}

/// Remove a line from the caller's cart.
#[utoipa::path(
    delete,
    path = "/remove",
    tags = ["Cart"],
    params(
        ("x-user-id" = Uuid, Header, description = "Caller's user ID"),
        RemoveCartItemQuery
    ),
    responses(
        (status = 200, description = "Item removed", body = Empty),
        (status = 400, description = "Missing item ID"),
        (status = 404, description = "No such item in the caller's cart")
    )
)]
async fn remove_cart_item(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<RemoveCartItemQuery>,
) -> Result<impl IntoResponse, AppError> {
    let item_id = query
        .item_id
        .ok_or_else(|| AppError::BadRequest("Item ID required".to_string()))?;

    let not_found = || AppError::NotFound("Cart item not found".to_string());
    let cart = state.repo.find_cart(user_id).await?.ok_or_else(not_found)?;
    if !state.repo.remove_cart_item(cart.id, item_id).await? {
        return Err(not_found());
    }

    Ok(StdResponse::with_message(Empty {}, "Item removed from cart"))
}
