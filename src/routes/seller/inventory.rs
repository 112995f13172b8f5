use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{StockAction, round_currency},
    extract::{Json, Path, Query},
    middleware::Seller,
    models::ProductEntity,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_inventory))
        .routes(utoipa_axum::routes!(update_stock))
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct InventoryStats {
    pub total_products: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    /// Sum of `stock_quantity * price`.
    pub total_value: f64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct InventoryBuckets {
    pub low_stock: Vec<ProductEntity>,
    pub out_of_stock: Vec<ProductEntity>,
    pub in_stock: Vec<ProductEntity>,
}

#[derive(Serialize, ToSchema)]
pub struct InventoryRes {
    pub stats: InventoryStats,
    pub inventory: InventoryBuckets,
    pub threshold: i32,
}

/// Splits products into out of stock (0), low (1..=threshold) and in stock.
fn partition(products: Vec<ProductEntity>, threshold: i32) -> (InventoryStats, InventoryBuckets) {
    let mut stats = InventoryStats {
        total_products: products.len(),
        ..Default::default()
    };
    let mut buckets = InventoryBuckets::default();

    for product in products {
        stats.total_value += f64::from(product.stock_quantity) * product.price;
        if product.stock_quantity <= 0 {
            buckets.out_of_stock.push(product);
        } else if product.stock_quantity <= threshold {
            buckets.low_stock.push(product);
        } else {
            buckets.in_stock.push(product);
        }
    }

    stats.total_value = round_currency(stats.total_value);
    stats.out_of_stock = buckets.out_of_stock.len();
    stats.low_stock = buckets.low_stock.len();
    stats.in_stock = buckets.in_stock.len();
    (stats, buckets)
}

#[derive(Deserialize, IntoParams)]
pub struct InventoryQuery {
    /// Stock at or below this level counts as low (default 10).
    pub threshold: Option<i32>,
}

/// The seller's products by ascending stock, bucketed by stock level.
#[utoipa::path(
    get,
    path = "/inventory",
    tags = ["Seller"],
    params(
        ("x-user-id" = Uuid, Header, description = "Seller's user ID"),
        InventoryQuery
    ),
    responses(
        (status = 200, description = "Inventory report", body = InventoryRes),
        (status = 403, description = "Caller is not a seller")
    )
)]
async fn get_inventory(
    State(state): State<AppState>,
    Seller(seller): Seller,
    Query(query): Query<InventoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    if threshold < 0 {
        return Err(AppError::BadRequest(
            "Threshold must not be negative".to_string(),
        ));
    }

    let products = state.repo.list_seller_products(seller.id).await?;
    let (stats, inventory) = partition(products, threshold);

    Ok(StdResponse::new(InventoryRes {
        stats,
        inventory,
        threshold,
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStockReq {
    pub stock_quantity: Option<i32>,
    /// `set` (default), `add` or `subtract`. Subtraction stops at zero.
    pub action: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateStockRes {
    pub product: ProductEntity,
}

/// Adjust the stock of one of the seller's products.
#[utoipa::path(
    put,
    path = "/inventory/{id}",
    tags = ["Seller"],
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("x-user-id" = Uuid, Header, description = "Seller's user ID")
    ),
    request_body = UpdateStockReq,
    responses(
        (status = 200, description = "Stock updated", body = UpdateStockRes),
        (status = 400, description = "Invalid action or quantity"),
        (status = 403, description = "Not a seller, or product owned by another seller"),
        (status = 404, description = "Product not found")
    )
)]
async fn update_stock(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Seller(seller): Seller,
    Json(body): Json<UpdateStockReq>,
) -> Result<impl IntoResponse, AppError> {
    let action = match body.action.as_deref() {
        None => StockAction::default(),
        Some(action) => action.parse::<StockAction>().map_err(|_| {
            AppError::BadRequest("Invalid action. Must be: set, add, or subtract".to_string())
        })?,
    };
    let quantity = body
        .stock_quantity
        .filter(|q| *q >= 0)
        .ok_or_else(|| AppError::BadRequest("Valid stock quantity required".to_string()))?;

    let not_found = || AppError::NotFound("Product not found".to_string());
    let product = state.repo.find_product(id).await?.ok_or_else(not_found)?;
    if product.seller_id != Some(seller.id) {
        return Err(AppError::ForbiddenResource(
            "Unauthorized - You can only update your own products".to_string(),
        ));
    }

    let (previous, product) = state
        .repo
        .adjust_stock(id, action, quantity)
        .await?
        .ok_or_else(not_found)?;

    let message = format!(
        "Stock updated from {previous} to {}",
        product.stock_quantity
    );
    tracing::info!(product_id = %id, %action, quantity, "{message}");

    Ok(StdResponse::with_message(UpdateStockRes { product }, message))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(stock: i32, price: f64) -> ProductEntity {
        let now = Utc::now();
        ProductEntity {
            id: Uuid::new_v4(),
            seller_id: None,
            name: format!("Frame {stock}"),
            price,
            stock_quantity: stock,
            featured_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn buckets_by_threshold() {
        let products = vec![
            product(0, 999.0),
            product(1, 500.0),
            product(10, 100.0),
            product(11, 10.0),
        ];
        let (stats, buckets) = partition(products, 10);

        assert_eq!(stats.total_products, 4);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.low_stock, 2);
        assert_eq!(stats.in_stock, 1);
        assert_eq!(stats.total_value, 500.0 + 1000.0 + 110.0);
        assert_eq!(buckets.in_stock[0].stock_quantity, 11);
    }

    #[test]
    fn zero_threshold_has_no_low_bucket() {
        let (stats, _) = partition(vec![product(0, 1.0), product(1, 1.0)], 0);
        assert_eq!(stats.low_stock, 0);
        assert_eq!(stats.in_stock, 1);
        assert_eq!(stats.out_of_stock, 1);
    }
}
