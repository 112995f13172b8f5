mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn non_sellers_are_forbidden() {
    let app = TestApp::new();
    let customer = app.create_user("customer", "9111111111").await;

    let (status, body) = app.get("/seller/inventory", Some(customer.id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized - Seller access only");

    let (status, _) = app.get("/seller/orders", Some(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/seller/orders", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inventory_is_bucketed_by_threshold() {
    let app = TestApp::new();
    let seller = app.create_user("seller", "9222222222").await;
    let other = app.create_user("seller", "9333333333").await;

    app.repo.seed_product(Some(seller.id), "Sold Out", 1000.0, 0).await;
    app.repo.seed_product(Some(seller.id), "Nearly Gone", 500.0, 3).await;
    app.repo.seed_product(Some(seller.id), "Plenty", 200.0, 50).await;
    app.repo.seed_product(Some(other.id), "Not Mine", 100.0, 1).await;

    let (status, body) = app.get("/seller/inventory", Some(seller.id)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["threshold"], 10);
    assert_eq!(body["stats"]["total_products"], 3);
    assert_eq!(body["stats"]["out_of_stock"], 1);
    assert_eq!(body["stats"]["low_stock"], 1);
    assert_eq!(body["stats"]["in_stock"], 1);
    assert_eq!(body["stats"]["total_value"], 11500.0);
    assert_eq!(body["inventory"]["low_stock"][0]["name"], "Nearly Gone");

    let (_, body) = app
        .get("/seller/inventory?threshold=2", Some(seller.id))
        .await;
    assert_eq!(body["threshold"], 2);
    assert_eq!(body["stats"]["low_stock"], 0);
    assert_eq!(body["stats"]["in_stock"], 2);
}

#[tokio::test]
async fn stock_updates_apply_the_requested_action() {
    let app = TestApp::new();
    let seller = app.create_user("seller", "9444444444").await;
    let frame = app.repo.seed_product(Some(seller.id), "Pilot", 1800.0, 5).await;
    let uri = format!("/seller/inventory/{}", frame.id);

    let (status, body) = app
        .put(&uri, Some(seller.id), json!({ "stock_quantity": 3, "action": "add" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Stock updated from 5 to 8");

    let (_, body) = app
        .put(
            &uri,
            Some(seller.id),
            json!({ "stock_quantity": 20, "action": "subtract" }),
        )
        .await;
    assert_eq!(body["message"], "Stock updated from 8 to 0");

    let (_, body) = app
        .put(&uri, Some(seller.id), json!({ "stock_quantity": 12 }))
        .await;
    assert_eq!(body["product"]["stock_quantity"], 12);

    let (status, body) = app
        .put(
            &uri,
            Some(seller.id),
            json!({ "stock_quantity": 1, "action": "double" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action. Must be: set, add, or subtract");
}

#[tokio::test]
async fn sellers_cannot_touch_other_sellers_stock() {
    let app = TestApp::new();
    let owner = app.create_user("seller", "9555555555").await;
    let rival = app.create_user("seller", "9666666666").await;
    let frame = app.repo.seed_product(Some(owner.id), "Hexagon", 1400.0, 4).await;

    let (status, body) = app
        .put(
            &format!("/seller/inventory/{}", frame.id),
            Some(rival.id),
            json!({ "stock_quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Unauthorized - You can only update your own products"
    );

    let (status, _) = app
        .put(
            &format!("/seller/inventory/{}", Uuid::new_v4()),
            Some(owner.id),
            json!({ "stock_quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_status_flow_stamps_shipping_and_delivery() {
    let app = TestApp::new();
    let seller = app.create_user("seller", "9777777777").await;
    let customer = Uuid::new_v4();
    let frame = app.repo.seed_product(Some(seller.id), "Panto", 1600.0, 5).await;

    let (_, body) = app
        .post(
            "/orders/create",
            Some(customer),
            json!({
                "items": [{ "product_id": frame.id, "quantity": 1 }],
                "subtotal": 1600.0,
                "total_amount": 1600.0,
                "shipping_address": { "city": "Chennai" },
                "order_source": "reseller",
            }),
        )
        .await;
    let order_id = body["order_id"].as_str().unwrap().to_string();
    let uri = format!("/seller/orders/{order_id}/status");

    let (status, body) = app
        .put(&uri, Some(seller.id), json!({ "status": "returned" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid status. Must be one of: pending, processing, shipped, delivered, cancelled"
    );

    let (status, body) = app
        .put(
            &uri,
            Some(seller.id),
            json!({ "status": "shipped", "tracking_number": "BLR123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Order status updated to shipped");
    assert_eq!(body["order"]["tracking_number"], "BLR123456");
    assert!(body["order"]["shipped_at"].is_string());
    assert!(body["order"]["delivered_at"].is_null());

    let (_, body) = app
        .put(&uri, Some(seller.id), json!({ "status": "delivered" }))
        .await;
    assert!(body["order"]["delivered_at"].is_string());

    let (status, body) = app
        .get("/seller/orders?source=reseller", Some(seller.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["orders"][0]["order_items"][0]["product_name"], "Panto");
    assert_eq!(body["stats"]["delivered"], 1);
    assert_eq!(body["stats"]["total_revenue"], 1600.0);

    let (_, body) = app
        .get("/seller/orders?status=pending", Some(seller.id))
        .await;
    assert!(body["orders"].as_array().unwrap().is_empty());

    let (status, _) = app
        .get("/seller/orders?status=lost", Some(seller.id))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            &format!("/seller/orders/{}/status", Uuid::new_v4()),
            Some(seller.id),
            json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
