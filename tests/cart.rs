mod common;

use axum::http::StatusCode;
use common::TestApp;
use eyewear_storefront::domain::MAX_LINE_QUANTITY;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn cart_requires_a_user_id() {
    let app = TestApp::new();

    let (status, body) = app.get("/cart", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User ID required");
}

#[tokio::test]
async fn adding_the_same_product_twice_merges_lines() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let frame = app.repo.seed_product(None, "Round Titanium", 1500.0, 20).await;

    let (status, body) = app
        .post(
            "/cart/add",
            Some(user),
            json!({ "product_id": frame.id, "quantity": 1, "lens_price": 500.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Item added to cart");

    let (status, body) = app
        .post(
            "/cart/add",
            Some(user),
            json!({ "product_id": frame.id, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Cart updated");
    assert_eq!(body["item"]["quantity"], 3);

    let (status, body) = app.get("/cart", Some(user)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["product"]["name"], "Round Titanium");
    assert_eq!(items[0]["product"]["is_in_stock"], true);
    assert_eq!(body["cart"]["total_price"], 6000.0);
}

#[tokio::test]
async fn unknown_product_is_not_added() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/cart/add",
            Some(Uuid::new_v4()),
            json!({ "product_id": Uuid::new_v4(), "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn update_and_remove_only_touch_the_callers_cart() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let frame = app.repo.seed_product(None, "Cat Eye", 900.0, 5).await;

    let (_, body) = app
        .post(
            "/cart/add",
            Some(owner),
            json!({ "product_id": frame.id, "quantity": 1 }),
        )
        .await;
    let item_id = body["item"]["id"].as_str().unwrap().to_string();

    // intruder has a cart of their own, but not this line
    app.get("/cart", Some(intruder)).await;
    let (status, _) = app
        .put(
            "/cart/update",
            Some(intruder),
            json!({ "item_id": item_id, "quantity": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .delete(&format!("/cart/remove?item_id={item_id}"), Some(intruder))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .put(
            "/cart/update",
            Some(owner),
            json!({ "item_id": item_id, "quantity": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["quantity"], 4);

    let (status, body) = app
        .put(
            "/cart/update",
            Some(owner),
            json!({ "item_id": item_id, "quantity": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .delete(&format!("/cart/remove?item_id={item_id}"), Some(owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from cart");

    let (_, body) = app.get("/cart", Some(owner)).await;
    assert!(body["cart"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_large_adds_stay_within_the_line_limit() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let frame = app.repo.seed_product(None, "Browline", 1300.0, 5).await;

    let (status, _) = app
        .post(
            "/cart/add",
            Some(user),
            json!({ "product_id": frame.id, "quantity": i32::MAX }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let (status, body) = app
            .post(
                "/cart/add",
                Some(user),
                json!({ "product_id": frame.id, "quantity": MAX_LINE_QUANTITY }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, body) = app.get("/cart", Some(user)).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], MAX_LINE_QUANTITY);
}
