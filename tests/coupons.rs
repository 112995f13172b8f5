mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use eyewear_storefront::{db::CouponRepository, models::CouponEntity};
use serde_json::json;
use uuid::Uuid;

fn coupon(code: &str, discount_type: &str, value: f64) -> CouponEntity {
    CouponEntity {
        id: Uuid::new_v4(),
        code: code.to_string(),
        description: Some("Festive offer".to_string()),
        discount_type: discount_type.to_string(),
        discount_value: value,
        min_purchase_amount: None,
        max_discount_amount: None,
        usage_limit: None,
        usage_count: 0,
        user_limit: None,
        is_active: true,
        valid_from: None,
        valid_until: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn percentage_coupon_is_capped_and_case_insensitive() {
    let app = TestApp::new();
    app.repo
        .seed_coupon(CouponEntity {
            max_discount_amount: Some(300.0),
            ..coupon("DIWALI20", "percentage", 20.0)
        })
        .await;

    let (status, body) = app
        .post(
            "/coupons/validate",
            Some(Uuid::new_v4()),
            json!({ "code": " diwali20 ", "order_amount": 2000.0 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["coupon"]["code"], "DIWALI20");
    assert_eq!(body["discount_amount"], 300.0);
    assert_eq!(body["final_amount"], 1700.0);
}

#[tokio::test]
async fn coupon_rules_are_enforced() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    app.repo
        .seed_coupon(CouponEntity {
            min_purchase_amount: Some(1000.0),
            ..coupon("MIN1000", "fixed", 100.0)
        })
        .await;
    app.repo
        .seed_coupon(CouponEntity {
            valid_until: Some(Utc::now() - Duration::days(1)),
            ..coupon("OLD", "fixed", 100.0)
        })
        .await;
    app.repo
        .seed_coupon(CouponEntity {
            is_active: false,
            ..coupon("OFF", "fixed", 100.0)
        })
        .await;

    let cases = [
        ("MIN1000", "Minimum purchase amount of ₹1000 required"),
        ("OLD", "This coupon has expired"),
        ("OFF", "This coupon is no longer active"),
    ];
    for (code, error) in cases {
        let (status, body) = app
            .post(
                "/coupons/validate",
                Some(user),
                json!({ "code": code, "order_amount": 500.0 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(body["error"], error);
    }

    let (status, body) = app
        .post(
            "/coupons/validate",
            Some(user),
            json!({ "code": "NOPE", "order_amount": 500.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid coupon code");
}

#[tokio::test]
async fn applying_records_usage_and_blocks_reuse() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let welcome = coupon("WELCOME", "fixed", 250.0);
    let coupon_id = welcome.id;
    app.repo.seed_coupon(welcome).await;

    let (status, body) = app
        .post(
            "/coupons/apply",
            Some(user),
            json!({ "coupon_id": coupon_id, "order_id": Uuid::new_v4(), "discount_amount": 250.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stored = app.repo.find_coupon(coupon_id).await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 1);

    let (status, body) = app
        .post(
            "/coupons/validate",
            Some(user),
            json!({ "code": "WELCOME", "order_amount": 1000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already used this coupon");

    // another customer is unaffected by the per-user limit
    let (status, body) = app
        .post(
            "/coupons/validate",
            Some(Uuid::new_v4()),
            json!({ "code": "WELCOME", "order_amount": 1000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["final_amount"], 750.0);
}

#[tokio::test]
async fn apply_requires_all_fields() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/coupons/apply",
            Some(Uuid::new_v4()),
            json!({ "coupon_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
