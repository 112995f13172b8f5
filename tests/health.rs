mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_lists_every_route_group() {
    let app = TestApp::new();
    let (status, body) = app.get("/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Eyewear Storefront API");
    let paths = body["paths"].as_object().unwrap();
    for path in [
        "/auth/register",
        "/cart/add",
        "/orders/create",
        "/payment/verify",
        "/coupons/validate",
        "/seller/inventory/{id}",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}
